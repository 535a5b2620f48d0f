//! Which paragraphs a rewrite covers

use doc_model::{DocumentModel, NodeId, ParagraphBlock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewriteScope {
    /// Every selected paragraph
    #[default]
    Selection,
    /// The first selected paragraph only
    Paragraph,
    /// Heading-bounded section around the first selected paragraph
    Section,
    /// Every paragraph of the document, table cells included
    Document,
}

impl RewriteScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteScope::Selection => "selection",
            RewriteScope::Paragraph => "paragraph",
            RewriteScope::Section => "section",
            RewriteScope::Document => "document",
        }
    }
}

/// Resolve a scope to paragraph ids in document order. Unknown ids in the
/// selection are ignored.
pub fn resolve_scope(model: &DocumentModel, scope: RewriteScope, selected: &[NodeId]) -> Vec<NodeId> {
    match scope {
        RewriteScope::Selection => {
            let wanted: BTreeSet<NodeId> = selected.iter().copied().collect();
            model
                .paragraphs()
                .filter(|p| wanted.contains(&p.id))
                .map(|p| p.id)
                .collect()
        }
        RewriteScope::Paragraph => first_known(model, selected).into_iter().collect(),
        RewriteScope::Section => match first_known(model, selected) {
            Some(anchor) => section_around(model, anchor),
            None => Vec::new(),
        },
        RewriteScope::Document => model.paragraphs().map(|p| p.id).collect(),
    }
}

fn first_known(model: &DocumentModel, selected: &[NodeId]) -> Option<NodeId> {
    selected
        .iter()
        .copied()
        .find(|id| model.find_paragraph(*id).is_some())
}

/// The section runs from the nearest heading at or before the anchor up to,
/// not including, the next heading. Both boundaries stay inside the anchor's
/// part.
fn section_around(model: &DocumentModel, anchor: NodeId) -> Vec<NodeId> {
    let Some(xml_path) = model.find_paragraph(anchor).map(|p| p.xml_path.clone()) else {
        return Vec::new();
    };
    let part: Vec<&ParagraphBlock> = model
        .paragraphs()
        .filter(|p| p.xml_path == xml_path)
        .collect();
    let Some(pos) = part.iter().position(|p| p.id == anchor) else {
        return Vec::new();
    };

    let start = part[..=pos]
        .iter()
        .rposition(|p| p.style.is_heading())
        .unwrap_or(0);
    let end = part[pos + 1..]
        .iter()
        .position(|p| p.style.is_heading())
        .map(|offset| pos + 1 + offset)
        .unwrap_or(part.len());

    part[start..end].iter().map(|p| p.id).collect()
}
