//! Flow-based page estimation
//!
//! Body blocks are stacked top to bottom: a paragraph's height is its line
//! count (characters times an average glyph width, wrapped at the content
//! width) times the line height, plus its spacing. A block that does not fit
//! starts a new page, as does `pageBreakBefore` or an explicit page break in
//! the previous paragraph. The estimate is heuristic; real line breaking is
//! not attempted.

use doc_model::units::{pt_to_px, twips_to_px};
use doc_model::{Block, NodeId, Page, PageGeometry, PagePlacement, ParagraphBlock, MAIN_DOCUMENT_PART};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub default_font_size_pt: f64,
    /// Line height as a multiple of the font size
    pub line_height_factor: f64,
    /// Average glyph width as a multiple of the font size
    pub char_width_factor: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_font_size_pt: 11.0,
            line_height_factor: 1.15,
            char_width_factor: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageEstimator {
    config: LayoutConfig,
}

impl PageEstimator {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Estimate pages for the body blocks of `blocks`. `breaks_after` holds
    /// paragraphs containing an explicit page break.
    pub fn estimate(
        &self,
        blocks: &[Block],
        geometry: PageGeometry,
        breaks_after: &HashSet<NodeId>,
    ) -> Vec<Page> {
        let capacity = geometry.content_height_px().max(1.0);
        let width = geometry.content_width_px().max(1.0);

        let mut pages = vec![Page::new(1, geometry)];
        let mut cursor = 0.0;
        let mut break_pending = false;

        for block in blocks.iter().filter(|b| b.xml_path() == MAIN_DOCUMENT_PART) {
            let height = self.block_height(block, width);
            let forced = break_pending
                || matches!(block, Block::Paragraph(p) if p.style.page_break_before());
            let overflows = cursor > 0.0 && cursor + height > capacity;

            if (forced && cursor > 0.0) || overflows {
                let number = pages.len() as u32 + 1;
                pages.push(Page::new(number, geometry));
                cursor = 0.0;
            }

            if let Some(page) = pages.last_mut() {
                page.placements.push(PagePlacement {
                    block_id: block.id(),
                    y_px: cursor,
                    height_px: height,
                });
            }
            // A block taller than a page spills over whole pages
            cursor += height;
            while cursor > capacity {
                cursor -= capacity;
                let number = pages.len() as u32 + 1;
                pages.push(Page::new(number, geometry));
            }

            break_pending = breaks_after.contains(&block.id());
        }

        pages
    }

    fn block_height(&self, block: &Block, width: f64) -> f64 {
        match block {
            Block::Paragraph(p) => self.paragraph_height(p, width),
            Block::Table(t) => {
                let columns = t.column_count().max(1) as f64;
                let cell_width = width / columns;
                t.rows
                    .iter()
                    .map(|row| {
                        row.cells
                            .iter()
                            .map(|cell| {
                                cell.paragraphs
                                    .iter()
                                    .map(|p| self.paragraph_height(p, cell_width))
                                    .sum::<f64>()
                            })
                            .fold(0.0, f64::max)
                    })
                    .sum()
            }
        }
    }

    fn paragraph_height(&self, paragraph: &ParagraphBlock, width: f64) -> f64 {
        let font_px = pt_to_px(
            paragraph
                .style
                .font_size_pt()
                .unwrap_or(self.config.default_font_size_pt),
        );
        let char_width = (font_px * self.config.char_width_factor).max(0.1);
        let chars_per_line = (width / char_width).floor().max(1.0);
        let lines = (paragraph.char_len() as f64 / chars_per_line).ceil().max(1.0);

        lines * font_px * self.config.line_height_factor
            + twips_to_px(paragraph.style.spacing_before_twips())
            + twips_to_px(paragraph.style.spacing_after_twips())
    }
}
