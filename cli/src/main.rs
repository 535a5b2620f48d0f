//! manual-canvas CLI - inspect, edit and round-trip DOCX manuals

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use doc_model::placeholder::replace_placeholders;
use doc_model::DocumentModel;
use edit_engine::{EditAction, Editor};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::{
    CanvasSettings, DocxExporter, DocxImporter, FileBlobStore, FileStorage, ImportResult, IntegrityChecker,
    ProjectSession, SettingsManager, WorkspaceRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "manual-canvas")]
#[command(version)]
#[command(about = "Import, edit and re-export DOCX quality manuals", long_about = None)]
struct Cli {
    /// Directory holding settings.json
    #[arg(long, global = true, env = "MANUAL_CANVAS_HOME", value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show blocks, pages, objects and placeholders of a DOCX
    Inspect {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the whole document model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import and export without edits and check the bytes are unchanged
    Roundtrip {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Replace the text of one paragraph
    SetText {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// 0-based paragraph ordinal, table cells included
        #[arg(long)]
        paragraph: usize,

        #[arg(long)]
        text: String,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Substitute {{TOKEN}} placeholders from a JSON object of values
    Fill {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// JSON file with `{"TOKEN": "value"}` pairs
        #[arg(long, value_name = "JSON")]
        values: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Import a DOCX into a stored project workspace
    Import {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        project: String,
    },

    /// Export a stored project workspace
    Export {
        #[arg(long)]
        project: String,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Rewrite paragraphs of a stored project with an OpenAI-compatible model
    #[cfg(feature = "openai")]
    Rewrite {
        #[arg(long)]
        project: String,

        /// selection, paragraph, section or document
        #[arg(long, default_value = "document")]
        scope: String,

        #[arg(long)]
        instruction: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Inspect { input, json } => inspect(&input, json, &settings),
        Commands::Roundtrip { input } => roundtrip(&input, &settings),
        Commands::SetText {
            input,
            paragraph,
            text,
            output,
        } => set_text(&input, paragraph, &text, &output, &settings),
        Commands::Fill {
            input,
            values,
            output,
        } => fill(&input, &values, &output, &settings),
        Commands::Import { input, project } => import_project(&input, &project, &settings),
        Commands::Export { project, output } => export_project(&project, &output, &settings),
        #[cfg(feature = "openai")]
        Commands::Rewrite {
            project,
            scope,
            instruction,
        } => rewrite_project(&project, &scope, &instruction, &settings),
    }
}

fn load_settings(config_dir: Option<&Path>) -> Result<CanvasSettings> {
    let Some(dir) = config_dir else {
        return Ok(CanvasSettings::default());
    };
    let mut manager = SettingsManager::new(dir.to_path_buf());
    Ok(manager.load_sync()?.clone())
}

fn import_file(input: &Path, settings: &CanvasSettings) -> Result<(Vec<u8>, ImportResult)> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let filename = input.file_name().and_then(|n| n.to_str());
    let imported = DocxImporter::new(settings.classifier.clone(), settings.layout.clone())
        .import(&bytes, "cli", filename)
        .with_context(|| format!("importing {}", input.display()))?;
    for warning in &imported.warnings {
        eprintln!("warning: {:?} in {}: {}", warning.kind, warning.xml_path, warning.detail);
    }
    Ok((bytes, imported))
}

fn inspect(input: &Path, json: bool, settings: &CanvasSettings) -> Result<()> {
    let (_, imported) = import_file(input, settings)?;
    let model = &imported.model;
    if json {
        println!("{}", serde_json::to_string_pretty(model)?);
        return Ok(());
    }

    println!("{}", input.display());
    println!(
        "  pages: {}  blocks: {}  objects: {}  assets: {}",
        model.metadata.page_count,
        model.blocks.len(),
        model.document_objects.len(),
        imported.assets.len()
    );
    for (ordinal, paragraph) in model.paragraphs().enumerate() {
        println!(
            "  [{ordinal:>3}] {}#{} {}",
            paragraph.xml_path,
            paragraph.node_index,
            preview(&paragraph.text(), 60)
        );
    }
    for object in &model.document_objects {
        println!(
            "  {} on page {} at ({:.0}, {:.0}) {:.0}x{:.0}px confidence {:.2}{}",
            object.object_type.as_str(),
            object.page_number,
            object.x_px,
            object.y_px,
            object.width_px,
            object.height_px,
            object.classification_confidence,
            if object.ambiguous { " (ambiguous)" } else { "" }
        );
    }
    if !model.metadata.placeholders.is_empty() {
        println!("  placeholders: {}", model.metadata.placeholders.join(", "));
    }

    let report = IntegrityChecker::new().check(model, &imported.assets);
    for issue in &report.issues {
        println!("  {:?}: {:?}", issue.severity(), issue);
    }
    Ok(())
}

fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push('…');
    cut
}

fn roundtrip(input: &Path, settings: &CanvasSettings) -> Result<()> {
    let (bytes, imported) = import_file(input, settings)?;
    let exported = DocxExporter::new().export(&imported.model, &bytes, &[])?;
    if exported.bytes != bytes {
        bail!("export of an unedited model differs from {}", input.display());
    }
    println!("{}: round-trip identical ({} bytes)", input.display(), bytes.len());
    Ok(())
}

fn write_export(model: &DocumentModel, original: &[u8], output: &Path) -> Result<()> {
    let exported = DocxExporter::new().export(model, original, &[])?;
    for block in &exported.report.skipped_blocks {
        eprintln!("warning: block {} could not be located and was not patched", block);
    }
    fs::write(output, &exported.bytes).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "{}: {} paragraphs patched",
        output.display(),
        exported.report.patched_paragraphs
    );
    Ok(())
}

fn set_text(
    input: &Path,
    ordinal: usize,
    text: &str,
    output: &Path,
    settings: &CanvasSettings,
) -> Result<()> {
    let (bytes, imported) = import_file(input, settings)?;
    let block_id = imported
        .model
        .paragraphs()
        .nth(ordinal)
        .map(|p| p.id)
        .with_context(|| format!("document has no paragraph {ordinal}"))?;

    let mut editor = Editor::new(imported.model);
    editor.dispatch(EditAction::EditText {
        block_id,
        text: text.to_string(),
    })?;
    write_export(editor.model(), &bytes, output)
}

fn fill(input: &Path, values: &Path, output: &Path, settings: &CanvasSettings) -> Result<()> {
    let values: BTreeMap<String, String> = serde_json::from_str(
        &fs::read_to_string(values).with_context(|| format!("reading {}", values.display()))?,
    )?;
    let (bytes, imported) = import_file(input, settings)?;

    let edits: Vec<EditAction> = imported
        .model
        .paragraphs()
        .filter(|p| !p.placeholders.is_empty())
        .filter_map(|p| {
            let (text, _) = replace_placeholders(&p.text(), &values);
            (text != p.text()).then_some(EditAction::EditText { block_id: p.id, text })
        })
        .collect();

    let mut editor = Editor::new(imported.model);
    for edit in edits {
        editor.dispatch(edit)?;
    }
    let unresolved = editor.model().placeholder_tokens();
    if !unresolved.is_empty() {
        eprintln!("unresolved placeholders: {}", unresolved.join(", "));
    }
    write_export(editor.model(), &bytes, output)
}

type FileRepository = WorkspaceRepository<FileStorage, FileBlobStore>;

fn repository(settings: &CanvasSettings) -> Result<Arc<FileRepository>> {
    let data_dir = settings
        .store
        .data_dir
        .clone()
        .context("store.dataDir is not configured")?;
    let blobs = FileBlobStore::new(data_dir.join("blobs"));
    Ok(Arc::new(
        WorkspaceRepository::with_blob_store(FileStorage::new(data_dir), blobs)
            .with_max_versions(settings.store.max_versions),
    ))
}

fn import_project(input: &Path, project: &str, settings: &CanvasSettings) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let filename = input.file_name().and_then(|n| n.to_str());
    let (session, warnings) =
        ProjectSession::import(repository(settings)?, project, bytes, filename, settings)?;
    for warning in &warnings {
        eprintln!("warning: {:?} in {}: {}", warning.kind, warning.xml_path, warning.detail);
    }
    println!(
        "project {}: {} blocks imported",
        session.project_id(),
        session.model().blocks.len()
    );
    Ok(())
}

fn export_project(project: &str, output: &Path, settings: &CanvasSettings) -> Result<()> {
    let session = ProjectSession::open(repository(settings)?, project, settings)?;
    let exported = session.export()?;
    fs::write(output, &exported.bytes).with_context(|| format!("writing {}", output.display()))?;
    println!("{}: exported project {}", output.display(), project);
    Ok(())
}

#[cfg(feature = "openai")]
fn rewrite_project(project: &str, scope: &str, instruction: &str, settings: &CanvasSettings) -> Result<()> {
    use rewrite::openai::OpenAiCompletionService;
    use rewrite::{RewriteEngine, RewriteRequest, RewriteScope};

    let scope: RewriteScope = serde_json::from_value(serde_json::Value::String(scope.to_string()))
        .with_context(|| format!("unknown scope {scope}"))?;
    let service = OpenAiCompletionService::from_env()?.with_model(settings.rewrite.model.clone());
    let engine = RewriteEngine::new(settings.rewrite_config());

    let mut session = ProjectSession::open(repository(settings)?, project, settings)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(session.rewrite(
        &engine,
        &service,
        RewriteRequest::new(scope, Vec::new(), instruction),
    ))?;
    for change in &outcome.changes {
        match &change.rejection_reason {
            None => println!("accepted {}", change.block_id),
            Some(reason) => println!("rejected {}: {}", change.block_id, reason),
        }
    }
    Ok(())
}
