//! Application settings management
//!
//! Settings persistence, loading and updating for the canvas backend. Every
//! section falls back to its defaults, so a partial settings file is valid.

use crate::docx::{ClassifierConfig, LayoutConfig};
use crate::Result;
use rewrite::RewriteConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main settings container
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasSettings {
    pub editor: EditorSettings,
    pub rewrite: RewriteSettings,
    pub classifier: ClassifierConfig,
    pub layout: LayoutConfig,
    pub store: StoreSettings,
}

impl CanvasSettings {
    /// Engine configuration for the rewrite pipeline
    pub fn rewrite_config(&self) -> RewriteConfig {
        self.rewrite.engine.clone()
    }
}

/// Editor settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    /// Maximum number of undo snapshots per session
    pub history_limit: usize,
    /// Actor recorded in audit entries when the caller names none
    pub default_actor: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_limit: 50,
            default_actor: "user".to_string(),
        }
    }
}

/// AI rewrite settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RewriteSettings {
    /// Chat model requested from the completion backend
    pub model: String,
    #[serde(flatten)]
    pub engine: RewriteConfig,
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            engine: RewriteConfig::default(),
        }
    }
}

/// Workspace storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Versions kept per project, oldest pruned first
    pub max_versions: usize,
    /// Root of the file-backed workspace storage
    pub data_dir: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_versions: 50,
            data_dir: None,
        }
    }
}

/// Settings manager handling persistence
pub struct SettingsManager {
    settings_path: PathBuf,
    current: CanvasSettings,
}

impl SettingsManager {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let settings_path = app_data_dir.join("settings.json");
        Self {
            settings_path,
            current: CanvasSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    /// Load settings from disk, falling back to defaults
    pub async fn load(&mut self) -> Result<&CanvasSettings> {
        self.current = if self.settings_path.exists() {
            let content = tokio::fs::read_to_string(&self.settings_path).await?;
            Self::parse(&content)
        } else {
            CanvasSettings::default()
        };
        Ok(&self.current)
    }

    pub fn load_sync(&mut self) -> Result<&CanvasSettings> {
        self.current = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            Self::parse(&content)
        } else {
            CanvasSettings::default()
        };
        Ok(&self.current)
    }

    fn parse(content: &str) -> CanvasSettings {
        match serde_json::from_str::<CanvasSettings>(content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                CanvasSettings::default()
            }
        }
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        tokio::fs::write(&self.settings_path, content).await?;
        Ok(())
    }

    pub fn save_sync(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    pub fn get(&self) -> &CanvasSettings {
        &self.current
    }

    pub async fn update(&mut self, settings: CanvasSettings) -> Result<()> {
        self.current = settings;
        self.save().await
    }

    pub fn update_sync(&mut self, settings: CanvasSettings) -> Result<()> {
        self.current = settings;
        self.save_sync()
    }

    pub fn reset_sync(&mut self) -> Result<&CanvasSettings> {
        self.current = CanvasSettings::default();
        self.save_sync()?;
        Ok(&self.current)
    }
}
