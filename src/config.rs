use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VcConfig {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// [diff] section configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Branch to diff against; detected from the repo when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub line_numbers: bool,
    #[serde(default = "default_true")]
    pub color: bool,
    #[serde(default = "default_tab_width")]
    pub tab_width: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: ExportFormat,
}

/// [storage] section configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Workspace file location; defaults to the user data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_true() -> bool {
    true
}

fn default_tab_width() -> u8 {
    4
}

fn default_context_lines() -> usize {
    3
}

fn default_retention_days() -> u32 {
    30
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            base_branch: None,
            context_lines: default_context_lines(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            line_numbers: true,
            color: true,
            tab_width: default_tab_width(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention_days: default_retention_days(),
        }
    }
}

/// Load config by merging global defaults with per-repo overrides.
/// Priority: per-repo `.vibechecker.toml` > global `~/.config/vibechecker/config.toml` > built-in defaults.
/// Merging is deep: individual keys within sections (e.g. `[display]`) override independently.
pub fn load_config(repo_root: &str) -> VcConfig {
    let local_path = Path::new(repo_root).join(".vibechecker.toml");
    let global_path = dirs::config_dir().map(|d| d.join("vibechecker").join("config.toml"));
    load_config_from(global_path.as_deref(), &local_path)
}

/// Merge the TOML files at `global` and `local` over the defaults.
/// Missing or malformed files are ignored.
pub fn load_config_from(global: Option<&Path>, local: &Path) -> VcConfig {
    let merged = match (global.and_then(read_table), read_table(local)) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            toml::Value::Table(global)
        }
        (Some(global), None) => toml::Value::Table(global),
        (None, Some(local)) => toml::Value::Table(local),
        (None, None) => return VcConfig::default(),
    };

    merged.try_into().unwrap_or_else(|e| {
        log::warn!("Invalid config, using defaults: {}", e);
        VcConfig::default()
    })
}

fn read_table(path: &Path) -> Option<toml::Table> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Table>(&content) {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("Ignoring unparsable config {}: {}", path.display(), e);
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Effective config rendered as TOML
pub fn render_config(config: &VcConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
