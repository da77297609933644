use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_GRAPH_DIR: &str = "graphs";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_JOB_HISTORY: usize = 100;
const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub(crate) storage: StorageConfig,
    pub(crate) lexicon: LexiconConfig,
    pub(crate) charts: ChartConfig,
    pub(crate) limits: LimitsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct StorageConfig {
    pub(crate) upload_dir: String,
    pub(crate) graph_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            graph_dir: DEFAULT_GRAPH_DIR.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LexiconConfig {
    /// Seeded next to the built-in vocabulary.
    pub(crate) extra_keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct ChartConfig {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// TTF used for chart text. An empty string disables text.
    pub(crate) font_path: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: analysis::chart::DEFAULT_WIDTH,
            height: analysis::chart::DEFAULT_HEIGHT,
            font_path: Some(DEFAULT_FONT_PATH.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct LimitsConfig {
    pub(crate) max_upload_bytes: usize,
    pub(crate) job_history: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            job_history: DEFAULT_JOB_HISTORY,
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.storage.upload_dir.trim().is_empty() {
            anyhow::bail!("storage.upload_dir cannot be empty");
        }
        if self.storage.graph_dir.trim().is_empty() {
            anyhow::bail!("storage.graph_dir cannot be empty");
        }
        if self.charts.width == 0 || self.charts.height == 0 {
            anyhow::bail!("charts.width and charts.height must be positive");
        }
        if self.limits.max_upload_bytes == 0 {
            anyhow::bail!("limits.max_upload_bytes must be positive");
        }
        if self.limits.job_history == 0 {
            anyhow::bail!("limits.job_history must be positive");
        }
        Ok(())
    }
}

/// Reads the TOML config at `path`, or returns defaults when no path is given.
pub(crate) fn load_server_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            parse_server_config(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => ServerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn parse_server_config(raw: &str) -> anyhow::Result<ServerConfig> {
    Ok(toml::from_str(raw)?)
}
