use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use analysis::chart::ChartRenderer;
use analysis::pipeline::PROCESSED_FILE_NAME;
use analysis::{Lexicon, LexiconStore, SentimentScorer, VaderScorer};
use system_utils::path::expand_tilde;

use crate::config::{ServerConfig, StorageConfig};
use crate::jobs::JobRegistry;

/// On-disk layout. Job files live under `<dir>/<job id>/`, the latest published
/// outputs directly under `<dir>/`.
#[derive(Debug, Clone)]
pub(crate) struct Storage {
    upload_dir: PathBuf,
    graph_dir: PathBuf,
}

impl Storage {
    pub(crate) fn prepare(config: &StorageConfig) -> anyhow::Result<Self> {
        let storage = Self {
            upload_dir: expand_tilde(config.upload_dir.trim()),
            graph_dir: expand_tilde(config.graph_dir.trim()),
        };
        for dir in [&storage.upload_dir, &storage.graph_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(storage)
    }

    pub(crate) fn job_upload_dir(&self, job_id: &str) -> PathBuf {
        self.upload_dir.join(job_id)
    }

    pub(crate) fn job_graph_dir(&self, job_id: &str) -> PathBuf {
        self.graph_dir.join(job_id)
    }

    pub(crate) fn graph_dir(&self) -> &Path {
        &self.graph_dir
    }

    pub(crate) fn latest_processed_path(&self) -> PathBuf {
        self.upload_dir.join(PROCESSED_FILE_NAME)
    }
}

pub(crate) struct Analyzer {
    pub(crate) lexicon: LexiconStore,
    pub(crate) scorer: Arc<dyn SentimentScorer>,
    pub(crate) charts: ChartRenderer,
    pub(crate) storage: Storage,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) analyzer: Arc<Analyzer>,
    pub(crate) jobs: JobRegistry,
}

pub(crate) fn build_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let storage = Storage::prepare(&config.storage)?;

    let seed = Lexicon::from_terms(
        analysis::lexicon::DEFAULT_KEYWORDS
            .iter()
            .copied()
            .chain(config.lexicon.extra_keywords.iter().map(String::as_str)),
    );
    tracing::info!(
        event = "lexicon.seeded",
        keywords = seed.len(),
        extra = config.lexicon.extra_keywords.len(),
        "lexicon seeded"
    );

    let mut charts = ChartRenderer::new(config.charts.width, config.charts.height);
    let font_path = config
        .charts
        .font_path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty());
    if let Some(font_path) = font_path {
        let font_path = expand_tilde(font_path);
        charts = match charts.clone().with_font(&font_path) {
            Ok(charts) => charts,
            Err(err) => {
                tracing::warn!(
                    event = "charts.font_unavailable",
                    path = %font_path.display(),
                    error = %err,
                    "chart font could not be loaded; chart text disabled"
                );
                charts
            }
        };
    } else {
        tracing::warn!(
            event = "charts.font_unavailable",
            "charts.font_path is empty; chart text disabled"
        );
    }

    let analyzer = Analyzer {
        lexicon: LexiconStore::new(seed),
        scorer: Arc::new(VaderScorer::new()),
        charts,
        storage,
    };
    Ok(AppState {
        analyzer: Arc::new(analyzer),
        jobs: JobRegistry::new(config.limits.job_history),
    })
}
