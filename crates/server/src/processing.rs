use std::path::{Path, PathBuf};

use analysis::pipeline::PROCESSED_FILE_NAME;
use analysis::{AnalysisError, ChatTable, Distribution};
use bytes::Bytes;
use protocol::KeywordPayload;
use system_utils::fs::{publish_copy, write_atomic};
use tokio::task::JoinHandle;

use crate::jobs::JobRegistry;
use crate::state::{Analyzer, AppState};

pub(crate) struct UploadedFile {
    pub(crate) file_name: String,
    pub(crate) contents: Bytes,
}

pub(crate) struct JobOutcome {
    pub(crate) upload_path: PathBuf,
    pub(crate) processed_path: PathBuf,
    pub(crate) rows: usize,
    pub(crate) lexicon_version: u64,
    pub(crate) distribution: Distribution,
}

/// Runs the job on the blocking pool from a detached task that owns the registry
/// update, so the job reaches a final state even when the caller goes away.
pub(crate) fn spawn_job(
    state: &AppState,
    job_id: String,
    upload: UploadedFile,
    keywords: KeywordPayload,
) -> JoinHandle<Result<JobOutcome, String>> {
    let analyzer = state.analyzer.clone();
    let jobs = state.jobs.clone();
    tokio::spawn(async move {
        jobs.mark_running(&job_id).await;
        let task_job_id = job_id.clone();
        let joined = tokio::task::spawn_blocking(move || {
            process_upload(&analyzer, &task_job_id, &upload, &keywords)
        })
        .await;
        let result = match joined {
            Ok(result) => result.map_err(|err| err.to_string()),
            Err(err) => Err(format!("processing task failed: {err}")),
        };
        record_outcome(&jobs, &job_id, &result).await;
        result
    })
}

async fn record_outcome(jobs: &JobRegistry, job_id: &str, result: &Result<JobOutcome, String>) {
    match result {
        Ok(outcome) => {
            jobs.complete(job_id, outcome.rows, outcome.lexicon_version)
                .await;
        }
        Err(error) => {
            tracing::warn!(
                event = "job.failed",
                job_id = %job_id,
                error = %error,
                "upload processing failed"
            );
            jobs.fail(job_id, error.clone()).await;
        }
    }
}

/// Runs one upload end to end. On failure the job's directories are removed and
/// the previously published outputs stay as they were.
pub(crate) fn process_upload(
    analyzer: &Analyzer,
    job_id: &str,
    upload: &UploadedFile,
    keywords: &KeywordPayload,
) -> Result<JobOutcome, AnalysisError> {
    let result = run_job(analyzer, job_id, upload, keywords);
    if result.is_err() {
        for dir in [
            analyzer.storage.job_upload_dir(job_id),
            analyzer.storage.job_graph_dir(job_id),
        ] {
            if let Err(err) = std::fs::remove_dir_all(&dir) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        event = "job.cleanup_failed",
                        job_id = %job_id,
                        path = %dir.display(),
                        error = %err,
                        "failed to remove job directory"
                    );
                }
            }
        }
    }
    result
}

fn run_job(
    analyzer: &Analyzer,
    job_id: &str,
    upload: &UploadedFile,
    keywords: &KeywordPayload,
) -> Result<JobOutcome, AnalysisError> {
    let storage = &analyzer.storage;
    let job_dir = storage.job_upload_dir(job_id);
    std::fs::create_dir_all(&job_dir)?;
    let upload_path = job_dir.join(stored_upload_name(&upload.file_name));
    write_atomic(&upload_path, &upload.contents)?;

    let table = ChatTable::from_path(&upload_path)?;
    let scored = table.score(analyzer.scorer.as_ref())?;
    // Merge only once every row parsed and scored.
    let lexicon = analyzer.lexicon.merge(keywords);
    let annotated = scored.classify(&lexicon);
    let distribution = annotated.distribution();

    let processed_path = job_dir.join(PROCESSED_FILE_NAME);
    annotated.write_to_path(&processed_path)?;

    let graph_dir = storage.job_graph_dir(job_id);
    std::fs::create_dir_all(&graph_dir)?;
    let charts = analyzer.charts.render_all(&distribution, &graph_dir)?;

    publish_copy(&processed_path, &storage.latest_processed_path())?;
    for chart in &charts {
        publish_latest_chart(chart, storage.graph_dir())?;
    }

    tracing::info!(
        event = "job.completed",
        job_id = %job_id,
        rows = annotated.len(),
        lexicon_version = lexicon.version(),
        keywords = lexicon.len(),
        "upload processed"
    );

    Ok(JobOutcome {
        upload_path,
        processed_path,
        rows: annotated.len(),
        lexicon_version: lexicon.version(),
        distribution,
    })
}

fn publish_latest_chart(chart: &Path, graph_dir: &Path) -> Result<(), AnalysisError> {
    let Some(name) = chart.file_name() else {
        return Ok(());
    };
    publish_copy(chart, &graph_dir.join(name))?;
    Ok(())
}

/// The processed output shares the job directory, so an upload with the same name
/// is stored under a prefixed one.
fn stored_upload_name(file_name: &str) -> String {
    if file_name == PROCESSED_FILE_NAME {
        format!("original_{file_name}")
    } else {
        file_name.to_string()
    }
}
