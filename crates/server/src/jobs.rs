use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use protocol::api::{JobSnapshot, JobState};
use tokio::sync::RwLock;

#[derive(Default)]
struct JobTable {
    jobs: HashMap<String, JobSnapshot>,
    order: VecDeque<String>,
}

/// In-memory job history, oldest entries evicted past `limit`.
#[derive(Clone)]
pub(crate) struct JobRegistry {
    inner: Arc<RwLock<JobTable>>,
    limit: usize,
}

impl JobRegistry {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(JobTable::default())),
            limit: limit.max(1),
        }
    }

    pub(crate) async fn create(&self, file_name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let snapshot = JobSnapshot {
            id: id.clone(),
            file_name: file_name.to_string(),
            status: JobState::Pending,
            created_at_ms: now_ms(),
            finished_at_ms: None,
            rows: None,
            lexicon_version: None,
            error: None,
        };
        let mut guard = self.inner.write().await;
        guard.order.push_back(id.clone());
        guard.jobs.insert(id.clone(), snapshot);
        while guard.order.len() > self.limit {
            if let Some(evicted) = guard.order.pop_front() {
                guard.jobs.remove(&evicted);
            }
        }
        id
    }

    pub(crate) async fn get(&self, id: &str) -> Option<JobSnapshot> {
        let guard = self.inner.read().await;
        guard.jobs.get(id).cloned()
    }

    pub(crate) async fn update<F>(&self, id: &str, update: F)
    where
        F: FnOnce(&mut JobSnapshot),
    {
        let mut guard = self.inner.write().await;
        if let Some(snapshot) = guard.jobs.get_mut(id) {
            update(snapshot);
        }
    }

    pub(crate) async fn mark_running(&self, id: &str) {
        self.update(id, |job| job.status = JobState::Running).await;
    }

    pub(crate) async fn complete(&self, id: &str, rows: usize, lexicon_version: u64) {
        self.update(id, |job| {
            job.status = JobState::Completed;
            job.finished_at_ms = Some(now_ms());
            job.rows = Some(rows);
            job.lexicon_version = Some(lexicon_version);
            job.error = None;
        })
        .await;
    }

    pub(crate) async fn fail(&self, id: &str, error: String) {
        self.update(id, |job| {
            job.status = JobState::Failed;
            job.finished_at_ms = Some(now_ms());
            job.error = Some(error);
        })
        .await;
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
