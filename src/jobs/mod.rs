use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of a scrape job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Progress record of one long-running site scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: String,
    pub city: String,
    pub site: String,
    pub status: JobStatus,
    /// Percent complete, 0-100
    pub progress: u8,
    pub current_status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_found: usize,
    pub error: Option<String>,
}

/// Shared, cloneable registry of scrape jobs
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, ScrapeJob>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending job and return its id.
    pub async fn create(&self, city: &str, site: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let job = ScrapeJob {
            id: id.clone(),
            city: city.to_string(),
            site: site.to_string(),
            status: JobStatus::Pending,
            progress: 0,
            current_status: String::new(),
            started_at: Utc::now(),
            completed_at: None,
            total_found: 0,
            error: None,
        };
        self.jobs.write().await.insert(id.clone(), job);
        info!("Created scrape job {} for {} in {}", id, site, city);
        id
    }

    async fn update(&self, id: &str, apply: impl FnOnce(&mut ScrapeJob)) {
        match self.jobs.write().await.get_mut(id) {
            Some(job) => apply(job),
            None => warn!("Unknown scrape job {}", id),
        }
    }

    pub async fn start(&self, id: &str) {
        self.update(id, |job| job.status = JobStatus::Running).await;
    }

    pub async fn update_status(&self, id: &str, message: &str) {
        debug!("Job {}: {}", id, message);
        self.update(id, |job| job.current_status = message.to_string()).await;
    }

    pub async fn set_progress(&self, id: &str, progress: u8) {
        self.update(id, |job| job.progress = progress.min(100)).await;
    }

    pub async fn complete(&self, id: &str, total_found: usize) {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.total_found = total_found;
            job.completed_at = Some(Utc::now());
        })
        .await;
    }

    pub async fn fail(&self, id: &str, error: &str) {
        warn!("Scrape job {} failed: {}", id, error);
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error.to_string());
            job.current_status = format!("Błąd: {}", error);
            job.completed_at = Some(Utc::now());
        })
        .await;
    }

    pub async fn get(&self, id: &str) -> Option<ScrapeJob> {
        self.jobs.read().await.get(id).cloned()
    }

    /// All jobs, most recently started first.
    pub async fn list(&self) -> Vec<ScrapeJob> {
        let mut jobs: Vec<_> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }

    pub fn handle(&self, id: &str) -> JobHandle {
        JobHandle {
            tracker: self.clone(),
            id: id.to_string(),
        }
    }
}

/// One job's view of the tracker, handed to a running scrape
#[derive(Debug, Clone)]
pub struct JobHandle {
    tracker: JobTracker,
    id: String,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn start(&self) {
        self.tracker.start(&self.id).await;
    }

    pub async fn status(&self, message: &str) {
        self.tracker.update_status(&self.id, message).await;
    }

    pub async fn progress(&self, progress: u8) {
        self.tracker.set_progress(&self.id, progress).await;
    }

    pub async fn complete(&self, total_found: usize) {
        self.tracker.complete(&self.id, total_found).await;
    }

    pub async fn fail(&self, error: &str) {
        self.tracker.fail(&self.id, error).await;
    }
}
