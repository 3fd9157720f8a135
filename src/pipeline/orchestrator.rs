//! Worker pool, job queue and lifecycle management.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chunker::ChunkConfig;
use crate::config::Config;
use crate::extract::ClaudeClient;
use crate::pathstore;

use super::job::{Job, JobStatus, JobStore};
use super::worker::Worker;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Manages the document ingestion pipeline: a bounded job queue drained by
/// a fixed-size worker pool, plus a background TTL sweep over the job
/// registry. All tasks observe one cancellation source.
pub struct Orchestrator {
    jobs: Arc<JobStore>,
    tx: Mutex<Option<mpsc::Sender<Arc<Job>>>>,
    rx: Mutex<Option<mpsc::Receiver<Arc<Job>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    token: CancellationToken,

    claude: Arc<ClaudeClient>,
    pathstore: Arc<pathstore::Client>,
    worker_count: usize,
    max_queue_size: usize,
    max_concurrent_extract: usize,
    max_concurrent_store: usize,
    chunk_cfg: ChunkConfig,
}

impl Orchestrator {
    pub fn new(cfg: &Config, claude: Arc<ClaudeClient>, pathstore: Arc<pathstore::Client>) -> Self {
        let (tx, rx) = mpsc::channel(cfg.max_queue_size);
        Self {
            jobs: Arc::new(JobStore::new(cfg.job_ttl)),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            handles: Mutex::new(Vec::new()),
            token: CancellationToken::new(),
            claude,
            pathstore,
            worker_count: cfg.worker_count,
            max_queue_size: cfg.max_queue_size,
            max_concurrent_extract: cfg.max_concurrent_extract,
            max_concurrent_store: cfg.max_concurrent_store,
            chunk_cfg: ChunkConfig {
                chunk_size: cfg.default_chunk_size,
                chunk_overlap: cfg.default_chunk_overlap,
                min_chunk: 100,
            },
        }
    }

    /// Launches the worker tasks and the registry sweeper.
    pub fn start(&self) {
        let rx = self
            .rx
            .lock()
            .take()
            .expect("orchestrator started more than once");
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut handles = self.handles.lock();
        for worker_id in 0..self.worker_count {
            let rx = rx.clone();
            let token = self.token.clone();
            let worker = Worker::new(
                self.claude.clone(),
                self.pathstore.clone(),
                self.chunk_cfg,
                self.max_concurrent_extract,
                self.max_concurrent_store,
            );

            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = token.cancelled() => return,
                            job = rx.recv() => match job {
                                Some(job) => job,
                                None => return,
                            },
                        }
                    };
                    debug!(worker_id, job_id = job.id, "picked up job");
                    worker.process(&token, job).await;
                }
            }));
        }

        let jobs = self.jobs.clone();
        let token = self.token.clone();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await; // First tick fires immediately; skip it.
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => jobs.cleanup(),
                }
            }
        }));

        info!(workers = self.worker_count, "pipeline started");
    }

    /// Queues a new job. Admission control: when the queue is full the job
    /// is immediately failed with phase `queue_full` and an error returned.
    pub fn submit(&self, job: Arc<Job>) -> anyhow::Result<()> {
        self.jobs.put(job.clone());

        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            job.set_status(JobStatus::Failed, "queue_full");
            bail!("pipeline is shut down");
        };
        match tx.try_send(job.clone()) {
            Ok(()) => Ok(()),
            Err(_) => {
                job.set_status(JobStatus::Failed, "queue_full");
                bail!("job queue is full ({})", self.max_queue_size)
            }
        }
    }

    /// Cancels everything and waits for workers and the sweeper to exit.
    /// Workers finish their current job or observe cancellation at their
    /// next suspension point.
    pub async fn stop(&self) {
        self.token.cancel();
        drop(self.tx.lock().take());

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
        info!("pipeline stopped");
    }

    pub fn get_job(&self, id: &str) -> Option<Arc<Job>> {
        self.jobs.get(id)
    }

    /// Current number of queued (not yet picked up) jobs.
    pub fn queue_depth(&self) -> usize {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.max_capacity() - tx.capacity(),
            None => 0,
        }
    }

    pub fn pathstore(&self) -> &pathstore::Client {
        &self.pathstore
    }
}
