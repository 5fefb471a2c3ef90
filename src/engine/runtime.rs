//! Routed execution runtime.
//!
//! `PredictionEngine` is a synchronous, reentrant executor. Long projections
//! must not hold up advisor replies, so this module runs jobs on two small,
//! bounded thread pools: one for projections and one for advisory chat.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::advisor::CityAdvisor;
use crate::engine::{calculate_impacts, PredictionEngine};
use crate::error::{ExecutionError, TwinError, TwinResult};
use crate::request::{ChatRequest, PredictionRequest, PredictionResponse};
use crate::timepoint::TimePoint;

/// Projected years buffered per stream before the worker waits on the reader.
const STREAM_BUFFER: usize = 32;

/// Execution path selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// Year-by-year projections (cost grows with the horizon).
    Projection,
    /// Keyword advisor replies (constant cost).
    Advisory,
}

impl ExecutionPath {
    const fn label(self) -> &'static str {
        match self {
            Self::Projection => "projection",
            Self::Advisory => "advisory",
        }
    }
}

/// Work accepted by the runtime.
#[derive(Debug, Clone)]
pub enum TwinJob {
    /// Full projection for one locality.
    Predict(PredictionRequest),
    /// Advisor question.
    Chat(ChatRequest),
}

impl TwinJob {
    /// The pool this job runs on.
    #[must_use]
    pub const fn path(&self) -> ExecutionPath {
        match self {
            Self::Predict(_) => ExecutionPath::Projection,
            Self::Chat(_) => ExecutionPath::Advisory,
        }
    }
}

/// Result of a completed job.
#[derive(Debug, Clone, PartialEq)]
pub enum TwinOutput {
    /// Response to [`TwinJob::Predict`].
    Prediction(PredictionResponse),
    /// Advisor reply text.
    Chat(String),
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct TwinRuntimeConfig {
    /// Number of projection workers.
    pub projection_workers: usize,
    /// Number of advisory workers.
    pub advisory_workers: usize,
    /// Maximum queued jobs per pool.
    pub queue_capacity: usize,
}

impl Default for TwinRuntimeConfig {
    fn default() -> Self {
        Self {
            projection_workers: 2,
            advisory_workers: 1,
            queue_capacity: 256,
        }
    }
}

struct Executor {
    engine: PredictionEngine,
    advisor: CityAdvisor,
}

impl Executor {
    fn run(&self, job: TwinJob) -> TwinResult<TwinOutput> {
        match job {
            TwinJob::Predict(request) => self.engine.execute(&request).map(TwinOutput::Prediction),
            TwinJob::Chat(request) => {
                request.validate()?;
                let reply = self.advisor.respond(&request.message, &request.context)?;
                Ok(TwinOutput::Chat(reply))
            }
        }
    }

    /// Sends one year at a time; stops early once the reader is gone.
    fn stream(&self, request: &PredictionRequest, events: &Sender<TwinResult<TimePoint>>) {
        let mut noise = self.engine.noise_for(request.seed_key.as_deref());
        let slopes = match self.engine.fit_trends(&request.baseline, &mut noise) {
            Ok(slopes) => slopes,
            Err(err) => {
                let _ = events.send(Err(err));
                return;
            }
        };
        let impact = calculate_impacts(&request.actions);
        for point in self
            .engine
            .project(&request.baseline, &impact, slopes, request.time_horizon_years)
        {
            if events.send(Ok(point)).is_err() {
                break;
            }
        }
    }
}

enum Job {
    Run {
        job: TwinJob,
        reply: Sender<TwinResult<TwinOutput>>,
    },

    Stream {
        request: PredictionRequest,
        events: Sender<TwinResult<TimePoint>>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        reply: Sender<()>,
    },
}

struct WorkerPool {
    path: ExecutionPath,
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    fn start(
        path: ExecutionPath,
        workers: usize,
        queue_capacity: usize,
        executor: &Arc<Executor>,
    ) -> TwinResult<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let executor = Arc::clone(executor);
            let handle = thread::Builder::new()
                .name(format!("twin-{}-{idx}", path.label()))
                .spawn(move || loop {
                    match rx.recv() {
                        Ok(Job::Run { job, reply }) => {
                            let _ = reply.send(executor.run(job));
                        }
                        Ok(Job::Stream { request, events }) => executor.stream(&request, &events),
                        Err(_) => break,

                        #[cfg(test)]
                        Ok(Job::Sleep { duration, reply }) => {
                            thread::sleep(duration);
                            let _ = reply.send(());
                        }
                    }
                })
                .map_err(|e| TwinError::internal(format!("failed to spawn {} worker: {e}", path.label())))?;
            handles.push(handle);
        }

        Ok(Self {
            path,
            tx,
            workers: handles,
            queue_capacity,
        })
    }

    /// Placeholder left behind while a pool is shut down.
    fn detached(path: ExecutionPath) -> Self {
        Self {
            path,
            tx: bounded::<Job>(1).0,
            workers: Vec::new(),
            queue_capacity: 1,
        }
    }

    fn try_submit(&self, job: Job) -> Result<(), TwinError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(path = self.path.label(), capacity = self.queue_capacity, "queue full, rejecting job");
                Err(TwinError::Execution(ExecutionError::QueueFull {
                    path: self.path.label().to_string(),
                    capacity: self.queue_capacity,
                }))
            }
            Err(TrySendError::Disconnected(_)) => Err(TwinError::Execution(ExecutionError::Disconnected {
                path: self.path.label().to_string(),
            })),
        }
    }

    fn shutdown(self) {
        // Closing the channel lets workers drain queued jobs, then exit.
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

/// Handle returned by [`TwinRuntime::execute_async`].
pub struct JobHandle {
    path: ExecutionPath,
    rx: Receiver<TwinResult<TwinOutput>>,
}

impl JobHandle {
    /// Returns the path the job was routed to.
    #[must_use]
    pub const fn path(&self) -> ExecutionPath {
        self.path
    }

    /// Waits for the job to complete.
    pub fn join(self) -> TwinResult<TwinOutput> {
        self.rx.recv().map_err(|_| {
            TwinError::Execution(ExecutionError::Disconnected {
                path: self.path.label().to_string(),
            })
        })?
    }

    /// Waits for the job to complete with a timeout.
    pub fn join_timeout(self, timeout: Duration) -> TwinResult<TwinOutput> {
        let path = self.path;
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            crossbeam_channel::RecvTimeoutError::Timeout => TwinError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            crossbeam_channel::RecvTimeoutError::Disconnected => {
                TwinError::Execution(ExecutionError::Disconnected {
                    path: path.label().to_string(),
                })
            }
        })?
    }
}

/// Years of a projection running on the projection pool.
///
/// Iteration ends after the last year or after the first error. Dropping the
/// stream stops the worker at its next year.
pub struct ProjectionStream {
    rx: Receiver<TwinResult<TimePoint>>,
}

impl Iterator for ProjectionStream {
    type Item = TwinResult<TimePoint>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

/// A routed runtime isolating projections from advisory replies.
pub struct TwinRuntime {
    executor: Arc<Executor>,
    projection: WorkerPool,
    advisory: WorkerPool,
}

impl TwinRuntime {
    /// Starts both worker pools.
    pub fn new(engine: PredictionEngine, advisor: CityAdvisor, config: &TwinRuntimeConfig) -> TwinResult<Self> {
        let executor = Arc::new(Executor { engine, advisor });
        let projection = WorkerPool::start(
            ExecutionPath::Projection,
            config.projection_workers,
            config.queue_capacity,
            &executor,
        )?;
        let advisory = WorkerPool::start(
            ExecutionPath::Advisory,
            config.advisory_workers,
            config.queue_capacity,
            &executor,
        )?;
        Ok(Self {
            executor,
            projection,
            advisory,
        })
    }

    fn pool(&self, path: ExecutionPath) -> &WorkerPool {
        match path {
            ExecutionPath::Projection => &self.projection,
            ExecutionPath::Advisory => &self.advisory,
        }
    }

    /// Queues a job on its routed pool.
    pub fn execute_async(&self, job: TwinJob) -> TwinResult<JobHandle> {
        let path = job.path();
        let (tx, rx) = bounded::<TwinResult<TwinOutput>>(1);
        self.pool(path).try_submit(Job::Run { job, reply: tx })?;
        Ok(JobHandle { path, rx })
    }

    /// Runs a job on its routed pool and waits for the result.
    pub fn execute(&self, job: TwinJob) -> TwinResult<TwinOutput> {
        self.execute_async(job)?.join()
    }

    /// Validates `request` and queues it on the projection pool, yielding
    /// years as the worker produces them.
    ///
    /// # Errors
    ///
    /// Validation failures and a full projection queue are reported here,
    /// before any year is produced.
    pub fn stream_projection(&self, request: PredictionRequest) -> TwinResult<ProjectionStream> {
        request.validate(self.engine().config().max_horizon_years)?;
        let (tx, rx) = bounded::<TwinResult<TimePoint>>(STREAM_BUFFER);
        self.projection.try_submit(Job::Stream {
            request,
            events: tx,
        })?;
        Ok(ProjectionStream { rx })
    }

    /// The engine shared by the projection workers.
    #[must_use]
    pub fn engine(&self) -> &PredictionEngine {
        &self.executor.engine
    }

    #[cfg(test)]
    pub(crate) fn submit_sleep(&self, path: ExecutionPath, duration: Duration) -> TwinResult<Receiver<()>> {
        let (tx, rx) = bounded::<()>(1);
        self.pool(path).try_submit(Job::Sleep { duration, reply: tx })?;
        Ok(rx)
    }
}

impl Drop for TwinRuntime {
    fn drop(&mut self) {
        let projection = std::mem::replace(&mut self.projection, WorkerPool::detached(ExecutionPath::Projection));
        let advisory = std::mem::replace(&mut self.advisory, WorkerPool::detached(ExecutionPath::Advisory));
        projection.shutdown();
        advisory.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::advisor::ChatContext;
    use crate::locality::BaselineStats;

    fn runtime(config: &TwinRuntimeConfig) -> TwinRuntime {
        TwinRuntime::new(PredictionEngine::default(), CityAdvisor::new(), config).unwrap()
    }

    fn predict_job(horizon: u32) -> TwinJob {
        TwinJob::Predict(
            PredictionRequest::builder()
                .locality("Chittur")
                .baseline(BaselineStats::new(60.0, 70.0, 30.0, 1500.0, 80_000))
                .horizon(horizon)
                .build()
                .unwrap(),
        )
    }

    fn chat_job(message: &str) -> TwinJob {
        TwinJob::Chat(ChatRequest {
            message: message.to_string(),
            context: ChatContext::default(),
        })
    }

    #[test]
    fn jobs_route_by_kind() {
        assert_eq!(predict_job(5).path(), ExecutionPath::Projection);
        assert_eq!(chat_job("hello").path(), ExecutionPath::Advisory);
    }

    #[test]
    fn predict_and_chat_complete() {
        let rt = runtime(&TwinRuntimeConfig::default());

        let TwinOutput::Prediction(resp) = rt.execute(predict_job(8)).unwrap() else {
            panic!("expected prediction output");
        };
        assert_eq!(resp.predictions.len(), 8);

        let TwinOutput::Chat(reply) = rt.execute(chat_job("who are you?")).unwrap() else {
            panic!("expected chat output");
        };
        assert!(reply.starts_with("I am the City Expert"));
    }

    #[test]
    fn invalid_requests_surface_validation_errors() {
        let rt = runtime(&TwinRuntimeConfig::default());
        let err = rt.execute(chat_job("   ")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn projection_work_does_not_starve_advisory() {
        let rt = runtime(&TwinRuntimeConfig {
            projection_workers: 1,
            advisory_workers: 1,
            queue_capacity: 16,
        });

        let sleep = rt
            .submit_sleep(ExecutionPath::Projection, Duration::from_millis(200))
            .unwrap();

        let started = std::time::Instant::now();
        let handle = rt.execute_async(chat_job("tell me about factories")).unwrap();
        assert_eq!(handle.path(), ExecutionPath::Advisory);
        let _ = handle.join_timeout(Duration::from_millis(100)).unwrap();
        assert!(started.elapsed() < Duration::from_millis(150));

        sleep.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn full_queue_is_rejected() {
        let rt = runtime(&TwinRuntimeConfig {
            projection_workers: 1,
            advisory_workers: 1,
            queue_capacity: 1,
        });

        // Occupy the worker, then fill the single queue slot.
        let busy = rt
            .submit_sleep(ExecutionPath::Projection, Duration::from_millis(200))
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let queued = rt
            .submit_sleep(ExecutionPath::Projection, Duration::from_millis(1))
            .unwrap();

        let err = rt.execute_async(predict_job(3)).err().unwrap();
        assert!(matches!(err, TwinError::Execution(ExecutionError::QueueFull { capacity: 1, .. })));
        assert!(err.is_retryable());

        busy.recv_timeout(Duration::from_secs(1)).unwrap();
        queued.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    fn chittur_request(horizon: u32) -> PredictionRequest {
        PredictionRequest::builder()
            .locality("Chittur")
            .baseline(BaselineStats::new(60.0, 70.0, 30.0, 1500.0, 80_000))
            .horizon(horizon)
            .seed_key("chittur-stream")
            .build()
            .unwrap()
    }

    #[test]
    fn streamed_years_match_a_full_prediction() {
        let rt = runtime(&TwinRuntimeConfig::default());
        let request = chittur_request(12);

        let streamed: Vec<TimePoint> = rt
            .stream_projection(request.clone())
            .unwrap()
            .collect::<TwinResult<_>>()
            .unwrap();
        let TwinOutput::Prediction(resp) = rt.execute(TwinJob::Predict(request)).unwrap() else {
            panic!("expected prediction output");
        };
        assert_eq!(streamed, resp.predictions);
    }

    #[test]
    fn stream_rejects_invalid_horizon_before_queueing() {
        let rt = runtime(&TwinRuntimeConfig::default());
        let mut request = chittur_request(3);
        request.time_horizon_years = 0;
        let err = rt.stream_projection(request).err().unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn stream_is_rejected_when_projection_queue_is_full() {
        let rt = runtime(&TwinRuntimeConfig {
            projection_workers: 1,
            advisory_workers: 1,
            queue_capacity: 1,
        });

        let busy = rt
            .submit_sleep(ExecutionPath::Projection, Duration::from_millis(200))
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let queued = rt
            .submit_sleep(ExecutionPath::Projection, Duration::from_millis(1))
            .unwrap();

        let err = rt.stream_projection(chittur_request(5)).err().unwrap();
        assert!(matches!(err, TwinError::Execution(ExecutionError::QueueFull { capacity: 1, .. })));

        busy.recv_timeout(Duration::from_secs(1)).unwrap();
        queued.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn dropped_stream_frees_the_worker() {
        let rt = runtime(&TwinRuntimeConfig {
            projection_workers: 1,
            advisory_workers: 1,
            queue_capacity: 4,
        });
        let mut stream = rt.stream_projection(chittur_request(200)).unwrap();
        assert!(stream.next().unwrap().is_ok());
        drop(stream);

        let handle = rt.execute_async(predict_job(3)).unwrap();
        let TwinOutput::Prediction(resp) = handle.join_timeout(Duration::from_secs(2)).unwrap() else {
            panic!("expected prediction output");
        };
        assert_eq!(resp.predictions.len(), 3);
    }

    #[test]
    fn join_reports_disconnected_when_reply_sender_dropped() {
        let (tx, rx) = bounded::<TwinResult<TwinOutput>>(1);
        drop(tx);

        let handle = JobHandle {
            path: ExecutionPath::Advisory,
            rx,
        };
        let err = handle.join_timeout(Duration::from_millis(10)).unwrap_err();
        let TwinError::Execution(ExecutionError::Disconnected { path }) = err else {
            panic!("expected Disconnected, got {err:?}");
        };
        assert_eq!(path, "advisory");
    }
}
