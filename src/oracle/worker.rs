//! Background threads running oracle predictions.
//!
//! Requests go to a small pool of named worker threads over an `mpsc`
//! channel; outcomes come back on a second channel and are only looked at when
//! the owner polls. Nothing here touches the annotation model.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{Oracle, PredictRequest, PredictResponse};
use crate::error::OracleError;

/// A prediction job sent to the workers.
struct PredictJob {
    id: u64,
    request: PredictRequest,
}

/// Message sent to the worker threads.
enum WorkerMessage {
    Predict(PredictJob),
    Shutdown,
}

/// Finished prediction, successful or not.
#[derive(Debug, Clone)]
pub struct PredictOutcome {
    pub job_id: u64,
    pub request: PredictRequest,
    pub result: Result<PredictResponse, OracleError>,
}

/// Pool of threads calling an `Oracle`.
///
/// Dropping the pool sends every worker a shutdown message and joins them.
pub struct OraclePool {
    request_tx: Sender<WorkerMessage>,
    result_rx: Receiver<PredictOutcome>,
    handles: Vec<JoinHandle<()>>,
    next_id: u64,
    pending: HashSet<u64>,
}

impl OraclePool {
    /// Spawn `workers` threads (at least one) sharing `oracle`.
    pub fn spawn(oracle: Arc<dyn Oracle>, workers: usize) -> Result<Self, OracleError> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (result_tx, result_rx) = mpsc::channel::<PredictOutcome>();
        let request_rx = Arc::new(Mutex::new(request_rx));

        let mut handles = Vec::new();
        for index in 0..workers.max(1) {
            let oracle = Arc::clone(&oracle);
            let request_rx = Arc::clone(&request_rx);
            let result_tx = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("oracle-worker-{}", index))
                .spawn(move || {
                    log::debug!("Oracle worker {} started", index);
                    Self::thread_loop(oracle.as_ref(), &request_rx, &result_tx);
                    log::debug!("Oracle worker {} exiting", index);
                })
                .map_err(|e| OracleError::transport(format!("Failed to spawn oracle worker: {}", e)))?;
            handles.push(handle);
        }

        log::info!("Oracle pool spawned with {} workers", handles.len());

        Ok(Self {
            request_tx,
            result_rx,
            handles,
            next_id: 0,
            pending: HashSet::new(),
        })
    }

    /// Worker main loop.
    fn thread_loop(
        oracle: &dyn Oracle,
        request_rx: &Mutex<Receiver<WorkerMessage>>,
        result_tx: &Sender<PredictOutcome>,
    ) {
        loop {
            let message = match request_rx.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => {
                    log::error!("Oracle request queue poisoned, worker exiting");
                    break;
                }
            };
            match message {
                Ok(WorkerMessage::Predict(job)) => {
                    log::debug!("Predicting job {} for task {}", job.id, job.request.task_id);
                    let result = oracle.predict(&job.request);
                    let outcome = PredictOutcome {
                        job_id: job.id,
                        request: job.request,
                        result,
                    };
                    if result_tx.send(outcome).is_err() {
                        log::warn!("Result channel closed, oracle worker exiting");
                        break;
                    }
                }
                Ok(WorkerMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, oracle worker exiting");
                    break;
                }
            }
        }
    }

    /// Queue a prediction. Returns the job id.
    pub fn submit(&mut self, request: PredictRequest) -> Result<u64, OracleError> {
        let id = self.next_id;
        self.next_id += 1;

        self.request_tx
            .send(WorkerMessage::Predict(PredictJob { id, request }))
            .map_err(|_| OracleError::Unavailable)?;
        self.pending.insert(id);
        log::debug!("Sent predict job {}", id);
        Ok(id)
    }

    fn finish(&mut self, outcome: PredictOutcome) -> PredictOutcome {
        self.pending.remove(&outcome.job_id);
        outcome
    }

    /// Take one finished prediction without blocking.
    pub fn try_recv(&mut self) -> Option<PredictOutcome> {
        match self.result_rx.try_recv() {
            Ok(outcome) => Some(self.finish(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Oracle workers disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for one finished prediction.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<PredictOutcome> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(self.finish(outcome)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Oracle workers disconnected");
                None
            }
        }
    }

    pub fn is_pending(&self, job_id: u64) -> bool {
        self.pending.contains(&job_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for OraclePool {
    fn drop(&mut self) {
        for _ in &self.handles {
            let _ = self.request_tx.send(WorkerMessage::Shutdown);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Oracle worker panicked");
            }
        }
        log::debug!("Oracle pool shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::Geometry;
    use crate::oracle::{AutoMode, PredictedRect, ReturnType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoOracle {
        calls: AtomicUsize,
    }

    impl Oracle for EchoOracle {
        fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let p = request
                .points
                .as_ref()
                .and_then(|p| p.first().copied())
                .ok_or_else(|| OracleError::malformed("no point"))?;
            Ok(PredictResponse::with_rects(vec![PredictedRect {
                x: p.x - 5.0,
                y: p.y - 5.0,
                w: 10.0,
                h: 10.0,
                score: None,
            }]))
        }
    }

    fn request(x: f32) -> PredictRequest {
        PredictRequest::from_seed(
            "a1",
            "img.png",
            &Geometry::point(Point::new(x, x)),
            100,
            AutoMode::Sam,
            ReturnType::Rect,
        )
    }

    #[test]
    fn test_jobs_complete_and_clear_pending() {
        let oracle = Arc::new(EchoOracle {
            calls: AtomicUsize::new(0),
        });
        let mut pool = OraclePool::spawn(oracle.clone(), 2).expect("spawn");
        assert_eq!(pool.worker_count(), 2);

        let a = pool.submit(request(10.0)).expect("submit");
        let b = pool.submit(request(20.0)).expect("submit");
        assert_eq!(pool.pending_count(), 2);

        let mut done = Vec::new();
        while done.len() < 2 {
            let outcome = pool
                .recv_timeout(Duration::from_secs(5))
                .expect("outcome in time");
            assert!(outcome.result.is_ok());
            done.push(outcome.job_id);
        }
        done.sort_unstable();
        assert_eq!(done, vec![a, b]);
        assert_eq!(pool.pending_count(), 0);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_joins_workers() {
        let oracle = Arc::new(EchoOracle {
            calls: AtomicUsize::new(0),
        });
        let pool = OraclePool::spawn(oracle.clone(), 3).expect("spawn");
        drop(pool);
        assert_eq!(Arc::strong_count(&oracle), 1);
    }
}
