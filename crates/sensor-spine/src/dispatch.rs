//! Downstream delivery of completed samples.
//!
//! The sampling thread hands every committed value to a [`DispatchSink`].
//! Sinks must not block: the sampling thread never waits for downstream
//! processing.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Receiver of committed sample values.
pub trait DispatchSink: Send + Sync {
    fn submit(&self, value: f64);
}

impl DispatchSink for mpsc::Sender<f64> {
    fn submit(&self, value: f64) {
        if self.send(value).is_err() {
            log::trace!("sample receiver dropped, discarding {}", value);
        }
    }
}

impl DispatchSink for mpsc::SyncSender<f64> {
    fn submit(&self, value: f64) {
        match self.try_send(value) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(v)) => log::debug!("sample channel full, dropping {}", v),
            Err(mpsc::TrySendError::Disconnected(v)) => {
                log::trace!("sample receiver dropped, discarding {}", v)
            }
        }
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// A worker thread that runs queued jobs in submission order.
///
/// Several engines can share one queue; jobs are executed one at a time.
pub struct EventQueue {
    name: String,
    tx: Option<mpsc::SyncSender<Job>>,
    worker: Option<thread::JoinHandle<()>>,
    executed: Arc<AtomicU64>,
    dropped: AtomicU64,
}

impl EventQueue {
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        Self::with_capacity(name, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> io::Result<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::sync_channel::<Job>(capacity);
        let executed = Arc::new(AtomicU64::new(0));

        let worker_executed = Arc::clone(&executed);
        let worker_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            for job in rx {
                if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    log::error!("job on {} panicked: {:?}", worker_name, panic_message(&*panic));
                }
                worker_executed.fetch_add(1, Ordering::Relaxed);
            }
            log::trace!("{} drained, exiting", worker_name);
        })?;

        Ok(Self {
            name,
            tx: Some(tx),
            worker: Some(handle),
            executed,
            dropped: AtomicU64::new(0),
        })
    }

    /// Schedules `job` without blocking. Returns false if the queue is full
    /// or already shut down; the job is then discarded.
    pub fn call<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(tx) = self.tx.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        match tx.try_send(Box::new(job)) {
            Ok(()) => true,
            Err(mpsc::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("{} full, dropping job", self.name);
                false
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("{} worker is gone, dropping job", self.name);
                false
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drains queued jobs, joins the worker and returns
    /// `(executed, dropped)`.
    pub fn shutdown(mut self) -> (u64, u64) {
        self.close();
        (self.executed(), self.dropped())
    }

    fn close(&mut self) {
        // closing the channel lets the worker drain what is queued and exit
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if let Err(err) = handle.join() {
                log::warn!("failed to join {} thread: {:?}", self.name, err);
            }
        }
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sink that runs a callback with each value on an [`EventQueue`].
#[derive(Clone)]
pub struct QueueSink {
    queue: Arc<EventQueue>,
    callback: Arc<dyn Fn(f64) + Send + Sync>,
}

impl QueueSink {
    pub fn new<F>(queue: Arc<EventQueue>, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        Self {
            queue,
            callback: Arc::new(callback),
        }
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }
}

impl DispatchSink for QueueSink {
    fn submit(&self, value: f64) {
        let callback = Arc::clone(&self.callback);
        self.queue.call(move || callback(value));
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::RecvTimeoutError;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn queue_runs_jobs_in_order() {
        let queue = EventQueue::new("test-queue").unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..10 {
            let tx = tx.clone();
            assert!(queue.call(move || tx.send(i).unwrap()));
        }
        let received: Vec<i32> = (0..10)
            .map(|_| rx.recv_timeout(Duration::from_secs(1)).unwrap())
            .collect();
        assert_eq!(received, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let queue = EventQueue::with_capacity("tiny-queue", 1).unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();

        // occupy the worker, then fill the single slot
        assert!(queue.call(move || {
            started_tx.send(()).unwrap();
            let _ = gate_rx.recv();
        }));
        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(queue.call(|| {}));

        assert!(!queue.call(|| {}));
        assert!(!queue.call(|| {}));
        assert_eq!(queue.dropped(), 2);

        gate_tx.send(()).unwrap();
    }

    #[test]
    fn drop_drains_pending_jobs() {
        let (tx, rx) = mpsc::channel();
        {
            let queue = EventQueue::new("drain-queue").unwrap();
            for i in 0..5 {
                let tx = tx.clone();
                queue.call(move || tx.send(i).unwrap());
            }
        }
        assert_eq!(rx.try_iter().count(), 5);
    }

    #[test]
    fn shutdown_counts_jobs_drained_after_close() {
        let queue = EventQueue::with_capacity("shutdown-queue", 8).unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        assert!(queue.call(move || {
            started_tx.send(()).unwrap();
            let _ = gate_rx.recv();
        }));
        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        for _ in 0..4 {
            assert!(queue.call(|| {}));
        }
        assert_eq!(queue.executed(), 0);

        let release = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            gate_tx.send(()).unwrap();
        });
        assert_eq!(queue.shutdown(), (5, 0));
        release.join().unwrap();
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let queue = EventQueue::new("panic-queue").unwrap();
        let (tx, rx) = mpsc::channel();
        queue.call(|| panic!("boom"));
        queue.call(move || tx.send(7).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(7));
    }

    #[test]
    fn queue_sink_delivers_values() {
        let queue = Arc::new(EventQueue::new("sink-queue").unwrap());
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let sink = QueueSink::new(Arc::clone(&queue), move |v| {
            let _ = tx.lock().unwrap().send(v);
        });
        sink.submit(1.5);
        sink.submit(2.5);
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(1.5));
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(2.5));
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(20)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn sync_sender_sink_never_blocks() {
        let (tx, rx) = mpsc::sync_channel::<f64>(1);
        tx.submit(1.0);
        tx.submit(2.0);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1.0]);
    }
}
