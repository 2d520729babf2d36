//! Coalescing flush scheduler
//!
//! A burst of mutations should reach disk as one write. The scheduler keeps
//! at most one pending deadline: the first `schedule()` arms it, later calls
//! are no-ops until it fires. When it fires the flush callback runs once and
//! sees whatever state the store holds at that moment.

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

enum Signal {
    /// Arm the deadline if none is pending
    Arm,
    /// Drop the pending deadline without flushing
    Cancel,
    /// Flush anything pending and exit
    Shutdown,
}

/// Background timer that runs a flush callback after a quiet period
pub struct FlushScheduler {
    delay: Duration,
    /// True from `schedule()` until the deadline fires or is cancelled.
    /// Held while sending so the worker never clears it with a signal queued.
    pending: Arc<Mutex<bool>>,
    tx: Sender<Signal>,
    worker: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    /// Start the worker thread
    ///
    /// `flush` runs on the worker thread and must handle its own errors.
    pub fn spawn<F>(delay: Duration, flush: F) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = unbounded::<Signal>();
        let pending = Arc::new(Mutex::new(false));
        let worker_pending = Arc::clone(&pending);

        let worker = std::thread::Builder::new()
            .name("date-store-flush".to_string())
            .spawn(move || {
                let mut deadline: Option<Instant> = None;

                loop {
                    let signal = match deadline {
                        Some(at) => rx.recv_deadline(at),
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match signal {
                        Ok(Signal::Arm) => {
                            if deadline.is_none() {
                                deadline = Some(Instant::now() + delay);
                                debug!("Flush armed ({:?})", delay);
                            }
                        }
                        Ok(Signal::Cancel) => {
                            deadline = None;
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            {
                                let mut pending = worker_pending.lock();
                                // Queued signals go first; the deadline has
                                // passed, so the next receive returns at once
                                if !rx.is_empty() {
                                    continue;
                                }
                                // Clear before flushing so mutations made
                                // during the write arm a fresh deadline
                                *pending = false;
                                deadline = None;
                            }
                            flush();
                        }
                        Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                            if deadline.take().is_some() {
                                *worker_pending.lock() = false;
                                flush();
                            }
                            break;
                        }
                    }
                }
            })?;

        Ok(Self {
            delay,
            pending,
            tx,
            worker: Some(worker),
        })
    }

    /// Arm a flush unless one is already pending
    ///
    /// Returns true if this call armed the deadline.
    pub fn schedule(&self) -> bool {
        let mut pending = self.pending.lock();
        if *pending {
            return false;
        }

        if self.tx.send(Signal::Arm).is_err() {
            warn!("Flush worker is gone; scheduled save dropped");
            return false;
        }
        *pending = true;
        true
    }

    /// Forget the pending deadline (the caller is about to write itself)
    pub fn cancel(&self) {
        let mut pending = self.pending.lock();
        if std::mem::take(&mut *pending) {
            let _ = self.tx.send(Signal::Cancel);
        }
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.lock()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(Signal::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Flush worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;

    fn counting(delay: Duration) -> (FlushScheduler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let scheduler = FlushScheduler::spawn(delay, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        (scheduler, count)
    }

    #[test]
    fn test_burst_coalesces_into_one_flush() {
        let (scheduler, count) = counting(Duration::from_millis(100));

        assert!(scheduler.schedule());
        assert!(!scheduler.schedule());
        assert!(!scheduler.schedule());
        assert!(scheduler.is_pending());

        sleep(Duration::from_millis(400));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_rearm_after_fire() {
        let (scheduler, count) = counting(Duration::from_millis(20));

        scheduler.schedule();
        sleep(Duration::from_millis(200));
        scheduler.schedule();
        sleep(Duration::from_millis(200));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_prevents_flush() {
        let (scheduler, count) = counting(Duration::from_millis(50));

        scheduler.schedule();
        scheduler.cancel();
        assert!(!scheduler.is_pending());

        sleep(Duration::from_millis(250));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_flushes_pending() {
        let (scheduler, count) = counting(Duration::from_secs(60));

        scheduler.schedule();
        drop(scheduler);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_without_pending_does_not_flush() {
        let (scheduler, count) = counting(Duration::from_millis(10));
        drop(scheduler);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_schedule_during_flush_rearms() {
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(4);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(4);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let scheduler = FlushScheduler::spawn(Duration::from_millis(10), move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        scheduler.schedule();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Worker is inside the first flush; queue arm, cancel, arm
        assert!(scheduler.schedule());
        scheduler.cancel();
        assert!(scheduler.schedule());
        assert!(scheduler.is_pending());

        release_tx.send(()).unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        release_tx.send(()).unwrap();

        sleep(Duration::from_millis(200));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_not_pending_means_no_flush_queued() {
        let delay = Duration::from_millis(2);
        let (scheduler, count) = counting(delay);

        for _ in 0..100 {
            scheduler.schedule();
            sleep(delay);
            scheduler.cancel();
            scheduler.schedule();

            let mut waited = 0;
            while scheduler.is_pending() && waited < 1000 {
                sleep(Duration::from_millis(1));
                waited += 1;
            }
            assert!(!scheduler.is_pending());

            // At most the flush already in flight may still land
            let seen = count.load(Ordering::SeqCst);
            sleep(delay * 5);
            assert!(count.load(Ordering::SeqCst) <= seen + 1);
        }
    }
}
