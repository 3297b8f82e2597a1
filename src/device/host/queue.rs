//! Out-of-order command queue of the host device.
//!
//! Workers take commands from a shared FIFO injector, block on each
//! command's wait-list, run it, then signal its event. A wait-list only
//! ever names commands submitted earlier, and FIFO pickup guarantees the
//! oldest running command has all of its prerequisites finished, so the
//! queue always makes progress with any number of workers.

use crate::device::event::HostEvent;
use crate::error::{Error, Result};
use crate::telemetry::Metrics;
use crate::util::Backoff;
use crossbeam_deque::{Injector, Steal};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

pub(crate) type Work = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

struct Command {
    label: String,
    wait_list: Vec<HostEvent>,
    work: Work,
    event: HostEvent,
}

struct Shared {
    injector: Injector<Command>,
    shutdown: AtomicBool,
    in_flight: Mutex<usize>,
    drained: Condvar,
    metrics: Arc<Metrics>,
}

struct WorkerHandle {
    thread: Option<JoinHandle<()>>,
    unparker: thread::Thread,
}

pub(crate) struct HostQueue {
    shared: Arc<Shared>,
    workers: Vec<WorkerHandle>,
    next_wake: AtomicUsize,
}

impl HostQueue {
    pub fn new(num_threads: usize, name_prefix: &str, metrics: Arc<Metrics>) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::config("need at least 1 queue thread"));
        }

        let shared = Arc::new(Shared {
            injector: Injector::new(),
            shutdown: AtomicBool::new(false),
            in_flight: Mutex::new(0),
            drained: Condvar::new(),
            metrics,
        });

        let mut queue = Self {
            shared,
            workers: Vec::with_capacity(num_threads),
            next_wake: AtomicUsize::new(0),
        };

        for id in 0..num_threads {
            let shared = queue.shared.clone();
            let thread = thread::Builder::new()
                .name(format!("{}-{}", name_prefix, id))
                .spawn(move || worker_loop(&shared))?;

            let unparker = thread.thread().clone();
            queue.workers.push(WorkerHandle {
                thread: Some(thread),
                unparker,
            });
        }

        tracing::debug!(threads = num_threads, "host queue started");
        Ok(queue)
    }

    /// Submit `work` to run once every event in `wait_list` has completed.
    pub fn submit(&self, label: impl Into<String>, wait_list: Vec<HostEvent>, work: Work) -> HostEvent {
        let label = label.into();
        let event = HostEvent::new(label.clone());

        *self.shared.in_flight.lock() += 1;
        tracing::trace!(
            command = %label,
            event = event.id(),
            waits = wait_list.len(),
            "enqueue"
        );

        self.shared.injector.push(Command {
            label,
            wait_list,
            work,
            event: event.clone(),
        });
        self.wake_one();

        event
    }

    /// Block until every submitted command has finished or failed.
    pub fn finish(&self) {
        let mut in_flight = self.shared.in_flight.lock();
        while *in_flight > 0 {
            self.shared.drained.wait(&mut in_flight);
        }
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    fn wake_one(&self) {
        let n = self.workers.len();
        let idx = self.next_wake.fetch_add(1, Ordering::Relaxed) % n;
        self.workers[idx].unparker.unpark();
    }
}

impl Drop for HostQueue {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);

        for worker in &self.workers {
            worker.unparker.unpark();
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

fn worker_loop(shared: &Shared) {
    let mut backoff = Backoff::new();

    loop {
        match shared.injector.steal() {
            Steal::Success(cmd) => {
                backoff.reset();
                run_command(shared, cmd);
            }
            Steal::Retry => continue,
            Steal::Empty => {
                // only exit once the queue is drained
                if shared.shutdown.load(Ordering::Acquire) {
                    break;
                }
                backoff.snooze();
            }
        }
    }
}

fn run_command(shared: &Shared, cmd: Command) {
    let Command {
        label,
        wait_list,
        work,
        event,
    } = cmd;

    let result = wait_for(&wait_list).and_then(|()| {
        let start = Instant::now();
        let outcome = match catch_unwind(AssertUnwindSafe(work)) {
            Ok(res) => res,
            Err(payload) => Err(Error::device(format!(
                "command panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };
        if outcome.is_ok() {
            shared
                .metrics
                .record_command(start.elapsed().as_nanos() as u64);
        }
        outcome
    });

    match result {
        Ok(()) => event.complete(),
        Err(e) => {
            let message = match e {
                Error::Device(msg) => msg,
                other => other.to_string(),
            };
            tracing::warn!(command = %label, error = %message, "command failed");
            shared.metrics.record_command_failed();
            event.fail(format!("{}: {}", label, message));
        }
    }

    let mut in_flight = shared.in_flight.lock();
    *in_flight -= 1;
    if *in_flight == 0 {
        shared.drained.notify_all();
    }
}

fn wait_for(wait_list: &[HostEvent]) -> Result<()> {
    for dep in wait_list {
        if let Err(e) = dep.wait() {
            let cause = match e {
                Error::Device(msg) => msg,
                other => other.to_string(),
            };
            return Err(Error::device(format!(
                "prerequisite `{}` failed ({})",
                dep.label(),
                cause
            )));
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    fn queue(threads: usize) -> HostQueue {
        HostQueue::new(threads, "test-queue", Arc::new(Metrics::new())).unwrap()
    }

    #[test]
    fn test_runs_submitted_work() {
        let q = queue(2);
        let counter = Arc::new(AtomicU64::new(0));

        let events: Vec<_> = (0..16)
            .map(|_| {
                let c = counter.clone();
                q.submit(
                    "inc",
                    Vec::new(),
                    Box::new(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                )
            })
            .collect();

        for e in &events {
            e.wait().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_wait_list_orders_commands() {
        let q = queue(4);
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let first = q.submit(
            "slow",
            Vec::new(),
            Box::new(move || {
                thread::sleep(Duration::from_millis(30));
                l1.lock().push(1);
                Ok(())
            }),
        );
        let l2 = log.clone();
        let second = q.submit(
            "fast",
            vec![first.clone()],
            Box::new(move || {
                l2.lock().push(2);
                Ok(())
            }),
        );

        second.wait().unwrap();
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[test]
    fn test_failure_propagates_to_dependants() {
        let q = queue(2);
        let bad = q.submit(
            "bad",
            Vec::new(),
            Box::new(|| Err(Error::device("out of resources"))),
        );
        let dependant = q.submit("after", vec![bad.clone()], Box::new(|| Ok(())));

        let err = dependant.wait().unwrap_err().to_string();
        assert!(err.contains("out of resources"), "{}", err);
        assert!(err.contains("bad"), "{}", err);
    }

    #[test]
    fn test_panicking_command_fails_event() {
        let q = queue(1);
        let event = q.submit("boom", Vec::new(), Box::new(|| panic!("kaboom")));
        let err = event.wait().unwrap_err().to_string();
        assert!(err.contains("kaboom"));

        // worker survives
        let ok = q.submit("ok", Vec::new(), Box::new(|| Ok(())));
        assert!(ok.wait().is_ok());
    }

    #[test]
    fn test_finish_and_drop_drain_queue() {
        let counter = Arc::new(AtomicU64::new(0));
        {
            let q = queue(3);
            for _ in 0..50 {
                let c = counter.clone();
                q.submit(
                    "inc",
                    Vec::new(),
                    Box::new(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                );
            }
            q.finish();
            assert_eq!(counter.load(Ordering::SeqCst), 50);

            for _ in 0..10 {
                let c = counter.clone();
                q.submit(
                    "inc",
                    Vec::new(),
                    Box::new(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                );
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 60);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(HostQueue::new(0, "x", Arc::new(Metrics::new())).is_err());
    }
}
