//! Completion markers for enqueued device work.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Marks the completion of one submitted unit of device work.
///
/// Cloning is cheap; all clones observe the same completion.
#[derive(Clone, Debug)]
pub enum Event {
    Host(HostEvent),

    #[cfg(feature = "opencl")]
    Cl(ocl::Event),
}

impl Event {
    /// Block until the work has finished. A failed command reports [`Error::Device`].
    pub fn wait(&self) -> Result<()> {
        match self {
            Event::Host(e) => e.wait(),
            #[cfg(feature = "opencl")]
            Event::Cl(e) => e.wait_for().map_err(Error::from),
        }
    }

    /// Whether the work finished successfully. Failed or pending work reports `false`.
    pub fn is_complete(&self) -> bool {
        match self {
            Event::Host(e) => e.is_complete(),
            #[cfg(feature = "opencl")]
            Event::Cl(e) => e.is_complete().unwrap_or(false),
        }
    }
}

impl From<HostEvent> for Event {
    fn from(e: HostEvent) -> Self {
        Event::Host(e)
    }
}

/// Wait on every event in order, stopping at the first failure.
pub fn wait_all(events: &[Event]) -> Result<()> {
    for event in events {
        event.wait()?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Status {
    Pending,
    Complete,
    Failed(String),
}

struct EventState {
    id: u64,
    label: String,
    status: Mutex<Status>,
    cond: Condvar,
}

/// Event signalled by the host queue.
#[derive(Clone)]
pub struct HostEvent {
    inner: Arc<EventState>,
}

impl HostEvent {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            inner: Arc::new(EventState {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                label: label.into(),
                status: Mutex::new(Status::Pending),
                cond: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub(crate) fn complete(&self) {
        self.finish(Status::Complete);
    }

    pub(crate) fn fail(&self, message: impl Into<String>) {
        self.finish(Status::Failed(message.into()));
    }

    fn finish(&self, status: Status) {
        let mut current = self.inner.status.lock();
        if *current == Status::Pending {
            *current = status;
        }
        self.inner.cond.notify_all();
    }

    pub fn wait(&self) -> Result<()> {
        let mut status = self.inner.status.lock();
        while *status == Status::Pending {
            self.inner.cond.wait(&mut status);
        }
        match &*status {
            Status::Failed(msg) => Err(Error::device(msg.clone())),
            _ => Ok(()),
        }
    }

    pub fn is_complete(&self) -> bool {
        *self.inner.status.lock() == Status::Complete
    }

    pub(crate) fn status(&self) -> Status {
        self.inner.status.lock().clone()
    }
}

impl fmt::Debug for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEvent")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_blocks_until_complete() {
        let event = HostEvent::new("test");
        let signaller = event.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaller.complete();
        });

        assert!(event.wait().is_ok());
        assert!(event.is_complete());
        handle.join().unwrap();
    }

    #[test]
    fn test_failure_is_sticky() {
        let event = HostEvent::new("broken");
        event.fail("boom");
        event.complete();

        assert!(!event.is_complete());
        match Event::from(event).wait() {
            Err(Error::Device(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let a = HostEvent::new("a");
        let b = HostEvent::new("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.label(), "a");
    }

    #[test]
    fn test_wait_all_stops_on_failure() {
        let ok = HostEvent::new("ok");
        ok.complete();
        let bad = HostEvent::new("bad");
        bad.fail("nope");

        let events = vec![Event::from(ok), Event::from(bad)];
        assert!(wait_all(&events).is_err());
    }
}
