//! Transient resource tracking — guaranteed release, exactly once.
//!
//! Every handle requiring explicit release (object URLs, worker handles,
//! decoded buffers, scratch files) is registered here with a release
//! closure. `release_all` runs on every terminal path of a processing run
//! and on disposal; individual release failures are logged and never block
//! the remaining releases.

use crate::types::{Error, ResourceId, Result};

type ReleaseFn = Box<dyn FnOnce() -> Result<()> + Send>;

/// A registered transient resource awaiting release.
struct TrackedResource {
    id: ResourceId,
    label: String,
    release: ReleaseFn,
}

impl std::fmt::Debug for TrackedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedResource")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Owns transient resources for one tool instance.
///
/// NOT a separate actor - owned by the instance and called via `&mut self`.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    entries: Vec<TrackedResource>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a resource with its release function. Returns its id.
    pub fn track<F>(&mut self, label: impl Into<String>, release: F) -> ResourceId
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let id = ResourceId::new();
        self.entries.push(TrackedResource {
            id: id.clone(),
            label: label.into(),
            release: Box::new(release),
        });
        id
    }

    /// Release and forget a single resource by id, if still tracked.
    pub fn release(&mut self, id: &ResourceId) -> Result<()> {
        let Some(pos) = self.entries.iter().position(|r| &r.id == id) else {
            return Ok(());
        };
        let entry = self.entries.remove(pos);
        (entry.release)()
            .map_err(|e| Error::resource_release(format!("{}: {}", entry.label, e)))
    }

    /// Release every still-registered resource, in registration order.
    ///
    /// Failures are swallowed and returned for logging; one failing release
    /// never blocks the rest. After this call the tracked set is empty, and
    /// calling it again is a no-op.
    pub fn release_all(&mut self) -> Vec<Error> {
        let mut failures = Vec::new();
        for entry in self.entries.drain(..) {
            if let Err(e) = (entry.release)() {
                let err = Error::resource_release(format!("{}: {}", entry.label, e));
                tracing::warn!(resource = %entry.label, error = %err, "resource release failed");
                failures.push(err);
            } else {
                tracing::debug!(resource = %entry.label, "resource released");
            }
        }
        failures
    }

    /// Number of resources currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn releases_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut tracker = ResourceTracker::new();
        for i in 0..3 {
            let order = order.clone();
            tracker.track(format!("res-{i}"), move || {
                order.lock().unwrap().push(i);
                Ok(())
            });
        }

        let failures = tracker.release_all();
        assert!(failures.is_empty());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn failing_release_does_not_block_the_rest() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut tracker = ResourceTracker::new();

        let r = released.clone();
        tracker.track("first", move || {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        tracker.track("broken", || Err(Error::resource_release("revoke failed")));
        let r = released.clone();
        tracker.track("last", move || {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let failures = tracker.release_all();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("broken"));
        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert!(tracker.is_empty());
    }

    #[test]
    fn release_all_twice_is_noop() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut tracker = ResourceTracker::new();
        let c = count.clone();
        tracker.track("once", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(tracker.release_all().is_empty());
        assert!(tracker.release_all().is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_release_by_id() {
        let mut tracker = ResourceTracker::new();
        let id = tracker.track("url", || Ok(()));
        tracker.track("buffer", || Ok(()));

        tracker.release(&id).unwrap();
        assert_eq!(tracker.len(), 1);

        // Releasing an already-released id is a no-op
        tracker.release(&id).unwrap();
        assert_eq!(tracker.len(), 1);
    }
}
