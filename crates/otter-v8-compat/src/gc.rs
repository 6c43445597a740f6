//! Garbage-collection bookkeeping interface.
//!
//! The collector itself is an external collaborator; this subsystem only
//! tells it when an instance becomes trackable, when it is finalized, and
//! when an internal field slot should be treated as GC-visible. Tracking
//! follows a scoped-acquisition pattern: [`GcRegistration`] registers on
//! creation and unregisters on drop, so a materialization failure between
//! registration and assembly leaves no half-registered instance observable
//! to the collector.

use std::sync::Arc;

/// Identifier the collector uses to track a live instance.
///
/// Allocated once per instance by the isolate and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier value.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// The narrow collector surface this subsystem consumes.
///
/// Implemented by the external garbage collector. Calls are synchronous
/// bookkeeping only; the tracker never runs embedder code reentrantly.
pub trait GcTracker: Send + Sync {
    /// Start tracking an instance for collection.
    fn register(&self, instance: InstanceId);

    /// Stop tracking an instance. Called exactly once, at finalization.
    fn unregister(&self, instance: InstanceId);

    /// Negotiate GC visibility for one internal field slot: the collector
    /// will trace the slot's payload from now on.
    fn mark_gc_visible(&self, instance: InstanceId, index: usize);
}

/// Tracker for embedders without collector integration.
///
/// All calls are no-ops; internal field payloads are then entirely the
/// responsibility of the native code that set them.
#[derive(Debug, Default)]
pub struct NullGcTracker;

impl GcTracker for NullGcTracker {
    fn register(&self, _instance: InstanceId) {}

    fn unregister(&self, _instance: InstanceId) {}

    fn mark_gc_visible(&self, _instance: InstanceId, _index: usize) {}
}

/// RAII registration of one instance with the collector.
///
/// Register-on-create, unregister-on-drop. Owned by the instance once
/// materialization completes, so the unregister call lines up exactly with
/// instance finalization.
pub(crate) struct GcRegistration {
    tracker: Arc<dyn GcTracker>,
    instance: InstanceId,
}

impl GcRegistration {
    pub(crate) fn new(tracker: Arc<dyn GcTracker>, instance: InstanceId) -> Self {
        tracker.register(instance);
        Self { tracker, instance }
    }

    pub(crate) fn instance(&self) -> InstanceId {
        self.instance
    }

    pub(crate) fn mark_gc_visible(&self, index: usize) {
        self.tracker.mark_gc_visible(self.instance, index);
    }
}

impl Drop for GcRegistration {
    fn drop(&mut self) {
        self.tracker.unregister(self.instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingTracker {
        registered: Mutex<Vec<InstanceId>>,
        unregistered: Mutex<Vec<InstanceId>>,
    }

    impl GcTracker for CountingTracker {
        fn register(&self, instance: InstanceId) {
            self.registered.lock().push(instance);
        }

        fn unregister(&self, instance: InstanceId) {
            self.unregistered.lock().push(instance);
        }

        fn mark_gc_visible(&self, _instance: InstanceId, _index: usize) {}
    }

    #[test]
    fn test_registration_registers_then_unregisters_on_drop() {
        let tracker = Arc::new(CountingTracker::default());
        let id = InstanceId::new(7);

        {
            let registration = GcRegistration::new(tracker.clone(), id);
            assert_eq!(registration.instance(), id);
            assert_eq!(tracker.registered.lock().as_slice(), &[id]);
            assert!(tracker.unregistered.lock().is_empty());
        }

        assert_eq!(tracker.unregistered.lock().as_slice(), &[id]);
    }

    #[test]
    fn test_null_tracker_is_silent() {
        let tracker = NullGcTracker;
        tracker.register(InstanceId::new(1));
        tracker.mark_gc_visible(InstanceId::new(1), 0);
        tracker.unregister(InstanceId::new(1));
    }
}
