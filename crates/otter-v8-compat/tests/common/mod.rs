//! Shared test doubles: a controllable realm and a recording collector.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use otter_v8_compat::{
    FunctionTemplateId, GcTracker, HostObjectRef, InstanceId, PrototypeHandle, Realm, RealmError,
    RealmResult,
};

/// A realm whose readiness and allocator behavior the test controls.
pub struct TestRealm {
    initialized: AtomicBool,
    fail_allocation: AtomicBool,
    next_object: AtomicU64,
}

impl TestRealm {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(true),
            fail_allocation: AtomicBool::new(false),
            next_object: AtomicU64::new(1),
        }
    }

    pub fn uninitialized() -> Self {
        let realm = Self::new();
        realm.initialized.store(false, Ordering::Relaxed);
        realm
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::Relaxed);
    }

    pub fn fail_next_allocations(&self, fail: bool) {
        self.fail_allocation.store(fail, Ordering::Relaxed);
    }
}

impl Realm for TestRealm {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    fn global_prototype_for(
        &self,
        constructor: Option<FunctionTemplateId>,
    ) -> RealmResult<PrototypeHandle> {
        Ok(PrototypeHandle::from_raw(
            constructor.map(|c| u64::from(c.as_u32()) + 1).unwrap_or(0),
        ))
    }

    fn allocate_object(&self, _prototype: PrototypeHandle) -> RealmResult<HostObjectRef> {
        if self.fail_allocation.load(Ordering::Relaxed) {
            return Err(RealmError::allocation("test allocator exhausted"));
        }
        Ok(HostObjectRef::from_raw(
            self.next_object.fetch_add(1, Ordering::Relaxed),
        ))
    }
}

/// Records every bookkeeping call the subsystem makes.
#[derive(Default)]
pub struct RecordingGc {
    registered: Mutex<Vec<InstanceId>>,
    unregistered: Mutex<Vec<InstanceId>>,
    marked: Mutex<Vec<(InstanceId, usize)>>,
}

impl RecordingGc {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn registered(&self) -> Vec<InstanceId> {
        self.registered.lock().clone()
    }

    pub fn unregistered(&self) -> Vec<InstanceId> {
        self.unregistered.lock().clone()
    }

    pub fn marked(&self) -> Vec<(InstanceId, usize)> {
        self.marked.lock().clone()
    }

    /// Instances currently registered and not yet unregistered.
    pub fn live_count(&self) -> usize {
        self.registered.lock().len() - self.unregistered.lock().len()
    }
}

impl GcTracker for RecordingGc {
    fn register(&self, instance: InstanceId) {
        self.registered.lock().push(instance);
    }

    fn unregister(&self, instance: InstanceId) {
        self.unregistered.lock().push(instance);
    }

    fn mark_gc_visible(&self, instance: InstanceId, index: usize) {
        self.marked.lock().push((instance, index));
    }
}
