//! Per-instance internal field storage.
//!
//! Internal fields are native-code-only slots on an instance: invisible to
//! and unreachable from script-level property access, addressed by index,
//! fixed in number once the owning template is instantiated. Slots hold
//! opaque pointer-sized payloads the store never interprets or traces; GC
//! visibility is an explicit per-slot tag, negotiated with the external
//! collector, rather than implicit pointer tagging.

use std::ffi::c_void;
use std::fmt;

use crate::error::fatal;

/// Opaque pointer-sized payload stored in an internal field slot.
///
/// Typically a pointer to embedder-owned native state. The store never
/// dereferences it; null is a legal payload (distinct from an empty slot).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(*mut c_void);

impl NativeHandle {
    /// Wrap a raw native pointer.
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// Get the raw native pointer back.
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:p})", self.0)
    }
}

// SAFETY: the payload is an opaque token. The store never dereferences it,
// and instances are confined to their isolate's thread; any cross-thread
// use of the pointed-to data is the embedder's contract, not ours.
unsafe impl Send for NativeHandle {}
unsafe impl Sync for NativeHandle {}

/// One internal field slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InternalField {
    /// The slot holds no value. Every slot starts here.
    Empty,
    /// Opaque native payload; invisible to the collector.
    Native(NativeHandle),
    /// Native payload the collector has been asked to trace.
    GcVisible(NativeHandle),
}

impl InternalField {
    /// Whether the slot holds no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The payload, if the slot holds one (visible to the GC or not).
    pub fn handle(&self) -> Option<NativeHandle> {
        match self {
            Self::Empty => None,
            Self::Native(handle) | Self::GcVisible(handle) => Some(*handle),
        }
    }
}

/// Fixed-size per-instance slot array for native values.
///
/// Created atomically with its instance, sized to the resolved internal
/// field count, destroyed with the instance. Access is O(1) and unaffected
/// by script-visible property mutation. Out-of-range indices are a
/// native-code contract violation and abort; see the crate error taxonomy.
pub struct InternalFieldStore {
    slots: Box<[InternalField]>,
}

impl InternalFieldStore {
    /// Create a store with `count` slots, all `Empty`.
    pub(crate) fn new(count: usize) -> Self {
        Self {
            slots: vec![InternalField::Empty; count].into_boxed_slice(),
        }
    }

    /// Number of slots. Fixed for the lifetime of the store.
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Read the slot at `index`.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range.
    pub fn get(&self, index: usize) -> InternalField {
        self.check_index("InternalFieldStore::get", index);
        self.slots[index]
    }

    /// Store `handle` in the slot at `index`.
    ///
    /// A slot that was marked GC-visible keeps its visibility tag across
    /// writes; the collector keeps tracing whatever the slot currently
    /// holds.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range.
    pub fn set(&mut self, index: usize, handle: NativeHandle) {
        self.check_index("InternalFieldStore::set", index);
        self.slots[index] = match self.slots[index] {
            InternalField::GcVisible(_) => InternalField::GcVisible(handle),
            InternalField::Empty | InternalField::Native(_) => InternalField::Native(handle),
        };
    }

    /// Reset the slot at `index` to `Empty`, dropping any visibility tag.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range.
    pub fn clear(&mut self, index: usize) {
        self.check_index("InternalFieldStore::clear", index);
        self.slots[index] = InternalField::Empty;
    }

    /// Tag the slot at `index` as GC-visible.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range or the slot is empty. Visibility
    /// is negotiated for a value; an empty slot gives the collector
    /// nothing to see.
    pub(crate) fn mark_gc_visible(&mut self, index: usize) {
        self.check_index("Instance::mark_gc_visible", index);
        match self.slots[index] {
            InternalField::Empty => fatal(
                "Instance::mark_gc_visible",
                &format!("internal field {index} is empty"),
            ),
            InternalField::Native(handle) | InternalField::GcVisible(handle) => {
                self.slots[index] = InternalField::GcVisible(handle);
            }
        }
    }

    fn check_index(&self, entry_point: &str, index: usize) {
        if index >= self.slots.len() {
            fatal(
                entry_point,
                &format!(
                    "internal field index {index} out of range for field count {}",
                    self.slots.len()
                ),
            );
        }
    }
}

impl fmt::Debug for InternalFieldStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalFieldStore")
            .field("count", &self.slots.len())
            .finish()
    }
}
