//! Live instances materialized from object templates.
//!
//! An instance is a concrete host-engine object created from a template
//! within a specific realm. It owns exactly one internal field store sized
//! to the resolved field count; the store's lifetime is the instance's
//! lifetime, and dropping the last handle unregisters the instance from
//! the collector.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::gc::{GcRegistration, InstanceId};
use crate::internal_fields::{InternalField, InternalFieldStore, NativeHandle};
use crate::realm::HostObjectRef;
use crate::registry::ObjectTemplateId;

struct InstanceInner {
    host: HostObjectRef,
    template: ObjectTemplateId,
    fields: RwLock<InternalFieldStore>,
    registration: GcRegistration,
}

/// A live object bound to a realm, stamped out from an object template.
///
/// Cheap to clone; all clones refer to the same underlying instance. Field
/// access is O(1) by slot index and independent of any script-visible
/// property mutation on the host object.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

impl Instance {
    pub(crate) fn assemble(
        host: HostObjectRef,
        template: ObjectTemplateId,
        fields: InternalFieldStore,
        registration: GcRegistration,
    ) -> Self {
        Self {
            inner: Arc::new(InstanceInner {
                host,
                template,
                fields: RwLock::new(fields),
                registration,
            }),
        }
    }

    /// Identifier under which the collector tracks this instance.
    pub fn id(&self) -> InstanceId {
        self.inner.registration.instance()
    }

    /// The underlying host-engine object.
    pub fn host_object(&self) -> HostObjectRef {
        self.inner.host
    }

    /// The object template this instance was materialized from.
    pub fn template(&self) -> ObjectTemplateId {
        self.inner.template
    }

    /// Number of internal field slots on this instance. Fixed at
    /// materialization.
    pub fn internal_field_count(&self) -> usize {
        self.inner.fields.read().count()
    }

    /// Read the internal field at `index`.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range.
    pub fn get_internal_field(&self, index: usize) -> InternalField {
        self.inner.fields.read().get(index)
    }

    /// Store `handle` in the internal field at `index`.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range.
    pub fn set_internal_field(&self, index: usize, handle: NativeHandle) {
        self.inner.fields.write().set(index, handle);
    }

    /// Reset the internal field at `index` to `Empty`.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range.
    pub fn clear_internal_field(&self, index: usize) {
        self.inner.fields.write().clear(index);
    }

    /// Ask the collector to trace the payload of the field at `index` from
    /// now on. The slot keeps its visibility tag across later writes.
    ///
    /// # Panics
    ///
    /// Fatal if `index` is out of range or the slot is empty.
    pub fn mark_gc_visible(&self, index: usize) {
        self.inner.fields.write().mark_gc_visible(index);
        self.inner.registration.mark_gc_visible(index);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id().as_raw())
            .field("template", &self.template().as_u32())
            .field("internal_fields", &self.internal_field_count())
            .finish()
    }
}
