//! # Otter V8 Compat
//!
//! V8 embedder API compatibility layer for the Otter runtime: lets native
//! extensions written against V8's template model run atop the host
//! engine. This crate covers the template-to-instance materialization
//! pipeline:
//!
//! - **Templates**: describe-then-instantiate descriptors for functions
//!   and object shapes, frozen once the first instance exists
//! - **Materialization**: resolving the constructor-linkage chain and
//!   stamping out live host-engine objects inside a realm
//! - **Internal fields**: per-instance native-only slot storage, invisible
//!   to script
//! - **Constructor linkage**: function-template inheritance with bounded,
//!   cycle-checked chain resolution
//!
//! Realms and the collector are external collaborators, consumed through
//! the narrow [`realm::Realm`] and [`gc::GcTracker`] traits.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod gc;
pub mod instance;
pub mod internal_fields;
pub mod isolate;
pub mod materialize;
pub mod realm;
pub mod registry;
pub mod template;

pub use error::{RealmError, RealmResult};
pub use gc::{GcTracker, InstanceId, NullGcTracker};
pub use instance::Instance;
pub use internal_fields::{InternalField, InternalFieldStore, NativeHandle};
pub use isolate::{Isolate, IsolateConfig};
pub use materialize::ResolvedShape;
pub use realm::{HostObjectRef, PrototypeHandle, Realm};
pub use registry::{FunctionTemplateId, ObjectTemplateId, TemplateRegistry};
pub use template::{
    ConstructCallback, FunctionTemplate, IndexedPropertyHandler, NamedPropertyHandler,
    ObjectTemplate, TemplateState,
};
