//! Function and object templates: the embedder-facing descriptor builders.
//!
//! A template is an engine-independent, instantiation-ready description of
//! an object's or function's shape, created once and used to stamp out many
//! instances. Templates follow the V8 model: mutable while being described,
//! frozen forever once the first instance has been materialized from them.
//! The freeze is an explicit state machine here, checked at every mutating
//! entry point, rather than the original API's implicit freeze-on-first-use.
//!
//! `FunctionTemplate` and `ObjectTemplate` are cheap cloneable handles into
//! the isolate's [`TemplateRegistry`](crate::registry::TemplateRegistry);
//! all record state lives in the registry arena.

use std::fmt;
use std::sync::Arc;

use crate::error::{RealmResult, fatal};
use crate::instance::Instance;
use crate::internal_fields::NativeHandle;
use crate::isolate::{Isolate, IsolateShared};
use crate::materialize::{self, ResolvedShape};
use crate::realm::Realm;
use crate::registry::{FunctionTemplateId, ObjectTemplateId};

/// Lifecycle of a template.
///
/// `Unconfigured → Configured → Instantiated`, never backwards. An
/// `Instantiated` template is immutable: live instances depend on its
/// layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateState {
    /// Freshly created, nothing set.
    Unconfigured,
    /// At least one descriptor mutation applied, no instances yet.
    Configured,
    /// At least one instance materialized; the template is frozen.
    Instantiated,
}

impl TemplateState {
    /// Whether the template has produced at least one instance.
    pub fn is_instantiated(self) -> bool {
        matches!(self, Self::Instantiated)
    }

    /// Record a descriptor mutation.
    pub(crate) fn touch(&mut self) {
        if matches!(self, Self::Unconfigured) {
            *self = Self::Configured;
        }
    }
}

/// Invoked by the external dispatcher when script constructs an object
/// through the template's function. Never invoked by this subsystem.
pub type ConstructCallback = fn(&Instance);

/// Hook invoked by the interceptor dispatcher when a named property is
/// read. Returns the intercepted value, or `None` to fall through.
pub type NamedGetterHook = fn(&Instance, name: &str) -> Option<NativeHandle>;

/// Hook invoked when a named property is written. Returns `true` when the
/// write was intercepted.
pub type NamedSetterHook = fn(&Instance, name: &str, value: NativeHandle) -> bool;

/// Hook invoked when an indexed property is read.
pub type IndexedGetterHook = fn(&Instance, index: u32) -> Option<NativeHandle>;

/// Hook invoked when an indexed property is written.
pub type IndexedSetterHook = fn(&Instance, index: u32, value: NativeHandle) -> bool;

/// A named property handler registration.
///
/// Registrations form an ordered list on each template; the external
/// dispatcher resolves same-name duplicates within one template in
/// registration order. Across a constructor chain, the most derived
/// template's registration wins.
#[derive(Clone, Debug)]
pub struct NamedPropertyHandler {
    /// Property name the handler intercepts.
    pub name: String,
    /// Read hook, if any.
    pub getter: Option<NamedGetterHook>,
    /// Write hook, if any.
    pub setter: Option<NamedSetterHook>,
}

impl NamedPropertyHandler {
    /// A handler with both hooks optional.
    pub fn new(
        name: impl Into<String>,
        getter: Option<NamedGetterHook>,
        setter: Option<NamedSetterHook>,
    ) -> Self {
        Self {
            name: name.into(),
            getter,
            setter,
        }
    }

    /// A read-only handler.
    pub fn getter(name: impl Into<String>, getter: NamedGetterHook) -> Self {
        Self::new(name, Some(getter), None)
    }

    /// A write-only handler.
    pub fn setter(name: impl Into<String>, setter: NamedSetterHook) -> Self {
        Self::new(name, None, Some(setter))
    }
}

/// An indexed property handler registration. Intercepts the whole index
/// space; registrations accumulate in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndexedPropertyHandler {
    /// Read hook, if any.
    pub getter: Option<IndexedGetterHook>,
    /// Write hook, if any.
    pub setter: Option<IndexedSetterHook>,
}

impl IndexedPropertyHandler {
    /// A handler with both hooks optional.
    pub fn new(getter: Option<IndexedGetterHook>, setter: Option<IndexedSetterHook>) -> Self {
        Self { getter, setter }
    }
}

fn assert_same_isolate(a: &Arc<IsolateShared>, b: &Arc<IsolateShared>, entry_point: &str) {
    if !Arc::ptr_eq(a, b) {
        fatal(entry_point, "templates belong to different isolates");
    }
}

/// Describes a constructible function and, through its instance template,
/// the shape of the objects it constructs.
#[derive(Clone)]
pub struct FunctionTemplate {
    shared: Arc<IsolateShared>,
    id: FunctionTemplateId,
}

impl FunctionTemplate {
    /// Create a function template in `isolate` with the given construct
    /// callback.
    pub fn new(isolate: &Isolate, callback: ConstructCallback) -> Self {
        let shared = isolate.shared().clone();
        let id = shared.registry.create_function(callback);
        Self { shared, id }
    }

    /// Stable id of this template in the isolate's registry.
    pub fn id(&self) -> FunctionTemplateId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TemplateState {
        self.shared.registry.function_state(self.id)
    }

    /// The construct callback, for the external dispatcher.
    pub fn construct_callback(&self) -> ConstructCallback {
        self.shared.registry.callback_of(self.id)
    }

    /// Set a class name used in diagnostics.
    ///
    /// # Panics
    ///
    /// Fatal if the template is already instantiated.
    pub fn set_class_name(&self, name: impl Into<String>) {
        self.shared.registry.set_class_name(self.id, name.into());
    }

    /// The class name, if one was set.
    pub fn class_name(&self) -> Option<String> {
        self.shared.registry.class_name_of(self.id)
    }

    /// The object template describing instances this function constructs,
    /// created and linked on first use. The association is one-directional
    /// and set at most once.
    ///
    /// # Panics
    ///
    /// Fatal if the template was instantiated before any instance template
    /// was linked.
    pub fn instance_template(&self) -> ObjectTemplate {
        let id = self.shared.registry.instance_template_of(self.id);
        ObjectTemplate {
            shared: self.shared.clone(),
            id,
        }
    }

    /// Make instances of this template inherit shape from `parent`.
    ///
    /// # Panics
    ///
    /// Fatal on self-inheritance, on reassignment, on cross-isolate
    /// linkage, or if this template is already instantiated. Cycles built
    /// out of individually valid links are caught by the materializer's
    /// bounded chain walk.
    pub fn inherit(&self, parent: &FunctionTemplate) {
        assert_same_isolate(&self.shared, &parent.shared, "FunctionTemplate::inherit");
        self.shared.registry.set_parent(self.id, parent.id);
    }

    /// The parent template, if inheritance was set up.
    pub fn parent(&self) -> Option<FunctionTemplateId> {
        self.shared.registry.parent_of(self.id)
    }
}

impl fmt::Debug for FunctionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTemplate")
            .field("id", &self.id.as_u32())
            .field("class_name", &self.class_name())
            .field("state", &self.state())
            .finish()
    }
}

/// Describes the shape instances will have: internal field count and
/// property handler registrations.
#[derive(Clone)]
pub struct ObjectTemplate {
    shared: Arc<IsolateShared>,
    id: ObjectTemplateId,
}

impl ObjectTemplate {
    /// Create an object template in `isolate`, optionally backed by the
    /// constructor whose instances it describes.
    pub fn new(isolate: &Isolate, constructor: Option<&FunctionTemplate>) -> Self {
        let shared = isolate.shared().clone();
        if let Some(constructor) = constructor {
            assert_same_isolate(&shared, &constructor.shared, "ObjectTemplate::new");
        }
        let id = shared.registry.create_object(constructor.map(|c| c.id));
        Self { shared, id }
    }

    /// Stable id of this template in the isolate's registry.
    pub fn id(&self) -> ObjectTemplateId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TemplateState {
        self.shared.registry.object_state(self.id)
    }

    /// The backing constructor, if any.
    pub fn constructor(&self) -> Option<FunctionTemplateId> {
        self.shared.registry.object_constructor(self.id)
    }

    /// Number of internal field slots instances of this template get.
    ///
    /// Note this is the template's own count; the effective count of an
    /// instance also depends on the constructor chain, see
    /// [`resolved_shape`](Self::resolved_shape).
    pub fn internal_field_count(&self) -> usize {
        self.shared.registry.object_field_count(self.id)
    }

    /// Set the number of internal field slots instances will carry.
    ///
    /// # Panics
    ///
    /// Fatal if any instance has already been materialized from this
    /// template (the layout is frozen), or if `count` exceeds the
    /// isolate's `max_internal_fields` limit.
    pub fn set_internal_field_count(&self, count: usize) {
        self.shared.registry.set_internal_field_count(self.id, count);
    }

    /// Register a named property handler. Handlers append in order.
    ///
    /// # Panics
    ///
    /// Fatal if the template is already instantiated.
    pub fn set_named_property_handler(&self, handler: NamedPropertyHandler) {
        self.shared.registry.add_named_handler(self.id, handler);
    }

    /// Register an indexed property handler. Handlers append in order.
    ///
    /// # Panics
    ///
    /// Fatal if the template is already instantiated.
    pub fn set_indexed_property_handler(&self, handler: IndexedPropertyHandler) {
        self.shared.registry.add_indexed_handler(self.id, handler);
    }

    /// Resolve the effective shape of instances of this template: the
    /// constructor chain's accumulated handlers and internal field count.
    ///
    /// This is what the materializer bakes into new instances and what the
    /// external interceptor dispatcher should consult.
    ///
    /// # Panics
    ///
    /// Fatal if the constructor linkage is cyclic.
    pub fn resolved_shape(&self) -> ResolvedShape {
        materialize::resolve_shape(&self.shared, self.id)
    }

    /// Materialize a live instance of this template inside `realm`.
    ///
    /// On success every template that contributed shape is frozen and the
    /// instance's internal field slots are all `Empty`. Fails with a
    /// [`RealmError`](crate::error::RealmError) if the realm is not ready
    /// or the host engine cannot allocate; nothing is registered with the
    /// collector on failure.
    ///
    /// # Panics
    ///
    /// Fatal if the template is malformed (cyclic constructor linkage).
    pub fn new_instance(&self, realm: &dyn Realm) -> RealmResult<Instance> {
        materialize::materialize(&self.shared, self.id, realm)
    }
}

impl fmt::Debug for ObjectTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTemplate")
            .field("id", &self.id.as_u32())
            .field("internal_field_count", &self.internal_field_count())
            .field("state", &self.state())
            .finish()
    }
}
