//! Template registry: isolate-scoped arena of template records.
//!
//! Templates are owned by the registry and addressed by stable integer
//! ids, never by raw cross-references, so constructor linkage stays a
//! bounded graph walk over indices. All state-machine enforcement lives
//! here: a template that has produced an instance is immutable, and every
//! mutating entry point checks that before touching the record.
//!
//! Lock ordering: `functions` before `objects`, never the reverse.

use parking_lot::RwLock;

use crate::error::fatal;
use crate::template::{
    ConstructCallback, IndexedPropertyHandler, NamedPropertyHandler, TemplateState,
};

/// Stable handle to a function template in the registry arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionTemplateId(u32);

impl FunctionTemplateId {
    /// Get the raw arena index.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable handle to an object template in the registry arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectTemplateId(u32);

impl ObjectTemplateId {
    /// Get the raw arena index.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registry record for a function template.
#[derive(Clone)]
pub(crate) struct FunctionTemplateRecord {
    pub(crate) callback: ConstructCallback,
    pub(crate) class_name: Option<String>,
    /// Object template describing instances this function constructs.
    /// One-directional, set at most once.
    pub(crate) instance_template: Option<ObjectTemplateId>,
    /// Parent function template for prototype inheritance. Set at most once.
    pub(crate) parent: Option<FunctionTemplateId>,
    pub(crate) state: TemplateState,
}

/// Registry record for an object template.
#[derive(Clone)]
pub(crate) struct ObjectTemplateRecord {
    pub(crate) internal_field_count: usize,
    /// Whether the count was explicitly configured (a chain's effective
    /// count is taken from the leaf-most template that configured one).
    pub(crate) field_count_configured: bool,
    pub(crate) named_handlers: Vec<NamedPropertyHandler>,
    pub(crate) indexed_handlers: Vec<IndexedPropertyHandler>,
    pub(crate) constructor: Option<FunctionTemplateId>,
    pub(crate) state: TemplateState,
}

/// Isolate-scoped owner of all live template records.
pub struct TemplateRegistry {
    functions: RwLock<Vec<FunctionTemplateRecord>>,
    objects: RwLock<Vec<ObjectTemplateRecord>>,
    max_internal_fields: usize,
}

impl TemplateRegistry {
    pub(crate) fn new(max_internal_fields: usize) -> Self {
        Self {
            functions: RwLock::new(Vec::new()),
            objects: RwLock::new(Vec::new()),
            max_internal_fields,
        }
    }

    /// Number of live function templates.
    pub fn function_template_count(&self) -> usize {
        self.functions.read().len()
    }

    /// Number of live object templates.
    pub fn object_template_count(&self) -> usize {
        self.objects.read().len()
    }

    pub(crate) fn create_function(&self, callback: ConstructCallback) -> FunctionTemplateId {
        let mut functions = self.functions.write();
        let id = FunctionTemplateId(functions.len() as u32);
        functions.push(FunctionTemplateRecord {
            callback,
            class_name: None,
            instance_template: None,
            parent: None,
            state: TemplateState::Unconfigured,
        });
        tracing::debug!(id = id.as_u32(), "created function template");
        id
    }

    pub(crate) fn create_object(
        &self,
        constructor: Option<FunctionTemplateId>,
    ) -> ObjectTemplateId {
        let mut objects = self.objects.write();
        let id = ObjectTemplateId(objects.len() as u32);
        objects.push(ObjectTemplateRecord {
            internal_field_count: 0,
            field_count_configured: false,
            named_handlers: Vec::new(),
            indexed_handlers: Vec::new(),
            constructor,
            state: TemplateState::Unconfigured,
        });
        tracing::debug!(
            id = id.as_u32(),
            constructor = constructor.map(FunctionTemplateId::as_u32),
            "created object template"
        );
        id
    }

    // --- function template record access ---

    pub(crate) fn callback_of(&self, id: FunctionTemplateId) -> ConstructCallback {
        self.functions.read()[id.index()].callback
    }

    pub(crate) fn class_name_of(&self, id: FunctionTemplateId) -> Option<String> {
        self.functions.read()[id.index()].class_name.clone()
    }

    pub(crate) fn set_class_name(&self, id: FunctionTemplateId, name: String) {
        let mut functions = self.functions.write();
        let record = &mut functions[id.index()];
        if record.state.is_instantiated() {
            fatal(
                "FunctionTemplate::set_class_name",
                "template is already instantiated and immutable",
            );
        }
        record.class_name = Some(name);
        record.state.touch();
    }

    pub(crate) fn parent_of(&self, id: FunctionTemplateId) -> Option<FunctionTemplateId> {
        self.functions.read()[id.index()].parent
    }

    pub(crate) fn set_parent(&self, child: FunctionTemplateId, parent: FunctionTemplateId) {
        if child == parent {
            fatal(
                "FunctionTemplate::inherit",
                "a function template cannot inherit from itself",
            );
        }
        let mut functions = self.functions.write();
        let record = &mut functions[child.index()];
        if record.state.is_instantiated() {
            fatal(
                "FunctionTemplate::inherit",
                "template is already instantiated and immutable",
            );
        }
        if record.parent.is_some() {
            fatal(
                "FunctionTemplate::inherit",
                "parent template is already set and cannot be reassigned",
            );
        }
        record.parent = Some(parent);
        record.state.touch();
        tracing::debug!(
            child = child.as_u32(),
            parent = parent.as_u32(),
            "linked function template inheritance"
        );
    }

    pub(crate) fn instance_template_id(&self, id: FunctionTemplateId) -> Option<ObjectTemplateId> {
        self.functions.read()[id.index()].instance_template
    }

    /// The object template describing instances `id` constructs, created
    /// and linked on first use. The association is set at most once; the
    /// lazily created template carries `id` as its constructor.
    pub(crate) fn instance_template_of(&self, id: FunctionTemplateId) -> ObjectTemplateId {
        let mut functions = self.functions.write();
        let record = &mut functions[id.index()];
        if let Some(existing) = record.instance_template {
            return existing;
        }
        if record.state.is_instantiated() {
            fatal(
                "FunctionTemplate::instance_template",
                "template is already instantiated and immutable",
            );
        }

        // Lock ordering: functions is held, objects taken second.
        let template = {
            let mut objects = self.objects.write();
            let template = ObjectTemplateId(objects.len() as u32);
            objects.push(ObjectTemplateRecord {
                internal_field_count: 0,
                field_count_configured: false,
                named_handlers: Vec::new(),
                indexed_handlers: Vec::new(),
                constructor: Some(id),
                state: TemplateState::Unconfigured,
            });
            template
        };
        record.instance_template = Some(template);
        record.state.touch();
        tracing::debug!(
            function = id.as_u32(),
            template = template.as_u32(),
            "linked instance template"
        );
        template
    }

    pub(crate) fn function_state(&self, id: FunctionTemplateId) -> TemplateState {
        self.functions.read()[id.index()].state
    }

    // --- object template record access ---

    pub(crate) fn object_constructor(&self, id: ObjectTemplateId) -> Option<FunctionTemplateId> {
        self.objects.read()[id.index()].constructor
    }

    pub(crate) fn object_field_count(&self, id: ObjectTemplateId) -> usize {
        self.objects.read()[id.index()].internal_field_count
    }

    pub(crate) fn object_state(&self, id: ObjectTemplateId) -> TemplateState {
        self.objects.read()[id.index()].state
    }

    pub(crate) fn object_snapshot(&self, id: ObjectTemplateId) -> ObjectTemplateRecord {
        self.objects.read()[id.index()].clone()
    }

    pub(crate) fn set_internal_field_count(&self, id: ObjectTemplateId, count: usize) {
        let mut objects = self.objects.write();
        let record = &mut objects[id.index()];
        if record.state.is_instantiated() {
            fatal(
                "ObjectTemplate::set_internal_field_count",
                "template is already instantiated; internal field count is frozen",
            );
        }
        if count > self.max_internal_fields {
            fatal(
                "ObjectTemplate::set_internal_field_count",
                &format!(
                    "internal field count {count} exceeds the isolate limit {}",
                    self.max_internal_fields
                ),
            );
        }
        record.internal_field_count = count;
        record.field_count_configured = true;
        record.state.touch();
    }

    pub(crate) fn add_named_handler(&self, id: ObjectTemplateId, handler: NamedPropertyHandler) {
        let mut objects = self.objects.write();
        let record = &mut objects[id.index()];
        if record.state.is_instantiated() {
            fatal(
                "ObjectTemplate::set_named_property_handler",
                "template is already instantiated and immutable",
            );
        }
        record.named_handlers.push(handler);
        record.state.touch();
    }

    pub(crate) fn add_indexed_handler(
        &self,
        id: ObjectTemplateId,
        handler: IndexedPropertyHandler,
    ) {
        let mut objects = self.objects.write();
        let record = &mut objects[id.index()];
        if record.state.is_instantiated() {
            fatal(
                "ObjectTemplate::set_indexed_property_handler",
                "template is already instantiated and immutable",
            );
        }
        record.indexed_handlers.push(handler);
        record.state.touch();
    }

    /// Freeze every template whose shape contributed to a materialized
    /// instance. No transition ever leaves `Instantiated`.
    pub(crate) fn mark_instantiated(
        &self,
        object_ids: &[ObjectTemplateId],
        function_ids: &[FunctionTemplateId],
    ) {
        {
            let mut functions = self.functions.write();
            for id in function_ids {
                functions[id.index()].state = TemplateState::Instantiated;
            }
        }
        let mut objects = self.objects.write();
        for id in object_ids {
            objects[id.index()].state = TemplateState::Instantiated;
        }
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("functions", &self.function_template_count())
            .field("objects", &self.object_template_count())
            .finish()
    }
}
