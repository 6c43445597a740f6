//! Instance materialization: turning a template into a live object.
//!
//! Materialization resolves the effective shape by walking the constructor
//! linkage chain, then runs the fallible pipeline against the target realm:
//! realm check, prototype lookup, host allocation, GC registration, field
//! store attachment, assembly. The GC registration is held by an RAII
//! guard the whole way, so a failure partway leaves nothing observable to
//! the collector. On success every template that contributed shape is
//! frozen.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{RealmError, RealmResult, fatal};
use crate::gc::{GcRegistration, InstanceId};
use crate::instance::Instance;
use crate::internal_fields::InternalFieldStore;
use crate::isolate::IsolateShared;
use crate::realm::Realm;
use crate::registry::{FunctionTemplateId, ObjectTemplateId};
use crate::template::{IndexedPropertyHandler, NamedPropertyHandler};

/// The effective shape of instances of a template, with the whole
/// constructor chain folded in.
///
/// Handlers accumulate root-to-leaf; a named handler re-registered at a
/// more derived level replaces every shallower registration for that name.
/// The internal field count is taken from the most derived template that
/// explicitly configured one: field storage tracks the most specific
/// layout, it is not additive across the chain.
pub struct ResolvedShape {
    /// Number of internal field slots instances receive.
    pub internal_field_count: usize,
    /// Effective named handlers, root-to-leaf, duplicates resolved.
    pub named_handlers: Vec<NamedPropertyHandler>,
    /// Effective indexed handlers, root-to-leaf, in registration order.
    pub indexed_handlers: Vec<IndexedPropertyHandler>,
    /// The leaf template's backing constructor, if any.
    pub constructor: Option<FunctionTemplateId>,
    /// Object templates that contributed shape, root-to-leaf.
    object_chain: SmallVec<[ObjectTemplateId; 8]>,
    /// Function templates on the constructor chain, root-to-leaf.
    function_chain: SmallVec<[FunctionTemplateId; 8]>,
}

impl ResolvedShape {
    /// Object templates that contributed shape, root-to-leaf (the leaf
    /// template is always last).
    pub fn contributing_templates(&self) -> &[ObjectTemplateId] {
        &self.object_chain
    }

    /// Length of the constructor chain that was walked.
    pub fn chain_depth(&self) -> usize {
        self.function_chain.len()
    }
}

/// Walk the constructor linkage from `leaf` to its root ancestor and fold
/// the chain into a [`ResolvedShape`].
///
/// The walk is bounded by the isolate's `max_template_chain_depth`;
/// exceeding the bound means the linkage is cyclic (or absurdly deep) and
/// is fatal either way.
pub(crate) fn resolve_shape(shared: &Arc<IsolateShared>, leaf: ObjectTemplateId) -> ResolvedShape {
    let registry = &shared.registry;
    let max_depth = shared.config.max_template_chain_depth;

    // Collect leaf-to-root, merge root-to-leaf.
    let mut object_chain: SmallVec<[ObjectTemplateId; 8]> = SmallVec::new();
    object_chain.push(leaf);
    let mut function_chain: SmallVec<[FunctionTemplateId; 8]> = SmallVec::new();

    let constructor = registry.object_constructor(leaf);
    let mut cursor = constructor;
    while let Some(function) = cursor {
        if function_chain.len() >= max_depth {
            fatal(
                "ObjectTemplate::new_instance",
                &format!(
                    "constructor linkage exceeds chain depth {max_depth}: linkage is cyclic"
                ),
            );
        }
        function_chain.push(function);
        if let Some(template) = registry.instance_template_id(function) {
            if !object_chain.contains(&template) {
                object_chain.push(template);
            }
        }
        cursor = registry.parent_of(function);
    }
    object_chain.reverse();
    function_chain.reverse();

    let mut internal_field_count = 0;
    let mut named_levels: Vec<Vec<NamedPropertyHandler>> = Vec::with_capacity(object_chain.len());
    let mut indexed_handlers = Vec::new();
    for id in &object_chain {
        let record = registry.object_snapshot(*id);
        if record.field_count_configured {
            internal_field_count = record.internal_field_count;
        }
        indexed_handlers.extend(record.indexed_handlers.iter().copied());
        named_levels.push(record.named_handlers);
    }

    // Leaf-wins: a name re-registered at a deeper level drops every
    // shallower registration for it; the winning level keeps its own
    // registration order, duplicates included.
    let mut deepest_level: FxHashMap<String, usize> = FxHashMap::default();
    for (level, handlers) in named_levels.iter().enumerate() {
        for handler in handlers {
            deepest_level.insert(handler.name.clone(), level);
        }
    }
    let mut named_handlers = Vec::new();
    for (level, handlers) in named_levels.into_iter().enumerate() {
        for handler in handlers {
            if deepest_level[&handler.name] == level {
                named_handlers.push(handler);
            }
        }
    }

    ResolvedShape {
        internal_field_count,
        named_handlers,
        indexed_handlers,
        constructor,
        object_chain,
        function_chain,
    }
}

/// Materialize one live instance of `template` inside `realm`.
pub(crate) fn materialize(
    shared: &Arc<IsolateShared>,
    template: ObjectTemplateId,
    realm: &dyn Realm,
) -> RealmResult<Instance> {
    let shape = resolve_shape(shared, template);

    if !realm.is_initialized() {
        tracing::trace!(
            template = template.as_u32(),
            "instantiation refused: realm not initialized"
        );
        return Err(RealmError::NotInitialized);
    }

    let prototype = realm.global_prototype_for(shape.constructor)?;
    let host = realm.allocate_object(prototype)?;

    let id = InstanceId::new(shared.next_instance_id.fetch_add(1, Ordering::Relaxed));
    // Registered before the field store is attached; if assembly does not
    // complete the guard's drop unregisters, and the collector never sees
    // a half-built instance.
    let registration = GcRegistration::new(shared.gc.clone(), id);
    let store = InternalFieldStore::new(shape.internal_field_count);

    shared
        .registry
        .mark_instantiated(&shape.object_chain, &shape.function_chain);

    let instance = Instance::assemble(host, template, store, registration);
    tracing::trace!(
        instance = id.as_raw(),
        template = template.as_u32(),
        fields = shape.internal_field_count,
        "materialized instance"
    );
    Ok(instance)
}
