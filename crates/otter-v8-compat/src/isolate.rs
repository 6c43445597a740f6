//! Isolate: the per-VM owner of the template subsystem.
//!
//! Templates and the registry are isolate-scoped. The design assumes the
//! conventional single logical thread of execution per isolate; the locks
//! inside the registry and instances exist for interior mutability, not to
//! make concurrent mutation of one isolate from several threads a
//! supported pattern. Callers must not touch the same isolate from two
//! threads at once.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crate::gc::{GcTracker, NullGcTracker};
use crate::registry::TemplateRegistry;

/// Configuration limits for an isolate's template subsystem.
#[derive(Debug, Clone)]
pub struct IsolateConfig {
    /// Upper bound on `set_internal_field_count`; exceeding it is a fatal
    /// configuration error (count overflow).
    pub max_internal_fields: usize,
    /// Upper bound on the constructor-linkage chain walk; exceeding it
    /// means the linkage is cyclic and is fatal.
    pub max_template_chain_depth: usize,
}

impl Default for IsolateConfig {
    fn default() -> Self {
        Self {
            max_internal_fields: 1024,
            max_template_chain_depth: 64,
        }
    }
}

/// State shared between an isolate and the template handles it hands out.
pub(crate) struct IsolateShared {
    pub(crate) registry: TemplateRegistry,
    pub(crate) gc: Arc<dyn GcTracker>,
    pub(crate) next_instance_id: AtomicU64,
    pub(crate) config: IsolateConfig,
}

/// An isolate's template subsystem: the registry of live templates, the
/// collector hookup, and the instance-id source.
///
/// Template handles created from an isolate keep its shared state alive;
/// dropping the `Isolate` value does not invalidate outstanding handles.
pub struct Isolate {
    shared: Arc<IsolateShared>,
}

impl Isolate {
    /// Create an isolate without collector integration (a no-op tracker).
    pub fn new(config: IsolateConfig) -> Self {
        Self::with_gc_tracker(config, Arc::new(NullGcTracker))
    }

    /// Create an isolate wired to the external collector's bookkeeping.
    pub fn with_gc_tracker(config: IsolateConfig, gc: Arc<dyn GcTracker>) -> Self {
        Self {
            shared: Arc::new(IsolateShared {
                registry: TemplateRegistry::new(config.max_internal_fields),
                gc,
                next_instance_id: AtomicU64::new(0),
                config,
            }),
        }
    }

    /// The configured limits.
    pub fn config(&self) -> &IsolateConfig {
        &self.shared.config
    }

    /// The isolate's template registry.
    pub fn template_registry(&self) -> &TemplateRegistry {
        &self.shared.registry
    }

    /// The collector bookkeeping handle this isolate registers instances
    /// with.
    pub fn gc_tracker(&self) -> &Arc<dyn GcTracker> {
        &self.shared.gc
    }

    pub(crate) fn shared(&self) -> &Arc<IsolateShared> {
        &self.shared
    }
}

impl std::fmt::Debug for Isolate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Isolate")
            .field("registry", &self.shared.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = IsolateConfig::default();
        assert_eq!(config.max_internal_fields, 1024);
        assert_eq!(config.max_template_chain_depth, 64);
    }

    #[test]
    fn test_isolate_starts_empty() {
        let isolate = Isolate::new(IsolateConfig::default());
        assert_eq!(isolate.template_registry().function_template_count(), 0);
        assert_eq!(isolate.template_registry().object_template_count(), 0);
    }

    #[test]
    fn test_isolate_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Isolate>();
    }
}
