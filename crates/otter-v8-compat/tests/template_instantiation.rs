//! Template instantiation and internal field behavior.
//!
//! Covers the embedder-visible contract of `ObjectTemplate::new_instance`
//! and the per-instance internal field store: slot counts, initialization,
//! round-trips, aliasing, freeze-on-first-use, and the fatal out-of-range
//! contract.

mod common;

use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};

use common::{RecordingGc, TestRealm};
use otter_v8_compat::{
    Instance, InternalField, Isolate, IsolateConfig, NativeHandle, ObjectTemplate, RealmError,
    TemplateState,
};

fn handle(raw: usize) -> NativeHandle {
    NativeHandle::from_ptr(raw as *mut c_void)
}

fn noop(_: &Instance) {}

#[test]
fn instances_get_exactly_the_configured_slot_count_all_empty() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(5);

    let realm = TestRealm::new();
    let instance = template.new_instance(&realm).unwrap();

    assert_eq!(instance.internal_field_count(), 5);
    for index in 0..5 {
        assert_eq!(instance.get_internal_field(index), InternalField::Empty);
    }
}

#[test]
fn default_field_count_is_zero() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    let instance = template.new_instance(&TestRealm::new()).unwrap();
    assert_eq!(instance.internal_field_count(), 0);
}

#[test]
fn set_get_roundtrip_for_every_valid_index() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(8);
    let instance = template.new_instance(&TestRealm::new()).unwrap();

    for index in 0..8 {
        let value = handle(0x1000 + index);
        instance.set_internal_field(index, value);
        assert_eq!(instance.get_internal_field(index), InternalField::Native(value));
    }
}

#[test]
fn late_field_count_mutation_is_fatal_and_leaves_instances_untouched() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(2);
    let instance = template.new_instance(&TestRealm::new()).unwrap();
    instance.set_internal_field(1, handle(0x42));

    let result = catch_unwind(AssertUnwindSafe(|| template.set_internal_field_count(5)));
    assert!(result.is_err(), "late mutation must be fatal");

    // The already-created instance keeps its layout and contents.
    assert_eq!(instance.internal_field_count(), 2);
    assert_eq!(instance.get_internal_field(1), InternalField::Native(handle(0x42)));
    assert_eq!(template.internal_field_count(), 2);
}

#[test]
#[should_panic(expected = "out of range")]
fn index_equal_to_count_is_fatal() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(3);
    let instance = template.new_instance(&TestRealm::new()).unwrap();
    let _ = instance.get_internal_field(3);
}

#[test]
#[should_panic(expected = "out of range")]
fn wrapped_negative_index_is_fatal() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(3);
    let instance = template.new_instance(&TestRealm::new()).unwrap();
    instance.set_internal_field(usize::MAX, handle(0x1));
}

#[test]
fn two_instances_share_a_template_but_not_field_storage() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(2);
    let realm = TestRealm::new();

    let first = template.new_instance(&realm).unwrap();
    let second = template.new_instance(&realm).unwrap();
    assert_ne!(first.host_object(), second.host_object());

    first.set_internal_field(0, handle(0xa));
    second.set_internal_field(0, handle(0xb));
    first.set_internal_field(1, handle(0xc));

    assert_eq!(first.get_internal_field(0), InternalField::Native(handle(0xa)));
    assert_eq!(second.get_internal_field(0), InternalField::Native(handle(0xb)));
    assert_eq!(second.get_internal_field(1), InternalField::Empty);
}

#[test]
fn uninitialized_realm_is_a_realm_error_and_nothing_reaches_the_collector() {
    let gc = RecordingGc::shared();
    let isolate = Isolate::with_gc_tracker(IsolateConfig::default(), gc.clone());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(1);

    let realm = TestRealm::uninitialized();
    let result = template.new_instance(&realm);
    assert!(matches!(result, Err(RealmError::NotInitialized)));
    assert!(gc.registered().is_empty());

    // A failed instantiation does not freeze the template.
    assert_eq!(template.state(), TemplateState::Configured);
}

#[test]
fn realm_errors_are_recoverable_by_retrying() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(1);

    let realm = TestRealm::uninitialized();
    assert!(template.new_instance(&realm).is_err());

    realm.set_initialized(true);
    let instance = template.new_instance(&realm).unwrap();
    assert_eq!(instance.internal_field_count(), 1);
    assert_eq!(template.state(), TemplateState::Instantiated);
}

#[test]
fn allocation_failure_registers_nothing() {
    let gc = RecordingGc::shared();
    let isolate = Isolate::with_gc_tracker(IsolateConfig::default(), gc.clone());
    let template = ObjectTemplate::new(&isolate, None);

    let realm = TestRealm::new();
    realm.fail_next_allocations(true);
    let result = template.new_instance(&realm);
    assert!(matches!(result, Err(RealmError::Allocation(_))));
    assert_eq!(gc.live_count(), 0);
    assert!(gc.registered().is_empty());
}

#[test]
fn instance_lifetime_brackets_collector_registration() {
    let gc = RecordingGc::shared();
    let isolate = Isolate::with_gc_tracker(IsolateConfig::default(), gc.clone());
    let template = ObjectTemplate::new(&isolate, None);
    let realm = TestRealm::new();

    let instance = template.new_instance(&realm).unwrap();
    let id = instance.id();
    assert_eq!(gc.registered(), vec![id]);
    assert_eq!(gc.live_count(), 1);

    // Clones share the registration; only the last drop unregisters.
    let alias = instance.clone();
    drop(instance);
    assert_eq!(gc.live_count(), 1);
    drop(alias);
    assert_eq!(gc.unregistered(), vec![id]);
    assert_eq!(gc.live_count(), 0);
}

#[test]
fn gc_visibility_is_negotiated_per_slot() {
    let gc = RecordingGc::shared();
    let isolate = Isolate::with_gc_tracker(IsolateConfig::default(), gc.clone());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(2);

    let instance = template.new_instance(&TestRealm::new()).unwrap();
    instance.set_internal_field(1, handle(0x99));
    instance.mark_gc_visible(1);

    assert_eq!(gc.marked(), vec![(instance.id(), 1)]);
    assert_eq!(
        instance.get_internal_field(1),
        InternalField::GcVisible(handle(0x99))
    );

    // Later writes stay visible to the collector.
    instance.set_internal_field(1, handle(0x77));
    assert_eq!(
        instance.get_internal_field(1),
        InternalField::GcVisible(handle(0x77))
    );
}

#[test]
#[should_panic(expected = "is empty")]
fn marking_an_empty_slot_gc_visible_is_fatal() {
    let isolate = Isolate::new(IsolateConfig::default());
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(1);
    let instance = template.new_instance(&TestRealm::new()).unwrap();
    instance.mark_gc_visible(0);
}

#[test]
#[should_panic(expected = "exceeds the isolate limit")]
fn field_count_overflow_is_a_fatal_configuration_error() {
    let isolate = Isolate::new(IsolateConfig {
        max_internal_fields: 16,
        ..IsolateConfig::default()
    });
    let template = ObjectTemplate::new(&isolate, None);
    template.set_internal_field_count(17);
}

#[test]
fn construct_callback_is_kept_for_the_dispatcher() {
    let isolate = Isolate::new(IsolateConfig::default());
    let function = otter_v8_compat::FunctionTemplate::new(&isolate, noop);
    assert_eq!(function.construct_callback() as usize, noop as usize);
}
