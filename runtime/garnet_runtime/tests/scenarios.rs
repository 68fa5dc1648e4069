#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test code, panics give clear failure messages"
)]

//! End-to-end behavior of the binding and model layers through one
//! runtime context.

use std::sync::Arc;

use garnet_globals::{BindingError, BindingSlot, FrameKind, StandardStreams, StorageKind};
use garnet_model::{PropertyFlags, PropertyOptions, PropertyType};
use garnet_runtime::{Operation, RuntimeConfig, RuntimeContext};
use garnet_value::{buffer_stream, Value};
use pretty_assertions::assert_eq;

fn context() -> RuntimeContext {
    garnet_runtime::init_tracing();
    RuntimeContext::with_streams(
        RuntimeConfig::new(),
        StandardStreams::with_streams(buffer_stream(), buffer_stream(), buffer_stream()),
    )
}

#[test]
fn read_only_redefinition_freezes_separator() {
    let context = context();
    let globals = context.globals();
    let mut state = context.new_thread();

    globals.define_global("$sep", Value::string(",")).unwrap();
    assert_eq!(globals.get(&mut state, "$sep").unwrap(), Value::string(","));

    globals.define_read_only("$sep", Value::string(";")).unwrap();
    assert_eq!(
        globals.set(&mut state, "$sep", Value::string(",")).unwrap_err(),
        BindingError::ReadOnlyViolation { name: "sep".into() }
    );
    assert_eq!(globals.get(&mut state, "$sep").unwrap(), Value::string(";"));
}

#[test]
fn lookup_identity_is_stable_until_redefinition() {
    let context = context();
    let registry = context.globals().registry();
    context.globals().define_global("$counter", Value::Int(0)).unwrap();

    let first = registry.lookup_str("counter").unwrap();
    for _ in 0..3 {
        assert!(Arc::ptr_eq(&first, &registry.lookup_str("counter").unwrap()));
    }
    context.globals().define_global("$counter", Value::Int(1)).unwrap();
    assert!(!Arc::ptr_eq(&first, &registry.lookup_str("counter").unwrap()));
}

#[test]
fn read_only_slots_reject_every_write() {
    let context = context();
    let globals = context.globals();
    let mut state = context.new_thread();

    for name in ["$*", "$$", "$LOAD_PATH", "$FILENAME"] {
        let slot = globals.registry().lookup_str(name).unwrap();
        assert_eq!(slot.storage_kind(), StorageKind::ReadOnly);
        let before = globals.get(&mut state, name).unwrap();
        let err = globals.set(&mut state, name, Value::Int(0)).unwrap_err();
        assert!(matches!(err, BindingError::ReadOnlyViolation { .. }), "{name}: {err}");
        assert_eq!(globals.get(&mut state, name).unwrap(), before);
    }
}

#[test]
fn scoped_binding_wins_over_registry() {
    let context = context();
    let globals = context.globals();
    let mut state = context.new_thread();
    globals.define_global("$b", Value::string("global")).unwrap();

    let f2 = state.chain.push_frame(FrameKind::Method);
    let f1 = state.chain.push_frame(FrameKind::Method);
    let b = context.interner().intern("b");
    state.chain.declare_scoped(b, None);
    globals.set(&mut state, "$b", Value::string("frame")).unwrap();
    let f0 = state.chain.push_frame(FrameKind::Block);

    assert_eq!(globals.get(&mut state, "$b").unwrap(), Value::string("frame"));

    state.chain.pop_frame(f0).unwrap();
    state.chain.pop_frame(f1).unwrap();
    assert_eq!(globals.get(&mut state, "$b").unwrap(), Value::string("global"));
    state.chain.pop_frame(f2).unwrap();
}

#[test]
fn subtype_properties_are_distinct() {
    let context = context();
    let models = context.models();
    let backend = context.catalog().default_backend();

    let animal = models.declare("Animal").unwrap();
    animal
        .declare_property("name", PropertyType::String, PropertyOptions::new())
        .unwrap();
    let dog = models.derive("Dog", &animal).unwrap();

    let dog_name = dog.property(backend, "name").unwrap();
    assert!(!dog_name.same(&animal.property(backend, "name").unwrap()));

    dog.declare_property("sound", PropertyType::String, PropertyOptions::new())
        .unwrap();
    assert!(animal.properties(backend).find("sound").is_none());
}

#[test]
fn duplicated_properties_do_not_alias() {
    let context = context();
    let models = context.models();
    let backend = context.catalog().default_backend();

    let person = models.declare("Person").unwrap();
    person
        .declare_property("age", PropertyType::Integer, PropertyOptions::new())
        .unwrap();
    let student = models.derive("Student", &person).unwrap();

    student
        .update_property(backend, "age", |age| age.set_flag(PropertyFlags::INDEX, true))
        .unwrap();
    person
        .update_property(backend, "age", |age| age.set_flag(PropertyFlags::UNIQUE, true))
        .unwrap();

    let parent_flags = person.property(backend, "age").unwrap().read().flags();
    let child_flags = student.property(backend, "age").unwrap().read().flags();
    assert!(!parent_flags.contains(PropertyFlags::INDEX));
    assert!(!child_flags.contains(PropertyFlags::UNIQUE));
}

#[test]
fn removing_a_parent_keeps_its_subtypes() {
    let context = context();
    let models = context.models();
    let animal = models.declare("Animal").unwrap();
    models.derive("Dog", &animal).unwrap();

    let live: Vec<String> = models
        .enumerate_live()
        .iter()
        .map(|model| model.name().to_string())
        .collect();
    assert_eq!(live, vec!["Animal", "Dog"]);

    assert!(models.remove(&animal));
    let live: Vec<String> = models
        .enumerate_live()
        .iter()
        .map(|model| model.name().to_string())
        .collect();
    assert_eq!(live, vec!["Dog"]);
}

#[test]
fn teardown_leaves_no_residue() {
    let context = context();
    let mut state = context.new_thread();
    let backend = context.catalog().default_backend();

    context
        .globals()
        .define_host("$host_setting", BindingSlot::global("host_setting", Some(Value::Int(9))))
        .unwrap();
    context
        .apply(
            &mut state,
            Operation::DefineGlobal {
                name: "$user_setting".into(),
                value: Value::Int(1),
            },
        )
        .unwrap();
    let first = context.models().declare("Animal").unwrap();
    first
        .declare_property("name", PropertyType::String, PropertyOptions::new())
        .unwrap();

    context.teardown();

    let second = context.models().declare("Animal").unwrap();
    assert!(second.properties(backend).is_empty());
    assert!(second.validations().is_empty());
    assert!(second.children().is_empty());

    let mut fresh = context.new_thread();
    assert!(!context.globals().is_defined(&mut fresh, "$user_setting"));
    assert_eq!(
        context.globals().read(&mut fresh, "$host_setting").unwrap(),
        Value::Int(9)
    );
}

#[test]
fn print_honors_separators() {
    let stdout = buffer_stream();
    let context = RuntimeContext::with_streams(
        RuntimeConfig::new(),
        StandardStreams::with_streams(stdout.clone(), buffer_stream(), buffer_stream()),
    );
    let globals = context.globals();
    let mut state = context.new_thread();

    globals.set(&mut state, "$,", Value::string("-")).unwrap();
    globals.set(&mut state, "$\\", Value::string("\n")).unwrap();
    globals
        .print(&mut state, &[Value::Int(1), Value::string("two"), Value::Nil])
        .unwrap();
    assert_eq!(stdout.get_output(), "1-two-\n");
}
