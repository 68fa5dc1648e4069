use super::*;
use garnet_globals::BindingError;
use garnet_model::ModelError;
use garnet_value::{buffer_stream, Value};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

fn context() -> RuntimeContext {
    RuntimeContext::with_streams(
        RuntimeConfig::new()
            .with_program_name("app.gt")
            .with_argv(["a", "b"])
            .with_load_path(["lib"]),
        StandardStreams::with_streams(buffer_stream(), buffer_stream(), buffer_stream()),
    )
}

fn property(model: &str, name: &str, type_name: &str, options: &[(&str, Value)]) -> Operation {
    Operation::DeclareProperty {
        model: model.into(),
        name: name.into(),
        type_name: type_name.into(),
        options: options
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect::<FxHashMap<_, _>>(),
    }
}

#[test]
fn config_seeds_builtins() {
    let context = context();
    let mut state = context.new_thread();
    let globals = context.globals();
    assert_eq!(globals.read(&mut state, "$0").unwrap(), Value::string("app.gt"));
    assert_eq!(
        globals.read(&mut state, "$*").unwrap(),
        Value::string_array(["a", "b"])
    );
    assert_eq!(
        globals.read(&mut state, "$LOAD_PATH").unwrap(),
        Value::string_array(["lib"])
    );
    assert_eq!(globals.read(&mut state, "$DEBUG").unwrap(), Value::Bool(false));
}

#[test]
fn global_operations() {
    let context = context();
    let mut state = context.new_thread();

    context
        .apply(
            &mut state,
            Operation::DefineGlobal {
                name: "$answer".into(),
                value: Value::Int(42),
            },
        )
        .unwrap();
    context
        .apply(
            &mut state,
            Operation::AliasGlobal {
                new: "$reply".into(),
                old: "$answer".into(),
            },
        )
        .unwrap();
    let value = context
        .apply(&mut state, Operation::ReadGlobal { name: "$reply".into() })
        .unwrap()
        .into_value();
    assert_eq!(value, Some(Value::Int(42)));

    let unset = context
        .apply(&mut state, Operation::ReadGlobal { name: "$nothing".into() })
        .unwrap()
        .into_value();
    assert_eq!(unset, Some(Value::Nil));

    let err = context
        .apply(
            &mut state,
            Operation::DefineGlobal {
                name: "$/".into(),
                value: Value::Int(1),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Binding(BindingError::TypeMismatch { .. })
    ));
}

#[test]
fn model_operations() {
    let context = context();
    let mut state = context.new_thread();

    let animal = context
        .apply(
            &mut state,
            Operation::DeclareModel {
                name: "Animal".into(),
                backend: None,
            },
        )
        .unwrap()
        .into_model()
        .unwrap();
    context
        .apply(&mut state, property("Animal", "id", "Serial", &[]))
        .unwrap();
    context
        .apply(
            &mut state,
            property("Animal", "name", "String", &[("length", Value::Int(20))]),
        )
        .unwrap();
    let dog = context
        .apply(
            &mut state,
            Operation::DeclareSubtype {
                name: "Dog".into(),
                parent: "Animal".into(),
            },
        )
        .unwrap()
        .into_model()
        .unwrap();

    let backend = context.catalog().default_backend();
    assert_eq!(dog.properties(backend).labels(), vec!["id", "name"]);
    assert_eq!(
        dog.property(backend, "name").unwrap().read().length(),
        Some(20)
    );
    assert!(Arc::ptr_eq(&dog.base_model().unwrap(), &animal));

    let removed = context
        .apply(&mut state, Operation::RemoveModel { name: "Dog".into() })
        .unwrap();
    assert!(matches!(removed, Outcome::Removed(true)));
    let again = context
        .apply(&mut state, Operation::RemoveModel { name: "Dog".into() })
        .unwrap();
    assert!(matches!(again, Outcome::Removed(false)));
}

#[test]
fn model_operation_errors() {
    let context = context();
    let mut state = context.new_thread();

    let err = context
        .apply(&mut state, property("Ghost", "name", "String", &[]))
        .unwrap_err();
    assert_eq!(err, RuntimeError::UnknownModel { name: "Ghost".into() });

    context
        .apply(
            &mut state,
            Operation::DeclareModel {
                name: "Animal".into(),
                backend: None,
            },
        )
        .unwrap();
    let err = context
        .apply(&mut state, property("Animal", "name", "Widget", &[]))
        .unwrap_err();
    assert_eq!(err, RuntimeError::UnknownType { name: "Widget".into() });

    let err = context
        .apply(
            &mut state,
            property("Animal", "name", "String", &[("nullable", Value::Int(1))]),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Model(ModelError::InvalidOption { .. })
    ));

    let err = context
        .apply(
            &mut state,
            Operation::DeclareModel {
                name: "Cat".into(),
                backend: Some("mongo".into()),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Model(ModelError::UnknownBackend { name: "mongo".into() })
    );
}

#[test]
fn teardown_restores_pristine_state() {
    let context = context();
    let mut state = context.new_thread();
    context
        .apply(
            &mut state,
            Operation::DefineGlobal {
                name: "$leftover".into(),
                value: Value::Int(1),
            },
        )
        .unwrap();
    context
        .apply(
            &mut state,
            Operation::DeclareModel {
                name: "Animal".into(),
                backend: None,
            },
        )
        .unwrap();

    context.teardown();
    assert!(context.models().is_empty());
    let mut fresh = context.new_thread();
    assert!(!context.globals().is_defined(&mut fresh, "$leftover"));
    assert_eq!(
        context.globals().read(&mut fresh, "$0").unwrap(),
        Value::string("app.gt")
    );
}
