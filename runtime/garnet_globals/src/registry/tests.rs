use super::*;
use crate::scope::ScopeChain;
use crate::slot::StorageKind;
use crate::streams::StandardStreams;
use crate::thread::ThreadSpecials;
use garnet_value::{buffer_stream, Value};
use pretty_assertions::assert_eq;

fn registry() -> BindingRegistry {
    BindingRegistry::with_builtins(SharedInterner::new(), BuiltinGlobals::default())
}

#[test]
fn lookup_returns_same_slot_until_redefined() {
    let registry = BindingRegistry::new(SharedInterner::new());
    let key = registry
        .define("$sep", BindingSlot::global("sep", Some(Value::string(","))).shared())
        .unwrap();

    let first = registry.lookup(key).unwrap();
    let second = registry.lookup(key).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    registry
        .define("sep", BindingSlot::read_only("sep", Value::string(";")).shared())
        .unwrap();
    let replaced = registry.lookup(key).unwrap();
    assert!(!Arc::ptr_eq(&first, &replaced));
    assert_eq!(replaced.storage_kind(), StorageKind::ReadOnly);
}

#[test]
fn lookup_never_creates() {
    let registry = BindingRegistry::new(SharedInterner::new());
    assert!(registry.lookup_str("ghost").is_none());
    assert!(registry.is_empty());
}

#[test]
fn define_rejects_invalid_names() {
    let registry = BindingRegistry::new(SharedInterner::new());
    let err = registry
        .define("not valid", BindingSlot::global("x", None).shared())
        .unwrap_err();
    assert_eq!(
        err,
        BindingError::InvalidName {
            name: "not valid".into()
        }
    );
    assert!(registry.resolve_or_create_user_global("$").is_err());
}

#[test]
fn user_globals_are_created_once() {
    let registry = BindingRegistry::new(SharedInterner::new());
    let a = registry.resolve_or_create_user_global("$counter").unwrap();
    let b = registry.resolve_or_create_user_global("counter").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.origin(), SlotOrigin::User);
    assert_eq!(a.storage_kind(), StorageKind::Global);
    assert_eq!(registry.len(), 1);
}

#[test]
fn alias_shares_slot_and_creates_missing_target() {
    let registry = BindingRegistry::new(SharedInterner::new());
    let slot = registry.alias("new_name", "old_name").unwrap();
    let old = registry.lookup_str("old_name").unwrap();
    let new = registry.lookup_str("new_name").unwrap();
    assert!(Arc::ptr_eq(&slot, &old));
    assert!(Arc::ptr_eq(&old, &new));

    assert!(registry.delete("old_name"));
    assert!(!registry.delete("old_name"));
    assert!(registry.lookup_str("new_name").is_some());
}

#[test]
fn builtin_aliases_are_installed() {
    let registry = registry();
    let stdout = registry.lookup_str("stdout").unwrap();
    let gt = registry.lookup_str(">").unwrap();
    let defout = registry.lookup_str("$defout").unwrap();
    assert!(Arc::ptr_eq(&stdout, &gt));
    assert!(Arc::ptr_eq(&stdout, &defout));
    assert_eq!(stdout.storage_kind(), StorageKind::Computed);
    assert_eq!(
        registry.lookup_str("LOAD_PATH").unwrap().storage_kind(),
        StorageKind::ReadOnly
    );
}

#[test]
fn enumerate_reflects_live_state() {
    let registry = registry();
    let streams = StandardStreams::with_streams(buffer_stream(), buffer_stream(), buffer_stream());
    let mut thread = ThreadSpecials::default();
    let chain = ScopeChain::new(registry.interner().clone());

    let user = registry.resolve_or_create_user_global("late").unwrap();
    let names = registry.enumerate_defined(&SlotContext {
        streams: &streams,
        thread: &mut thread,
        scope: &chain,
    });
    assert!(!names.contains(&"late"));
    assert!(names.contains(&"stdout"));
    assert!(names.contains(&"~"));
    assert!(!names.contains(&"&"));
    assert!(!names.contains(&"1"));

    let mut cx = SlotContext {
        streams: &streams,
        thread: &mut thread,
        scope: &chain,
    };
    user.set(&mut cx, Value::Int(1)).unwrap();
    let names = registry.enumerate_defined(&cx);
    assert!(names.contains(&"late"));
}

#[test]
fn reset_drops_user_slots_and_restores_builtins() {
    let registry = registry();
    let builtin_count = registry.len();
    let before = registry.lookup_str("/").unwrap();

    registry.resolve_or_create_user_global("scratch").unwrap();
    registry
        .define("host_value", BindingSlot::global("host_value", None).with_origin(SlotOrigin::Host).shared())
        .unwrap();
    registry
        .define("DEBUG", BindingSlot::read_only("DEBUG", Value::Bool(true)).shared())
        .unwrap();

    registry.reset_user_globals();

    assert!(registry.lookup_str("scratch").is_none());
    assert!(registry.lookup_str("host_value").is_some());
    assert_eq!(registry.len(), builtin_count + 1);
    assert_eq!(
        registry.lookup_str("DEBUG").unwrap().storage_kind(),
        StorageKind::Global
    );
    let after = registry.lookup_str("/").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
}

#[test]
fn concurrent_creation_yields_one_slot() {
    let registry = Arc::new(BindingRegistry::new(SharedInterner::new()));
    let slots: Vec<SlotRef> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                s.spawn(move || registry.resolve_or_create_user_global("shared").unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(slots.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(registry.len(), 1);
}
