use super::*;
use crate::slot::BindingSlot;
use garnet_value::MatchData;
use pretty_assertions::assert_eq;

fn chain() -> (SharedInterner, ScopeChain) {
    let interner = SharedInterner::new();
    let chain = ScopeChain::new(interner.clone());
    (interner, chain)
}

#[test]
fn starts_with_top_level_frame() {
    let (_, chain) = chain();
    assert_eq!(chain.depth(), 1);
    assert_eq!(chain.innermost_kind(), FrameKind::TopLevel);
    assert!(chain.current_match().is_some());
    assert!(chain.last_read_line().is_some());
}

#[test]
fn frames_pop_innermost_first() {
    let (_, mut chain) = chain();
    let outer = chain.push_frame(FrameKind::Method);
    let inner = chain.push_frame(FrameKind::Block);

    let err = chain.pop_frame(outer).unwrap_err();
    assert_eq!(
        err,
        BindingError::FrameMismatch {
            expected: inner.id(),
            got: outer.id(),
        }
    );
    assert_eq!(chain.depth(), 3);

    chain.pop_frame(inner).unwrap();
    chain.pop_frame(outer).unwrap();
    assert_eq!(chain.depth(), 1);
}

#[test]
fn stale_handles_never_match_a_later_frame() {
    let (_, mut chain) = chain();
    let mut seen = rustc_hash::FxHashSet::default();
    let first = chain.push_frame(FrameKind::Block);
    chain.pop_frame(first).unwrap();
    for _ in 0..1000 {
        let handle = chain.push_frame(FrameKind::Block);
        assert!(handle.id() != 0 && seen.insert(handle.id()));
        assert!(chain.pop_frame(first).is_err());
        chain.pop_frame(handle).unwrap();
    }
    assert_eq!(chain.depth(), 1);
}

#[test]
fn top_level_frame_cannot_be_popped() {
    let (_, mut chain) = chain();
    let root = FrameHandle { id: 0 };
    assert!(chain.pop_frame(root).is_err());
    assert_eq!(chain.depth(), 1);
}

#[test]
fn innermost_owner_wins_over_registry() {
    let (interner, mut chain) = chain();
    let registry = BindingRegistry::new(interner.clone());
    registry
        .define("b", BindingSlot::global("b", Some(Value::Int(0))).shared())
        .unwrap();
    let b = interner.intern("b");

    let _f2 = chain.push_frame(FrameKind::Method);
    let f1 = chain.push_frame(FrameKind::Block);
    chain.declare_scoped(b, None);
    let _f0 = chain.push_frame(FrameKind::Block);

    match chain.resolve_scoped(b, &registry) {
        Some(Binding::Scoped(cell)) => assert_eq!(cell.frame_id(), f1.id()),
        other => panic!("expected scoped binding, got {other:?}"),
    }
}

#[test]
fn unowned_names_fall_through_to_registry() {
    let (interner, chain) = chain();
    let registry = BindingRegistry::new(interner.clone());
    let slot = BindingSlot::global("g", None).shared();
    registry.define("g", slot.clone()).unwrap();

    let g = interner.intern("g");
    match chain.resolve_scoped(g, &registry) {
        Some(Binding::Global(found)) => assert!(std::sync::Arc::ptr_eq(&found, &slot)),
        other => panic!("expected global binding, got {other:?}"),
    }
    assert!(chain.resolve_scoped(interner.intern("missing"), &registry).is_none());
}

#[test]
fn block_frames_share_the_enclosing_match() {
    let (_, mut chain) = chain();
    let method = chain.push_frame(FrameKind::Method);
    let m = MatchData::new("abc", vec![Some(1..2)]).unwrap();
    chain.current_match().unwrap().set(Value::match_data(m)).unwrap();

    let block = chain.push_frame(FrameKind::Block);
    let cell = chain.current_match().unwrap();
    assert_eq!(cell.frame_id(), method.id());
    assert!(cell.get().as_match().is_some());

    chain.pop_frame(block).unwrap();
    chain.pop_frame(method).unwrap();
    assert_eq!(chain.current_match().unwrap().get(), Value::Nil);
}

#[test]
fn method_frames_own_fresh_specials() {
    let (_, mut chain) = chain();
    chain.last_read_line().unwrap().set(Value::string("outer")).unwrap();
    let _method = chain.push_frame(FrameKind::Method);
    assert_eq!(chain.last_read_line().unwrap().get(), Value::Nil);
}

#[test]
fn closures_resolve_against_captured_chain() {
    let (_, mut chain) = chain();

    let creator = chain.push_frame(FrameKind::Method);
    chain.last_read_line().unwrap().set(Value::string("from creator")).unwrap();
    let captured = chain.capture();
    chain.pop_frame(creator).unwrap();

    let caller = chain.push_frame(FrameKind::Method);
    chain.last_read_line().unwrap().set(Value::string("from caller")).unwrap();

    let closure = chain.push_closure_frame(&captured);
    assert_eq!(
        chain.last_read_line().unwrap().get(),
        Value::string("from creator")
    );
    chain.pop_frame(closure).unwrap();

    assert_eq!(
        chain.last_read_line().unwrap().get(),
        Value::string("from caller")
    );
    chain.pop_frame(caller).unwrap();
}

#[test]
fn frame_guard_pops_on_drop() {
    let (_, mut chain) = chain();
    {
        let mut guard = chain.scoped(FrameKind::Module);
        assert_eq!(guard.depth(), 2);
        let nested = guard.push_frame(FrameKind::Block);
        assert_eq!(guard.depth(), 3);
        guard.pop_frame(nested).unwrap();
    }
    assert_eq!(chain.depth(), 1);

    let depth = chain.with_frame(FrameKind::Method, |inner| inner.depth());
    assert_eq!(depth, 2);
    assert_eq!(chain.depth(), 1);
}

#[test]
fn current_match_rejects_non_match_values() {
    let (_, chain) = chain();
    let err = chain
        .current_match()
        .unwrap()
        .set(Value::string("nope"))
        .unwrap_err();
    assert!(matches!(err, BindingError::TypeMismatch { .. }));
    chain.current_match().unwrap().set(Value::Nil).unwrap();
}

#[test]
fn redeclaring_keeps_value() {
    let (interner, mut chain) = chain();
    let x = interner.intern("x");
    chain.declare_scoped(x, None);
    chain.owner_of(x).unwrap().set(Value::Int(3)).unwrap();
    chain.declare_scoped(x, Some(ValueShape::INT));
    assert_eq!(chain.owner_of(x).unwrap().get(), Value::Int(3));
    assert!(chain.owner_of(x).unwrap().set(Value::string("s")).is_err());
}
