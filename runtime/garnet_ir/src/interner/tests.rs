use super::*;

#[test]
fn interning_is_idempotent() {
    let interner = StringInterner::new();
    let sep = interner.intern("sep");
    let out = interner.intern("out");
    assert_eq!(interner.intern("sep"), sep);
    assert_ne!(sep, out);
    assert_eq!(interner.lookup(sep), "sep");
    assert_eq!(interner.lookup(out), "out");
}

#[test]
fn empty_string_is_name_zero() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.lookup(Name::EMPTY), "");
}

#[test]
fn special_names_are_pre_interned() {
    let interner = StringInterner::new();
    for special in ["stdout", "~", "LOAD_PATH", "$", "default"] {
        assert!(interner.get(special).is_some(), "{special}");
    }
    assert_eq!(interner.len(), PRE_INTERNED.len() + 1);
    assert!(!interner.is_empty());
}

#[test]
fn get_never_interns() {
    let interner = StringInterner::new();
    let before = interner.len();
    assert!(interner.get("lazy_global").is_none());
    assert_eq!(interner.len(), before);
}

#[test]
fn concurrent_interning_agrees() {
    let interner = SharedInterner::new();
    let names: Vec<Name> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| s.spawn(|| interner.intern("shared")))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    assert!(names.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(interner.lookup(names[0]), "shared");
}

#[test]
fn shared_interner_debug_counts_names() {
    let interner = SharedInterner::new();
    let before = interner.len();
    interner.intern("fresh");
    assert_eq!(format!("{interner:?}"), format!("SharedInterner({} names)", before + 1));
}
