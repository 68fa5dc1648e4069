use super::*;
use pretty_assertions::assert_eq;

#[test]
fn identifiers() {
    assert!(is_identifier("name"));
    assert!(is_identifier("_private"));
    assert!(is_identifier("age2"));
    assert!(!is_identifier(""));
    assert!(!is_identifier("2fast"));
    assert!(!is_identifier("has space"));
    assert!(!is_identifier("dash-ed"));
}

#[test]
fn global_names() {
    assert!(is_global_name("sep"));
    assert!(is_global_name("~"));
    assert!(is_global_name("/"));
    assert!(is_global_name("-w"));
    assert!(is_global_name("1"));
    assert!(is_global_name("12"));
    assert!(is_global_name("0"));
    assert!(!is_global_name(""));
    assert!(!is_global_name("01"));
    assert!(!is_global_name("a b"));
    assert!(!is_global_name("--"));
    assert!(!is_global_name("#"));
}

#[test]
fn sigil_is_optional() {
    assert_eq!(strip_sigil("$stdout"), "stdout");
    assert_eq!(strip_sigil("stdout"), "stdout");
}
