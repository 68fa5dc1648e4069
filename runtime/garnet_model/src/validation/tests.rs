use super::*;
use pretty_assertions::assert_eq;

fn record(entries: &[(&str, Value)]) -> Record {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

#[test]
fn presence_rejects_nil_missing_and_empty() {
    let rule = ValidationRule::new("name", RuleKind::Presence);
    assert!(rule.check(&record(&[("name", Value::string("Rex"))])).is_none());
    assert!(rule.check(&record(&[("name", Value::string(""))])).is_some());
    assert!(rule.check(&record(&[("name", Value::Nil)])).is_some());
    let failure = rule.check(&Record::default()).unwrap();
    assert_eq!(failure.to_string(), "name must not be blank");
}

#[test]
fn length_counts_characters() {
    let rule = ValidationRule::new("code", RuleKind::Length { max: 3 });
    assert!(rule.check(&record(&[("code", Value::string("äöü"))])).is_none());
    assert_eq!(
        rule.check(&record(&[("code", Value::string("abcd"))])).unwrap().message,
        "code must be at most 3 characters long"
    );
}

#[test]
fn within_ignores_nil() {
    let rule = ValidationRule::new(
        "size",
        RuleKind::Within(vec![Value::string("S"), Value::string("M")]),
    );
    assert!(rule.check(&Record::default()).is_none());
    assert!(rule.check(&record(&[("size", Value::string("M"))])).is_none());
    assert_eq!(
        rule.check(&record(&[("size", Value::string("XL"))])).unwrap().message,
        "size must be one of \"S\", \"M\""
    );
}

#[test]
fn formats() {
    assert!(FormatRule::EmailAddress.matches("rex@example.com"));
    assert!(!FormatRule::EmailAddress.matches("rex@example"));
    assert!(!FormatRule::EmailAddress.matches("rex example@x.com"));
    assert!(FormatRule::Url.matches("https://example.com/a"));
    assert!(!FormatRule::Url.matches("ftp://example.com"));
    assert!(FormatRule::Digits.matches("0042"));
    assert!(!FormatRule::Digits.matches(""));
    assert!(!FormatRule::EmailAddress.matches("@@"));
    assert!(!FormatRule::EmailAddress.matches("rex@@example.com"));
    assert!(!FormatRule::EmailAddress.matches("rex@example..com"));
    assert_eq!(FormatRule::parse(":email_address"), Some(FormatRule::EmailAddress));
}

#[test]
fn custom_pattern_format() {
    let rule = FormatRule::pattern(r"^[A-Z]{3}-\d{4}$").unwrap();
    assert!(rule.matches("ABC-1234"));
    assert!(!rule.matches("abc-1234"));
    assert_eq!(rule, FormatRule::pattern(r"^[A-Z]{3}-\d{4}$").unwrap());
    assert_ne!(rule, FormatRule::Digits);
    assert!(FormatRule::pattern("(unclosed").is_err());

    let rules = vec![ValidationRule::new("sku", RuleKind::Format(rule))];
    assert!(validate(&rules, &record(&[("sku", Value::string("XYZ-0001"))])).is_empty());
    assert_eq!(
        validate(&rules, &record(&[("sku", Value::string("xyz"))]))[0].message,
        "sku has an invalid format"
    );
}

#[test]
fn validate_reports_in_rule_order() {
    let rules = vec![
        ValidationRule::new("name", RuleKind::Presence),
        ValidationRule::new("zip", RuleKind::Format(FormatRule::Digits)),
    ];
    let failures = validate(&rules, &record(&[("zip", Value::string("12a"))]));
    let properties: Vec<&str> = failures.iter().map(|f| f.property.as_str()).collect();
    assert_eq!(properties, vec!["name", "zip"]);
}
