//! Validation rules attached to a model.

use std::fmt;
use std::sync::LazyLock;

use garnet_value::Value;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::property::{Property, PropertyType};

/// A record to validate: property label → value.
pub type Record = FxHashMap<String, Value>;

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| compile(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$"));
static URL: LazyLock<Regex> = LazyLock::new(|| compile(r"^https?://\S+$"));
static DIGITS: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9]+$"));

#[allow(clippy::expect_used, reason = "built-in patterns are literals")]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in format pattern must compile")
}

/// String formats a `Format` rule checks.
#[derive(Clone, Debug)]
pub enum FormatRule {
    EmailAddress,
    Url,
    Digits,
    /// User-supplied pattern. Unanchored: a match anywhere in the value
    /// passes, so anchor the pattern to constrain the whole value.
    Pattern(Regex),
}

impl FormatRule {
    /// A built-in format by name (`email_address`, `url`, `digits`), with or
    /// without a leading `:`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim_start_matches(':') {
            "email_address" => Some(FormatRule::EmailAddress),
            "url" => Some(FormatRule::Url),
            "digits" => Some(FormatRule::Digits),
            _ => None,
        }
    }

    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(FormatRule::Pattern)
    }

    fn regex(&self) -> &Regex {
        match self {
            FormatRule::EmailAddress => &EMAIL_ADDRESS,
            FormatRule::Url => &URL,
            FormatRule::Digits => &DIGITS,
            FormatRule::Pattern(regex) => regex,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex().is_match(text)
    }
}

impl PartialEq for FormatRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FormatRule::Pattern(a), FormatRule::Pattern(b)) => a.as_str() == b.as_str(),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for FormatRule {}

#[derive(Clone, Debug, PartialEq)]
pub enum RuleKind {
    /// Present, non-nil and not an empty string.
    Presence,
    /// String of at most `max` characters.
    Length { max: usize },
    /// One of the listed values.
    Within(Vec<Value>),
    Format(FormatRule),
}

/// One rule on one property.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationRule {
    pub property: String,
    pub kind: RuleKind,
}

/// A failed rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    pub property: String,
    pub message: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl ValidationRule {
    pub fn new(property: impl Into<String>, kind: RuleKind) -> Self {
        ValidationRule {
            property: property.into(),
            kind,
        }
    }

    /// Rules implied by a property's options: non-nullable non-serial
    /// properties must be present, strings are length-limited, and `set`
    /// and `format` options become `Within` and `Format` rules.
    pub fn for_property(property: &Property) -> Vec<ValidationRule> {
        let label = property.label();
        let mut rules = Vec::new();
        if !property.is_nullable() && !property.is_serial() {
            rules.push(ValidationRule::new(label, RuleKind::Presence));
        }
        if property.declared_type() == PropertyType::String {
            if let Some(max) = property.length() {
                rules.push(ValidationRule::new(label, RuleKind::Length { max }));
            }
        }
        if let Some(values) = property.within() {
            rules.push(ValidationRule::new(label, RuleKind::Within(values.to_vec())));
        }
        if let Some(format) = property.format() {
            rules.push(ValidationRule::new(label, RuleKind::Format(format.clone())));
        }
        rules
    }

    /// `None` when `record` satisfies the rule.
    pub fn check(&self, record: &Record) -> Option<ValidationFailure> {
        let value = record.get(&self.property).unwrap_or(&Value::Nil);
        let message = match &self.kind {
            RuleKind::Presence => {
                let blank = value.is_nil() || value.as_str().is_some_and(str::is_empty);
                blank.then(|| format!("{} must not be blank", self.property))
            }
            RuleKind::Length { max } => value
                .as_str()
                .filter(|text| text.chars().count() > *max)
                .map(|_| format!("{} must be at most {max} characters long", self.property)),
            RuleKind::Within(values) => (!value.is_nil() && !values.contains(value)).then(|| {
                let listed: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
                format!("{} must be one of {}", self.property, listed.join(", "))
            }),
            RuleKind::Format(rule) => value
                .as_str()
                .filter(|text| !rule.matches(text))
                .map(|_| format!("{} has an invalid format", self.property)),
        };
        message.map(|message| ValidationFailure {
            property: self.property.clone(),
            message,
        })
    }
}

/// Every failure of `rules` against `record`, in rule order.
pub fn validate(rules: &[ValidationRule], record: &Record) -> Vec<ValidationFailure> {
    rules.iter().filter_map(|rule| rule.check(record)).collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
