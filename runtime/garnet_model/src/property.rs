//! Properties and property sets.
//!
//! A [`Property`] is resolved from declared [`PropertyOptions`] once, at
//! declaration. Properties are shared as [`SharedProperty`] handles: the
//! per-backend sets of one model share handles, while a subtype always gets
//! its own duplicates.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use garnet_ir::Name;
use garnet_value::Value;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;

use crate::backend::Backend;
use crate::descriptor::ModelId;
use crate::errors::{invalid_option, ModelResult};
use crate::validation::FormatRule;

pub const DEFAULT_LENGTH: usize = 50;
pub const DEFAULT_PRECISION: i64 = 10;
pub const DEFAULT_DECIMAL_SCALE: i64 = 0;

/// Declared type of a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Boolean,
    String,
    Text,
    Float,
    Integer,
    Decimal,
    DateTime,
    Date,
    Time,
    Object,
    Class,
    Discriminator,
    Serial,
}

impl PropertyType {
    pub fn name(self) -> &'static str {
        match self {
            PropertyType::Boolean => "Boolean",
            PropertyType::String => "String",
            PropertyType::Text => "Text",
            PropertyType::Float => "Float",
            PropertyType::Integer => "Integer",
            PropertyType::Decimal => "Decimal",
            PropertyType::DateTime => "DateTime",
            PropertyType::Date => "Date",
            PropertyType::Time => "Time",
            PropertyType::Object => "Object",
            PropertyType::Class => "Class",
            PropertyType::Discriminator => "Discriminator",
            PropertyType::Serial => "Serial",
        }
    }

    /// Parse a type name as written by the front end.
    pub fn parse(name: &str) -> Option<Self> {
        let ty = match name {
            "Boolean" | "TrueClass" => PropertyType::Boolean,
            "String" => PropertyType::String,
            "Text" => PropertyType::Text,
            "Float" => PropertyType::Float,
            "Integer" | "Fixnum" => PropertyType::Integer,
            "Decimal" | "BigDecimal" => PropertyType::Decimal,
            "DateTime" => PropertyType::DateTime,
            "Date" => PropertyType::Date,
            "Time" => PropertyType::Time,
            "Object" => PropertyType::Object,
            "Class" => PropertyType::Class,
            "Discriminator" => PropertyType::Discriminator,
            "Serial" => PropertyType::Serial,
            _ => return None,
        };
        Some(ty)
    }

    /// Storage primitive the type maps to.
    pub fn primitive(self) -> PropertyType {
        match self {
            PropertyType::Text => PropertyType::String,
            PropertyType::Serial => PropertyType::Integer,
            PropertyType::Discriminator => PropertyType::Class,
            other => other,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Boolean property options after derivation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        const KEY = 1 << 0;
        const SERIAL = 1 << 1;
        const LAZY = 1 << 2;
        const NULLABLE = 1 << 3;
        const INDEX = 1 << 4;
        const UNIQUE_INDEX = 1 << 5;
        const UNIQUE = 1 << 6;
    }
}

/// Reader/writer visibility of a property accessor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim_start_matches(':') {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Options as declared. Unset fields take their derived defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyOptions {
    pub key: Option<bool>,
    pub serial: Option<bool>,
    pub lazy: Option<bool>,
    pub nullable: Option<bool>,
    pub index: bool,
    pub unique_index: bool,
    pub unique: Option<bool>,
    pub field: Option<String>,
    pub default: Option<Value>,
    pub length: Option<usize>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub reader: Option<Visibility>,
    pub writer: Option<Visibility>,
    /// Allowed values, checked by an auto-generated `Within` rule.
    pub set: Option<Vec<Value>>,
    pub format: Option<FormatRule>,
    /// Options this layer does not interpret.
    pub extra: FxHashMap<String, Value>,
}

impl PropertyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(mut self) -> Self {
        self.key = Some(true);
        self
    }

    #[must_use]
    pub fn serial(mut self) -> Self {
        self.serial = Some(true);
        self
    }

    #[must_use]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    #[must_use]
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = Some(true);
        self
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: i64) -> Self {
        self.precision = Some(precision);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: i64) -> Self {
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn accessor(mut self, visibility: Visibility) -> Self {
        self.reader = Some(visibility);
        self.writer = Some(visibility);
        self
    }

    #[must_use]
    pub fn within(mut self, values: Vec<Value>) -> Self {
        self.set = Some(values);
        self
    }

    #[must_use]
    pub fn format(mut self, rule: FormatRule) -> Self {
        self.format = Some(rule);
        self
    }

    /// Parse an option dictionary from the front end. Unknown keys are kept
    /// in `extra`.
    pub fn from_dictionary(property: &str, dictionary: &FxHashMap<String, Value>) -> ModelResult<Self> {
        let mut options = PropertyOptions::default();
        let mut accessor = None;
        for (key, value) in dictionary {
            let flag = || {
                value
                    .as_bool()
                    .ok_or_else(|| invalid_option(property, format!("{key} must be true or false")))
            };
            let int = || {
                value
                    .as_int()
                    .ok_or_else(|| invalid_option(property, format!("{key} must be an Integer")))
            };
            let visibility = || {
                value
                    .as_str()
                    .and_then(Visibility::parse)
                    .ok_or_else(|| invalid_option(property, "property visibility must be public, protected, or private"))
            };
            match key.as_str() {
                "key" => options.key = Some(flag()?),
                "serial" => options.serial = Some(flag()?),
                "lazy" => options.lazy = Some(flag()?),
                "nullable" => options.nullable = Some(flag()?),
                "index" => options.index = flag()?,
                "unique_index" => options.unique_index = flag()?,
                "unique" => options.unique = Some(flag()?),
                "field" => {
                    let field = value
                        .as_str()
                        .ok_or_else(|| invalid_option(property, "field must be a String"))?;
                    options.field = Some(field.to_string());
                }
                "default" => options.default = Some(value.clone()),
                "length" | "size" => {
                    let length = usize::try_from(int()?)
                        .map_err(|_| invalid_option(property, "length must not be negative"))?;
                    options.length = Some(length);
                }
                "precision" => options.precision = Some(int()?),
                "scale" => options.scale = Some(int()?),
                "reader" => options.reader = Some(visibility()?),
                "writer" => options.writer = Some(visibility()?),
                "accessor" => accessor = Some(visibility()?),
                "set" => {
                    let values = value
                        .as_array()
                        .ok_or_else(|| invalid_option(property, "set must be an Array"))?;
                    options.set = Some(values.to_vec());
                }
                "format" => {
                    let text = value
                        .as_str()
                        .ok_or_else(|| invalid_option(property, "format must be a String"))?;
                    let rule = match text.strip_prefix('/').and_then(|rest| rest.strip_suffix('/')) {
                        Some(pattern) => FormatRule::pattern(pattern).map_err(|err| {
                            invalid_option(property, format!("invalid format pattern: {err}"))
                        })?,
                        None => FormatRule::parse(text)
                            .ok_or_else(|| invalid_option(property, "unknown format"))?,
                    };
                    options.format = Some(rule);
                }
                _ => {
                    options.extra.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(visibility) = accessor {
            options.reader.get_or_insert(visibility);
            options.writer.get_or_insert(visibility);
        }
        Ok(options)
    }
}

/// A declared, typed attribute of one model.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    name: Name,
    label: &'static str,
    model: ModelId,
    declared_type: PropertyType,
    flags: PropertyFlags,
    field: Option<String>,
    default: Option<Value>,
    length: Option<usize>,
    precision: Option<i64>,
    scale: Option<i64>,
    reader: Visibility,
    writer: Visibility,
    within: Option<Vec<Value>>,
    format: Option<FormatRule>,
    extra: FxHashMap<String, Value>,
}

impl Property {
    /// Resolve declared options into a property.
    ///
    /// `serial` implies `key`; `nullable` defaults to `!key`; keys are never
    /// lazy. String-like types get a length, numeric types a precision and
    /// scale.
    pub fn resolve(
        name: Name,
        label: &'static str,
        model: ModelId,
        declared_type: PropertyType,
        options: PropertyOptions,
    ) -> ModelResult<Property> {
        let serial = options.serial.unwrap_or(declared_type == PropertyType::Serial);
        let key = options.key.unwrap_or(serial);
        let nullable = options.nullable.unwrap_or(!key);
        let lazy = options.lazy.unwrap_or(declared_type == PropertyType::Text) && !key;
        let unique = options.unique.unwrap_or(serial || key);

        let mut flags = PropertyFlags::empty();
        flags.set(PropertyFlags::KEY, key);
        flags.set(PropertyFlags::SERIAL, serial);
        flags.set(PropertyFlags::LAZY, lazy);
        flags.set(PropertyFlags::NULLABLE, nullable);
        flags.set(PropertyFlags::INDEX, options.index);
        flags.set(PropertyFlags::UNIQUE_INDEX, options.unique_index);
        flags.set(PropertyFlags::UNIQUE, unique);

        let primitive = declared_type.primitive();
        let mut length = None;
        let mut precision = None;
        let mut scale = None;
        match primitive {
            PropertyType::String | PropertyType::Class => {
                length = Some(options.length.unwrap_or(DEFAULT_LENGTH));
            }
            PropertyType::Decimal | PropertyType::Float => {
                let p = options.precision.unwrap_or(DEFAULT_PRECISION);
                let s = match primitive {
                    PropertyType::Decimal => Some(options.scale.unwrap_or(DEFAULT_DECIMAL_SCALE)),
                    _ => options.scale,
                };
                if p <= 0 {
                    return Err(invalid_option(
                        label,
                        format!("precision must be greater than 0, but was {p}"),
                    ));
                }
                if let Some(s) = s {
                    if s < 0 {
                        return Err(invalid_option(
                            label,
                            format!("scale must be equal to or greater than 0, but was {s}"),
                        ));
                    }
                    if p < s {
                        return Err(invalid_option(
                            label,
                            format!("precision must be equal to or greater than scale, but was {p} and scale was {s}"),
                        ));
                    }
                }
                precision = Some(p);
                scale = s;
            }
            _ => {}
        }

        Ok(Property {
            name,
            label,
            model,
            declared_type,
            flags,
            field: options.field,
            default: options.default,
            length,
            precision,
            scale,
            reader: options.reader.unwrap_or_default(),
            writer: options.writer.unwrap_or_default(),
            within: options.set,
            format: options.format,
            extra: options.extra,
        })
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Owning model.
    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn declared_type(&self) -> PropertyType {
        self.declared_type
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn is_key(&self) -> bool {
        self.flags.contains(PropertyFlags::KEY)
    }

    pub fn is_serial(&self) -> bool {
        self.flags.contains(PropertyFlags::SERIAL)
    }

    pub fn is_lazy(&self) -> bool {
        self.flags.contains(PropertyFlags::LAZY)
    }

    pub fn is_nullable(&self) -> bool {
        self.flags.contains(PropertyFlags::NULLABLE)
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn precision(&self) -> Option<i64> {
        self.precision
    }

    pub fn scale(&self) -> Option<i64> {
        self.scale
    }

    pub fn reader_visibility(&self) -> Visibility {
        self.reader
    }

    pub fn writer_visibility(&self) -> Visibility {
        self.writer
    }

    pub fn within(&self) -> Option<&[Value]> {
        self.within.as_deref()
    }

    pub fn format(&self) -> Option<&FormatRule> {
        self.format.as_ref()
    }

    pub fn extra(&self) -> &FxHashMap<String, Value> {
        &self.extra
    }

    /// Field name in `backend`: the `field` override or the backend's
    /// naming convention applied to the property name.
    pub fn field(&self, backend: &Backend) -> String {
        self.field
            .clone()
            .unwrap_or_else(|| backend.field_name(self.label))
    }

    pub fn set_flag(&mut self, flag: PropertyFlags, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn set_default(&mut self, default: Option<Value>) {
        self.default = default;
    }

    pub fn set_length(&mut self, length: Option<usize>) {
        self.length = length;
    }

    /// Same declared type and key-ness; replacing a property with an
    /// incompatible one changes the model's storage shape.
    pub fn is_compatible_with(&self, other: &Property) -> bool {
        self.declared_type == other.declared_type && self.is_key() == other.is_key()
    }
}

/// Shared, independently lockable property.
#[derive(Clone)]
pub struct SharedProperty {
    name: Name,
    label: &'static str,
    inner: Arc<RwLock<Property>>,
}

impl SharedProperty {
    pub fn new(property: Property) -> Self {
        SharedProperty {
            name: property.name,
            label: property.label,
            inner: Arc::new(RwLock::new(property)),
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Property> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Property> {
        self.inner.write()
    }

    /// `true` if both handles are the same property object.
    pub fn same(&self, other: &SharedProperty) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Independent copy owned by `model`.
    pub fn duplicate_for(&self, model: ModelId) -> SharedProperty {
        let mut copy = self.read().clone();
        copy.model = model;
        SharedProperty::new(copy)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for SharedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let property = self.read();
        write!(
            f,
            "#<Property:{:?}:{} {}>",
            property.model, self.label, property.declared_type
        )
    }
}

/// Properties of one model for one backend, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct PropertySet {
    order: Vec<Name>,
    by_name: FxHashMap<Name, SharedProperty>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: Name) -> Option<&SharedProperty> {
        self.by_name.get(&name)
    }

    /// Lookup by label; linear in the number of properties.
    pub fn find(&self, label: &str) -> Option<&SharedProperty> {
        self.iter().find(|property| property.label() == label)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.by_name.contains_key(&name)
    }

    /// Insert, replacing a property of the same name in place.
    pub fn insert(&mut self, property: SharedProperty) -> Option<SharedProperty> {
        let name = property.name();
        let previous = self.by_name.insert(name, property);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedProperty> + '_ {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.iter().map(SharedProperty::label).collect()
    }

    /// Key properties in declaration order.
    pub fn key(&self) -> Vec<SharedProperty> {
        self.iter()
            .filter(|property| property.read().is_key())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
