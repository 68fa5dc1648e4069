//! Storage backends and their naming conventions.
//!
//! A backend is an identifier for a storage target ("repository"). Each one
//! carries a [`NamingConvention`] that maps a model's base name to a storage
//! name and a property name to a field name. The [`BackendCatalog`] is the
//! process-wide set of known backends, one of which is the default.

use std::fmt;
use std::sync::Arc;

use garnet_ir::{Name, SharedInterner};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{ModelError, ModelResult};

/// Interned backend name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(Name);

impl BackendId {
    pub fn name(self) -> Name {
        self.0
    }
}

/// Storage naming supplied by a backend.
pub trait NamingConvention: Send + Sync + fmt::Debug {
    /// Physical storage name for a model, e.g. `"Blog::Post"` → `"blog_posts"`.
    fn storage_name(&self, model_name: &str) -> String;

    /// Field name for a property.
    fn field_name(&self, property_name: &str) -> String {
        underscore(property_name)
    }
}

/// The stock resource naming conventions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResourceNaming {
    /// `Blog::Post` → `blog_posts`
    #[default]
    UnderscoredAndPluralized,
    /// `Blog::Post` → `posts`
    UnderscoredAndPluralizedWithoutModule,
    /// `Blog::Post` → `blog/post`
    Underscored,
    /// `Blog::Post` → `blog/posts.yaml`
    Yaml,
}

impl NamingConvention for ResourceNaming {
    fn storage_name(&self, model_name: &str) -> String {
        match self {
            ResourceNaming::UnderscoredAndPluralized => pluralize(&underscore(model_name)).replace('/', "_"),
            ResourceNaming::UnderscoredAndPluralizedWithoutModule => {
                pluralize(&underscore(demodulize(model_name)))
            }
            ResourceNaming::Underscored => underscore(model_name),
            ResourceNaming::Yaml => format!("{}.yaml", pluralize(&underscore(model_name))),
        }
    }
}

/// `"Blog::PostTag"` → `"blog/post_tag"`.
pub fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' {
            if chars.peek() == Some(&':') {
                chars.next();
            }
            out.push('/');
            prev = Some('/');
            continue;
        }
        if c.is_uppercase() {
            let next_is_lower = chars.peek().is_some_and(|n| n.is_lowercase());
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next_is_lower,
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Last `::` segment of a model name.
pub fn demodulize(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

const UNCOUNTABLE: &[&str] = &["equipment", "information", "rice", "money", "species", "series", "sheep", "fish"];

/// English plural of the last path segment.
pub fn pluralize(word: &str) -> String {
    let (head, last) = match word.rfind(['/', '_']) {
        Some(at) => word.split_at(at + 1),
        None => ("", word),
    };
    if last.is_empty() || UNCOUNTABLE.contains(&last) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR_PLURALS.iter().find(|(singular, _)| *singular == last) {
        return format!("{head}{plural}");
    }
    let plural = if let Some(stem) = last.strip_suffix('y').filter(|stem| !stem.ends_with(['a', 'e', 'i', 'o', 'u'])) {
        format!("{stem}ies")
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| last.ends_with(suffix)) {
        format!("{last}es")
    } else {
        format!("{last}s")
    };
    format!("{head}{plural}")
}

/// A registered backend.
#[derive(Debug)]
pub struct Backend {
    id: BackendId,
    label: &'static str,
    naming: Arc<dyn NamingConvention>,
}

impl Backend {
    pub fn id(&self) -> BackendId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn storage_name(&self, model_name: &str) -> String {
        self.naming.storage_name(model_name)
    }

    pub fn field_name(&self, property_name: &str) -> String {
        self.naming.field_name(property_name)
    }
}

struct CatalogInner {
    interner: SharedInterner,
    default: BackendId,
    backends: RwLock<FxHashMap<BackendId, Arc<Backend>>>,
}

/// Process-wide set of backends; cheap to clone.
#[derive(Clone)]
pub struct BackendCatalog(Arc<CatalogInner>);

impl BackendCatalog {
    /// A catalog whose default backend is `default_name` with the stock
    /// naming convention.
    pub fn new(interner: SharedInterner, default_name: &str) -> Self {
        let id = BackendId(interner.intern(default_name));
        let catalog = BackendCatalog(Arc::new(CatalogInner {
            interner,
            default: id,
            backends: RwLock::new(FxHashMap::default()),
        }));
        catalog.register(default_name, Arc::new(ResourceNaming::default()));
        catalog
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.0.interner
    }

    /// The process-wide default backend.
    pub fn default_backend(&self) -> BackendId {
        self.0.default
    }

    /// Register (or replace the naming convention of) a backend.
    pub fn register(&self, name: &str, naming: Arc<dyn NamingConvention>) -> BackendId {
        let interned = self.0.interner.intern(name);
        let id = BackendId(interned);
        let backend = Arc::new(Backend {
            id,
            label: self.0.interner.lookup(interned),
            naming,
        });
        self.0.backends.write().insert(id, backend);
        tracing::debug!(backend = name, "registered backend");
        id
    }

    /// Id of a registered backend.
    pub fn resolve(&self, name: &str) -> ModelResult<BackendId> {
        self.0
            .interner
            .get(name)
            .map(BackendId)
            .filter(|id| self.0.backends.read().contains_key(id))
            .ok_or_else(|| ModelError::UnknownBackend {
                name: name.to_string(),
            })
    }

    pub fn get(&self, id: BackendId) -> ModelResult<Arc<Backend>> {
        self.0
            .backends
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| ModelError::UnknownBackend {
                name: self.0.interner.lookup(id.0).to_string(),
            })
    }

    pub fn label(&self, id: BackendId) -> &'static str {
        self.0.interner.lookup(id.0)
    }

    /// Every registered backend id, default first.
    pub fn ids(&self) -> Vec<BackendId> {
        let mut ids: Vec<BackendId> = self.0.backends.read().keys().copied().collect();
        ids.sort_by_key(|id| (*id != self.0.default, self.label(*id)));
        ids
    }
}

impl fmt::Debug for BackendCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCatalog")
            .field("default", &self.label(self.0.default))
            .field("backends", &self.0.backends.read().len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
