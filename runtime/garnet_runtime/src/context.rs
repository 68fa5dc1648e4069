//! The runtime context: one per process (or per isolated test).

use std::sync::Arc;

use garnet_globals::{ExecutionState, Globals, StandardStreams};
use garnet_ir::SharedInterner;
use garnet_model::{BackendCatalog, ModelDescriptor, ModelRegistry, PropertyOptions, PropertyType};

use crate::config::RuntimeConfig;
use crate::errors::{RuntimeError, RuntimeResult};
use crate::operation::{Operation, Outcome};

/// Owns the process-wide registries. Shared across threads by reference;
/// each thread works through its own [`ExecutionState`].
#[derive(Debug)]
pub struct RuntimeContext {
    config: RuntimeConfig,
    interner: SharedInterner,
    globals: Globals,
    models: ModelRegistry,
}

impl RuntimeContext {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_streams(config, StandardStreams::new())
    }

    /// A context whose standard streams start out as `streams`.
    pub fn with_streams(config: RuntimeConfig, streams: StandardStreams) -> Self {
        let interner = SharedInterner::new();
        let globals = Globals::with_streams(interner.clone(), config.builtins(), streams);
        let catalog = BackendCatalog::new(interner.clone(), &config.default_backend);
        tracing::debug!(
            program = %config.program_name,
            backend = %config.default_backend,
            "runtime context created"
        );
        RuntimeContext {
            config,
            interner,
            globals,
            models: ModelRegistry::new(catalog),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn catalog(&self) -> &BackendCatalog {
        self.models.catalog()
    }

    pub fn new_thread(&self) -> ExecutionState {
        self.globals.new_thread()
    }

    pub fn reset_user_globals(&self) {
        self.globals.reset_user_globals();
    }

    /// Remove every model and reset the globals. Backends stay registered.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn teardown(&self) {
        let removed = self.models.clear();
        self.globals.reset_user_globals();
        tracing::debug!(removed, "runtime torn down");
    }

    fn model(&self, name: &str) -> RuntimeResult<Arc<ModelDescriptor>> {
        self.models
            .lookup(name)
            .ok_or_else(|| RuntimeError::UnknownModel {
                name: name.to_string(),
            })
    }

    /// Apply one front-end operation on behalf of the thread owning `state`.
    pub fn apply(&self, state: &mut ExecutionState, operation: Operation) -> RuntimeResult<Outcome> {
        tracing::trace!(kind = operation.kind(), "apply");
        let outcome = match operation {
            Operation::DefineGlobal { name, value } => {
                self.globals.set(state, &name, value)?;
                Outcome::Unit
            }
            Operation::ReadGlobal { name } => Outcome::Value(self.globals.read(state, &name)?),
            Operation::AliasGlobal { new, old } => {
                self.globals.alias(&new, &old)?;
                Outcome::Unit
            }
            Operation::DeclareModel { name, backend } => {
                let model = match backend {
                    Some(backend) => {
                        let backend = self.catalog().resolve(&backend)?;
                        self.models.declare_in(&name, backend)?
                    }
                    None => self.models.declare(&name)?,
                };
                Outcome::Model(model)
            }
            Operation::DeclareProperty {
                model,
                name,
                type_name,
                options,
            } => {
                let declared_type =
                    PropertyType::parse(&type_name).ok_or(RuntimeError::UnknownType { name: type_name })?;
                let options = PropertyOptions::from_dictionary(&name, &options)?;
                let property = self.model(&model)?.declare_property(&name, declared_type, options)?;
                Outcome::Property(property)
            }
            Operation::DeclareSubtype { name, parent } => {
                let parent = self.model(&parent)?;
                Outcome::Model(self.models.derive(&name, &parent)?)
            }
            Operation::RemoveModel { name } => {
                let removed = self
                    .models
                    .lookup(&name)
                    .is_some_and(|model| self.models.remove(&model));
                Outcome::Removed(removed)
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
