//! Runtime configuration.

use std::ffi::OsString;

use garnet_globals::BuiltinGlobals;

/// Process-level settings that seed the built-in globals and the model
/// layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// `$0`
    pub program_name: String,
    /// `$*`
    pub argv: Vec<String>,
    /// `$:`
    pub load_path: Vec<String>,
    /// `$DEBUG`
    pub debug: bool,
    /// `$VERBOSE`; `None` is nil.
    pub verbose: Option<bool>,
    /// Name of the process-wide default backend.
    pub default_backend: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let builtins = BuiltinGlobals::default();
        RuntimeConfig {
            program_name: builtins.program_name,
            argv: Vec::new(),
            load_path: Vec::new(),
            debug: builtins.debug,
            verbose: builtins.verbose,
            default_backend: "default".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `GARNET_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `GARNET_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut config = Self::default();
        let text = |key: &str| lookup(key).map(|value| value.to_string_lossy().into_owned());

        if let Some(value) = text("GARNET_DEBUG") {
            config.debug = parse_flag(&value);
        }
        if let Some(value) = text("GARNET_VERBOSE") {
            match parse_verbose(&value) {
                Some(verbose) => config.verbose = verbose,
                None => tracing::warn!(value = %value, "ignoring unrecognized GARNET_VERBOSE"),
            }
        }
        if let Some(name) = text("GARNET_PROGRAM_NAME") {
            config.program_name = name;
        }
        if let Some(paths) = lookup("GARNET_LOAD_PATH") {
            config.load_path = std::env::split_paths(&paths)
                .map(|path| path.to_string_lossy().into_owned())
                .filter(|path| !path.is_empty())
                .collect();
        }
        if let Some(backend) = text("GARNET_DEFAULT_BACKEND").filter(|name| !name.is_empty()) {
            config.default_backend = backend;
        }
        config
    }

    #[must_use]
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    #[must_use]
    pub fn with_argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = argv.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_load_path<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_path = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_default_backend(mut self, name: impl Into<String>) -> Self {
        self.default_backend = name.into();
        self
    }

    /// Initial values of the built-in globals.
    pub fn builtins(&self) -> BuiltinGlobals {
        BuiltinGlobals {
            program_name: self.program_name.clone(),
            argv: self.argv.clone(),
            load_path: self.load_path.clone(),
            debug: self.debug,
            verbose: self.verbose,
            ..BuiltinGlobals::default()
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Warning levels as accepted by `-W`: 0 is nil, 1 is false, 2 is true.
fn parse_verbose(value: &str) -> Option<Option<bool>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "0" | "nil" => Some(None),
        "1" | "false" => Some(Some(false)),
        "2" | "true" => Some(Some(true)),
        _ => None,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
