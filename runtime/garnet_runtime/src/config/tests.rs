use super::*;
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
    let vars: FxHashMap<String, OsString> = vars
        .iter()
        .map(|(key, value)| ((*key).to_string(), OsString::from(value)))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_without_environment() {
    let config = RuntimeConfig::from_lookup(lookup(&[]));
    assert_eq!(config, RuntimeConfig::default());
    assert_eq!(config.program_name, "garnet");
    assert_eq!(config.verbose, Some(false));
    assert_eq!(config.default_backend, "default");
}

#[test]
fn reads_garnet_variables() {
    let paths = std::env::join_paths(["lib", "vendor/lib"]).unwrap();
    let config = RuntimeConfig::from_lookup(lookup(&[
        ("GARNET_DEBUG", "yes"),
        ("GARNET_VERBOSE", "2"),
        ("GARNET_PROGRAM_NAME", "script.gt"),
        ("GARNET_LOAD_PATH", paths.to_str().unwrap()),
        ("GARNET_DEFAULT_BACKEND", "memory"),
    ]));
    assert!(config.debug);
    assert_eq!(config.verbose, Some(true));
    assert_eq!(config.program_name, "script.gt");
    assert_eq!(config.load_path, vec!["lib", "vendor/lib"]);
    assert_eq!(config.default_backend, "memory");
}

#[test]
fn verbose_levels() {
    let verbose = |level| RuntimeConfig::from_lookup(lookup(&[("GARNET_VERBOSE", level)])).verbose;
    assert_eq!(verbose("0"), None);
    assert_eq!(verbose("1"), Some(false));
    assert_eq!(verbose("true"), Some(true));
    assert_eq!(verbose("loud"), Some(false));
}

#[test]
fn builder_feeds_builtins() {
    let config = RuntimeConfig::new()
        .with_program_name("app")
        .with_argv(["-v", "input.txt"])
        .with_load_path(["lib"])
        .with_debug(true)
        .with_verbose(None);
    let builtins = config.builtins();
    assert_eq!(builtins.program_name, "app");
    assert_eq!(builtins.argv, vec!["-v", "input.txt"]);
    assert_eq!(builtins.load_path, vec!["lib"]);
    assert!(builtins.debug);
    assert_eq!(builtins.verbose, None);
    assert_eq!(builtins.input_file_name, "-");
}
