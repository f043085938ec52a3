use super::*;
use crate::section::SectionPath;
use std::fs;
use tempfile::TempDir;

fn path(segments: &[&str]) -> SectionPath {
    SectionPath::from(segments)
}

#[test]
fn env_provider_renders_double_underscore_keys() {
    let provider = EnvProvider::new(EnvConfig::default());
    assert_eq!(
        provider.key_for(&path(&["destination", "postgres", "credentials"]), "password"),
        "DESTINATION__POSTGRES__CREDENTIALS__PASSWORD"
    );
    assert_eq!(provider.key_for(&path(&[]), "password"), "PASSWORD");
}

#[test]
fn env_provider_reads_the_process_environment() {
    let provider = EnvProvider::new(EnvConfig::default());
    unsafe { std::env::set_var("PIPECONF_TEST__SOME_KEY", "from-env") };
    let value = provider
        .lookup(&path(&["pipeconf_test"]), "some_key")
        .unwrap();
    assert_eq!(value, Some(ConfigValue::String("from-env".to_string())));
    unsafe { std::env::remove_var("PIPECONF_TEST__SOME_KEY") };
}

#[test]
fn toml_provider_walks_nested_sections() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("secrets.toml");
    fs::write(
        &store,
        r#"
[destination.postgres.credentials]
password = "hunter2"
"#,
    )
    .unwrap();
    let provider = SecretsTomlProvider::at(&store);
    let value = provider
        .lookup(&path(&["destination", "postgres", "credentials"]), "password")
        .unwrap();
    assert_eq!(value, Some(ConfigValue::String("hunter2".to_string())));
    let miss = provider
        .lookup(&path(&["destination", "postgres"]), "password")
        .unwrap();
    assert_eq!(miss, None);
}

#[test]
fn scalar_in_the_middle_of_a_path_is_a_miss_not_an_error() {
    let provider = StringTomlProvider::secure(r#"destination = "postgres""#).unwrap();
    let value = provider
        .lookup(&path(&["destination", "postgres"]), "password")
        .unwrap();
    assert_eq!(value, None);
}

#[test]
fn missing_store_file_is_an_empty_store() {
    let dir = TempDir::new().unwrap();
    let provider = ConfigTomlProvider::at(dir.path().join("does-not-exist.toml"));
    assert_eq!(provider.lookup(&path(&[]), "anything").unwrap(), None);
}

#[test]
fn malformed_store_fails_every_lookup() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("secrets.toml");
    fs::write(&store, "this is [not valid toml").unwrap();
    let provider = SecretsTomlProvider::at(&store);
    let first = provider.lookup(&path(&[]), "key");
    assert!(matches!(first, Err(ConfigError::ProviderRead { .. })));
    // cached, still failing on the second read
    let second = provider.lookup(&path(&["section"]), "key");
    assert!(matches!(second, Err(ConfigError::ProviderRead { .. })));
}

#[test]
fn security_classes_are_fixed_per_store() {
    let dir = TempDir::new().unwrap();
    assert_eq!(
        SecretsTomlProvider::at(dir.path().join("secrets.toml")).security_class(),
        SecurityClass::Secure
    );
    assert_eq!(
        ConfigTomlProvider::at(dir.path().join("config.toml")).security_class(),
        SecurityClass::Plain
    );
    assert_eq!(
        EnvProvider::new(EnvConfig::default()).security_class(),
        SecurityClass::Secure
    );
}

#[test]
fn providers_construct_from_uri_specs() {
    let provider = Box::<dyn Provider>::try_from("env://").unwrap();
    assert_eq!(provider.name(), "env");

    let provider = Box::<dyn Provider>::try_from("secrets://store/secrets.toml").unwrap();
    assert_eq!(provider.name(), "secrets");

    // bare name shorthand
    let provider = Box::<dyn Provider>::try_from("config").unwrap();
    assert_eq!(provider.name(), "config");
}

#[test]
fn unknown_provider_scheme_is_rejected() {
    let err = Box::<dyn Provider>::try_from("vault://prod").unwrap_err();
    assert!(matches!(err, ConfigError::ProviderNotFound(name) if name == "vault"));
}

#[test]
fn registry_lists_all_builtin_providers_with_security_classes() {
    let infos = providers();
    let class = |name: &str| {
        infos
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.security)
    };
    assert_eq!(class("env"), Some(SecurityClass::Secure));
    assert_eq!(class("secrets"), Some(SecurityClass::Secure));
    assert_eq!(class("config"), Some(SecurityClass::Plain));
}

#[test]
fn registry_security_matches_constructed_providers() {
    for info in providers() {
        let provider = Box::<dyn Provider>::try_from(info.name).unwrap();
        assert_eq!(provider.security_class(), info.security, "{}", info.name);
    }
}

#[test]
fn stack_preserves_spec_order_as_rank() {
    let stack = ProviderStack::from_specs(&["env://", "secrets://s.toml", "config://c.toml"])
        .unwrap();
    let names: Vec<&str> = stack.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["env", "secrets", "config"]);
}
