//! Unit tests for configuration loading and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate LTRP_ROOT_FOLDER are marked with #[serial].

use ltrp_common::config::{
    default_root_folder, resolve_root_folder, ConfigPaths, TomlConfig, ROOT_FOLDER_ENV,
};
use ltrp_common::{Error, ErrorCodeList, Parameters};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_cli_arg_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ltrp-from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ltrp-from-toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(Some(Path::new("/tmp/ltrp-cli")), ROOT_FOLDER_ENV, Some(&toml));
    assert_eq!(root, PathBuf::from("/tmp/ltrp-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_before_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ltrp-from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ltrp-from-toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(None, ROOT_FOLDER_ENV, Some(&toml));
    assert_eq!(root, PathBuf::from("/tmp/ltrp-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ltrp-from-toml")),
        ..Default::default()
    };

    assert_eq!(
        resolve_root_folder(None, ROOT_FOLDER_ENV, Some(&toml)),
        PathBuf::from("/tmp/ltrp-from-toml")
    );
    assert_eq!(resolve_root_folder(None, ROOT_FOLDER_ENV, None), default_root_folder());
}

#[test]
fn test_toml_config_parsing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "root_folder = \"/opt/ltrp\"\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/opt/ltrp")));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_toml_config_defaults_and_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    std::fs::write(&path, "").unwrap();
    let config = TomlConfig::load(&path).unwrap();
    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");

    std::fs::write(&path, "root_folder = [").unwrap();
    assert!(matches!(TomlConfig::load(&path), Err(Error::Config(_))));
}

#[test]
fn test_config_paths_layout() {
    let paths = ConfigPaths::new("/opt/ltrp");
    assert_eq!(paths.root_folder(), Path::new("/opt/ltrp"));
    assert_eq!(paths.parameters(), PathBuf::from("/opt/ltrp/config/parameters.json"));
    assert_eq!(
        paths.error_code_list(),
        PathBuf::from("/opt/ltrp/config/error_code_list.json")
    );
    assert_eq!(paths.sound_dir(), PathBuf::from("/opt/ltrp/config/sound_files"));
}

#[test]
fn test_missing_documents_are_config_errors() {
    let dir = TempDir::new().unwrap();
    let paths = ConfigPaths::new(dir.path());

    assert!(matches!(Parameters::load(&paths.parameters()), Err(Error::Config(_))));
    assert!(matches!(ErrorCodeList::load(&paths.error_code_list()), Err(Error::Config(_))));
}

#[test]
fn test_malformed_parameters_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parameters.json");

    // Missing required sections
    std::fs::write(&path, r#"{ "NODE_CODE": { "VALUE": {} } }"#).unwrap();
    assert!(matches!(Parameters::load(&path), Err(Error::Json(_))));

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(Parameters::load(&path), Err(Error::Json(_))));
}
