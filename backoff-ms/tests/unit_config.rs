use backoff_ms::config::{Overrides, Settings};
use backoff_ms::BackoffConfig;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let settings = Settings::load(Some(path.as_path())).unwrap();
    assert_eq!(settings.base_time_ms, 1_000.0);
    assert_eq!(settings.max_time_ms, 86_400_000.0);
    assert_eq!(settings.max_attempts, 10.0);
    assert_eq!(settings.randomization_factor, 0.25);
    assert_eq!(settings.path().unwrap(), path);
}

#[test]
fn file_values_override_defaults_per_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "maxAttempts: 4\nbase_time_ms: 250\n").unwrap();
    let settings = Settings::load(Some(path.as_path())).unwrap();
    assert_eq!(settings.max_attempts, 4.0);
    assert_eq!(settings.base_time_ms, 250.0);
    assert_eq!(settings.max_time_ms, 86_400_000.0);
}

#[test]
fn empty_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "\n").unwrap();
    let settings = Settings::load(Some(path.as_path())).unwrap();
    assert_eq!(settings.max_attempts, 10.0);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "max_attempts: [1, 2\n").unwrap();
    let err = Settings::load(Some(path.as_path())).unwrap_err();
    assert!(format!("{err:#}").contains("parse config yaml"));
}

#[test]
fn saved_settings_reload_with_private_permissions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yaml");
    let mut settings = Settings::load(Some(path.as_path())).unwrap();
    settings.set("max_time", "30s").unwrap();
    settings.set("randomization_factor", "0.1").unwrap();
    settings.save().unwrap();

    let reloaded = Settings::load(Some(path.as_path())).unwrap();
    assert_eq!(reloaded.max_time_ms, 30_000.0);
    assert_eq!(reloaded.randomization_factor, 0.1);
    let saved = fs::read_to_string(&path).unwrap();
    assert!(!saved.contains("attempt:"));
    assert!(!saved.contains("path"));
    #[cfg(unix)]
    {
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}

#[test]
fn get_and_set_by_key() {
    let mut settings = Settings::default();
    settings.set("base_time", "1.5s").unwrap();
    settings.set("max_attempts", "7").unwrap();
    assert_eq!(settings.get("base_time").unwrap(), 1_500.0);
    assert_eq!(settings.get("max_attempts").unwrap(), 7.0);
    assert!(settings.set("max_attempts", "many").is_err());
    assert!(settings.set("base_time", "soon").is_err());
    assert!(settings.get("attempt").is_err());
    assert!(settings.set("token", "x").is_err());
}

#[test]
fn overrides_replace_only_given_fields() {
    let mut settings = Settings::default();
    settings.apply_overrides(&Overrides {
        max_attempts: Some(3.0),
        randomization_factor: Some(0.0),
        ..Default::default()
    });
    assert_eq!(settings.max_attempts, 3.0);
    assert_eq!(settings.randomization_factor, 0.0);
    assert_eq!(settings.base_time_ms, 1_000.0);
}

#[test]
fn settings_build_calculator_input() {
    let settings = Settings::default();
    assert_eq!(settings.backoff(4.0), BackoffConfig::for_attempt(4));
}
