//! Comprehensive unit tests for config.rs module

use sparkify_etl::config::AppConfig;

#[test]
fn test_default_config_values() {
    let config = AppConfig::default();

    assert_eq!(config.database.path, "data/sparkifydb.sqlite");
    assert_eq!(config.input.song_data, "data/song_data");
    assert_eq!(config.input.log_data, "data/log_data");
    assert_eq!(config.input.extension, "json");
}

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_default_matching_is_exact() {
    let config = AppConfig::default();
    assert_eq!(config.matching.duration_tolerance, 0.0);
    assert_eq!(config.load_options().duration_tolerance, 0.0);
}

#[test]
fn test_config_validation_success() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_empty_database_path() {
    let mut config = AppConfig::default();
    config.database.path = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_valid_log_levels() {
    let valid_levels = vec!["trace", "debug", "info", "warn", "error"];
    for level in valid_levels {
        let mut config = AppConfig::default();
        config.logging.level = level.to_string();
        assert!(config.validate().is_ok(), "Failed for level: {}", level);
    }
}

#[test]
fn test_config_validation_invalid_log_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_extension_with_dot() {
    let mut config = AppConfig::default();
    config.input.extension = ".json".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_empty_extension() {
    let mut config = AppConfig::default();
    config.input.extension = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_non_finite_tolerance() {
    let mut config = AppConfig::default();
    config.matching.duration_tolerance = f64::NAN;
    assert!(config.validate().is_err());
    config.matching.duration_tolerance = f64::INFINITY;
    assert!(config.validate().is_err());
}

#[test]
fn test_load_options_carry_tolerance_and_extension() {
    let mut config = AppConfig::default();
    config.matching.duration_tolerance = 0.01;
    config.input.extension = " ndjson ".to_string();

    let options = config.load_options();
    assert_eq!(options.duration_tolerance, 0.01);
    assert_eq!(options.extension, "ndjson");
}

#[test]
fn test_load_with_explicit_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("override.toml");
    std::fs::write(
        &path,
        "[database]\npath = \"/tmp/warehouse.sqlite\"\n\n[matching]\nduration_tolerance = 0.25\n",
    )
    .unwrap();

    let config = AppConfig::load_from(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(config.database.path, "/tmp/warehouse.sqlite");
    assert_eq!(config.matching.duration_tolerance, 0.25);
    assert_eq!(config.logging.level, "info");
}
