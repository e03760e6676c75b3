//! Core infrastructure tests.

mod common;

use datty::codec::ReadMode;
use datty::core::config::{Config, ConfigOverrides};
use datty::core::error::{DattyError, ErrCode};
use std::time::Duration;

// ============================================================================
// Config tests
// ============================================================================

#[test]
fn parse_full_config() {
    let file = common::create_config(
        r#"
[codec]
numeric_keys = false
copy_payloads = false
max_nesting_depth = 16
max_collection_len = 1024

[store]
default_ttl_seconds = 60

[telemetry]
log_level = "debug"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert!(!config.codec.numeric_keys);
    assert_eq!(config.codec.read_mode(), ReadMode::Slice);
    assert_eq!(config.codec.limits().max_nesting_depth, 16);
    assert_eq!(config.codec.limits().max_collection_len, 1024);
    assert_eq!(config.store.default_ttl(), Some(Duration::from_secs(60)));
    assert_eq!(config.telemetry.log_level, "debug");
}

#[test]
fn parse_config_with_settings() {
    let file = common::create_config_with_settings(true, false, "warn");
    let config = Config::from_file(file.path()).unwrap();
    assert!(config.codec.numeric_keys);
    assert_eq!(config.codec.read_mode(), ReadMode::Slice);
    assert_eq!(config.telemetry.log_level, "warn");
}

#[test]
fn validate_invalid_collection_len() {
    let file = common::create_config("[codec]\nmax_collection_len = 0\n");
    let result = Config::from_file(file.path());
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("max_collection_len"));
}

#[test]
fn validate_oversized_default_ttl() {
    let file = common::create_config("[store]\ndefault_ttl_seconds = 9223372036854775807\n");
    let result = Config::from_file(file.path());
    assert!(result.unwrap_err().to_string().contains("default_ttl_seconds"));

    let file = common::create_config("[store]\ndefault_ttl_seconds = 4294967295\n");
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(
        config.store.default_ttl(),
        Some(Duration::from_secs(u64::from(u32::MAX)))
    );
}

#[test]
fn missing_config_file() {
    let result = Config::from_file(std::path::Path::new("/nonexistent/datty.toml"));
    assert!(result.unwrap_err().to_string().contains("failed to read config file"));
}

#[test]
fn config_overrides() {
    let mut config = Config::default();
    config.apply_overrides(&ConfigOverrides {
        log_level: Some("trace".to_string()),
        numeric_keys: Some(false),
    });
    assert_eq!(config.telemetry.log_level, "trace");
    assert!(!config.codec.numeric_keys);
    assert!(config.validate().is_ok());
}

#[test]
fn config_toml_round_trip() {
    let file = common::create_config_with_settings(false, true, "error");
    let config = Config::from_file(file.path()).unwrap();
    let reparsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
    assert_eq!(reparsed.codec.numeric_keys, config.codec.numeric_keys);
    assert_eq!(reparsed.telemetry.log_level, "error");
}

// ============================================================================
// Error tests
// ============================================================================

#[test]
fn error_codes_follow_error_kind() {
    let cases = [
        (DattyError::parse("truncated"), ErrCode::BadPayload),
        (DattyError::number_format("1e999x"), ErrCode::BadPayload),
        (DattyError::usage("empty path"), ErrCode::BadArguments),
        (DattyError::version_conflict("1", "2"), ErrCode::ConcurrentUpdate),
        (DattyError::unsupported("scan"), ErrCode::UnsupportedOperation),
    ];
    for (error, code) in cases {
        assert_eq!(ErrCode::from(&error), code, "{}", error);
    }
}

#[test]
fn only_conflicts_are_retriable() {
    assert!(DattyError::version_conflict("1", "2").is_retriable());
    assert!(!DattyError::parse("x").is_retriable());
    assert!(!DattyError::usage("x").is_retriable());
    assert!(!DattyError::number_format("x").is_retriable());
}

#[test]
fn err_code_display() {
    assert_eq!(ErrCode::ConcurrentUpdate.to_string(), "CONCURRENT_UPDATE");
    assert_eq!(ErrCode::from_code(2), Some(ErrCode::BadPayload));
}
