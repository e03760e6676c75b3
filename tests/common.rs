//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use datty::codec::{PackReader, PackWriter};
use datty::io::{QueryKey, Record};
use std::io::Write;
use tempfile::NamedTempFile;

/// Create a configuration file with the given content.
pub fn create_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

/// Create a configuration with custom settings.
pub fn create_config_with_settings(numeric_keys: bool, copy_payloads: bool, log_level: &str) -> NamedTempFile {
    create_config(&format!(
        r#"
[codec]
numeric_keys = {}
copy_payloads = {}

[telemetry]
log_level = "{}"
"#,
        numeric_keys, copy_payloads, log_level
    ))
}

/// Encode with a fresh writer.
pub fn packed(build: impl FnOnce(&mut PackWriter)) -> bytes::Bytes {
    let mut writer = PackWriter::new();
    build(&mut writer);
    writer.finish()
}

/// Reader over the output of `build`.
pub fn reader(build: impl FnOnce(&mut PackWriter)) -> PackReader {
    PackReader::new(packed(build))
}

/// Key in the "users" set.
pub fn user_key(major_key: &str) -> QueryKey {
    QueryKey::new("users", major_key)
}

/// Record with UTF-8 column values.
pub fn record(columns: &[(&str, &str)]) -> Record {
    columns.iter().map(|(k, v)| (*k, *v)).collect()
}
