//! Encode command implementation.

use crate::core::config::Config;
use crate::value::json::from_json;
use crate::value::PackableValue;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Encode a JSON document as a packed value.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON document.
    #[arg(conflicts_with = "file")]
    pub json: Option<String>,

    /// Read the JSON document from a file instead.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Treat the input as a stringified literal rather than JSON.
    #[arg(long)]
    pub literal: bool,
}

/// Run the encode command.
pub fn run_encode(args: EncodeArgs, _config: &Config) -> Result<()> {
    let input = match (&args.json, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?,
        (None, None) => anyhow::bail!("either a JSON document or --file is required"),
    };
    println!("{}", encode(&input, args.literal)?);
    Ok(())
}

/// Encode `input` and return the payload as hex. `null` encodes as NIL.
pub fn encode(input: &str, literal: bool) -> Result<String> {
    let value = if literal {
        Some(PackableValue::from_stringified(input.trim())?)
    } else {
        let json: serde_json::Value =
            serde_json::from_str(input).with_context(|| "invalid JSON input")?;
        from_json(&json)
    };
    let bytes = match value {
        Some(value) => value.to_bytes()?.to_vec(),
        None => vec![crate::codec::format::NIL],
    };
    tracing::debug!(bytes = bytes.len(), "encoded value");
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_object() {
        assert_eq!(encode(r#"{"a": [true]}"#, false).unwrap(), "81a1618100c3");
    }

    #[test]
    fn test_encode_null() {
        assert_eq!(encode("null", false).unwrap(), "c0");
    }

    #[test]
    fn test_encode_literal() {
        assert_eq!(encode("TRUE", true).unwrap(), "c3");
        assert_eq!(encode("-1", true).unwrap(), "ff");
        assert_eq!(encode("abc", true).unwrap(), "a3616263");
    }

    #[test]
    fn test_encode_rejects_bad_json() {
        assert!(encode("{", false).is_err());
    }
}
