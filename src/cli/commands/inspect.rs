//! Inspect command implementation.

use crate::codec::{Dynamic, PackReader};
use crate::core::config::Config;
use crate::io::{Operation, OperationResult};
use crate::value::json::to_json;
use crate::value::{PackableMessage, PackableValue};
use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Decode a payload and print it.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Payload as hex (whitespace and a `0x` prefix are ignored).
    #[arg(conflicts_with = "file")]
    pub hex: Option<String>,

    /// Read the raw payload from a file instead.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// How to interpret the payload.
    #[arg(long = "as", value_enum, default_value_t = InspectAs::Value)]
    pub kind: InspectAs,

    /// Print values as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Payload interpretations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InspectAs {
    /// A value tree.
    Value,
    /// An operation envelope.
    Op,
    /// A result envelope.
    Result,
    /// A header and payload message.
    Message,
    /// The raw token stream.
    Tokens,
}

/// Run the inspect command.
pub fn run_inspect(args: InspectArgs, config: &Config) -> Result<()> {
    let payload = read_payload(&args)?;
    tracing::debug!(bytes = payload.len(), kind = ?args.kind, "inspecting payload");
    let output = render(payload, args.kind, args.json, config)?;
    println!("{}", output);
    Ok(())
}

fn read_payload(args: &InspectArgs) -> Result<Bytes> {
    match (&args.hex, &args.file) {
        (Some(hex), _) => decode_hex(hex),
        (None, Some(path)) => {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read payload file: {}", path.display()))?;
            Ok(Bytes::from(data))
        }
        (None, None) => anyhow::bail!("either a hex payload or --file is required"),
    }
}

/// Parse hex text into bytes.
pub fn decode_hex(text: &str) -> Result<Bytes> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    let data = hex::decode(digits).with_context(|| "invalid hex payload")?;
    Ok(Bytes::from(data))
}

/// Render `payload` as text.
pub fn render(payload: Bytes, kind: InspectAs, json: bool, config: &Config) -> Result<String> {
    let limits = config.codec.limits();
    let mode = config.codec.read_mode();
    let rendered = match kind {
        InspectAs::Value => {
            let mut reader = PackReader::with_limits(payload, limits);
            match PackableValue::read(&mut reader, mode)? {
                Some(value) if json => serde_json::to_string_pretty(&to_json(&value))?,
                Some(value) => value.to_string(),
                None => "nil".to_string(),
            }
        }
        InspectAs::Op => format!("{:#?}", Operation::decode(payload, limits, mode)?),
        InspectAs::Result => format!("{:#?}", OperationResult::decode(payload, limits, mode)?),
        InspectAs::Message => {
            let mut reader = PackReader::with_limits(payload, limits);
            let message = PackableMessage::read(&mut reader, mode)?;
            if json {
                serde_json::to_string_pretty(&message.to_json())?
            } else {
                message.to_string()
            }
        }
        InspectAs::Tokens => render_tokens(payload, config)?,
    };
    Ok(rendered)
}

/// One line per token, indented by container depth.
fn render_tokens(payload: Bytes, config: &Config) -> Result<String> {
    let mut reader = PackReader::with_limits(payload, config.codec.limits());
    let mut lines = Vec::new();
    // Remaining child counts of the open containers.
    let mut open: Vec<usize> = Vec::new();
    while reader.has_next() {
        let offset = reader.position();
        let format = reader.peek_format()?;
        let token = reader.read_dynamic(config.codec.read_mode())?;
        let depth = open.len();
        let text = match &token {
            Dynamic::Nil => "nil".to_string(),
            Dynamic::Bool(b) => b.to_string(),
            Dynamic::Long(v) => v.to_string(),
            Dynamic::Double(v) => format!("{:?}", v),
            Dynamic::String(s) => format!("{:?}", s),
            Dynamic::Binary(p) => format!("0x{}", hex::encode(p.as_bytes())),
            Dynamic::Array(n) => format!("array({})", n),
            Dynamic::IntMap(n) => format!("map<int>({})", n),
            Dynamic::StringMap(n) => format!("map<str>({})", n),
        };
        lines.push(format!("{:>6}  {}{} [{}]", offset, "  ".repeat(depth), text, format));

        if let Some(remaining) = open.last_mut() {
            *remaining -= 1;
        }
        match token {
            Dynamic::Array(n) if n > 0 => open.push(n),
            Dynamic::IntMap(n) | Dynamic::StringMap(n) if n > 0 => open.push(n * 2),
            _ => {}
        }
        while open.last() == Some(&0) {
            open.pop();
        }
    }
    Ok(lines.join("\n"))
}
