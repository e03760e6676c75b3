//! Self-describing messages: string headers plus a table of named payloads.
//!
//! A [`PackableMessage`] encodes as a MAP with up to two string keys,
//! `header` (a MAP of STR to STR) and `body` (a MAP of STR to payload). Each
//! part is written only when it has entries, so an empty message is an empty
//! MAP. Body payloads keep their wire kind: BIN reads as binary, STR as text
//! and anything else as a value tree.

use super::json::to_json;
use super::{PackableString, PackableValue};
use crate::codec::{PackReader, PackWriter, Payload, ReadMode};
use crate::core::error::{DattyError, DattyResult};
use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const HEADER_KEY: &str = "header";
const BODY_KEY: &str = "body";

/// One named entry of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    Binary(Payload),
    Utf8(String),
    Value(PackableValue),
}

impl MessagePayload {
    /// The payload as a value tree. Binary and text payloads become strings.
    pub fn to_value(&self) -> PackableValue {
        match self {
            Self::Binary(payload) => PackableValue::String(PackableString::binary(payload.clone())),
            Self::Utf8(text) => PackableValue::from(text.as_str()),
            Self::Value(value) => value.clone(),
        }
    }

    /// Raw bytes: binary content, UTF-8 text, or the encoding of a value.
    pub fn to_bytes(&self) -> DattyResult<Bytes> {
        match self {
            Self::Binary(payload) => Ok(payload.clone().into_bytes()),
            Self::Utf8(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            Self::Value(value) => value.to_bytes(),
        }
    }

    /// Textual form. Binary content is decoded lossily.
    pub fn to_utf8(&self) -> String {
        match self {
            Self::Binary(payload) => payload.to_utf8_lossy(),
            Self::Utf8(text) => text.clone(),
            Self::Value(value) => value.as_string(),
        }
    }

    fn write(&self, writer: &mut PackWriter) -> DattyResult<()> {
        match self {
            Self::Binary(payload) => writer.write_bin(payload.as_bytes()),
            Self::Utf8(text) => writer.write_str(text),
            Self::Value(value) => value.write(writer),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Utf8(text) => Value::String(text.clone()),
            other => to_json(&other.to_value()),
        }
    }
}

/// Headers and named payloads, each ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackableMessage {
    header: BTreeMap<String, String>,
    body: BTreeMap<String, MessagePayload>,
}

impl PackableMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if both header and body are empty.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.body.is_empty()
    }

    /// Set a header (builder style).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }

    /// Set a header, or remove it when `value` is `None`.
    pub fn put_header(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match value {
            Some(value) => {
                self.header.insert(key, value);
            }
            None => {
                self.header.remove(&key);
            }
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.header.get(key).map(String::as_str)
    }

    pub fn header_keys(&self) -> impl Iterator<Item = &str> {
        self.header.keys().map(String::as_str)
    }

    /// Add a value-tree payload (builder style).
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<PackableValue>) -> Self {
        self.body.insert(key.into(), MessagePayload::Value(value.into()));
        self
    }

    /// Add a binary payload (builder style).
    pub fn with_binary(mut self, key: impl Into<String>, payload: impl Into<Payload>) -> Self {
        self.body.insert(key.into(), MessagePayload::Binary(payload.into()));
        self
    }

    /// Add a text payload (builder style).
    pub fn with_utf8(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.body.insert(key.into(), MessagePayload::Utf8(text.into()));
        self
    }

    /// Set a payload, or remove it when `payload` is `None`.
    pub fn put_payload(&mut self, key: impl Into<String>, payload: Option<MessagePayload>) {
        let key = key.into();
        match payload {
            Some(payload) => {
                self.body.insert(key, payload);
            }
            None => {
                self.body.remove(&key);
            }
        }
    }

    pub fn payload_entry(&self, key: &str) -> Option<&MessagePayload> {
        self.body.get(key)
    }

    /// Payload as a value tree.
    pub fn payload(&self, key: &str) -> Option<PackableValue> {
        self.body.get(key).map(MessagePayload::to_value)
    }

    /// Payload as raw bytes.
    pub fn payload_bytes(&self, key: &str) -> DattyResult<Option<Bytes>> {
        self.body.get(key).map(MessagePayload::to_bytes).transpose()
    }

    /// Payload as text.
    pub fn payload_utf8(&self, key: &str) -> Option<String> {
        self.body.get(key).map(MessagePayload::to_utf8)
    }

    pub fn payload_keys(&self) -> impl Iterator<Item = &str> {
        self.body.keys().map(String::as_str)
    }

    /// Append the encoding of this message.
    pub fn write(&self, writer: &mut PackWriter) -> DattyResult<()> {
        let parts = usize::from(!self.header.is_empty()) + usize::from(!self.body.is_empty());
        writer.write_map_header(parts)?;
        if !self.header.is_empty() {
            writer.write_str(HEADER_KEY)?;
            writer.write_map_header(self.header.len())?;
            for (key, value) in &self.header {
                writer.write_str(key)?;
                writer.write_str(value)?;
            }
        }
        if !self.body.is_empty() {
            writer.write_str(BODY_KEY)?;
            writer.write_map_header(self.body.len())?;
            for (key, payload) in &self.body {
                writer.write_str(key)?;
                payload.write(writer)?;
            }
        }
        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> DattyResult<Bytes> {
        let mut writer = PackWriter::new();
        self.write(&mut writer)?;
        Ok(writer.finish())
    }

    /// Decode a message. NIL and an empty buffer give an empty message.
    pub fn decode(bytes: Bytes, mode: ReadMode) -> DattyResult<Self> {
        let mut reader = PackReader::new(bytes);
        Self::read(&mut reader, mode)
    }

    /// Read a message. Unknown top-level keys are skipped along with their
    /// values; NIL body entries are dropped.
    pub fn read(reader: &mut PackReader, mode: ReadMode) -> DattyResult<Self> {
        let mut message = Self::new();
        if !reader.has_next() || reader.try_read_nil()? {
            return Ok(message);
        }
        let parts = read_map_size(reader, "message")?;
        for _ in 0..parts {
            let key = reader.read_str()?;
            match key.as_str() {
                HEADER_KEY => message.read_header(reader)?,
                BODY_KEY => message.read_body(reader, mode)?,
                other => {
                    tracing::debug!(key = other, "skipping unknown message part");
                    reader.skip_value()?;
                }
            }
        }
        Ok(message)
    }

    fn read_header(&mut self, reader: &mut PackReader) -> DattyResult<()> {
        if reader.try_read_nil()? {
            return Ok(());
        }
        let size = read_map_size(reader, HEADER_KEY)?;
        for _ in 0..size {
            let key = reader.read_str()?;
            let value = reader.read_str()?;
            self.header.insert(key, value);
        }
        Ok(())
    }

    fn read_body(&mut self, reader: &mut PackReader, mode: ReadMode) -> DattyResult<()> {
        if reader.try_read_nil()? {
            return Ok(());
        }
        let size = read_map_size(reader, BODY_KEY)?;
        for _ in 0..size {
            let key = reader.read_str()?;
            let format = reader.peek_format()?;
            let payload = if format.is_nil() {
                reader.read_nil()?;
                continue;
            } else if format.is_bin() {
                MessagePayload::Binary(reader.read_bin(mode)?)
            } else if format.is_str() {
                MessagePayload::Utf8(reader.read_str()?)
            } else {
                match PackableValue::read(reader, mode)? {
                    Some(value) => MessagePayload::Value(value),
                    None => continue,
                }
            };
            self.body.insert(key, payload);
        }
        Ok(())
    }

    /// JSON object with `header` and `body` members, each present only when
    /// non-empty.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        if !self.header.is_empty() {
            let header = self
                .header
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            object.insert(HEADER_KEY.to_string(), Value::Object(header));
        }
        if !self.body.is_empty() {
            let body = self
                .body
                .iter()
                .map(|(k, payload)| (k.clone(), payload.to_json()))
                .collect();
            object.insert(BODY_KEY.to_string(), Value::Object(body));
        }
        Value::Object(object)
    }
}

fn read_map_size(reader: &mut PackReader, part: &str) -> DattyResult<usize> {
    let format = reader.peek_format()?;
    if !format.is_map() {
        return Err(DattyError::parse(format!(
            "expected map for {}, got {} at offset {}",
            part,
            format,
            reader.position()
        )));
    }
    reader.read_map_header()
}

impl std::fmt::Display for PackableMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{PackableTable, PathExpression};
    use serde_json::json;

    fn sample() -> PackableMessage {
        let table = PackableTable::new()
            .put(&PathExpression::parse("name"), "Alex")
            .unwrap();
        PackableMessage::new()
            .with_header("corr", "42")
            .with_binary("blob", vec![0xde, 0xad])
            .with_utf8("note", "hi")
            .with_payload("user", table)
            .with_payload("n", 7i64)
    }

    #[test]
    fn test_empty_message_is_empty_map() {
        let message = PackableMessage::new();
        assert!(message.is_empty());
        assert_eq!(message.to_bytes().unwrap().as_ref(), &[0x80]);
    }

    #[test]
    fn test_header_only_layout() {
        let bytes = PackableMessage::new().with_header("a", "b").to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0x81, 0xa6, b'h', b'e', b'a', b'd', b'e', b'r', 0x81, 0xa1, b'a', 0xa1, b'b']
        );
    }

    #[test]
    fn test_round_trip_keeps_payload_kinds() {
        let message = sample();
        let decoded = PackableMessage::decode(message.to_bytes().unwrap(), ReadMode::Copy).unwrap();
        assert_eq!(decoded, message);
        assert!(matches!(decoded.payload_entry("blob"), Some(MessagePayload::Binary(_))));
        assert!(matches!(decoded.payload_entry("note"), Some(MessagePayload::Utf8(_))));
        assert_eq!(
            decoded.payload_keys().collect::<Vec<_>>(),
            ["blob", "n", "note", "user"]
        );
    }

    #[test]
    fn test_payload_accessors() {
        let message = sample();
        assert_eq!(message.header("corr"), Some("42"));
        assert_eq!(message.header("missing"), None);
        assert_eq!(
            message.payload("blob"),
            Some(PackableValue::String(PackableString::binary(vec![0xde, 0xad])))
        );
        assert_eq!(message.payload("note"), Some(PackableValue::from("hi")));
        assert_eq!(message.payload_utf8("n").as_deref(), Some("7"));
        assert_eq!(
            message.payload_bytes("note").unwrap().as_deref(),
            Some(&b"hi"[..])
        );
        assert_eq!(
            message.payload_bytes("n").unwrap().as_deref(),
            Some(&[0x07][..])
        );
        assert_eq!(message.payload("missing"), None);
    }

    #[test]
    fn test_put_none_removes() {
        let mut message = sample();
        message.put_header("corr", None);
        message.put_payload("blob", None);
        assert_eq!(message.header("corr"), None);
        assert_eq!(message.payload_entry("blob"), None);
        assert!(message.header_keys().next().is_none());
    }

    #[test]
    fn test_nil_and_empty_decode_to_empty_message() {
        for bytes in [Bytes::new(), Bytes::from_static(&[0xc0])] {
            assert!(PackableMessage::decode(bytes, ReadMode::Copy).unwrap().is_empty());
        }
    }

    #[test]
    fn test_non_map_is_parse_error() {
        let err = PackableMessage::decode(Bytes::from_static(&[0x01]), ReadMode::Copy).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_unknown_part_and_nil_payload_skipped() {
        // {"x": [1, 2], "body": {"a": nil, "b": 1}}
        let data: Vec<u8> = vec![
            0x82, 0xa1, b'x', 0x92, 0x01, 0x02, 0xa4, b'b', b'o', b'd', b'y', 0x82, 0xa1, b'a',
            0xc0, 0xa1, b'b', 0x01,
        ];
        let message = PackableMessage::decode(Bytes::from(data), ReadMode::Copy).unwrap();
        assert_eq!(message.payload_keys().collect::<Vec<_>>(), ["b"]);
        assert_eq!(message.payload("b"), Some(PackableValue::from(1i64)));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            sample().to_json(),
            json!({
                "header": {"corr": "42"},
                "body": {"blob": "0xdead", "n": 7, "note": "hi", "user": {"name": "Alex"}}
            })
        );
        assert_eq!(PackableMessage::new().to_json(), json!({}));
    }
}
