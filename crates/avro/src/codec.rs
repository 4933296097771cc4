//! Compiled Avro schemas and textual/native/binary conversion.

use apache_avro::schema::ResolvedSchema;
use apache_avro::types::Value;
use apache_avro::{from_avro_datum, to_avro_datum, Schema};
use serde_json::Value as JsonValue;

use crate::error::{CodecError, Result};
use crate::json::json_to_value;

/// A compiled Avro schema together with the text it was compiled from.
///
/// The text is kept verbatim: it is what gets registered with a schema
/// registry and what registry caches are keyed on.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    schema_text: String,
    schema: Schema,
}

impl AvroCodec {
    /// Compile a JSON Avro schema definition.
    pub fn compile(schema_text: &str) -> Result<Self> {
        let schema = Schema::parse_str(schema_text)
            .map_err(|e| CodecError::SchemaCompile(e.to_string()))?;

        tracing::debug!("Compiled Avro schema: {}", schema.canonical_form());

        Ok(Self {
            schema_text: schema_text.to_string(),
            schema,
        })
    }

    /// The schema text this codec was compiled from.
    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Convert a message in the Avro JSON encoding to a native value that
    /// conforms to the schema.
    pub fn to_native(&self, textual: &str) -> Result<Value> {
        let json: JsonValue = serde_json::from_str(textual)
            .map_err(|e| CodecError::MessageParse(format!("message is not valid JSON: {e}")))?;

        let resolved = ResolvedSchema::try_from(&self.schema)
            .map_err(|e| CodecError::SchemaCompile(e.to_string()))?;

        let value = json_to_value(json, &self.schema, resolved.get_names())?;

        value
            .resolve(&self.schema)
            .map_err(|e| CodecError::MessageParse(e.to_string()))
    }

    /// Encode a native value as an Avro datum (no container, no framing).
    pub fn to_binary(&self, native: Value) -> Result<Vec<u8>> {
        to_avro_datum(&self.schema, native).map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Decode an Avro datum written with this schema.
    pub fn from_binary(&self, bytes: &[u8]) -> Result<Value> {
        let mut reader = bytes;
        from_avro_datum(&self.schema, &mut reader, None)
            .map_err(|e| CodecError::Decoding(e.to_string()))
    }
}
