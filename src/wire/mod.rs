//! Wire codec
//!
//! Canonical configuration crosses the orchestrator/plugin boundary as
//! MessagePack: self-describing, so the plugin can weak-decode it into its own
//! static struct without seeing the schema.
//!
//! ```text
//! orchestrator                              plugin
//! CanonicalValue --encode--> bytes --decode::<DriverConfig>--> DriverConfig
//! ```
//!
//! Object entries are written in their stored order, so equal canonical values
//! always encode to identical bytes.

mod de;
mod error;

pub use de::WeakDeserializer;
pub use error::WireError;

use serde::de::DeserializeOwned;
use std::io::Cursor;
use taskconf_types::{CanonicalValue, Value};
use tracing::trace;

/// Encode a canonical configuration for transport
pub fn encode(config: &CanonicalValue) -> Result<Vec<u8>, WireError> {
    let bytes = rmp_serde::to_vec(config)?;
    trace!(bytes = bytes.len(), entries = config.len(), "encoded driver config");
    Ok(bytes)
}

/// Encode an arbitrary dynamic value
pub fn encode_value(value: &Value) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec(value)?)
}

/// Structural decode: bytes back to the dynamic value they encode.
///
/// The input must hold exactly one value; anything after it is malformed.
pub fn decode_value(bytes: &[u8]) -> Result<Value, WireError> {
    let mut cursor = Cursor::new(bytes);
    let value: Value = rmp_serde::from_read(&mut cursor)?;
    let consumed = cursor.position() as usize;
    if consumed < bytes.len() {
        return Err(WireError::Malformed(format!(
            "trailing bytes: {} after the encoded value",
            bytes.len() - consumed
        )));
    }
    Ok(value)
}

/// Structural decode of bytes produced by [`encode`]
pub fn decode_canonical(bytes: &[u8]) -> Result<CanonicalValue, WireError> {
    let value = decode_value(bytes)?;
    let found = value.type_name();
    CanonicalValue::from_wire(value)
        .ok_or_else(|| WireError::Malformed(format!("expected an object at the top level, found {}", found)))
}

/// Weak decode into a plugin's static configuration record
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    let value = decode_value(bytes)?;
    T::deserialize(WeakDeserializer::new(&value))
}

/// Weak decode into an existing record.
///
/// The record is only replaced once the whole decode has succeeded; on error it
/// is left exactly as it was.
pub fn decode_into<T: DeserializeOwned>(bytes: &[u8], target: &mut T) -> Result<(), WireError> {
    *target = decode(bytes)?;
    Ok(())
}
