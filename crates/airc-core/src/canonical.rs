//! # Canonical Bytes
//!
//! Version records and audit entries are digested over RFC 8785 (JCS)
//! bytes: sorted keys, compact separators. [`CanonicalBytes::new`] is the
//! only way to obtain them. Numeric answers are integers, so any float in a
//! record is a bug and is rejected rather than rounded.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// JCS bytes of a serializable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Serialize `obj` canonically.
    ///
    /// # Errors
    ///
    /// `FloatRejected` for any non-integer number, `SerializationFailed` if
    /// `obj` does not serialize.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        Ok(Self(serde_jcs::to_vec(&value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(items) => items.iter().try_for_each(reject_floats),
    }
}
