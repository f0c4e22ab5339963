//! Canonical cache keys
//!
//! Parameters are converted to a `serde_json::Value` (whose object keys are
//! kept sorted), serialized, and hashed together with the calculator name. Two
//! parameter sets that differ only in field order therefore hash identically.
//! Negative zero is folded into zero. Defaults that only a calculator knows
//! about are resolved by the caller before deriving a key.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of (calculator name, canonical parameters), hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for any serializable parameter set
    pub fn derive<P: Serialize>(function_name: &str, params: &P) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_value(params)?;
        Ok(Self::from_canonical(function_name, &canonical))
    }

    /// Key for a value that is already a JSON document, in any field order
    pub fn from_json(function_name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let canonical: Value = serde_json::from_str(json)?;
        Ok(Self::from_canonical(function_name, &canonical))
    }

    fn from_canonical(function_name: &str, canonical: &Value) -> Self {
        let mut canonical = canonical.clone();
        fold_negative_zero(&mut canonical);

        let mut hasher = Sha256::new();
        hasher.update(function_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical.to_string().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn fold_negative_zero(value: &mut Value) {
    if matches!(value, Value::Number(n) if n.is_f64() && n.as_f64() == Some(0.0)) {
        *value = Value::from(0.0);
        return;
    }
    match value {
        Value::Array(items) => items.iter_mut().for_each(fold_negative_zero),
        Value::Object(fields) => fields.values_mut().for_each(fold_negative_zero),
        _ => {}
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
