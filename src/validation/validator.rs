//! Envelope validator and checksum calculator
//!
//! The validator never fails loudly: structural gaps and checksum mismatches
//! are reported as `bool` or as a list of offending paths, and callers turn
//! them into their own error kinds.

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::schema::SchemaRegistry;

/// Name of the top-level field excluded from the checksum
pub const CHECKSUM_FIELD: &str = "checksum";

/// Schema-driven structural checker and checksum calculator/verifier
#[derive(Debug, Clone, Default)]
pub struct Validator {
    registry: SchemaRegistry,
}

impl Validator {
    /// Validator with the built-in schemas
    pub fn new() -> Self {
        Self::with_registry(SchemaRegistry::builtin())
    }

    pub fn with_registry(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn is_known_version(&self, version: &str) -> bool {
        self.registry.contains(version)
    }

    /// Check every field required by the schema for `version`
    ///
    /// Extra fields are ignored. An unregistered version never validates.
    pub fn validate(&self, envelope: &Value, version: &str) -> bool {
        self.registry.contains(version) && self.missing_fields(envelope, version).is_empty()
    }

    /// Dotted paths of required fields that are absent or of the wrong kind
    pub fn missing_fields(&self, envelope: &Value, version: &str) -> Vec<String> {
        let mut violations = Vec::new();
        match self.registry.get(version) {
            Some(schema) => schema.collect_violations(envelope, "", &mut violations),
            None => violations.push("version".to_string()),
        }
        violations
    }

    /// SHA-256 over the canonical form of `envelope` minus its checksum field
    pub fn calculate_checksum(&self, envelope: &Value) -> String {
        let canonical = canonical_json(envelope, Some(CHECKSUM_FIELD));
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{:x}", digest)
    }

    /// Recompute the checksum and compare it with the stored one
    pub fn verify_checksum(&self, envelope: &Value) -> bool {
        match envelope.get(CHECKSUM_FIELD).and_then(Value::as_str) {
            Some(stored) => stored == self.calculate_checksum(envelope),
            None => false,
        }
    }
}

/// Compact JSON with object keys sorted at every level
///
/// `skip_top_level` names a key of the root object to leave out.
pub fn canonical_json(value: &Value, skip_top_level: Option<&str>) -> String {
    let mut out = String::new();
    write_canonical(value, skip_top_level, &mut out);
    out
}

fn write_canonical(value: &Value, skip: Option<&str>, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .keys()
                .filter(|k| Some(k.as_str()) != skip)
                .collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], None, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, None, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
