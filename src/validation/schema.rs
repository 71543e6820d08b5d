//! Envelope schemas, one per save format version
//!
//! Versions form a linear chain; [`SCHEMA_CHAIN`] lists them oldest first and
//! its last entry is [`CURRENT_VERSION`].

use std::collections::HashMap;

use serde_json::Value;

/// Schema version written by this build
pub const CURRENT_VERSION: &str = "2.0";

/// Every known version, oldest first
pub const SCHEMA_CHAIN: &[&str] = &["1.0", "1.1", "2.0"];

/// Top-level fields every envelope version has carried
pub const CORE_ENVELOPE_FIELDS: &[&str] = &["version", "timestamp", "checksum", "player", "world"];

/// JSON kind a required field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Any,
    String,
    Number,
    /// A number representable as `i64`
    Integer,
    Array,
    Object,
}

impl FieldKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }
}

/// A required field, optionally with a nested schema for object values
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nested: Option<Schema>,
}

/// Set of required fields for one JSON object
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a field of the given kind
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldRule {
            name,
            kind,
            nested: None,
        });
        self
    }

    /// Require an object field that must itself satisfy `nested`
    pub fn object(mut self, name: &'static str, nested: Schema) -> Self {
        self.fields.push(FieldRule {
            name,
            kind: FieldKind::Object,
            nested: Some(nested),
        });
        self
    }

    /// Collect the dotted paths of missing or mistyped fields under `prefix`
    pub fn collect_violations(&self, value: &Value, prefix: &str, out: &mut Vec<String>) {
        let Some(object) = value.as_object() else {
            out.push(if prefix.is_empty() {
                "<root>".to_string()
            } else {
                prefix.to_string()
            });
            return;
        };

        for rule in &self.fields {
            let path = if prefix.is_empty() {
                rule.name.to_string()
            } else {
                format!("{}.{}", prefix, rule.name)
            };

            match object.get(rule.name) {
                Some(child) if rule.kind.matches(child) => {
                    if let Some(nested) = &rule.nested {
                        nested.collect_violations(child, &path, out);
                    }
                }
                _ => out.push(path),
            }
        }
    }
}

/// Registry of envelope schemas keyed by version string
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Registry with every built-in save format version
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("1.0", envelope_v1_0());
        registry.register("1.1", envelope_v1_1());
        registry.register("2.0", envelope_v2_0());
        registry
    }

    pub fn register(&mut self, version: &str, schema: Schema) {
        self.schemas.insert(version.to_string(), schema);
    }

    pub fn get(&self, version: &str) -> Option<&Schema> {
        self.schemas.get(version)
    }

    pub fn contains(&self, version: &str) -> bool {
        self.schemas.contains_key(version)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn envelope_v1_0() -> Schema {
    Schema::new()
        .field("version", FieldKind::String)
        .field("timestamp", FieldKind::String)
        .field("checksum", FieldKind::String)
        .object(
            "player",
            Schema::new()
                .field("name", FieldKind::String)
                .field("health", FieldKind::Integer)
                .field("inventory", FieldKind::Array)
                .field("location", FieldKind::String),
        )
        .object(
            "world",
            Schema::new().field("current_location", FieldKind::String),
        )
}

// 1.1 added gold and the free-form metadata map
fn envelope_v1_1() -> Schema {
    Schema::new()
        .field("version", FieldKind::String)
        .field("timestamp", FieldKind::String)
        .field("checksum", FieldKind::String)
        .object("player", player_v1_1())
        .object(
            "world",
            Schema::new().field("current_location", FieldKind::String),
        )
        .field("metadata", FieldKind::Object)
}

// 2.0 added the world's location table
fn envelope_v2_0() -> Schema {
    Schema::new()
        .field("version", FieldKind::String)
        .field("timestamp", FieldKind::String)
        .field("checksum", FieldKind::String)
        .object("player", player_v1_1())
        .object(
            "world",
            Schema::new()
                .field("current_location", FieldKind::String)
                .field("locations", FieldKind::Object),
        )
        .field("metadata", FieldKind::Object)
}

fn player_v1_1() -> Schema {
    Schema::new()
        .field("name", FieldKind::String)
        .field("health", FieldKind::Integer)
        .field("inventory", FieldKind::Array)
        .field("location", FieldKind::String)
        .field("gold", FieldKind::Integer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_registry_covers_chain() {
        let registry = SchemaRegistry::builtin();
        for version in SCHEMA_CHAIN {
            assert!(registry.contains(version), "missing schema {}", version);
        }
        assert_eq!(SCHEMA_CHAIN.last(), Some(&CURRENT_VERSION));
    }

    #[test]
    fn test_collect_violations_reports_nested_paths() {
        let schema = SchemaRegistry::builtin().get("2.0").cloned().unwrap();
        let value = json!({
            "version": "2.0",
            "timestamp": "t",
            "checksum": "c",
            "player": {"name": "Kevin", "health": "full", "inventory": [], "location": "Village"},
            "world": {"current_location": "Village"},
            "metadata": {}
        });

        let mut violations = Vec::new();
        schema.collect_violations(&value, "", &mut violations);

        assert_eq!(
            violations,
            vec!["player.health", "player.gold", "world.locations"]
        );
    }

    #[test]
    fn test_integer_fields_reject_fractions() {
        assert!(FieldKind::Integer.matches(&json!(100)));
        assert!(FieldKind::Integer.matches(&json!(-3)));
        assert!(!FieldKind::Integer.matches(&json!(99.5)));
        assert!(!FieldKind::Integer.matches(&json!("100")));
        assert!(FieldKind::Number.matches(&json!(99.5)));

        let schema = SchemaRegistry::builtin().get("1.0").cloned().unwrap();
        let value = json!({
            "version": "1.0",
            "timestamp": "t",
            "checksum": "c",
            "player": {"name": "Kevin", "health": 99.5, "inventory": [], "location": "Village"},
            "world": {"current_location": "Village"}
        });
        let mut violations = Vec::new();
        schema.collect_violations(&value, "", &mut violations);
        assert_eq!(violations, vec!["player.health"]);
    }

    #[test]
    fn test_non_object_root() {
        let schema = SchemaRegistry::builtin().get("1.0").cloned().unwrap();
        let mut violations = Vec::new();
        schema.collect_violations(&json!([1, 2]), "", &mut violations);
        assert_eq!(violations, vec!["<root>"]);
    }
}
