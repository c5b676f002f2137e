#![forbid(unsafe_code)]

//! Block-type registry boundary.
//!
//! The document model does not know which block kinds exist or which
//! parameters they carry; that knowledge is supplied externally as a
//! schema (loading schema files is out of scope here — [`Schema`] is the
//! in-memory form). The model consumes the registry through the narrow
//! [`TypeRegistry`] trait: parameter defaults for `add`/`set_defaults`,
//! and the required-text flag per kind.
//!
//! Incoming parameter bags are validated at this boundary. Validation
//! failures are data problems, reported as values — never panics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::{Block, ParamValue};

/// Declaration of one type-specific parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, unique within its kind.
    pub name: String,
    /// Declared default. Kinds may declare a parameter without a default.
    #[serde(default)]
    pub default: Option<ParamValue>,
}

impl ParamSpec {
    /// Create a spec with no declared default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Create a spec with a declared default.
    #[must_use]
    pub fn with_default(name: impl Into<String>, default: ParamValue) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }

    /// The value `set_defaults` fills in: the declared default, or empty
    /// text when none is declared.
    #[must_use]
    pub fn default_value(&self) -> ParamValue {
        self.default
            .clone()
            .unwrap_or_else(|| ParamValue::Text(String::new()))
    }
}

/// Declaration of one block kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSpec {
    /// Kind name, the key blocks carry in their `kind` field.
    pub name: String,
    /// Whether blocks of this kind semantically require text content.
    #[serde(default)]
    pub requires_text: bool,
    /// Parameters that apply to this kind.
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl KindSpec {
    /// Create a kind with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, requires_text: bool) -> Self {
        Self {
            name: name.into(),
            requires_text,
            params: Vec::new(),
        }
    }

    /// Add a parameter declaration.
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }
}

/// Lookup surface the document model consumes.
///
/// Unknown kinds are an expected condition at this boundary: they yield no
/// parameters and no text requirement rather than an error, so a document
/// loaded against a narrower schema still round-trips.
pub trait TypeRegistry {
    /// Parameter declarations for a kind. Empty for unknown kinds.
    fn defaults(&self, kind: &str) -> &[ParamSpec];

    /// Whether a kind requires text content. False for unknown kinds.
    fn requires_text(&self, kind: &str) -> bool;
}

/// Validation failure for an incoming block against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The block's kind is not declared by the schema.
    UnknownKind(String),
    /// The block carries a parameter its kind does not declare.
    UnknownParam { kind: String, param: String },
    /// A parameter value's shape differs from the declared default's.
    ValueShape {
        kind: String,
        param: String,
        expected: &'static str,
    },
    /// The kind requires text but the block has none.
    MissingText(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind(kind) => write!(f, "unknown block kind '{}'", kind),
            Self::UnknownParam { kind, param } => {
                write!(f, "kind '{}' does not declare parameter '{}'", kind, param)
            }
            Self::ValueShape {
                kind,
                param,
                expected,
            } => write!(
                f,
                "parameter '{}' of kind '{}' expects a {} value",
                param, kind, expected
            ),
            Self::MissingText(kind) => write!(f, "kind '{}' requires text content", kind),
        }
    }
}

impl std::error::Error for SchemaError {}

/// In-memory block-type schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    kinds: BTreeMap<String, KindSpec>,
}

impl Schema {
    /// Build a schema from kind declarations. Later duplicates win.
    #[must_use]
    pub fn from_specs(specs: impl IntoIterator<Item = KindSpec>) -> Self {
        let kinds = specs
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect();
        Self { kinds }
    }

    /// The fallback schema used when no schema file is supplied: plain
    /// narrative text, quoted dialogue with a speaker, and stage commands.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_specs([
            KindSpec::new("narrative", true),
            KindSpec::new("dialogue", true).with_param(ParamSpec::with_default(
                "speaker",
                ParamValue::Text(String::new()),
            )),
            KindSpec::new("command", false)
                .with_param(ParamSpec::with_default(
                    "verb",
                    ParamValue::Text(String::new()),
                ))
                .with_param(ParamSpec::with_default(
                    "target",
                    ParamValue::Text(String::new()),
                )),
        ])
    }

    /// Look up a kind declaration.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    /// Iterate declared kind names in sorted order.
    pub fn kind_names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Validate an incoming block's kind and parameter bag.
    ///
    /// Shape checking compares against the declared default's shape; a
    /// parameter declared without a default accepts any shape.
    pub fn validate(&self, block: &Block) -> Result<(), SchemaError> {
        let Some(spec) = self.kinds.get(&block.kind) else {
            return Err(SchemaError::UnknownKind(block.kind.clone()));
        };
        if spec.requires_text && block.text.is_none() {
            return Err(SchemaError::MissingText(block.kind.clone()));
        }
        for (name, value) in &block.params {
            let Some(param) = spec.params.iter().find(|p| &p.name == name) else {
                return Err(SchemaError::UnknownParam {
                    kind: block.kind.clone(),
                    param: name.clone(),
                });
            };
            if let Some(default) = &param.default {
                if !default.same_shape(value) {
                    return Err(SchemaError::ValueShape {
                        kind: block.kind.clone(),
                        param: name.clone(),
                        expected: default.shape(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl TypeRegistry for Schema {
    fn defaults(&self, kind: &str) -> &[ParamSpec] {
        match self.kinds.get(kind) {
            Some(spec) => &spec.params,
            None => &[],
        }
    }

    fn requires_text(&self, kind: &str) -> bool {
        self.kinds.get(kind).is_some_and(|spec| spec.requires_text)
    }
}

// ============================================================================
// Tests
// ============================================================================
