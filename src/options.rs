//! Request options: schema, parser and the resulting engine configuration.
//!
//! Parsing is a single pass over the declarative [`SCHEMA`] followed by the
//! action parameter:
//!
//! ```text
//! RawParams ──┬─ SCHEMA (declaration order) ──> EngineConfig keys
//!             ├─ action / text / titles     ──> Action
//!             └─ keys never read            ──> warnings
//! ```
//!
//! Every problem is collected into [`Issues`]; nothing short-circuits. The
//! caller inspects the outcome exactly once through [`ParsedRequest::validate`].
//!
//! Absent parameters fall back to the default declared in the schema, so the
//! configuration always carries the full key set.

#[path = "options/parser.rs"]
mod parser;
#[path = "options/schema.rs"]
mod schema;


pub use parser::{ParsedRequest, parse_bool, parse_request};
pub use schema::{ACTIONS, OptionKind, OptionSpec, SCHEMA, SymbolOutput, find as find_option};

use crate::engine::EngineConstant;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Typed value of one engine option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionValue {
    Bool(bool),
    Str(&'static str),
    Constant(EngineConstant),
}

/// Engine configuration built from one request.
///
/// Keys are the engine's option names (not the request parameter names).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    values: BTreeMap<&'static str, OptionValue>,
    dict_path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &'static str, value: OptionValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<OptionValue> {
        self.values.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            OptionValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&'static str> {
        match self.get(key)? {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn constant(&self, key: &str) -> Option<EngineConstant> {
        match self.get(key)? {
            OptionValue::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Dictionary to load; `None` means the engine's built-in dictionary.
    pub fn dict_path(&self) -> Option<&Path> {
        self.dict_path.as_deref()
    }

    pub fn set_dict_path(&mut self, path: Option<PathBuf>) {
        self.dict_path = path;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Problems found while parsing a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issues {
    /// Fatal: the request cannot reach the engine.
    pub errors: Vec<String>,
    /// Non-fatal: unknown parameters.
    pub warnings: Vec<String>,
}

impl Issues {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Requested operation together with its mandatory payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Analyze { text: String },
    Generate { titles: Vec<String> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Analyze { .. } => "analyze",
            Action::Generate { .. } => "generate",
        }
    }
}
