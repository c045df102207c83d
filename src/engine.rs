//! Morphological engine contract.
//!
//! The service treats the analyser/generator as an opaque collaborator. It only
//! needs:
//!
//! - an [`EngineFactory`] that turns a validated [`EngineConfig`] into a fresh
//!   engine instance (one per request, released by `Drop`);
//! - a [`MorphEngine`] that analyses text into a DAG of [`RawNode`]s and
//!   generates word forms from a lemma.
//!
//! Option values that the engine represents as native constants are modelled by
//! the enums in this module and carried in the configuration as
//! [`EngineConstant`].
//!
//! A dictionary-backed implementation lives in `engine/builtin.rs`, with the
//! dictionary format itself in `engine/dictionary.rs`.

#[path = "engine/builtin.rs"]
mod builtin;
#[path = "engine/dictionary.rs"]
mod dictionary;

pub use builtin::{BUILTIN_ENGINE_VERSION, BuiltinEngineFactory, DictionaryEngine, expand_tag};
pub use dictionary::{DictEntry, Dictionary};

use crate::error::EngineError;
use crate::options::EngineConfig;
use crate::{MorphInfo, RawNode};

/// A morphological analyser/generator instance configured for one request.
pub trait MorphEngine {
    /// Analyse `text` into a DAG of segments.
    fn analyse(&mut self, text: &str) -> Result<Vec<RawNode>, EngineError>;

    /// Generate all forms of the lexeme named by `title`.
    fn generate(&mut self, title: &str) -> Result<Vec<MorphInfo>, EngineError>;

    /// Engine version string.
    fn version(&self) -> String;

    /// Identity of the loaded dictionary.
    fn dict_id(&self) -> String;

    /// Copyright notice of the loaded dictionary, when it has one.
    fn dict_copyright(&self) -> Option<String>;
}

/// Creates engine instances from a request configuration.
///
/// Factories are shared across concurrent requests; any pooling or caching
/// must be internally synchronized.
pub trait EngineFactory: Send + Sync {
    fn create(&self, config: &EngineConfig) -> Result<Box<dyn MorphEngine>, EngineError>;
}

// --- Engine constants ---------------------------------------------------------

/// Node numbering across successive analysis calls on one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenNumbering {
    Separate,
    Continuous,
}

/// Letter case policy for dictionary lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseHandling {
    /// Case-sensitive unless no exact match exists.
    Conditional,
    Strict,
    Ignore,
}

/// What happens to whitespace between tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhitespaceHandling {
    Skip,
    Append,
    Keep,
}

/// Native engine constant stored in an [`EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineConstant {
    TokenNumbering(TokenNumbering),
    CaseHandling(CaseHandling),
    Whitespace(WhitespaceHandling),
}
