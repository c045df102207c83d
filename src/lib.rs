//! HTTP front-end for a morphological analyser/generator.
//!
//! A request is a flat mapping of string parameters. It is validated against a
//! declarative option schema, turned into an engine configuration, handed to a
//! morphological engine (optionally followed by a statistical disambiguator)
//! and the engine output is flattened into one response schema:
//!
//! ```text
//! RawParams ── options::parse_request ──> EngineConfig + Issues + Action
//!                                             │ (validate gate)
//!                                             v
//!                              Orchestrator::run (engine, disambiguator)
//!                                             │
//!                                             v
//!                                normalize::* ──> Response
//! ```

#[macro_use]
mod macros;
pub mod api;
pub mod config;
pub mod disamb;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod options;
pub mod orchestrator;
pub mod server;

pub use api::{Interpretation, RawParams, Response, ResultEntry, Results, Service};
pub use config::ServiceConfig;
pub use error::{ConfigError, DisambError, EngineError, ServiceError};
pub use options::{Action, EngineConfig, Issues, OptionValue, ParsedRequest, parse_request};
pub use orchestrator::Orchestrator;

// --- Raw engine output --------------------------------------------------------

/// Morphological description of one reading, as produced by an engine.
///
/// `form` and `lemma` keep the engine's internal spelling: multi-word units
/// are joined with underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphInfo {
    pub form: String,
    pub lemma: String,
    pub tag: String,
    pub name: Vec<String>,
    pub labels: Vec<String>,
}

/// One raw interpretation record. Each shape the engine (or disambiguator)
/// can hand back has its own constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInterp {
    /// Analysis without disambiguation.
    Analysed { start: usize, end: usize, morph: MorphInfo },
    /// Analysis annotated by the disambiguator. `disamb` is present only on
    /// the selected reading.
    Disambiguated { start: usize, end: usize, morph: MorphInfo, probability: f64, weight: f64, disamb: Option<String> },
    /// Generated form (no position, no probability).
    Generated(MorphInfo),
}

impl RawInterp {
    pub fn morph(&self) -> &MorphInfo {
        match self {
            RawInterp::Analysed { morph, .. } | RawInterp::Disambiguated { morph, .. } => morph,
            RawInterp::Generated(morph) => morph,
        }
    }

    /// DAG node span, if the record carries one.
    pub fn span(&self) -> Option<(usize, usize)> {
        match self {
            RawInterp::Analysed { start, end, .. } | RawInterp::Disambiguated { start, end, .. } => Some((*start, *end)),
            RawInterp::Generated(_) => None,
        }
    }
}

/// One DAG node: either a single reading or a set of competing readings.
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Single(RawInterp),
    Ambiguous(Vec<RawInterp>),
}

impl RawNode {
    /// Interpretations of this node in order.
    pub fn interps(&self) -> &[RawInterp] {
        match self {
            RawNode::Single(interp) => std::slice::from_ref(interp),
            RawNode::Ambiguous(interps) => interps,
        }
    }

    /// Number of interpretations held by this node.
    pub fn len(&self) -> usize {
        self.interps().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interps().is_empty()
    }
}
