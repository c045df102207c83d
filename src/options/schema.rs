//! Declarative catalogue of request parameters.
//!
//! Each [`OptionSpec`] names a request parameter, the engine key it writes and
//! the value domain it accepts. The parser walks [`SCHEMA`] in declaration
//! order, so error messages come out in this order too.

use crate::engine::{CaseHandling, EngineConstant, TokenNumbering, WhitespaceHandling};

/// Accepted `action` values.
pub const ACTIONS: &[&str] = &["analyze", "generate"];

pub const AGGLUTINATION_RULES: &[&str] = &["strict", "isolated", "permissive"];
pub const PAST_TENSE_SEGMENTATION: &[&str] = &["split", "composite"];

pub const TOKEN_NUMBERING: &[(&str, EngineConstant)] = &[
    ("separate", EngineConstant::TokenNumbering(TokenNumbering::Separate)),
    ("continuous", EngineConstant::TokenNumbering(TokenNumbering::Continuous)),
];

pub const CASE_HANDLING: &[(&str, EngineConstant)] = &[
    ("conditional", EngineConstant::CaseHandling(CaseHandling::Conditional)),
    ("strict", EngineConstant::CaseHandling(CaseHandling::Strict)),
    ("ignore", EngineConstant::CaseHandling(CaseHandling::Ignore)),
];

pub const WHITESPACE_HANDLING: &[(&str, EngineConstant)] = &[
    ("skip", EngineConstant::Whitespace(WhitespaceHandling::Skip)),
    ("append", EngineConstant::Whitespace(WhitespaceHandling::Append)),
    ("keep", EngineConstant::Whitespace(WhitespaceHandling::Keep)),
];

/// How a closed-enum parameter is written into the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolOutput {
    /// Write the symbol's engine constant.
    Constant,
    /// Write `true` iff the chosen symbol is the named one.
    FlagFor(&'static str),
}

/// Value domain of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool { default: bool },
    Choice { accepted: &'static [&'static str], default: &'static str },
    Symbol { symbols: &'static [(&'static str, EngineConstant)], default: &'static str, output: SymbolOutput },
}

/// One recognized request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    /// Name in the request.
    pub url_name: &'static str,
    /// Name in the engine configuration.
    pub target_key: &'static str,
    pub kind: OptionKind,
}

const fn flag(url_name: &'static str, target_key: &'static str, default: bool) -> OptionSpec {
    OptionSpec { url_name, target_key, kind: OptionKind::Bool { default } }
}

const fn choice(
    url_name: &'static str,
    target_key: &'static str,
    accepted: &'static [&'static str],
    default: &'static str,
) -> OptionSpec {
    OptionSpec { url_name, target_key, kind: OptionKind::Choice { accepted, default } }
}

const fn symbol(
    url_name: &'static str,
    target_key: &'static str,
    symbols: &'static [(&'static str, EngineConstant)],
    default: &'static str,
    output: SymbolOutput,
) -> OptionSpec {
    OptionSpec { url_name, target_key, kind: OptionKind::Symbol { symbols, default, output } }
}

/// All option parameters, in validation order.
pub const SCHEMA: &[OptionSpec] = &[
    flag("expandDag", "expand_dag", false),
    flag("expandTags", "expand_tags", false),
    flag("expandDot", "expand_dot", true),
    flag("expandUnderscore", "expand_underscore", true),
    choice("agglutinationRules", "aggl", AGGLUTINATION_RULES, "strict"),
    choice("pastTenseSegmentation", "praet", PAST_TENSE_SEGMENTATION, "split"),
    symbol("tokenNumbering", "separate_numbering", TOKEN_NUMBERING, "separate", SymbolOutput::FlagFor("separate")),
    symbol("caseHandling", "case_handling", CASE_HANDLING, "conditional", SymbolOutput::Constant),
    symbol("whitespaceHandling", "whitespace", WHITESPACE_HANDLING, "skip", SymbolOutput::Constant),
];

impl OptionSpec {
    /// Accepted spellings, in declaration order.
    pub fn accepted(&self) -> Vec<&'static str> {
        match self.kind {
            OptionKind::Bool { .. } => vec!["true", "false"],
            OptionKind::Choice { accepted, .. } => accepted.to_vec(),
            OptionKind::Symbol { symbols, .. } => symbols.iter().map(|(name, _)| *name).collect(),
        }
    }
}

/// Look up a schema entry by request parameter name.
pub fn find(url_name: &str) -> Option<&'static OptionSpec> {
    SCHEMA.iter().find(|spec| spec.url_name == url_name)
}
