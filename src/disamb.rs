//! Statistical disambiguation.
//!
//! A [`Disambiguator`] takes an analysis DAG and returns the same DAG with
//! every reading annotated by a probability and the selected reading marked.
//!
//! The disambiguator only understands DAGs produced under particular engine
//! settings. [`DISAMBIGUATION_FORBIDDEN`] lists the option values it cannot
//! cope with; when any of them is set, disambiguation is skipped silently and
//! the raw analysis is returned as is.

#[path = "disamb/process.rs"]
mod process;
#[path = "disamb/protocol.rs"]
mod protocol;

pub use process::ProcessDisambiguator;
pub use protocol::{decode_line, encode_dag, regroup};

use crate::RawNode;
use crate::engine::{EngineConstant, WhitespaceHandling};
use crate::error::DisambError;
use crate::options::{EngineConfig, OptionValue};

/// A disambiguation backend shared by all requests.
pub trait Disambiguator: Send + Sync {
    fn disambiguate(&self, dag: Vec<RawNode>) -> Result<Vec<RawNode>, DisambError>;
}

/// An engine option value that rules out disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForbiddenOption {
    pub key: &'static str,
    pub value: OptionValue,
}

/// Option values the disambiguator cannot work with: it expects expanded
/// tags, a collapsed DAG, split dots, split past-tense forms and no
/// whitespace segments.
pub const DISAMBIGUATION_FORBIDDEN: &[ForbiddenOption] = &[
    ForbiddenOption { key: "expand_tags", value: OptionValue::Bool(false) },
    ForbiddenOption { key: "expand_dag", value: OptionValue::Bool(true) },
    ForbiddenOption { key: "expand_dot", value: OptionValue::Bool(false) },
    ForbiddenOption { key: "praet", value: OptionValue::Str("composite") },
    ForbiddenOption { key: "whitespace", value: OptionValue::Constant(EngineConstant::Whitespace(WhitespaceHandling::Keep)) },
];

/// Keys of `table` whose forbidden value is currently set in `config`.
pub fn conflicts(config: &EngineConfig, table: &[ForbiddenOption]) -> Vec<&'static str> {
    table.iter().filter(|entry| config.get(entry.key) == Some(entry.value)).map(|entry| entry.key).collect()
}

/// Whether `config` allows disambiguation under the default table.
pub fn is_eligible(config: &EngineConfig) -> bool {
    conflicts(config, DISAMBIGUATION_FORBIDDEN).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawParams;
    use crate::options::parse_request;

    fn config(pairs: &[(&str, &str)]) -> EngineConfig {
        let params: RawParams = pairs.iter().map(|(k, v)| (*k, *v)).chain([("action", "analyze"), ("text", "x")]).collect();
        let parsed = parse_request(&params, None);
        assert!(parsed.issues.errors.is_empty(), "{:?}", parsed.issues.errors);
        parsed.config
    }

    #[test]
    fn defaults_are_not_eligible_because_tags_are_not_expanded() {
        assert_eq!(conflicts(&config(&[]), DISAMBIGUATION_FORBIDDEN), vec!["expand_tags"]);
    }

    #[test]
    fn expanded_tags_with_other_defaults_are_eligible() {
        assert!(is_eligible(&config(&[("expandTags", "true")])));
    }

    #[test]
    fn each_forbidden_value_blocks() {
        let cases: Vec<(&str, &str, &str)> = vec![
            ("expandDag", "true", "expand_dag"),
            ("expandDot", "false", "expand_dot"),
            ("pastTenseSegmentation", "composite", "praet"),
            ("whitespaceHandling", "keep", "whitespace"),
        ];

        for (param, value, key) in cases {
            let cfg = config(&[("expandTags", "true"), (param, value)]);
            assert_eq!(conflicts(&cfg, DISAMBIGUATION_FORBIDDEN), vec![key], "{param}={value}");
        }
    }

    #[test]
    fn other_whitespace_modes_are_allowed() {
        assert!(is_eligible(&config(&[("expandTags", "true"), ("whitespaceHandling", "append")])));
        assert!(is_eligible(&config(&[("expandTags", "true"), ("whitespaceHandling", "skip")])));
    }

    #[test]
    fn custom_table_is_honoured() {
        let table = [ForbiddenOption { key: "aggl", value: OptionValue::Str("permissive") }];
        assert!(conflicts(&config(&[("agglutinationRules", "permissive")]), &table) == vec!["aggl"]);
        assert!(conflicts(&config(&[]), &table).is_empty());
    }
}
