//! Request option parser.
//!
//! The parser never mutates the caller's parameters. It records which keys it
//! read; whatever was never read is reported as an unknown parameter.

use super::schema::{ACTIONS, OptionKind, OptionSpec, SCHEMA, SymbolOutput};
use super::{Action, EngineConfig, Issues, OptionValue};
use crate::api::{RawParams, Response};
use std::collections::HashSet;
use std::path::PathBuf;

/// Outcome of parsing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub config: EngineConfig,
    pub issues: Issues,
    /// `None` when the action or its payload was missing or invalid.
    pub action: Option<Action>,
}

impl ParsedRequest {
    /// Copy issues into `response`. Returns `true` when the request may go on
    /// to the engine.
    ///
    /// `errors` is written only when there are fatal issues; `warnings` is
    /// written whenever unknown parameters were seen, independently.
    pub fn validate(&self, response: &mut Response) -> bool {
        let mut success = true;

        if self.issues.has_errors() {
            response.errors = Some(self.issues.errors.clone());
            success = false;
        }

        if !self.issues.warnings.is_empty() {
            response.warnings = Some(self.issues.warnings.clone());
        }

        success && self.action.is_some()
    }
}

/// Parse `params` against the option schema and the action parameter.
///
/// `dict_path` comes from the deployment environment, never from the request.
pub fn parse_request(params: &RawParams, dict_path: Option<PathBuf>) -> ParsedRequest {
    let mut parser = OptionParser::new(params);

    for spec in SCHEMA {
        parser.parse_option(spec);
    }
    let action = parser.parse_action("action");

    let OptionParser { mut config, mut issues, consumed, .. } = parser;
    config.set_dict_path(dict_path);

    issues.warnings = params
        .iter()
        .filter(|(key, _)| !consumed.contains(key))
        .map(|(key, value)| format!("unknown parameter \"{key}={value}\""))
        .collect();

    ParsedRequest { config, issues, action }
}

/// Strict string-to-boolean conversion.
///
/// Accepts `y yes t true on 1` and `n no f false off 0`, in any letter case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

struct OptionParser<'a> {
    params: &'a RawParams,
    consumed: HashSet<&'a str>,
    config: EngineConfig,
    issues: Issues,
}

impl<'a> OptionParser<'a> {
    fn new(params: &'a RawParams) -> Self {
        Self { params, consumed: HashSet::new(), config: EngineConfig::new(), issues: Issues::default() }
    }

    /// Read a parameter and mark it as recognized.
    fn take(&mut self, name: &str) -> Option<&'a str> {
        let (key, value) = self.params.get_entry(name)?;
        self.consumed.insert(key);
        Some(value)
    }

    fn report_unsupported(&mut self, param: &str, value: &str, accepted: &[&str]) {
        let available = accepted.iter().map(|s| format!("\"{s}\"")).collect::<Vec<_>>().join(", ");
        self.issues.errors.push(format!("unsupported value \"{value}\" for parameter \"{param}\"; available: {available}"));
    }

    fn parse_option(&mut self, spec: &OptionSpec) {
        let raw = self.take(spec.url_name);

        match spec.kind {
            OptionKind::Bool { default } => {
                let value = match raw {
                    None => default,
                    Some(raw) => match parse_bool(raw) {
                        Some(b) => b,
                        None => {
                            self.issues
                                .errors
                                .push(format!("invalid boolean value \"{raw}\" for parameter \"{}\"", spec.url_name));
                            return;
                        }
                    },
                };
                self.config.set(spec.target_key, OptionValue::Bool(value));
            }
            OptionKind::Choice { accepted, default } => {
                let value = match raw {
                    None => default,
                    Some(raw) => match accepted.iter().find(|candidate| **candidate == raw) {
                        Some(found) => *found,
                        None => {
                            self.report_unsupported(spec.url_name, raw, accepted);
                            return;
                        }
                    },
                };
                self.config.set(spec.target_key, OptionValue::Str(value));
            }
            OptionKind::Symbol { symbols, default, output } => {
                let name = raw.unwrap_or(default);
                let Some((symbol, constant)) = symbols.iter().find(|(symbol, _)| *symbol == name) else {
                    self.report_unsupported(spec.url_name, name, &spec.accepted());
                    return;
                };

                let value = match output {
                    SymbolOutput::Constant => OptionValue::Constant(*constant),
                    SymbolOutput::FlagFor(designated) => OptionValue::Bool(*symbol == designated),
                };
                self.config.set(spec.target_key, value);
            }
        }
    }

    fn parse_action(&mut self, param: &str) -> Option<Action> {
        let Some(value) = self.take(param) else {
            self.issues.errors.push(format!("missing mandatory \"{param}\" parameter"));
            return None;
        };

        if !ACTIONS.iter().any(|action| *action == value) {
            let available = ACTIONS.iter().map(|s| format!("\"{s}\"")).collect::<Vec<_>>().join(", ");
            self.issues.errors.push(format!("unsupported action \"{value}\"; available: {available}"));
            return None;
        }

        let analyze = value == "analyze";
        self.config.set("analyse", OptionValue::Bool(analyze));
        self.config.set("generate", OptionValue::Bool(!analyze));

        if analyze {
            match self.take("text") {
                Some(text) => Some(Action::Analyze { text: text.to_string() }),
                None => {
                    self.issues.errors.push("missing mandatory \"text\" parameter".to_string());
                    None
                }
            }
        } else {
            match self.take("titles") {
                Some(titles) => Some(Action::Generate { titles: titles.split('|').map(str::to_string).collect() }),
                None => {
                    self.issues.errors.push("missing mandatory \"titles\" parameter".to_string());
                    None
                }
            }
        }
    }
}
