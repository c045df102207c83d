//! Dictionary-backed engine.
//!
//! A small analyser/generator over a [`Dictionary`], so the service works
//! without a native engine binding.
//!
//! Analysis pipeline for one call:
//!
//! ```text
//! text ── tokenize (words | whitespace runs | punctuation)
//!        │
//!        ├─ whitespace      -> skip / own `sp` segment / appended to previous form
//!        ├─ multi-word unit -> longest `w1_w2..` dictionary match, one segment
//!        └─ single token    -> dictionary readings, or one `ign` reading
//!        │
//!        v
//! segments ── numbered as DAG nodes (start, start + 1) ──> Vec<RawNode>
//! ```
//!
//! Honoured options: `case_handling`, `whitespace`, `expand_tags` and
//! `separate_numbering`. Every other key is accepted and ignored.

use super::dictionary::Dictionary;
use super::{CaseHandling, EngineConstant, EngineFactory, MorphEngine, TokenNumbering, WhitespaceHandling};
use crate::error::EngineError;
use crate::options::{EngineConfig, OptionValue};
use crate::{MorphInfo, RawInterp, RawNode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Version reported by the dictionary engine.
pub const BUILTIN_ENGINE_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-builtin");

const UNKNOWN_TAG: &str = "ign";
const WHITESPACE_TAG: &str = "sp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BuiltinOptions {
    case: CaseHandling,
    whitespace: WhitespaceHandling,
    numbering: TokenNumbering,
    expand_tags: bool,
}

impl BuiltinOptions {
    /// Missing keys fall back to engine defaults; present keys must have the
    /// expected type.
    fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            case: read(config, "case_handling", CaseHandling::Conditional, |v| match v {
                OptionValue::Constant(EngineConstant::CaseHandling(c)) => Some(c),
                _ => None,
            })?,
            whitespace: read(config, "whitespace", WhitespaceHandling::Skip, |v| match v {
                OptionValue::Constant(EngineConstant::Whitespace(w)) => Some(w),
                _ => None,
            })?,
            numbering: read(config, "separate_numbering", TokenNumbering::Separate, |v| match v {
                OptionValue::Bool(true) => Some(TokenNumbering::Separate),
                OptionValue::Bool(false) => Some(TokenNumbering::Continuous),
                _ => None,
            })?,
            expand_tags: read(config, "expand_tags", false, |v| match v {
                OptionValue::Bool(b) => Some(b),
                _ => None,
            })?,
        })
    }
}

fn read<T>(
    config: &EngineConfig,
    key: &'static str,
    default: T,
    extract: impl Fn(OptionValue) -> Option<T>,
) -> Result<T, EngineError> {
    match config.get(key) {
        None => Ok(default),
        Some(value) => extract(value).ok_or(EngineError::InvalidOption { key }),
    }
}

/// Split dot-separated tag alternatives into separate tags.
///
/// `subst:sg:nom.acc:m3` becomes `subst:sg:nom:m3` and `subst:sg:acc:m3`.
pub fn expand_tag(tag: &str) -> Vec<String> {
    let mut out = vec![String::new()];
    for (idx, part) in tag.split(':').enumerate() {
        out = out
            .iter()
            .flat_map(|prefix| {
                part.split('.').map(move |alt| if idx == 0 { alt.to_string() } else { format!("{prefix}:{alt}") })
            })
            .collect();
    }
    out
}

struct Segment {
    start: usize,
    end: usize,
    readings: Vec<MorphInfo>,
}

impl Segment {
    fn into_node(self) -> RawNode {
        let Segment { start, end, mut readings } = self;
        if readings.len() == 1 {
            let morph = readings.remove(0);
            RawNode::Single(RawInterp::Analysed { start, end, morph })
        } else {
            RawNode::Ambiguous(readings.into_iter().map(|morph| RawInterp::Analysed { start, end, morph }).collect())
        }
    }
}

/// Engine instance over a shared dictionary.
#[derive(Debug)]
pub struct DictionaryEngine {
    dict: Arc<Dictionary>,
    options: BuiltinOptions,
    next_node: usize,
}

impl DictionaryEngine {
    pub fn new(dict: Arc<Dictionary>, config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self { dict, options: BuiltinOptions::from_config(config)?, next_node: 0 })
    }

    fn segment(&mut self, readings: Vec<MorphInfo>) -> Segment {
        let start = self.next_node;
        self.next_node += 1;
        Segment { start, end: self.next_node, readings }
    }

    fn expand(&self, morph: MorphInfo) -> Vec<MorphInfo> {
        if !self.options.expand_tags || !morph.tag.contains('.') {
            return vec![morph];
        }
        expand_tag(&morph.tag).into_iter().map(|tag| MorphInfo { tag, ..morph.clone() }).collect()
    }

    /// Readings of `orth`, keeping the input spelling as the form.
    fn readings(&self, orth: &str) -> Vec<MorphInfo> {
        let entries = self.dict.lookup_form(orth, self.options.case);
        if entries.is_empty() {
            return vec![MorphInfo {
                form: orth.to_string(),
                lemma: orth.to_string(),
                tag: UNKNOWN_TAG.to_string(),
                name: Vec::new(),
                labels: Vec::new(),
            }];
        }

        entries
            .into_iter()
            .flat_map(|entry| self.expand(MorphInfo { form: orth.to_string(), ..entry.to_morph() }))
            .collect()
    }

    /// Longest multi-word unit starting at `tokens[0]`, as
    /// `(tokens consumed, readings)`.
    fn multiword(&self, tokens: &[&str]) -> Option<(usize, Vec<MorphInfo>)> {
        for words in (2..=self.dict.max_words()).rev() {
            let span = 2 * words - 1;
            if tokens.len() < span {
                continue;
            }
            let window = &tokens[..span];
            let shaped = window.iter().enumerate().all(|(idx, tok)| is_space(tok) == (idx % 2 == 1));
            if !shaped {
                continue;
            }

            let joined = window.iter().step_by(2).copied().collect::<Vec<_>>().join("_");
            let entries = self.dict.lookup_form(&joined, self.options.case);
            if !entries.is_empty() {
                let readings = entries
                    .into_iter()
                    .flat_map(|entry| self.expand(MorphInfo { form: joined.clone(), ..entry.to_morph() }))
                    .collect();
                return Some((span, readings));
            }
        }
        None
    }
}

fn is_space(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_whitespace)
}

impl MorphEngine for DictionaryEngine {
    fn analyse(&mut self, text: &str) -> Result<Vec<RawNode>, EngineError> {
        if self.options.numbering == TokenNumbering::Separate {
            self.next_node = 0;
        }

        let tokens: Vec<&str> = regex!(r"\w+|\s+|[^\w\s]").find_iter(text).map(|m| m.as_str()).collect();
        let mut segments: Vec<Segment> = Vec::new();
        let mut idx = 0;

        while idx < tokens.len() {
            let token = tokens[idx];

            if is_space(token) {
                match self.options.whitespace {
                    WhitespaceHandling::Skip => {}
                    WhitespaceHandling::Keep => {
                        let reading = MorphInfo {
                            form: token.to_string(),
                            lemma: token.to_string(),
                            tag: WHITESPACE_TAG.to_string(),
                            name: Vec::new(),
                            labels: Vec::new(),
                        };
                        let segment = self.segment(vec![reading]);
                        segments.push(segment);
                    }
                    WhitespaceHandling::Append => {
                        if let Some(last) = segments.last_mut() {
                            last.readings.iter_mut().for_each(|m| m.form.push_str(token));
                        }
                    }
                }
                idx += 1;
                continue;
            }

            let (consumed, readings) = match self.multiword(&tokens[idx..]) {
                Some(found) => found,
                None => (1, self.readings(token)),
            };
            let segment = self.segment(readings);
            segments.push(segment);
            idx += consumed;
        }

        Ok(segments.into_iter().map(Segment::into_node).collect())
    }

    fn generate(&mut self, title: &str) -> Result<Vec<MorphInfo>, EngineError> {
        let lemma = title.trim().replace(' ', "_");
        if lemma.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .dict
            .lookup_lemma(&lemma, self.options.case)
            .into_iter()
            .flat_map(|entry| self.expand(entry.to_morph()))
            .collect())
    }

    fn version(&self) -> String {
        BUILTIN_ENGINE_VERSION.to_string()
    }

    fn dict_id(&self) -> String {
        self.dict.id().to_string()
    }

    fn dict_copyright(&self) -> Option<String> {
        self.dict.copyright().map(str::to_string)
    }
}

/// Creates [`DictionaryEngine`]s, loading each dictionary file once.
#[derive(Debug, Default)]
pub struct BuiltinEngineFactory {
    cache: Mutex<HashMap<PathBuf, Arc<Dictionary>>>,
}

impl BuiltinEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn dictionary(&self, path: Option<&Path>) -> Result<Arc<Dictionary>, EngineError> {
        let Some(path) = path else {
            return Dictionary::builtin();
        };

        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(dict) = cache.get(path) {
            return Ok(Arc::clone(dict));
        }

        let dict = Arc::new(Dictionary::load(path)?);
        info!(path = %path.display(), id = dict.id(), entries = dict.len(), "dictionary loaded");
        cache.insert(path.to_path_buf(), Arc::clone(&dict));
        Ok(dict)
    }
}

impl EngineFactory for BuiltinEngineFactory {
    fn create(&self, config: &EngineConfig) -> Result<Box<dyn MorphEngine>, EngineError> {
        let dict = self.dictionary(config.dict_path())?;
        Ok(Box::new(DictionaryEngine::new(dict, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawParams;
    use crate::options::parse_request;

    fn engine(pairs: &[(&str, &str)]) -> Box<dyn MorphEngine> {
        let params: RawParams = pairs.iter().map(|(k, v)| (*k, *v)).chain([("action", "analyze"), ("text", "-")]).collect();
        let parsed = parse_request(&params, None);
        assert!(parsed.issues.errors.is_empty(), "{:?}", parsed.issues.errors);
        BuiltinEngineFactory::new().create(&parsed.config).unwrap()
    }

    fn tags(node: &RawNode) -> Vec<String> {
        node.interps().iter().map(|i| i.morph().tag.clone()).collect()
    }

    #[test]
    fn expand_tag_builds_cartesian_product() {
        assert_eq!(expand_tag("subst:sg:nom.acc:m3"), vec!["subst:sg:nom:m3", "subst:sg:acc:m3"]);
        assert_eq!(expand_tag("adj:sg.pl:nom.voc:f"), vec!["adj:sg:nom:f", "adj:sg:voc:f", "adj:pl:nom:f", "adj:pl:voc:f"]);
        assert_eq!(expand_tag("qub"), vec!["qub"]);
    }

    #[test]
    fn analyses_sentence_into_numbered_segments() {
        let dag = engine(&[]).analyse("Ala ma kota.").unwrap();

        assert_eq!(dag.len(), 4);
        assert!(matches!(&dag[0], RawNode::Single(RawInterp::Analysed { start: 0, end: 1, .. })));
        assert!(matches!(&dag[1], RawNode::Ambiguous(v) if v.len() == 2));
        assert_eq!(dag[3].interps()[0].span(), Some((3, 4)));
        assert_eq!(tags(&dag[3]), vec!["interp"]);
    }

    #[test]
    fn unknown_words_get_ign() {
        let dag = engine(&[]).analyse("zzyzx").unwrap();
        let RawNode::Single(interp) = &dag[0] else { panic!("single node expected") };
        assert_eq!(interp.morph().tag, "ign");
        assert_eq!(interp.morph().lemma, "zzyzx");
    }

    #[test]
    fn multiword_units_take_precedence() {
        let dag = engine(&[]).analyse("na przykład kot").unwrap();

        assert_eq!(dag.len(), 2);
        let RawNode::Single(interp) = &dag[0] else { panic!("single node expected") };
        assert_eq!(interp.morph().form, "na_przykład");
        assert_eq!(interp.morph().tag, "qub");
    }

    #[test]
    fn tag_expansion_multiplies_readings() {
        let plain = engine(&[]).analyse("Kraków").unwrap();
        assert_eq!(tags(&plain[0]), vec!["subst:sg:nom.acc:m3"]);

        let expanded = engine(&[("expandTags", "true")]).analyse("Kraków").unwrap();
        assert_eq!(tags(&expanded[0]), vec!["subst:sg:nom:m3", "subst:sg:acc:m3"]);
    }

    #[test]
    fn whitespace_policies() {
        assert_eq!(engine(&[]).analyse("kot  kot").unwrap().len(), 2);

        let kept = engine(&[("whitespaceHandling", "keep")]).analyse("kot  kot").unwrap();
        assert_eq!(kept.len(), 3);
        assert_eq!(tags(&kept[1]), vec!["sp"]);
        assert_eq!(kept[1].interps()[0].morph().form, "  ");

        let appended = engine(&[("whitespaceHandling", "append")]).analyse("kot  kot").unwrap();
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].interps()[0].morph().form, "kot  ");
    }

    #[test]
    fn case_policies() {
        assert_eq!(tags(&engine(&[]).analyse("KOT").unwrap()[0]), vec!["subst:sg:nom:m2"]);
        assert_eq!(tags(&engine(&[("caseHandling", "strict")]).analyse("KOT").unwrap()[0]), vec!["ign"]);
        assert_eq!(tags(&engine(&[("caseHandling", "ignore")]).analyse("KOT").unwrap()[0]), vec!["subst:sg:nom:m2"]);
    }

    #[test]
    fn numbering_policies() {
        let mut separate = engine(&[]);
        separate.analyse("kot kot").unwrap();
        assert_eq!(separate.analyse("kot").unwrap()[0].interps()[0].span(), Some((0, 1)));

        let mut continuous = engine(&[("tokenNumbering", "continuous")]);
        continuous.analyse("kot kot").unwrap();
        assert_eq!(continuous.analyse("kot").unwrap()[0].interps()[0].span(), Some((2, 3)));
    }

    #[test]
    fn generates_all_forms_of_lemma() {
        let mut e = engine(&[]);
        let forms = e.generate("Warszawa").unwrap();
        assert_eq!(forms.len(), 6);
        assert!(forms.iter().all(|m| m.lemma == "Warszawa"));

        assert_eq!(e.generate("na przykład").unwrap()[0].form, "na_przykład");
        assert!(e.generate("nieznane").unwrap().is_empty());
        assert!(e.generate("").unwrap().is_empty());
    }

    #[test]
    fn wrongly_typed_option_is_rejected() {
        let mut config = EngineConfig::new();
        config.set("case_handling", OptionValue::Bool(true));
        let err = BuiltinEngineFactory::new().create(&config).err().expect("error");
        assert!(matches!(err, EngineError::InvalidOption { key: "case_handling" }));
    }

    #[test]
    fn factory_caches_loaded_dictionaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.dict");
        std::fs::write(&path, "#!id\ttiny\npies\tpies\tsubst:sg:nom:m2\n").unwrap();

        let factory = BuiltinEngineFactory::new();
        let mut config = EngineConfig::new();
        config.set_dict_path(Some(path.clone()));

        let first = factory.create(&config).unwrap();
        assert_eq!(first.dict_id(), "tiny");
        assert!(first.dict_copyright().is_none());

        std::fs::remove_file(&path).unwrap();
        let second = factory.create(&config).unwrap();
        assert_eq!(second.dict_id(), "tiny");
    }
}
