//! Tab-separated morphological dictionary.
//!
//! One interpretation per line:
//!
//! ```text
//! form \t lemma \t tag [\t name [\t labels]]
//! ```
//!
//! `name` and `labels` are `|`-separated lists. Lines starting with `#!id` and
//! `#!copyright` (followed by a tab and the value) set metadata; any other
//! `#` line and blank lines are ignored. Multi-word units are written with
//! underscores (`na_przykład`).
//!
//! ## Invariants
//!
//! - Index vectors hold positions into `entries` in file order, so lookups are
//!   deterministic.
//! - `max_words` is the largest number of `_`-joined words in any form; the
//!   analyser never tries longer multi-word candidates.

use crate::MorphInfo;
use crate::engine::CaseHandling;
use crate::error::EngineError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const EMBEDDED: &str = include_str!("../../data/default.dict");

static BUILTIN: Lazy<Result<Arc<Dictionary>, String>> =
    Lazy::new(|| Dictionary::parse(EMBEDDED, "builtin").map(Arc::new).map_err(|err| err.to_string()));

/// One dictionary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    pub form: String,
    pub lemma: String,
    pub tag: String,
    pub name: Vec<String>,
    pub labels: Vec<String>,
}

impl DictEntry {
    pub fn to_morph(&self) -> MorphInfo {
        MorphInfo {
            form: self.form.clone(),
            lemma: self.lemma.clone(),
            tag: self.tag.clone(),
            name: self.name.clone(),
            labels: self.labels.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Index {
    exact: HashMap<String, Vec<usize>>,
    folded: HashMap<String, Vec<usize>>,
}

impl Index {
    fn insert(&mut self, key: &str, id: usize) {
        self.exact.entry(key.to_string()).or_default().push(id);
        self.folded.entry(key.to_lowercase()).or_default().push(id);
    }

    fn find(&self, key: &str, case: CaseHandling) -> &[usize] {
        let exact = || self.exact.get(key).map(Vec::as_slice).unwrap_or_default();
        let folded = || self.folded.get(&key.to_lowercase()).map(Vec::as_slice).unwrap_or_default();

        match case {
            CaseHandling::Strict => exact(),
            CaseHandling::Ignore => folded(),
            CaseHandling::Conditional => {
                let hits = exact();
                if hits.is_empty() { folded() } else { hits }
            }
        }
    }
}

/// In-memory dictionary with form and lemma indexes.
#[derive(Debug)]
pub struct Dictionary {
    id: String,
    copyright: Option<String>,
    entries: Vec<DictEntry>,
    by_form: Index,
    by_lemma: Index,
    max_words: usize,
}

impl Dictionary {
    /// The dictionary compiled into the binary.
    pub fn builtin() -> Result<Arc<Dictionary>, EngineError> {
        BUILTIN.clone().map_err(|reason| EngineError::DictionaryFormat { origin: "builtin".to_string(), line: 0, reason })
    }

    /// Load a dictionary file. Its id defaults to the file stem.
    pub fn load(path: &Path) -> Result<Dictionary, EngineError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| EngineError::DictionaryIo { path: path.to_path_buf(), source })?;
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "dictionary".to_string());

        Dictionary::parse(&source, &stem)
    }

    /// Parse dictionary text. `origin` names the source in error messages and
    /// is the id used when the text has no `#!id` header.
    pub fn parse(source: &str, origin: &str) -> Result<Dictionary, EngineError> {
        let mut dict = Dictionary {
            id: String::new(),
            copyright: None,
            entries: Vec::new(),
            by_form: Index::default(),
            by_lemma: Index::default(),
            max_words: 1,
        };

        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim_end_matches('\r');
            let malformed =
                |reason: &str| EngineError::DictionaryFormat { origin: origin.to_string(), line: line_no, reason: reason.to_string() };

            if let Some(header) = line.strip_prefix("#!") {
                let (key, value) = header.split_once('\t').ok_or_else(|| malformed("header without value"))?;
                match key {
                    "id" => dict.id = value.trim().to_string(),
                    "copyright" => dict.copyright = Some(value.trim().to_string()),
                    _ => return Err(malformed("unknown header")),
                }
                continue;
            }
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let form = fields.next().unwrap_or_default();
            let lemma = fields.next().ok_or_else(|| malformed("missing lemma"))?;
            let tag = fields.next().ok_or_else(|| malformed("missing tag"))?;
            if form.is_empty() || lemma.is_empty() || tag.is_empty() {
                return Err(malformed("empty form, lemma or tag"));
            }

            let entry = DictEntry {
                form: form.to_string(),
                lemma: lemma.to_string(),
                tag: tag.to_string(),
                name: split_list(fields.next().unwrap_or_default()),
                labels: split_list(fields.next().unwrap_or_default()),
            };
            dict.push(entry);
        }

        if dict.id.is_empty() {
            dict.id = origin.to_string();
        }
        Ok(dict)
    }

    fn push(&mut self, entry: DictEntry) {
        let id = self.entries.len();
        self.max_words = self.max_words.max(entry.form.split('_').count());
        self.by_form.insert(&entry.form, id);
        self.by_lemma.insert(&entry.lemma, id);
        self.entries.push(entry);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn copyright(&self) -> Option<&str> {
        self.copyright.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest multi-word form, in words.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Entries whose form matches `form` under `case`.
    pub fn lookup_form(&self, form: &str, case: CaseHandling) -> Vec<&DictEntry> {
        self.by_form.find(form, case).iter().map(|id| &self.entries[*id]).collect()
    }

    /// Entries whose lemma matches `lemma` under `case`.
    pub fn lookup_lemma(&self, lemma: &str, case: CaseHandling) -> Vec<&DictEntry> {
        self.by_lemma.find(lemma, case).iter().map(|id| &self.entries[*id]).collect()
    }
}

fn split_list(field: &str) -> Vec<String> {
    if field.is_empty() { Vec::new() } else { field.split('|').map(str::to_string).collect() }
}
