use crate::error::ServiceError;
use crate::normalize;
use crate::options;
use crate::orchestrator::{Orchestrator, RawOutput};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Flat string parameters of one request, in the order they were received.
///
/// When a key occurs more than once the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    entries: Vec<(String, String)>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter unless `key` is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.get(&key).is_none() {
            self.entries.push((key, value.into()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_entry(key).map(|(_, v)| v)
    }

    /// Stored key and value for `key`, borrowed from this mapping.
    pub fn get_entry(&self, key: &str) -> Option<(&str, &str)> {
        self.entries.iter().find(|(k, _)| k == key).map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build parameters from a JSON object body.
    ///
    /// Strings are taken verbatim, other scalars by their JSON text and `null`
    /// becomes an empty string.
    pub fn from_json_object(object: serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RawParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// One morphological reading, as returned to clients.
///
/// `start`/`end` are present for analysis only; `probability` and
/// `disambiguated` only when the disambiguator ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    pub form: String,
    pub lemma: String,
    pub tag: String,
    pub name: Vec<String>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disambiguated: Option<bool>,
}

/// One analysed DAG node: a single reading, or the competing readings of an
/// ambiguous node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEntry {
    Single(Interpretation),
    Alternatives(Vec<Interpretation>),
}

/// Response payload. Both variants serialize as plain JSON arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Results {
    Analysis(Vec<ResultEntry>),
    /// One list of generated forms per requested title, in request order.
    Generation(Vec<Vec<Interpretation>>),
}

impl Default for Results {
    fn default() -> Self {
        Results::Analysis(Vec::new())
    }
}

impl Results {
    pub fn len(&self) -> usize {
        match self {
            Results::Analysis(entries) => entries.len(),
            Results::Generation(titles) => titles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Response body. Presence of `errors` means the request never produced
/// results; `warnings` is independent of success.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub results: Results,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl Response {
    /// Response for a request that failed outside of validation.
    pub fn failure(err: &ServiceError) -> Self {
        let mut response = Response::default();
        response.fail(err);
        response
    }

    /// Drop any results and metadata and report `err` as the only error.
    /// Warnings are kept.
    pub fn fail(&mut self, err: &ServiceError) {
        self.results = Results::default();
        self.errors = Some(vec![err.report()]);
        self.version = None;
        self.dictionary_id = None;
        self.copyright = None;
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_none()
    }
}

/// The request pipeline: parse, validate, run, normalize.
pub struct Service {
    orchestrator: Orchestrator,
    dict_path: Option<PathBuf>,
}

impl Service {
    /// `dict_path` is the deployment dictionary, injected into every request
    /// configuration.
    pub fn new(orchestrator: Orchestrator, dict_path: Option<PathBuf>) -> Self {
        Self { orchestrator, dict_path }
    }

    /// Process one request. Never fails: every problem ends up in `errors`.
    pub fn process(&self, params: &RawParams) -> Response {
        let parsed = options::parse_request(params, self.dict_path.clone());
        let mut response = Response::default();

        if !parsed.validate(&mut response) {
            debug!(errors = parsed.issues.errors.len(), "request rejected by validation");
            return response;
        }
        let Some(action) = parsed.action.as_ref() else {
            return response;
        };

        match self.orchestrator.run(&parsed.config, action) {
            Ok(run) => {
                response.results = match run.output {
                    RawOutput::Analysis(dag) => Results::Analysis(normalize::normalize_dag(&dag)),
                    RawOutput::Generation(forms) => Results::Generation(normalize::normalize_generated(&forms)),
                };
                response.version = Some(run.metadata.version);
                response.dictionary_id = Some(run.metadata.dictionary_id);
                response.copyright = run.metadata.copyright;
            }
            Err(err) => {
                warn!(action = action.name(), error = %err, "engine invocation failed");
                response.fail(&err);
            }
        }

        response
    }
}
