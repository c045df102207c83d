//! Engine invocation for one validated request.
//!
//! The orchestrator owns the two shared collaborators: the engine factory and
//! the optional disambiguator. Every call creates a fresh engine from the
//! request configuration, runs the action, collects the engine metadata and
//! drops the instance before returning.

use crate::disamb::{self, DISAMBIGUATION_FORBIDDEN, Disambiguator};
use crate::engine::{EngineFactory, MorphEngine};
use crate::error::ServiceError;
use crate::options::{Action, EngineConfig};
use crate::{MorphInfo, RawNode};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Raw engine output, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    Analysis(Vec<RawNode>),
    /// One form list per title, in request order.
    Generation(Vec<Vec<MorphInfo>>),
}

/// Engine and dictionary identity reported with every successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub version: String,
    pub dictionary_id: String,
    pub copyright: Option<String>,
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRun {
    pub output: RawOutput,
    pub metadata: Metadata,
}

pub struct Orchestrator {
    factory: Arc<dyn EngineFactory>,
    disambiguator: Option<Arc<dyn Disambiguator>>,
}

impl Orchestrator {
    pub fn new(factory: Arc<dyn EngineFactory>, disambiguator: Option<Arc<dyn Disambiguator>>) -> Self {
        Self { factory, disambiguator }
    }

    /// Run `action` on a new engine configured by `config`.
    pub fn run(&self, config: &EngineConfig, action: &Action) -> Result<EngineRun, ServiceError> {
        let started = Instant::now();
        let mut engine = self.factory.create(config)?;

        let output = match action {
            Action::Analyze { text } => RawOutput::Analysis(self.analyse(engine.as_mut(), config, text)?),
            Action::Generate { titles } => {
                let mut forms = Vec::with_capacity(titles.len());
                for title in titles {
                    forms.push(engine.generate(title)?);
                }
                RawOutput::Generation(forms)
            }
        };

        let metadata = Metadata {
            version: engine.version(),
            dictionary_id: engine.dict_id(),
            copyright: engine.dict_copyright(),
        };

        debug!(action = action.name(), elapsed = ?started.elapsed(), "engine run finished");
        Ok(EngineRun { output, metadata })
    }

    fn analyse(&self, engine: &mut dyn MorphEngine, config: &EngineConfig, text: &str) -> Result<Vec<RawNode>, ServiceError> {
        let dag = engine.analyse(text)?;

        let Some(disambiguator) = &self.disambiguator else {
            return Ok(dag);
        };
        let conflicts = disamb::conflicts(config, DISAMBIGUATION_FORBIDDEN);
        if !conflicts.is_empty() {
            debug!(?conflicts, "disambiguation skipped");
            return Ok(dag);
        }

        Ok(disambiguator.disambiguate(dag)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawParams;
    use crate::error::{DisambError, EngineError};
    use crate::options::parse_request;
    use crate::RawInterp;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn morph(form: &str, tag: &str) -> MorphInfo {
        MorphInfo { form: form.to_string(), lemma: form.to_string(), tag: tag.to_string(), name: vec![], labels: vec![] }
    }

    struct StubEngine {
        fail: bool,
    }

    impl MorphEngine for StubEngine {
        fn analyse(&mut self, text: &str) -> Result<Vec<RawNode>, EngineError> {
            if self.fail {
                return Err(EngineError::InvalidOption { key: "expand_tags" });
            }
            Ok(text
                .split_whitespace()
                .enumerate()
                .map(|(i, w)| RawNode::Single(RawInterp::Analysed { start: i, end: i + 1, morph: morph(w, "ign") }))
                .collect())
        }

        fn generate(&mut self, title: &str) -> Result<Vec<MorphInfo>, EngineError> {
            Ok(vec![morph(title, "subst:sg:nom"), morph(&format!("{title}a"), "subst:sg:gen")])
        }

        fn version(&self) -> String {
            "stub-1".to_string()
        }

        fn dict_id(&self) -> String {
            "stub-dict".to_string()
        }

        fn dict_copyright(&self) -> Option<String> {
            None
        }
    }

    #[derive(Default)]
    struct StubFactory {
        fail: bool,
        created: AtomicUsize,
    }

    impl EngineFactory for StubFactory {
        fn create(&self, _config: &EngineConfig) -> Result<Box<dyn MorphEngine>, EngineError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubEngine { fail: self.fail }))
        }
    }

    /// Gives every reading probability 1 and marks it selected.
    #[derive(Default)]
    struct StubDisambiguator {
        calls: Mutex<usize>,
    }

    impl Disambiguator for StubDisambiguator {
        fn disambiguate(&self, dag: Vec<RawNode>) -> Result<Vec<RawNode>, DisambError> {
            *self.calls.lock().unwrap() += 1;
            Ok(dag
                .into_iter()
                .map(|node| match node {
                    RawNode::Single(RawInterp::Analysed { start, end, morph }) => RawNode::Single(RawInterp::Disambiguated {
                        start,
                        end,
                        morph,
                        probability: 1.0,
                        weight: 0.0,
                        disamb: Some("disamb".to_string()),
                    }),
                    other => other,
                })
                .collect())
        }
    }

    fn parsed(pairs: &[(&str, &str)]) -> (EngineConfig, Action) {
        let params: RawParams = pairs.iter().map(|(k, v)| (*k, *v)).collect();
        let parsed = parse_request(&params, None);
        assert!(parsed.issues.errors.is_empty(), "{:?}", parsed.issues.errors);
        (parsed.config, parsed.action.unwrap())
    }

    fn with_disambiguator() -> (Orchestrator, Arc<StubDisambiguator>) {
        let d = Arc::new(StubDisambiguator::default());
        (Orchestrator::new(Arc::new(StubFactory::default()), Some(d.clone())), d)
    }

    #[test]
    fn eligible_analysis_is_disambiguated() {
        let (orchestrator, d) = with_disambiguator();
        let (config, action) = parsed(&[("action", "analyze"), ("text", "Ala ma kota"), ("expandTags", "1")]);

        let run = orchestrator.run(&config, &action).unwrap();
        let RawOutput::Analysis(dag) = run.output else { panic!("analysis expected") };
        assert_eq!(dag.len(), 3);
        assert!(matches!(&dag[0], RawNode::Single(RawInterp::Disambiguated { .. })));
        assert_eq!(*d.calls.lock().unwrap(), 1);
    }

    #[test]
    fn composite_past_tense_bypasses_disambiguation() {
        let (orchestrator, d) = with_disambiguator();
        let (config, action) = parsed(&[
            ("action", "analyze"),
            ("text", "Ala ma kota"),
            ("expandTags", "1"),
            ("pastTenseSegmentation", "composite"),
        ]);

        let run = orchestrator.run(&config, &action).unwrap();
        let RawOutput::Analysis(dag) = run.output else { panic!("analysis expected") };
        assert!(dag.iter().flat_map(RawNode::interps).all(|i| matches!(i, RawInterp::Analysed { .. })));
        assert_eq!(*d.calls.lock().unwrap(), 0);
    }

    #[test]
    fn generation_never_touches_the_disambiguator() {
        let (orchestrator, d) = with_disambiguator();
        let (config, action) = parsed(&[("action", "generate"), ("titles", "kot|pies"), ("expandTags", "1")]);

        let run = orchestrator.run(&config, &action).unwrap();
        let RawOutput::Generation(forms) = run.output else { panic!("generation expected") };
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0][0].form, "kot");
        assert_eq!(forms[1][1].form, "piesa");
        assert_eq!(*d.calls.lock().unwrap(), 0);
    }

    #[test]
    fn metadata_comes_from_the_engine() {
        let factory = Arc::new(StubFactory::default());
        let orchestrator = Orchestrator::new(factory.clone(), None);
        let (config, action) = parsed(&[("action", "analyze"), ("text", "kot")]);

        let run = orchestrator.run(&config, &action).unwrap();
        assert_eq!(run.metadata, Metadata { version: "stub-1".into(), dictionary_id: "stub-dict".into(), copyright: None });

        orchestrator.run(&config, &action).unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 2, "one engine per request");
    }

    #[test]
    fn engine_errors_propagate() {
        let orchestrator = Orchestrator::new(Arc::new(StubFactory { fail: true, ..Default::default() }), None);
        let (config, action) = parsed(&[("action", "analyze"), ("text", "kot")]);

        let err = orchestrator.run(&config, &action).unwrap_err();
        assert!(matches!(err, ServiceError::Engine(EngineError::InvalidOption { .. })));
        assert!(err.report().starts_with("EngineError: "));
    }
}
