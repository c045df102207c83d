//! Result normalization.
//!
//! Turns raw engine records into the uniform [`Interpretation`] schema. The
//! record shape decides which fields are filled:
//!
//! ```text
//! RawInterp ──┬─ Analysed        -> start, end, morph
//!             ├─ Disambiguated   -> start, end, morph, probability, disambiguated
//!             └─ Generated       -> morph
//! ```
//!
//! Underscores in `form` and `lemma` are turned back into spaces for every
//! shape (multi-word units are stored with underscores).
//!
//! DAG structure is preserved: a node with one reading becomes a flat
//! [`ResultEntry::Single`], a node with competing readings becomes a nested
//! [`ResultEntry::Alternatives`], even when only one alternative is left.

use crate::api::{Interpretation, ResultEntry};
use crate::{MorphInfo, RawInterp, RawNode};

/// Normalize one raw record.
pub fn normalize_interp(raw: &RawInterp) -> Interpretation {
    let mut item = from_morph(raw.morph());

    match raw {
        RawInterp::Analysed { start, end, .. } => {
            item.start = Some(*start);
            item.end = Some(*end);
        }
        RawInterp::Disambiguated { start, end, probability, disamb, .. } => {
            item.start = Some(*start);
            item.end = Some(*end);
            item.probability = Some(*probability);
            item.disambiguated = Some(disamb.is_some());
        }
        RawInterp::Generated(_) => {}
    }

    item
}

/// Normalize an analysis DAG, keeping single and ambiguous nodes apart.
pub fn normalize_dag(dag: &[RawNode]) -> Vec<ResultEntry> {
    dag.iter()
        .map(|node| match node {
            RawNode::Single(interp) => ResultEntry::Single(normalize_interp(interp)),
            RawNode::Ambiguous(interps) => ResultEntry::Alternatives(interps.iter().map(normalize_interp).collect()),
        })
        .collect()
}

/// Normalize generation output: one list per title, order preserved.
pub fn normalize_generated(per_title: &[Vec<MorphInfo>]) -> Vec<Vec<Interpretation>> {
    per_title.iter().map(|forms| forms.iter().map(from_morph).collect()).collect()
}

fn from_morph(morph: &MorphInfo) -> Interpretation {
    Interpretation {
        start: None,
        end: None,
        form: restore_spaces(&morph.form),
        lemma: restore_spaces(&morph.lemma),
        tag: morph.tag.clone(),
        name: morph.name.clone(),
        labels: morph.labels.clone(),
        probability: None,
        disambiguated: None,
    }
}

fn restore_spaces(s: &str) -> String {
    s.replace('_', " ")
}
