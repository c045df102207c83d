//! Line protocol spoken with the disambiguation process.
//!
//! Request, one line per interpretation, then an empty line:
//!
//! ```text
//! start \t end \t form \t lemma \t tag \t name \t labels
//! ```
//!
//! Response, same lines in the same order with three more fields, then an
//! empty line:
//!
//! ```text
//! ... \t probability \t weight \t flag        (empty flag = not selected)
//! ```
//!
//! `name` and `labels` are `|`-joined lists. Backslash, tab, newline and
//! carriage return inside a field are written as `\\`, `\t`, `\n` and `\r`,
//! so every record stays on one line.

use crate::error::DisambError;
use crate::{MorphInfo, RawInterp, RawNode};

const REQUEST_FIELDS: usize = 7;
const RESPONSE_FIELDS: usize = 10;

/// Encode a DAG as a request, including the terminating empty line.
pub fn encode_dag(dag: &[RawNode]) -> String {
    let mut out = String::new();
    for interp in dag.iter().flat_map(RawNode::interps) {
        let (start, end) = interp.span().unwrap_or((0, 0));
        let m = interp.morph();
        out.push_str(&format!(
            "{start}\t{end}\t{}\t{}\t{}\t{}\t{}\n",
            escape(&m.form),
            escape(&m.lemma),
            escape(&m.tag),
            escape(&m.name.join("|")),
            escape(&m.labels.join("|"))
        ));
    }
    out.push('\n');
    out
}

/// Decode one response line.
pub fn decode_line(line: &str) -> Result<RawInterp, DisambError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != RESPONSE_FIELDS {
        return Err(DisambError::Protocol(format!(
            "expected {RESPONSE_FIELDS} fields, got {}: {line:?}",
            fields.len()
        )));
    }

    let number = |idx: usize| {
        fields[idx].parse::<usize>().map_err(|_| DisambError::Protocol(format!("bad node number {:?}", fields[idx])))
    };
    let real = |idx: usize| {
        fields[idx].parse::<f64>().map_err(|_| DisambError::Protocol(format!("bad number {:?}", fields[idx])))
    };

    let morph = MorphInfo {
        form: unescape(fields[2])?,
        lemma: unescape(fields[3])?,
        tag: unescape(fields[4])?,
        name: split_list(&unescape(fields[5])?),
        labels: split_list(&unescape(fields[6])?),
    };
    let flag = unescape(fields[REQUEST_FIELDS + 2])?;

    Ok(RawInterp::Disambiguated {
        start: number(0)?,
        end: number(1)?,
        morph,
        probability: real(REQUEST_FIELDS)?,
        weight: real(REQUEST_FIELDS + 1)?,
        disamb: if flag.is_empty() { None } else { Some(flag) },
    })
}

/// Put decoded interpretations back into the node structure of `shape`.
pub fn regroup(shape: &[RawNode], interps: Vec<RawInterp>) -> Result<Vec<RawNode>, DisambError> {
    let expected: usize = shape.iter().map(RawNode::len).sum();
    if interps.len() != expected {
        return Err(DisambError::Protocol(format!("sent {expected} interpretations, got {} back", interps.len())));
    }

    let mut rest = interps.into_iter();
    let mut nodes = Vec::with_capacity(shape.len());
    for node in shape {
        match node {
            RawNode::Single(_) => match rest.next() {
                Some(interp) => nodes.push(RawNode::Single(interp)),
                None => return Err(DisambError::Protocol("response ended early".to_string())),
            },
            RawNode::Ambiguous(alts) => nodes.push(RawNode::Ambiguous(rest.by_ref().take(alts.len()).collect())),
        }
    }

    Ok(nodes)
}

/// Escape one field so it contains no tab or line break.
fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse [`escape`].
fn unescape(field: &str) -> Result<String, DisambError> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            other => return Err(DisambError::Protocol(format!("bad escape \\{} in {field:?}", other.unwrap_or(' ')))),
        }
    }
    Ok(out)
}

fn split_list(field: &str) -> Vec<String> {
    if field.is_empty() { Vec::new() } else { field.split('|').map(str::to_string).collect() }
}
