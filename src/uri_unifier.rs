use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;

use crate::error::Result;
use crate::file_format::event::EventLabel;

/// A user-supplied URI pattern.  Patterns match anchored at the start of the
/// URI but need not consume all of it.
#[derive(Clone, Debug)]
pub struct UriPattern {
    source: String,
    regex: Regex,
}

impl UriPattern {
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(&format!(r"\A(?:{})", source))?;
        Ok(UriPattern {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern exactly as it was written; this is what a matching URI is
    /// replaced with.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, uri: &str) -> bool {
        self.regex.is_match(uri)
    }
}

/// Compile a list of patterns in order, skipping empty strings.  Any invalid
/// pattern fails the whole list.
pub fn compile_patterns<S: AsRef<str>>(sources: &[S]) -> Result<Vec<UriPattern>> {
    sources
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.is_empty())
        .map(UriPattern::new)
        .collect()
}

/// Collapses families of URIs (`/users/1`, `/users/2`, ...) into one
/// canonical form so they show up as a single node, and decides which URIs
/// are not worth looking at at all.
#[derive(Debug)]
pub struct UriUnifier {
    aggregates: Vec<UriPattern>,
    ignore: Vec<UriPattern>,
    /// Distinct raw URIs seen per canonical label.
    hits: HashMap<EventLabel, BTreeSet<String>>,
}

impl UriUnifier {
    pub fn new<S: AsRef<str>>(aggregates: &[S], ignore: &[S]) -> Result<Self> {
        let aggregates = compile_patterns(aggregates)?;
        let ignore = compile_patterns(ignore)?;
        debug!(
            aggregates = aggregates.len(),
            ignore = ignore.len(),
            "compiled uri patterns"
        );
        Ok(UriUnifier {
            aggregates,
            ignore,
            hits: HashMap::new(),
        })
    }

    pub fn aggregates(&self) -> &[UriPattern] {
        &self.aggregates
    }

    pub fn is_ignored(&self, raw_uri: &str) -> bool {
        self.ignore.iter().any(|p| p.matches(raw_uri))
    }

    /// First matching aggregate wins; unmatched URIs pass through untouched.
    pub fn unify<'a>(&'a self, raw_uri: &'a str) -> &'a str {
        self.aggregates
            .iter()
            .find(|p| p.matches(raw_uri))
            .map_or(raw_uri, UriPattern::source)
    }

    /// `unify` plus bookkeeping of which raw URIs ended up in which form.
    pub fn canonicalize(&mut self, method: &str, raw_uri: &str) -> String {
        let unified = self.unify(raw_uri).to_string();
        self.hits
            .entry(EventLabel::new(method, &unified))
            .or_default()
            .insert(raw_uri.to_string());
        unified
    }

    /// How many distinct raw URIs were collapsed into `label`.
    pub fn hit_count(&self, label: &EventLabel) -> usize {
        self.hits.get(label).map_or(0, BTreeSet::len)
    }

    pub fn hit_counts(&self) -> BTreeMap<EventLabel, usize> {
        self.hits
            .iter()
            .map(|(label, raws)| (label.clone(), raws.len()))
            .collect()
    }
}
