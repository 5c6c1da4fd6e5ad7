use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Write};
use std::hash::Hash;

use crate::file_format::event::{EventLabel, STATUS, UA};
use crate::file_format::ltsv::LogRecord;

/// Occurrence counts that remember the order values were first seen in, so
/// ties come out in log order.
#[derive(Debug)]
pub struct ValueCounter<K> {
    counts: Vec<(K, usize)>,
    index: HashMap<K, usize>,
}

impl<K: Clone + Eq + Hash> ValueCounter<K> {
    pub fn new() -> Self {
        ValueCounter {
            counts: vec![],
            index: HashMap::new(),
        }
    }

    pub fn add(&mut self, value: &K) {
        match self.index.get(value) {
            Some(ix) => self.counts[*ix].1 += 1,
            None => {
                self.index.insert(value.clone(), self.counts.len());
                self.counts.push((value.clone(), 1));
            }
        }
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// The `limit` most frequent values, most frequent first.
    pub fn most_common(&self, limit: usize) -> Vec<(&K, usize)> {
        let mut sorted: Vec<(&K, usize)> = self.counts.iter().map(|(k, c)| (k, *c)).collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(limit);
        sorted
    }
}

impl<K: Clone + Eq + Hash> Default for ValueCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorten values that don't fit in `width` characters to their head and
/// tail around an ellipsis.
pub fn abbreviate(value: &str, width: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < width {
        return value.to_string();
    }
    let half = width / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Frequency report over the user agents, statuses and request patterns of
/// the (already aggregated) log, used to pick good `--aggregates` patterns.
#[derive(Debug, Default)]
pub struct StatisticsReport {
    aggregates: Vec<String>,
    total: usize,
    user_agents: ValueCounter<String>,
    statuses: ValueCounter<String>,
    requests: ValueCounter<EventLabel>,
}

struct Section {
    title: &'static str,
    width: usize,
    limit: usize,
}

const USER_AGENT_SECTION: Section = Section {
    title: "USER AGENT",
    width: 30,
    limit: 10,
};
const STATUS_SECTION: Section = Section {
    title: "STATUS",
    width: 30,
    limit: 100,
};
const URI_SECTION: Section = Section {
    title: "URI",
    width: 50,
    limit: 100,
};

impl StatisticsReport {
    pub fn new(aggregates: &[String]) -> Self {
        StatisticsReport {
            aggregates: aggregates.to_vec(),
            ..StatisticsReport::default()
        }
    }

    /// Count one record whose URI has been canonicalized into `label`.
    pub fn observe(&mut self, record: &LogRecord, label: &EventLabel) {
        self.total += 1;
        if let Some(ua) = record.get(UA) {
            self.user_agents.add(&ua.to_string());
        }
        if let Some(status) = record.get(STATUS) {
            self.statuses.add(&status.to_string());
        }
        self.requests.add(label);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Render the report.  `hit_counts` holds, per request pattern, how many
    /// distinct raw URIs were folded into it; patterns that absorbed more
    /// than one get that number appended.
    pub fn render(&self, hit_counts: &BTreeMap<EventLabel, usize>) -> String {
        let quoted: Vec<String> = self
            .aggregates
            .iter()
            .map(|a| format!("\"{}\"", a))
            .collect();
        let mut out = format!("--aggregates={}\n", quoted.join(","));

        self.render_section(&mut out, &USER_AGENT_SECTION, &self.user_agents, |_| None);
        out.push('\n');
        self.render_section(&mut out, &STATUS_SECTION, &self.statuses, |_| None);
        out.push('\n');
        self.render_section(&mut out, &URI_SECTION, &self.requests, |label| {
            hit_counts.get(label).copied().filter(|hits| *hits > 1)
        });

        out.truncate(out.trim_end().len());
        out
    }

    fn render_section<K, F>(&self, out: &mut String, section: &Section, counter: &ValueCounter<K>, hits: F)
    where
        K: Clone + Eq + Hash + Display,
        F: Fn(&K) -> Option<usize>,
    {
        // Writing into a String can't fail.
        let _ = writeln!(out, "### {} ({}) ###", section.title, counter.distinct());
        let _ = writeln!(out, "{} (100.0%) : *", self.total);
        for (value, count) in counter.most_common(section.limit) {
            let percent = 100.0 * count as f64 / self.total as f64;
            let name = abbreviate(&value.to_string(), section.width);
            match hits(value) {
                Some(hits) => {
                    let _ = writeln!(out, "{} ({:.1}%) : {} ({})", count, percent, name, hits);
                }
                None => {
                    let _ = writeln!(out, "{} ({:.1}%) : {}", count, percent, name);
                }
            }
        }
        if counter.distinct() > section.limit {
            out.push_str("...\n");
        }
    }
}
