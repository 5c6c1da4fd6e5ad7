use std::collections::{HashMap, HashSet};

use crate::file_format::event::{Event, EventLabel};

/// All events of one visitor, in time order.
#[derive(Clone, Debug)]
pub struct Session {
    /// Position of the session's identifier in order of first appearance in
    /// the log.  Used to break ties deterministically.
    pub ordinal: usize,
    pub identifier: String,
    pub events: Vec<Event>,
    distinct_labels: usize,
}

impl Session {
    fn new(ordinal: usize, identifier: String, mut events: Vec<Event>) -> Self {
        // `sort_by` is stable, so same-timestamp events keep their log order.
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let distinct_labels = events
            .iter()
            .map(|e| &e.label)
            .collect::<HashSet<_>>()
            .len();
        Session {
            ordinal,
            identifier,
            events,
            distinct_labels,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &EventLabel> {
        self.events.iter().map(|e| &e.label)
    }

    /// Number of different request patterns in the session, regardless of
    /// how often each repeats.
    pub fn distinct_label_count(&self) -> usize {
        self.distinct_labels
    }
}

/// Group events by identifier, preserving the order in which identifiers were
/// first seen, and time-sort each group.
pub fn assemble_sessions(events: Vec<Event>) -> Vec<Session> {
    let mut index_by_identifier: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Event>)> = vec![];

    for event in events {
        let idx = match index_by_identifier.get(&event.identifier) {
            Some(idx) => *idx,
            None => {
                let idx = groups.len();
                index_by_identifier.insert(event.identifier.clone(), idx);
                groups.push((event.identifier.clone(), vec![]));
                idx
            }
        };
        groups[idx].1.push(event);
    }

    let sessions: Vec<Session> = groups
        .into_iter()
        .enumerate()
        .map(|(ordinal, (identifier, events))| Session::new(ordinal, identifier, events))
        .collect();
    debug!(sessions = sessions.len(), "assembled sessions");
    sessions
}


#[cfg(test)]
mod tests {
    use super::test_support::event;
    use super::*;

    fn uris(session: &Session) -> Vec<&str> {
        session.events.iter().map(|e| e.uri()).collect()
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let sessions = assemble_sessions(vec![
            event("b", "GET", "/1", "1"),
            event("a", "GET", "/2", "2"),
            event("b", "GET", "/3", "3"),
        ]);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].identifier, "b");
        assert_eq!(sessions[0].ordinal, 0);
        assert_eq!(uris(&sessions[0]), vec!["/1", "/3"]);
        assert_eq!(sessions[1].identifier, "a");
        assert_eq!(sessions[1].ordinal, 1);
    }

    #[test]
    fn test_sort_is_stable() {
        let sessions = assemble_sessions(vec![
            event("a", "GET", "/late", "20"),
            event("a", "GET", "/tie1", "10"),
            event("a", "GET", "/early", "5"),
            event("a", "GET", "/tie2", "10"),
        ]);
        assert_eq!(uris(&sessions[0]), vec!["/early", "/tie1", "/tie2", "/late"]);
    }

    #[test]
    fn test_distinct_label_count() {
        let sessions = assemble_sessions(vec![
            event("a", "GET", "/x", "1"),
            event("a", "GET", "/y", "2"),
            event("a", "GET", "/x", "3"),
            event("a", "POST", "/x", "4"),
        ]);
        assert_eq!(sessions[0].len(), 4);
        assert_eq!(sessions[0].distinct_label_count(), 3);
    }
}
