use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::ltsv::LogRecord;
use crate::error::Result;

pub const URI: &str = "uri";
pub const METHOD: &str = "method";
pub const TIME: &str = "time";
pub const UA: &str = "ua";
pub const VHOST: &str = "vhost";
pub const APPTIME: &str = "apptime";
pub const REQTIME: &str = "reqtime";
pub const STATUS: &str = "status";
pub const SIZE: &str = "size";
pub const UID: &str = "uid";

/// The field used to tell visitors apart when nothing else is configured.
pub const DEFAULT_IDENTIFIER: &str = UID;

lazy_static! {
    /// Keys we keep from each log line.  The configured identifier key is
    /// recognized in addition to these.
    pub static ref RECOGNIZED_KEYS: BTreeSet<&'static str> = [
        URI, METHOD, TIME, UA, VHOST, APPTIME, REQTIME, STATUS, SIZE, UID,
    ]
    .iter()
    .copied()
    .collect();
}

/// A request pattern: the method plus the (canonicalized) URI.  This is the
/// unit that stories are matched on and that transitions are counted between.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventLabel {
    method: String,
    uri: String,
}

impl EventLabel {
    pub fn new(method: &str, uri: &str) -> Self {
        EventLabel {
            method: method.to_string(),
            uri: uri.to_string(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Two-line form used for node labels so that long URIs don't push the
    /// method off to the side.
    pub fn to_multiline(&self) -> String {
        format!("{}\n{}", self.method, self.uri)
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}

#[derive(Clone, Debug)]
enum TimeKey {
    /// Seconds since the epoch, possibly fractional.
    Instant(f64),
    /// Something we couldn't make sense of; ordered lexicographically.
    Text(String),
}

/// A request time as written in the log plus a key that orders it.
///
/// We understand epoch seconds (`1700000000.25`), RFC 3339 and the
/// `10/Oct/2000:13:55:36 -0700` format nginx and apache write (with or without
/// the surrounding brackets).  Anything else orders as plain text after all
/// parsed instants.
#[derive(Clone, Debug)]
pub struct Timestamp {
    raw: String,
    key: TimeKey,
}

fn instant_seconds(dt: DateTime<FixedOffset>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

impl Timestamp {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
        let key = match trimmed.parse::<f64>() {
            Ok(secs) if secs.is_finite() => TimeKey::Instant(secs),
            _ => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
                    TimeKey::Instant(instant_seconds(dt))
                } else if let Ok(dt) = DateTime::parse_from_str(trimmed, "%d/%b/%Y:%H:%M:%S %z") {
                    TimeKey::Instant(instant_seconds(dt))
                } else {
                    TimeKey::Text(raw.to_string())
                }
            }
        };
        Timestamp {
            raw: raw.to_string(),
            key,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.key, &other.key) {
            (TimeKey::Instant(a), TimeKey::Instant(b)) => a.total_cmp(b),
            (TimeKey::Instant(_), TimeKey::Text(_)) => Ordering::Less,
            (TimeKey::Text(_), TimeKey::Instant(_)) => Ordering::Greater,
            (TimeKey::Text(a), TimeKey::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

/// One request from the access log, after its URI has been canonicalized.
/// Events are never modified once built.
#[derive(Clone, Debug)]
pub struct Event {
    pub identifier: String,
    pub label: EventLabel,
    pub timestamp: Timestamp,
    /// Every other recognized field (user agent, status, ...).  Graph
    /// building never looks at these.
    pub extra: BTreeMap<String, String>,
}

impl Event {
    /// Build an event from a parsed log record, using `uri` in place of the
    /// record's raw URI.  The identifier, method and time fields must be
    /// present.
    pub fn from_record(record: LogRecord, identifier_key: &str, uri: &str) -> Result<Self> {
        let identifier = record.require(identifier_key)?.to_string();
        let label = EventLabel::new(record.require(METHOD)?, uri);
        let timestamp = Timestamp::parse(record.require(TIME)?);

        let mut extra = record.into_fields();
        extra.remove(identifier_key);
        extra.remove(METHOD);
        extra.remove(URI);
        extra.remove(TIME);

        Ok(Event {
            identifier,
            label,
            timestamp,
            extra,
        })
    }

    pub fn method(&self) -> &str {
        self.label.method()
    }

    pub fn uri(&self) -> &str {
        self.label.uri()
    }
}
