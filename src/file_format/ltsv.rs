use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::event::RECOGNIZED_KEYS;
use crate::error::{AnalysisError, Result};

/// The recognized fields of one LTSV access log line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogRecord {
    /// 1-based line number in the source, for error messages.
    pub line_number: usize,
    fields: BTreeMap<String, String>,
}

impl LogRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Like `get` but a missing field is a data error.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            AnalysisError::data(format!(
                "line {}: missing required field '{}'",
                self.line_number, key
            ))
        })
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

/// Parse a single line.  Each tab-separated field is split on its first `:`;
/// a field without one means the line isn't LTSV and we give up on the whole
/// input.
pub fn parse_ltsv_line(line: &str, line_number: usize, identifier_key: &str) -> Result<LogRecord> {
    let mut fields = BTreeMap::new();
    for field in line.split('\t') {
        let (key, value) = match field.split_once(':') {
            Some(kv) => kv,
            None => {
                return Err(AnalysisError::data(format!(
                    "line {}: field '{}' has no ':' separator",
                    line_number, field
                )));
            }
        };
        if key == identifier_key || RECOGNIZED_KEYS.contains(key) {
            fields.insert(key.to_string(), value.to_string());
        }
    }
    Ok(LogRecord {
        line_number,
        fields,
    })
}

pub fn parse_ltsv(text: &str, identifier_key: &str) -> Result<Vec<LogRecord>> {
    let mut records = vec![];
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(parse_ltsv_line(line, i + 1, identifier_key)?);
    }
    trace!(records = records.len(), "parsed ltsv");
    Ok(records)
}

/// Read a whole log file into memory.
pub fn read_log_file<P: AsRef<Path>>(path: P, identifier_key: &str) -> Result<Vec<LogRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| {
        AnalysisError::data(format!("unable to read '{}': {}", path.display(), err))
    })?;
    let records = parse_ltsv(&text, identifier_key)?;
    info!(path = %path.display(), records = records.len(), "read access log");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorLayer;
    use crate::utils::temp_dir::TempDir;

    #[test]
    fn test_unknown_keys_are_dropped() {
        let rec = parse_ltsv_line("uid:a\tmethod:GET\thost:example.com\turi:/x?a=b:c", 1, "uid").unwrap();
        assert_eq!(rec.get("uid"), Some("a"));
        assert_eq!(rec.get("host"), None);
        // Only the first ':' separates.
        assert_eq!(rec.get("uri"), Some("/x?a=b:c"));
    }

    #[test]
    fn test_custom_identifier_is_recognized() {
        let rec = parse_ltsv_line("session:s1\tuid:a", 1, "session").unwrap();
        assert_eq!(rec.get("session"), Some("s1"));
        assert_eq!(rec.get("uid"), Some("a"));

        let rec = parse_ltsv_line("session:s1", 1, "uid").unwrap();
        assert_eq!(rec.get("session"), None);
    }

    #[test]
    fn test_missing_separator_is_fatal() {
        let err = parse_ltsv("uid:a\tmethod:GET\n\nuid:b\tbroken", "uid").unwrap_err();
        assert_eq!(err.layer(), Some(&ErrorLayer::DataLayer));
        let msg = err.to_string();
        assert!(msg.contains("line 3"), "{}", msg);
        assert!(msg.contains("broken"), "{}", msg);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let records = parse_ltsv("\nuid:a\n   \nuid:b\n", "uid").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line_number, 2);
        assert_eq!(records[1].line_number, 4);
    }

    #[test]
    fn test_read_log_file() {
        let dir = TempDir::new("navgraph-ltsv-read");
        let path = dir.write_file("access.log", "uid:a\tmethod:GET\turi:/\ttime:1\n");

        let records = read_log_file(&path, "uid").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].require("method").unwrap(), "GET");
        assert!(records[0].require("status").is_err());
    }
}
