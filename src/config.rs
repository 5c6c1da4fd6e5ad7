use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AnalysisError, Result};
use crate::file_format::event::DEFAULT_IDENTIFIER;
use crate::graph::render::OutputFormat;

pub const DEFAULT_OUT: &str = "stories.svg";

/// What a run produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Deduplicated session chains.
    Stories,
    /// One weighted transition graph over all sessions.
    Unified,
    /// A frequency report on stdout; no graph is written.
    Statistics,
}

impl Mode {
    /// Statistics wins over unified when both are asked for.
    pub fn from_flags(unified: bool, statistics: bool) -> Self {
        if statistics {
            Mode::Statistics
        } else if unified {
            Mode::Unified
        } else {
            Mode::Stories
        }
    }
}

/// The settings that can come from either a TOML file or the command line.
/// Anything left unset falls through to the next layer, and finally to the
/// defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub aggregates: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    pub identifier: Option<String>,
    pub out: Option<PathBuf>,
}

impl Settings {
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(config_str)?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path).map_err(|err| {
            AnalysisError::bad_input(format!(
                "Problem reading config '{}': {}",
                path.display(),
                err
            ))
        })?;
        Self::from_toml_str(&config_str)
    }

    /// Layer `self` over `base`: lists replace rather than extend.
    pub fn over(self, base: Settings) -> Settings {
        Settings {
            aggregates: if self.aggregates.is_empty() {
                base.aggregates
            } else {
                self.aggregates
            },
            ignore: if self.ignore.is_empty() {
                base.ignore
            } else {
                self.ignore
            },
            identifier: self.identifier.or(base.identifier),
            out: self.out.or(base.out),
        }
    }
}

/// A pattern list given as a single value is comma separated; given as
/// several values, each is one pattern.  Empty patterns are dropped.
pub fn split_patterns(values: &[String]) -> Vec<String> {
    let patterns: Vec<String> = match values {
        [single] => single.split(',').map(str::to_string).collect(),
        many => many.to_vec(),
    };
    patterns.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Everything a run needs, validated.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub log_path: PathBuf,
    pub aggregates: Vec<String>,
    pub ignore: Vec<String>,
    pub identifier: String,
    pub out: PathBuf,
    /// Unset for statistics runs, which never write a graph.
    pub output_format: Option<OutputFormat>,
    pub mode: Mode,
}

impl AnalysisConfig {
    /// Fails with `BadInput` if the output extension can't be rendered,
    /// before any log data is touched.  Statistics runs ignore the output
    /// path entirely.
    pub fn new(log_path: PathBuf, settings: Settings, mode: Mode) -> Result<Self> {
        let out = settings.out.unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));
        let output_format = match mode {
            Mode::Statistics => None,
            Mode::Stories | Mode::Unified => Some(OutputFormat::from_path(&out)?),
        };
        let identifier = match settings.identifier {
            Some(identifier) if !identifier.is_empty() => identifier,
            Some(_) => {
                return Err(AnalysisError::bad_input("identifier key must not be empty"));
            }
            None => DEFAULT_IDENTIFIER.to_string(),
        };
        Ok(AnalysisConfig {
            log_path,
            aggregates: split_patterns(&settings.aggregates),
            ignore: split_patterns(&settings.ignore),
            identifier,
            out,
            output_format,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorLayer;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_patterns() {
        assert_eq!(
            split_patterns(&strings(&[r"^/users/\d+$,^/static/"])),
            strings(&[r"^/users/\d+$", "^/static/"])
        );
        // Repeated values are taken as they are, commas and all.
        assert_eq!(
            split_patterns(&strings(&["^/a{1,3}$", "^/b"])),
            strings(&["^/a{1,3}$", "^/b"])
        );
        assert!(split_patterns(&strings(&[""])).is_empty());
        assert!(split_patterns(&[]).is_empty());
    }

    #[test]
    fn test_mode_precedence() {
        assert_eq!(Mode::from_flags(false, false), Mode::Stories);
        assert_eq!(Mode::from_flags(true, false), Mode::Unified);
        assert_eq!(Mode::from_flags(true, true), Mode::Statistics);
    }

    #[test]
    fn test_settings_layering() {
        let file = Settings::from_toml_str(
            r#"
            aggregates = ["^/users/\\d+$"]
            ignore = ["^/static/"]
            identifier = "session"
            out = "file.dot"
            "#,
        )
        .unwrap();
        let cli = Settings {
            aggregates: vec![],
            ignore: strings(&["^/favicon"]),
            identifier: None,
            out: Some(PathBuf::from("cli.json")),
        };
        let merged = cli.over(file);
        assert_eq!(merged.aggregates, strings(&[r"^/users/\d+$"]));
        assert_eq!(merged.ignore, strings(&["^/favicon"]));
        assert_eq!(merged.identifier.as_deref(), Some("session"));
        assert_eq!(merged.out, Some(PathBuf::from("cli.json")));
    }

    #[test]
    fn test_unknown_config_key_is_bad_input() {
        let err = Settings::from_toml_str("aggregate = []").unwrap_err();
        assert_eq!(err.layer(), Some(&ErrorLayer::BadInput));
    }

    #[test]
    fn test_defaults_and_validation() {
        let config =
            AnalysisConfig::new(PathBuf::from("access.log"), Settings::default(), Mode::Stories)
                .unwrap();
        assert_eq!(config.identifier, "uid");
        assert_eq!(config.out, PathBuf::from("stories.svg"));
        assert_eq!(config.output_format, Some(OutputFormat::Svg));

        let bad_out = Settings {
            out: Some(PathBuf::from("stories.pdf")),
            ..Settings::default()
        };
        let err = AnalysisConfig::new(PathBuf::from("access.log"), bad_out.clone(), Mode::Unified)
            .unwrap_err();
        assert_eq!(err.layer(), Some(&ErrorLayer::BadInput));

        // Nothing gets written in statistics mode, so the path isn't checked.
        let config =
            AnalysisConfig::new(PathBuf::from("access.log"), bad_out, Mode::Statistics).unwrap();
        assert_eq!(config.output_format, None);
        assert_eq!(config.out, PathBuf::from("stories.pdf"));
    }
}
