use crate::config::options::Options;
use crate::config::schema::{CleanupConfig, TemplateDefinition, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::DocumentMut;

const TOP_LEVEL_KEYS: &[&str] = &["engine", "cleanup", "template"];
const ENGINE_KEYS: &[&str] = &["max_passes", "format_edited_regions", "indent"];
const TEMPLATE_KEYS: &[&str] = &["id", "pattern", "rewrite", "kind", "label", "summary", "enabled"];

/// Similarity above which an unknown key gets a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read clean-up config from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse clean-up config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse clean-up config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid clean-up config ({}): {}", path.display(), source),
                None => write!(f, "invalid clean-up config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// A parsed and validated configuration file.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub options: Options,
    pub templates: Vec<TemplateDefinition>,
    /// Unknown keys, ignored but worth telling the user about.
    pub warnings: Vec<String>,
}

/// Closest candidate to `key`, if any is similar enough.
pub fn suggest<'a>(key: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    candidates
        .into_iter()
        .map(|candidate| (strsim::jaro_winkler(key, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

fn unknown_key_warning(path: &str, key: &str, known: &[&str]) -> String {
    match suggest(key, known.iter().copied()) {
        Some(hint) => format!("unknown key '{path}{key}' ignored (did you mean '{path}{hint}'?)"),
        None => format!("unknown key '{path}{key}' ignored"),
    }
}

/// Keys outside the schema. `[cleanup]` is open-ended and checked against
/// the rule catalog later.
fn unknown_keys(input: &str) -> Vec<String> {
    let Ok(document) = input.parse::<DocumentMut>() else {
        return Vec::new();
    };
    let mut warnings = Vec::new();
    for (key, item) in document.iter() {
        if !TOP_LEVEL_KEYS.contains(&key) {
            warnings.push(unknown_key_warning("", key, TOP_LEVEL_KEYS));
            continue;
        }
        if key == "engine" {
            if let Some(table) = item.as_table_like() {
                for (engine_key, _) in table.iter() {
                    if !ENGINE_KEYS.contains(&engine_key) {
                        warnings.push(unknown_key_warning("engine.", engine_key, ENGINE_KEYS));
                    }
                }
            }
        }
        if key == "template" {
            if let Some(tables) = item.as_array_of_tables() {
                for table in tables.iter() {
                    for (template_key, _) in table.iter() {
                        if !TEMPLATE_KEYS.contains(&template_key) {
                            warnings.push(unknown_key_warning(
                                "template.",
                                template_key,
                                TEMPLATE_KEYS,
                            ));
                        }
                    }
                }
            }
        }
    }
    warnings
}

pub fn load_from_str(input: &str) -> Result<LoadedConfig, ConfigError> {
    let config: CleanupConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(LoadedConfig {
        options: config.to_options(),
        templates: config.templates,
        warnings: unknown_keys(input),
    })
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoadedConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_picks_closest_key() {
        let known = ["cleanup.use_blocks", "cleanup.unused"];
        assert_eq!(
            suggest("cleanup.use_block", known),
            Some("cleanup.use_blocks".to_string())
        );
        assert_eq!(suggest("zzz", known), None);
    }

    #[test]
    fn unknown_sections_warn_with_hint() {
        let loaded = load_from_str("[engin]\nmax_passes = 2\n\n[engine]\nmax_pases = 2\n").unwrap();
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded.warnings[0].contains("did you mean 'engine'"));
        assert!(loaded.warnings[1].contains("did you mean 'engine.max_passes'"));
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let err = load_from_str("[cleanup\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_from_path("/nonexistent/cleanup.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cleanup.toml"));
    }
}
