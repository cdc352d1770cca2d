use crate::config::options::{OptionValue, Options};
use crate::render::IndentSetting;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Upper bound accepted for `engine.max_passes`.
pub const MAX_PASSES_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CleanupConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub cleanup: BTreeMap<String, CleanupValue>,
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateDefinition>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EngineSection {
    #[serde(default)]
    pub max_passes: Option<i64>,
    #[serde(default)]
    pub format_edited_regions: Option<bool>,
    #[serde(default)]
    pub indent: Option<IndentValue>,
}

/// `indent = "tab"`, `indent = "auto"` or `indent = 2`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum IndentValue {
    Width(i64),
    Name(String),
}

impl IndentValue {
    pub fn setting(&self) -> Option<IndentSetting> {
        match self {
            IndentValue::Width(width) => IndentSetting::parse(&width.to_string()),
            IndentValue::Name(name) => IndentSetting::parse(name),
        }
    }
}

/// A value under `[cleanup]`: a scalar, or a table of sub-options where the
/// `enabled` key stands for the table's own key.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum CleanupValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    Table(BTreeMap<String, CleanupValue>),
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TemplateDefinition {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub rewrite: String,
    /// Restrict matches to nodes of this tree-sitter kind.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

fn flatten_into(prefix: &str, value: &CleanupValue, options: &mut Options) {
    match value {
        CleanupValue::Bool(flag) => {
            options.set(prefix, *flag);
        }
        CleanupValue::Integer(number) => {
            options.set(prefix, *number);
        }
        CleanupValue::Text(text) => {
            options.set(prefix, text.as_str());
        }
        CleanupValue::Table(entries) => {
            for (key, nested) in entries {
                if key == "enabled" {
                    flatten_into(prefix, nested, options);
                } else {
                    flatten_into(&format!("{prefix}.{key}"), nested, options);
                }
            }
        }
    }
}

impl CleanupConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Some(passes) = self.engine.max_passes {
            if !(1..=MAX_PASSES_LIMIT).contains(&passes) {
                issues.push(ValidationIssue::InvalidEngineValue {
                    key: "max_passes",
                    message: format!("must be between 1 and {MAX_PASSES_LIMIT}, got {passes}"),
                });
            }
        }
        if let Some(indent) = &self.engine.indent {
            if indent.setting().is_none() {
                issues.push(ValidationIssue::InvalidEngineValue {
                    key: "indent",
                    message: "expected \"auto\", \"tab\" or a width from 1 to 16".to_string(),
                });
            }
        }

        let mut seen = HashSet::new();
        for template in &self.templates {
            if template.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    template_id: None,
                    field: "id",
                });
                continue;
            }
            if !seen.insert(template.id.as_str()) {
                issues.push(ValidationIssue::DuplicateTemplate {
                    id: template.id.clone(),
                });
            }
            if template.pattern.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    template_id: Some(template.id.clone()),
                    field: "pattern",
                });
            }
            let toggled_in_cleanup = matches!(
                self.cleanup.get("template"),
                Some(CleanupValue::Table(entries)) if entries.contains_key(&template.id)
            );
            if toggled_in_cleanup {
                issues.push(ValidationIssue::InvalidCombo {
                    template_id: Some(template.id.clone()),
                    message: "toggle templates with their own `enabled` key".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Flat option map: `engine.*` settings, dotted `cleanup.*` keys and one
    /// `cleanup.template.<id>` toggle per template.
    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        if let Some(passes) = self.engine.max_passes {
            options.set("engine.max_passes", passes);
        }
        if let Some(format) = self.engine.format_edited_regions {
            options.set("engine.format_edited_regions", format);
        }
        match &self.engine.indent {
            Some(IndentValue::Width(width)) => {
                options.set("engine.indent", *width);
            }
            Some(IndentValue::Name(name)) => {
                options.set("engine.indent", name.as_str());
            }
            None => {}
        }
        for (key, value) in &self.cleanup {
            flatten_into(&format!("cleanup.{key}"), value, &mut options);
        }
        for template in &self.templates {
            options.set(
                format!("cleanup.template.{}", template.id),
                OptionValue::Bool(template.enabled),
            );
        }
        options
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    InvalidEngineValue {
        key: &'static str,
        message: String,
    },
    MissingField {
        template_id: Option<String>,
        field: &'static str,
    },
    DuplicateTemplate {
        id: String,
    },
    InvalidCombo {
        template_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidEngineValue { key, message } => {
                write!(f, "engine.{key} {message}")
            }
            ValidationIssue::MissingField { template_id, field } => match template_id {
                Some(id) => write!(f, "template '{id}' missing required field '{field}'"),
                None => write!(f, "template missing required field '{field}'"),
            },
            ValidationIssue::DuplicateTemplate { id } => {
                write!(f, "template '{id}' is defined more than once")
            }
            ValidationIssue::InvalidCombo {
                template_id,
                message,
            } => match template_id {
                Some(id) => write!(f, "template '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid configuration: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> CleanupConfig {
        toml_edit::de::from_str(input).unwrap()
    }

    #[test]
    fn nested_tables_flatten_to_dotted_keys() {
        let config = parse(
            r#"
[cleanup]
use_blocks = true

[cleanup.this_qualification]
enabled = true
mode = "always"
"#,
        );
        let options = config.to_options();
        assert!(options.is_enabled("cleanup.use_blocks"));
        assert!(options.is_enabled("cleanup.this_qualification"));
        assert_eq!(options.text("cleanup.this_qualification.mode"), Some("always"));
    }

    #[test]
    fn engine_settings_become_options() {
        let config = parse("[engine]\nmax_passes = 3\nindent = 2\nformat_edited_regions = false\n");
        let options = config.to_options();
        assert_eq!(options.integer("engine.max_passes"), Some(3));
        assert_eq!(options.integer("engine.indent"), Some(2));
        assert!(!options.flag("engine.format_edited_regions", true));
    }

    #[test]
    fn templates_are_enabled_by_default() {
        let config = parse(
            "[[template]]\nid = \"empty\"\npattern = \"$A.size() == 0\"\nrewrite = \"$A.isEmpty()\"\n\n[[template]]\nid = \"off\"\npattern = \"$A\"\nenabled = false\n",
        );
        let options = config.to_options();
        assert!(options.is_enabled("cleanup.template.empty"));
        assert!(!options.is_enabled("cleanup.template.off"));
    }

    #[test]
    fn validation_collects_every_issue() {
        let config = parse(
            "[engine]\nmax_passes = 0\nindent = \"wide\"\n\n[[template]]\nid = \"a\"\npattern = \"\"\n\n[[template]]\nid = \"a\"\npattern = \"$X\"\n",
        );
        let err = config.validate().unwrap_err();
        assert_eq!(err.issues.len(), 4);
        assert!(err.issues.contains(&ValidationIssue::DuplicateTemplate { id: "a".to_string() }));
        assert!(err.to_string().contains("engine.max_passes must be between 1 and 1000"));
    }
}
