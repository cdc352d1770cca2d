//! Rule catalog.
//!
//! Holds every rule in a fixed total priority order (index in the catalog,
//! lower wins) and selects the active ones for an options value.

use crate::config::{suggest, Options, TemplateDefinition};
use crate::rules::template::{TemplateError, TemplateRule};
use crate::rules::{builtin_rules, Rule, RuleDescriptor, RuleSettings};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("option key '{key}' is claimed by both '{first}' and '{second}'")]
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// A rule selected for one `clean_up` call.
pub struct ActiveRule<'a> {
    pub rule: &'a dyn Rule,
    pub priority: usize,
    pub settings: RuleSettings,
}

impl ActiveRule<'_> {
    pub fn id(&self) -> &str {
        &self.rule.descriptor().id
    }
}

/// Problem with a `cleanup.*` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionIssue {
    UnknownKey {
        key: String,
        suggestion: Option<String>,
    },
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}

impl fmt::Display for OptionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionIssue::UnknownKey { key, suggestion } => match suggestion {
                Some(suggestion) => {
                    write!(f, "unknown option '{key}' ignored (did you mean '{suggestion}'?)")
                }
                None => write!(f, "unknown option '{key}' ignored"),
            },
            OptionIssue::InvalidValue {
                key,
                value,
                expected,
            } => write!(
                f,
                "option '{key}' has invalid value {value}, expected {expected}; using default"
            ),
        }
    }
}

pub struct Catalog {
    rules: Vec<Box<dyn Rule>>,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| &rule.descriptor().id))
            .finish()
    }
}

impl Catalog {
    /// Build a catalog, rejecting two rules that claim the same option key.
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Result<Self, CatalogError> {
        let mut claimed: HashMap<String, String> = HashMap::new();
        for rule in &rules {
            let descriptor = rule.descriptor();
            let keys = std::iter::once(descriptor.option_key()).chain(descriptor.aliases.iter().cloned());
            for key in keys {
                if let Some(first) = claimed.insert(key.clone(), descriptor.id.clone()) {
                    return Err(CatalogError::DuplicateKey {
                        key,
                        first,
                        second: descriptor.id.clone(),
                    });
                }
            }
        }
        Ok(Self { rules })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_rules())
    }

    /// Built-in rules followed by user templates in declaration order.
    pub fn with_templates(templates: &[TemplateDefinition]) -> Result<Self, CatalogError> {
        let mut rules = builtin_rules();
        for template in templates {
            rules.push(Box::new(TemplateRule::new(template)?));
        }
        Self::new(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &RuleDescriptor> {
        self.rules.iter().map(|rule| rule.descriptor())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|rule| rule.descriptor().id == id)
            .map(|rule| rule.as_ref())
    }

    /// Enabled rules in priority order.
    pub fn active_rules(&self, options: &Options) -> Vec<ActiveRule<'_>> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.descriptor().is_enabled(options))
            .map(|(priority, rule)| ActiveRule {
                rule: rule.as_ref(),
                priority,
                settings: rule.descriptor().settings(options),
            })
            .collect()
    }

    /// Every option key the catalog understands.
    pub fn known_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for descriptor in self.descriptors() {
            keys.insert(descriptor.option_key());
            keys.extend(descriptor.aliases.iter().cloned());
            for option in &descriptor.sub_options {
                keys.insert(descriptor.sub_option_key(option.name));
            }
        }
        keys
    }

    /// Unknown `cleanup.*` keys and unacceptable sub-option values.
    pub fn check_options(&self, options: &Options) -> Vec<OptionIssue> {
        let known = self.known_keys();
        let mut issues = Vec::new();
        for (key, value) in options.iter() {
            if !key.starts_with("cleanup.") {
                continue;
            }
            if !known.contains(key) {
                issues.push(OptionIssue::UnknownKey {
                    key: key.to_string(),
                    suggestion: suggest(key, known.iter().map(String::as_str)),
                });
                continue;
            }
            for descriptor in self.descriptors() {
                for option in &descriptor.sub_options {
                    if descriptor.sub_option_key(option.name) == key && !option.accepts(value) {
                        let expected = if option.choices.is_empty() {
                            "a boolean".to_string()
                        } else {
                            format!("one of {}", option.choices.join(", "))
                        };
                        issues.push(OptionIssue::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                            expected,
                        });
                    }
                }
            }
        }
        issues
    }
}
