//! Clean-up rules.
//!
//! Each rule is a pure matcher over one [`SyntaxTree`]: it inspects the
//! kinds it cares about and returns [`Candidate`]s. Rules never see each
//! other's output within a pass; the compositor is the only place where
//! cross-rule decisions are made.

pub mod catalog;
pub mod support;
pub mod template;

mod boolean_if_else;
mod diamond;
mod duplicate_branches;
mod foreach;
mod hoist_field;
mod imports;
mod inline_return;
mod primitive_parsing;
mod redundant_cast;
mod redundant_wrapper;
mod super_call;
mod this_qualification;
mod unused;
mod use_blocks;

pub use catalog::{ActiveRule, Catalog, CatalogError, OptionIssue};
pub use template::{TemplateError, TemplateRule};

use crate::config::{OptionValue, Options};
use crate::edit::{Candidate, EditError};
use crate::render::Style;
use crate::syntax::SyntaxTree;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Generic shape of a rule's matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// A node is replaced wholesale; innermost match wins.
    LocalReplace,
    /// A minimal run of sibling statements is replaced.
    StatementList,
    /// Requires a precondition scan of the whole enclosing declaration.
    CrossCutting,
    /// Rewrites plus a declaration-insertion side-request, applied atomically.
    NameIntroducing,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::LocalReplace => "local",
            Shape::StatementList => "statement-list",
            Shape::CrossCutting => "cross-cutting",
            Shape::NameIntroducing => "name-introducing",
        };
        f.write_str(name)
    }
}

/// A named sub-option of a rule, read from `cleanup.<id>.<name>`.
#[derive(Debug, Clone, Serialize)]
pub struct SubOption {
    pub name: &'static str,
    pub default: OptionValue,
    /// Allowed text values; empty for boolean sub-options.
    pub choices: &'static [&'static str],
}

impl SubOption {
    pub const fn flag(name: &'static str, default: bool) -> Self {
        Self {
            name,
            default: OptionValue::Bool(default),
            choices: &[],
        }
    }

    pub fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self {
            name,
            default: OptionValue::Text(choices.first().copied().unwrap_or_default().to_string()),
            choices,
        }
    }

    /// Whether `value` is acceptable for this sub-option.
    pub fn accepts(&self, value: &OptionValue) -> bool {
        if self.choices.is_empty() {
            value.as_bool().is_some()
        } else {
            value
                .as_text()
                .is_some_and(|text| self.choices.contains(&text))
        }
    }
}

/// Identity and options of a rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleDescriptor {
    pub id: String,
    pub summary: String,
    pub shape: Shape,
    /// Additional option keys that enable the rule.
    pub aliases: Vec<String>,
    pub sub_options: Vec<SubOption>,
}

impl RuleDescriptor {
    pub fn new(id: impl Into<String>, summary: impl Into<String>, shape: Shape) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            shape,
            aliases: Vec::new(),
            sub_options: Vec::new(),
        }
    }

    pub fn with_alias(mut self, key: impl Into<String>) -> Self {
        self.aliases.push(key.into());
        self
    }

    pub fn with_sub_option(mut self, option: SubOption) -> Self {
        self.sub_options.push(option);
        self
    }

    /// Governing option key: `cleanup.<id>`.
    pub fn option_key(&self) -> String {
        format!("cleanup.{}", self.id)
    }

    pub fn sub_option_key(&self, name: &str) -> String {
        format!("cleanup.{}.{}", self.id, name)
    }

    pub fn is_enabled(&self, options: &Options) -> bool {
        options.is_enabled(&self.option_key())
            || self.aliases.iter().any(|alias| options.is_enabled(alias))
    }

    /// Resolve sub-option values, falling back to defaults for missing or
    /// unacceptable values.
    pub fn settings(&self, options: &Options) -> RuleSettings {
        let values = self
            .sub_options
            .iter()
            .map(|option| {
                let value = options
                    .get(&self.sub_option_key(option.name))
                    .filter(|value| option.accepts(value))
                    .cloned()
                    .unwrap_or_else(|| option.default.clone());
                (option.name.to_string(), value)
            })
            .collect();
        RuleSettings { values }
    }
}

/// Resolved sub-option values for one active rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSettings {
    values: BTreeMap<String, OptionValue>,
}

impl RuleSettings {
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(OptionValue::as_bool)
            .unwrap_or(false)
    }

    pub fn choice(&self, name: &str) -> &str {
        self.values
            .get(name)
            .and_then(OptionValue::as_text)
            .unwrap_or("")
    }
}

/// Everything a matcher may read.
pub struct MatchContext<'a> {
    pub tree: &'a SyntaxTree,
    pub settings: &'a RuleSettings,
    pub style: &'a Style,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("matcher panicked: {message}")]
    Panicked { message: String },

    #[error("invalid candidate: {0}")]
    Candidate(#[from] EditError),

    #[error("pattern matching failed: {0}")]
    Pattern(String),
}

/// A clean-up rule. Implementations are immutable and shared across threads.
pub trait Rule: Send + Sync {
    fn descriptor(&self) -> &RuleDescriptor;

    /// All opportunities in the tree. Must be deterministic for a given tree
    /// and settings.
    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError>;
}

/// Built-in rules in priority order.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(hoist_field::HoistSingleUseField::new()),
        Box::new(foreach::IndexedLoopToForeach::new()),
        Box::new(duplicate_branches::MergeDuplicateBranches::new()),
        Box::new(inline_return::InlineLocalBeforeReturn::new()),
        Box::new(unused::RemoveUnusedCode::new()),
        Box::new(super_call::RemoveRedundantSuperCall::new()),
        Box::new(imports::ImportQualifiedNames::new()),
        Box::new(this_qualification::ThisQualification::new()),
        Box::new(use_blocks::UseBlocks::new()),
        Box::new(boolean_if_else::SimplifyBooleanIfElse::new()),
        Box::new(redundant_wrapper::RedundantWrapper::new()),
        Box::new(primitive_parsing::PrimitiveParsing::new()),
        Box::new(redundant_cast::UnnecessaryCast::new()),
        Box::new(diamond::UseDiamondOperator::new()),
    ]
}
