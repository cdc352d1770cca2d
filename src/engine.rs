//! Engine entry point.
//!
//! [`Engine::clean_up`] is the only surface callers need: it selects the
//! active rules for an options value, parses the source once, and hands the
//! tree to the [`Scheduler`]. Only a parse failure is an error; everything
//! else that goes wrong is recovered and reported as a diagnostic.

use crate::apply::ApplySettings;
use crate::config::{Options, TemplateDefinition};
use crate::diagnostics::{Diagnostics, Severity};
use crate::pool;
use crate::render::{IndentSetting, Style};
use crate::rules::{Catalog, CatalogError, OptionIssue};
use crate::scheduler::{CancellationToken, Scheduler, SchedulerState, DEFAULT_MAX_PASSES};
use crate::syntax::{ErrorNode, SyntaxError};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanUpError {
    #[error("input does not parse: {} syntax error(s), first at line {line}, column {column}", .errors.len())]
    Parse {
        errors: Vec<ErrorNode>,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// `engine.*` options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_passes: usize,
    pub format_edited_regions: bool,
    pub indent: Option<IndentSetting>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            format_edited_regions: true,
            indent: None,
        }
    }
}

impl EngineSettings {
    /// Read `engine.*` keys; unusable values fall back to defaults with a warning.
    pub fn from_options(options: &Options, diagnostics: &mut Diagnostics) -> Self {
        let mut settings = Self::default();
        if let Some(value) = options.get("engine.max_passes") {
            match value.as_integer().filter(|passes| (1..=1000).contains(passes)) {
                Some(passes) => settings.max_passes = passes as usize,
                None => diagnostics.report(
                    0,
                    None,
                    Severity::Warning,
                    None,
                    format!("engine.max_passes = {value} is not a pass count from 1 to 1000; using {DEFAULT_MAX_PASSES}"),
                ),
            }
        }
        settings.format_edited_regions = options.flag("engine.format_edited_regions", true);
        if let Some(value) = options.get("engine.indent") {
            let raw = match value.as_text() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            };
            match IndentSetting::parse(&raw) {
                Some(indent) => settings.indent = Some(indent),
                None => diagnostics.report(
                    0,
                    None,
                    Severity::Warning,
                    None,
                    format!("engine.indent = {value} is not \"auto\", \"tab\" or a width; detecting"),
                ),
            }
        }
        settings
    }
}

/// Output of one `clean_up` call.
#[derive(Debug, Clone, Serialize)]
pub struct CleanUpResult {
    pub text: String,
    pub applied_rules: BTreeSet<String>,
    pub diagnostics: Diagnostics,
    pub passes: usize,
    pub state: SchedulerState,
}

impl CleanUpResult {
    fn unchanged(source: &str, diagnostics: Diagnostics) -> Self {
        Self {
            text: source.to_string(),
            applied_rules: BTreeSet::new(),
            diagnostics,
            passes: 0,
            state: SchedulerState::Idle,
        }
    }

    pub fn is_changed(&self) -> bool {
        !self.applied_rules.is_empty()
    }
}

/// Rule catalog plus the fixed-point driver. Immutable and shareable across
/// threads; each call owns its own tree and edit sets.
#[derive(Debug)]
pub struct Engine {
    catalog: Catalog,
}

impl Engine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self::new(Catalog::builtin()?))
    }

    pub fn with_templates(templates: &[TemplateDefinition]) -> Result<Self, CatalogError> {
        Ok(Self::new(Catalog::with_templates(templates)?))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn clean_up(&self, source: &str, options: &Options) -> Result<CleanUpResult, CleanUpError> {
        self.clean_up_with(source, options, &CancellationToken::new())
    }

    pub fn clean_up_with(
        &self,
        source: &str,
        options: &Options,
        cancel: &CancellationToken,
    ) -> Result<CleanUpResult, CleanUpError> {
        let mut diagnostics = Diagnostics::new();
        for issue in self.catalog.check_options(options) {
            let severity = match issue {
                OptionIssue::UnknownKey { .. } => Severity::Info,
                OptionIssue::InvalidValue { .. } => Severity::Warning,
            };
            diagnostics.report(0, None, severity, None, issue.to_string());
        }

        let active = self.catalog.active_rules(options);
        if active.is_empty() {
            return Ok(CleanUpResult::unchanged(source, diagnostics));
        }
        let settings = EngineSettings::from_options(options, &mut diagnostics);

        let span = tracing::debug_span!("clean_up", rules = active.len(), bytes = source.len());
        let _guard = span.enter();

        let tree = pool::with_parser(|parser| parser.parse_tree(source))??;
        if let Some(first) = tree.error_nodes().first() {
            return Err(CleanUpError::Parse {
                line: first.line,
                column: first.column,
                errors: tree.error_nodes().to_vec(),
            });
        }

        let style = Style::from_setting(settings.indent, source);
        let outcome = Scheduler::new(&active, style)
            .with_max_passes(settings.max_passes)
            .with_apply_settings(ApplySettings {
                format_edited_regions: settings.format_edited_regions,
            })
            .run(tree, cancel, &mut diagnostics);

        Ok(CleanUpResult {
            text: outcome.text,
            applied_rules: outcome.applied_rules,
            diagnostics,
            passes: outcome.passes,
            state: outcome.state,
        })
    }
}

/// Clean up `source` with the built-in rules enabled in `options`.
pub fn clean_up(source: &str, options: &Options) -> Result<CleanUpResult, CleanUpError> {
    Engine::builtin()?.clean_up(source, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_active_rules_returns_input_without_parsing() {
        let source = "class A { this is not java";
        let result = clean_up(source, &Options::new()).unwrap();
        assert_eq!(result.text, source);
        assert!(result.applied_rules.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn parse_failure_is_an_error() {
        let options = Options::new().enable("use_blocks");
        let err = clean_up("class A { void f( { }", &options).unwrap_err();
        assert!(matches!(err, CleanUpError::Parse { line: 1, .. }));
    }

    #[test]
    fn reports_applied_rules() {
        let options = Options::new().enable("redundant_wrapper");
        let result = clean_up("class A { String s = new String(\"a\"); }", &options).unwrap();
        assert_eq!(result.text, "class A { String s = \"a\"; }");
        assert_eq!(result.applied_rules.iter().collect::<Vec<_>>(), ["redundant_wrapper"]);
        assert_eq!(result.passes, 1);
        assert!(result.is_changed());
    }

    #[test]
    fn engine_settings_validate_values() {
        let mut diagnostics = Diagnostics::new();
        let options = Options::new()
            .with("engine.max_passes", 0)
            .with("engine.indent", "tab")
            .with("engine.format_edited_regions", false);
        let settings = EngineSettings::from_options(&options, &mut diagnostics);
        assert_eq!(settings.max_passes, DEFAULT_MAX_PASSES);
        assert_eq!(settings.indent, Some(IndentSetting::Tab));
        assert!(!settings.format_edited_regions);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn unknown_rule_keys_are_reported_not_fatal() {
        let options = Options::new().with("cleanup.use_block", true);
        let result = clean_up("class A {}", &options).unwrap();
        assert!(!result.is_changed());
        assert!(result.diagnostics.iter().any(|d| d.message.contains("cleanup.use_blocks")));
    }
}
