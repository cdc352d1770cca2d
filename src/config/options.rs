//! Flat `name -> value` options store.
//!
//! Read once per engine invocation. Unknown names are ignored by the engine;
//! a missing rule key means the rule is disabled.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl OptionValue {
    /// Interpret a raw command-line value: booleans and integers are typed,
    /// surrounding quotes are stripped from everything else.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => return OptionValue::Bool(true),
            "false" => return OptionValue::Bool(false),
            _ => {}
        }
        if let Ok(number) = raw.parse::<i64>() {
            return OptionValue::Integer(number);
        }
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(raw);
        OptionValue::Text(unquoted.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(value) => Some(*value),
            OptionValue::Text(text) if text == "true" => Some(true),
            OptionValue::Text(text) if text == "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            OptionValue::Integer(value) => Some(*value),
            OptionValue::Text(text) => text.parse().ok(),
            OptionValue::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Integer(value) => write!(f, "{value}"),
            OptionValue::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

/// Immutable-by-convention option map threaded into one `clean_up` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Enable `cleanup.<rule_id>`.
    pub fn enable(self, rule_id: &str) -> Self {
        self.with(format!("cleanup.{rule_id}"), true)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// `true` only for an explicit boolean (or `"true"`) value.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).and_then(OptionValue::as_bool).unwrap_or(false)
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(OptionValue::as_bool).unwrap_or(default)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(OptionValue::as_integer)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Later values win.
    pub fn merge(&mut self, other: Options) {
        self.values.extend(other.values);
    }
}

impl FromIterator<(String, OptionValue)> for Options {
    fn from_iter<T: IntoIterator<Item = (String, OptionValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Split a `key=value` assignment.
pub fn parse_assignment(input: &str) -> Option<(String, OptionValue)> {
    let (key, value) = input.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), OptionValue::parse(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_disabled() {
        let options = Options::new();
        assert!(!options.is_enabled("cleanup.use_blocks"));
    }

    #[test]
    fn string_true_enables() {
        let options = Options::new().with("cleanup.use_blocks", "true");
        assert!(options.is_enabled("cleanup.use_blocks"));
        let options = Options::new().with("cleanup.use_blocks", "yes");
        assert!(!options.is_enabled("cleanup.use_blocks"));
    }

    #[test]
    fn assignment_parsing_types_values() {
        assert_eq!(
            parse_assignment("engine.max_passes=4"),
            Some(("engine.max_passes".to_string(), OptionValue::Integer(4)))
        );
        assert_eq!(
            parse_assignment("cleanup.this_qualification.mode = \"always\""),
            Some((
                "cleanup.this_qualification.mode".to_string(),
                OptionValue::Text("always".to_string())
            ))
        );
        assert_eq!(parse_assignment("novalue"), None);
        assert_eq!(parse_assignment("=1"), None);
    }

    #[test]
    fn merge_overrides() {
        let mut base = Options::new().with("a", true).with("b", 1);
        base.merge(Options::new().with("a", false));
        assert!(!base.is_enabled("a"));
        assert_eq!(base.integer("b"), Some(1));
    }
}
