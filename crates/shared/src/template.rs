//! Placeholder template rendering.
//!
//! Templates contain `{key}` tokens that are substituted from a flat
//! [`TemplateContext`]. Rendering is a single pass: substituted values are
//! never re-scanned, and tokens without a matching context entry are left in
//! the output verbatim.

use std::collections::BTreeMap;
use std::fmt;

use regex::{Captures, Regex};

lazy_static::lazy_static! {
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap();
}

/// Flat key/value context used to render templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Any `Display` value is stringified on insert.
    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.values.insert(key.into(), value.to_string());
    }

    /// Builder-style variant of [`TemplateContext::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Render a template against a context.
///
/// Never fails. Braces that do not form a `{key}` token are untouched.
pub fn render(template: &str, context: &TemplateContext) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| match context.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// List the distinct placeholder keys referenced by a template, in order of
/// first appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut keys: Vec<&str> = Vec::new();
    for caps in PLACEHOLDER_REGEX.captures_iter(template) {
        if let Some(key) = caps.get(1).map(|m| m.as_str()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Placeholder keys referenced by a template that the context cannot resolve.
pub fn unresolved<'a>(template: &'a str, context: &TemplateContext) -> Vec<&'a str> {
    placeholders(template)
        .into_iter()
        .filter(|key| context.get(key).is_none())
        .collect()
}
