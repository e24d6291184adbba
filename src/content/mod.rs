//! Display text for content keys.
//!
//! The engine only ever carries keys; this module turns a key plus the
//! step context into the text a reader sees.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use handlebars::Handlebars;
use once_cell::sync::Lazy;

use crate::progress::StepContext;

const EMBEDDED_CATALOG: &str = include_str!("en.toml");

static DEFAULT_ENTRIES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    match parse_catalog(EMBEDDED_CATALOG) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "Embedded content catalog is invalid");
            HashMap::new()
        }
    }
});

/// Resolves a content key to display text
pub trait ContentResolver {
    fn resolve(&self, key: &str, context: &StepContext) -> String;
}

/// Key to template map rendered with handlebars
pub struct Catalog {
    entries: HashMap<String, String>,
    handlebars: Handlebars<'static>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_entries(DEFAULT_ENTRIES.clone())
    }
}

impl Catalog {
    fn from_entries(entries: HashMap<String, String>) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Plain terminal text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self {
            entries,
            handlebars,
        }
    }

    /// Built-in catalog with the entries of `path` layered on top
    pub fn with_overrides(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content catalog {}", path.display()))?;
        let overrides = parse_catalog(&content)
            .with_context(|| format!("Failed to parse content catalog {}", path.display()))?;

        let mut entries = DEFAULT_ENTRIES.clone();
        entries.extend(overrides);
        Ok(Self::from_entries(entries))
    }

    /// Catalog from an optional override path, logging and falling back to
    /// the built-in texts when the override cannot be used
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::with_overrides(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Using built-in content catalog");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentResolver for Catalog {
    fn resolve(&self, key: &str, context: &StepContext) -> String {
        let Some(template) = self.entries.get(key) else {
            return key.to_string();
        };
        if !template.contains("{{") {
            return template.clone();
        }
        self.handlebars
            .render_template(template, context)
            .unwrap_or_else(|e| {
                tracing::debug!(key, error = %e, "Content template failed to render");
                template.clone()
            })
    }
}

/// Flatten a TOML catalog into dotted keys
fn parse_catalog(content: &str) -> Result<HashMap<String, String>> {
    let table: toml::Table = toml::from_str(content)?;
    let mut entries = HashMap::new();
    flatten("", &table, &mut entries);
    Ok(entries)
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten(&full_key, inner, out),
            toml::Value::String(s) => {
                out.insert(full_key, s.clone());
            }
            other => {
                out.insert(full_key, other.to_string());
            }
        }
    }
}
