// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The template system seam.
//!
//! The site compiles and executes pages and layouts through the
//! [`TemplateSystem`] trait only. [`crate::HtmlTemplateSystem`] is the
//! built-in implementation; any other engine can be plugged in by
//! implementing the trait.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::asset::AssetRef;
use crate::error::Result;
use crate::page::PageConfig;

/// A compiled template together with the assets it declared.
#[derive(Debug)]
pub struct Compiled<T> {
    /// Logical path the template was compiled from.
    pub path: String,
    /// Engine-specific compiled form.
    pub template: T,
    /// Assets declared by the template and everything it includes.
    pub assets: Vec<AssetRef>,
}

/// Compile-time information extracted from a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileContext {
    /// Page configuration from the page directive, if the template has one.
    pub page: Option<PageConfig>,
}

/// Values visible to a template during execution.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: Map<String, Value>,
    page: Option<PageConfig>,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope seeded with `values`.
    pub fn with_values(values: Map<String, Value>) -> Self {
        Self { values, page: None }
    }

    /// Binds a raw JSON value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Binds any serializable value.
    pub fn set<V: Serialize>(&mut self, key: impl Into<String>, value: V) -> Result<()> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Top level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Looks up a dotted path such as `page.title` or `items.0`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Records the runtime page configuration.
    pub fn set_page(&mut self, page: PageConfig) {
        self.page = Some(page);
    }

    /// Runtime page configuration, if the template produced one.
    pub fn page(&self) -> Option<&PageConfig> {
        self.page.as_ref()
    }

    /// Removes and returns the runtime page configuration.
    pub fn take_page(&mut self) -> Option<PageConfig> {
        self.page.take()
    }
}

/// A template engine the site can compile pages and layouts with.
///
/// A template missing from every source must be reported as
/// [`crate::StxError::FileNotFound`]; the site uses that to tell a missing
/// layout apart from a broken one.
pub trait TemplateSystem: Send + Sync + 'static {
    /// Engine-specific compiled form.
    type Template: Send + Sync + 'static;

    /// Compiles the template at a logical path.
    fn compile(&self, path: &str) -> Result<(Arc<Compiled<Self::Template>>, CompileContext)>;

    /// Creates a fresh execution scope.
    fn new_scope(&self) -> Scope;

    /// Executes a compiled template against a scope.
    fn execute(&self, template: &Self::Template, scope: &mut Scope) -> Result<String>;
}

/// Escapes text for HTML content and double or single quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">Tom & Jerry's</a>"), "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_scope_lookup() {
        let mut scope = Scope::new();
        scope.insert("site", json!({ "name": "Docs", "tags": ["a", "b"] }));
        scope.set("count", 3).unwrap();

        assert_eq!(scope.lookup("site.name"), Some(&json!("Docs")));
        assert_eq!(scope.lookup("site.tags.1"), Some(&json!("b")));
        assert_eq!(scope.lookup("count"), Some(&json!(3)));
        assert_eq!(scope.lookup("site.missing"), None);
        assert_eq!(scope.lookup("count.deeper"), None);
    }

    #[test]
    fn test_scope_page_slot() {
        let mut scope = Scope::new();
        assert!(scope.page().is_none());
        scope.set_page(PageConfig::new("root.html", "Hello"));
        assert_eq!(scope.page().map(|p| p.title.as_str()), Some("Hello"));
        assert!(scope.take_page().is_some());
        assert!(scope.page().is_none());
    }
}
