// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Built-in HTML template system.
//!
//! A small engine that covers what a site needs from its templates:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `{name}` / `{a.b}` | Escaped value from the scope (missing renders empty) |
//! | `{@html name}` | Unescaped value |
//! | `{@include "path"}` | Inline another template at compile time |
//! | `<page layout="blog" title="..."/>` | Page directive, renders nothing |
//! | `<script src="...">` | Script asset, moved to the bundle |
//! | `<link rel="stylesheet" href="...">` | Stylesheet asset, moved to the bundle |
//!
//! Paths in `include`, `src`, `href` and `depends` are resolved through the
//! VFS relative to the declaring template, or from the root when they start
//! with `/`. `http://`, `https://` and `//` references become url assets.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::asset::{Asset, AssetRef, AssetStore, AssetType};
use crate::error::{Result, StxError};
use crate::page::PageConfig;
use crate::template::{escape_html, CompileContext, Compiled, Scope, TemplateSystem};
use crate::vfs::{join_path, normalize_path, Vfs};

/// Maximum `{@include}` nesting depth.
pub const MAX_INCLUDE_DEPTH: usize = 16;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(concat!(
        r#"\{@html\s+(?P<raw>[A-Za-z_][\w.]*)\s*\}"#,
        r#"|\{@include\s+"(?P<include>[^"]+)"\s*\}"#,
        r#"|\{\s*(?P<value>[A-Za-z_][\w.]*)\s*\}"#,
        r#"|<page\b(?P<page>[^>]*?)/?>(?:\s*</page>)?"#,
        r#"|<script\b(?P<script>[^>]*)>\s*</script>"#,
        r#"|<link\b(?P<link>[^>]*?)/?>"#,
    ))
    .unwrap();
    static ref ATTR_RE: Regex = Regex::new(
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
    )
    .unwrap();
    static ref PLACEHOLDER_RE: Regex = Regex::new(r#"\{\s*([A-Za-z_][\w.]*)\s*\}"#).unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Value { path: String, raw: bool },
    Page { layout: String, title: String },
}

/// A compiled HTML template.
#[derive(Debug, Clone)]
pub struct HtmlTemplate {
    path: String,
    nodes: Vec<Node>,
}

impl HtmlTemplate {
    /// Logical path of the template.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Default)]
struct CompileState {
    assets: Vec<AssetRef>,
    page: Option<PageConfig>,
}

fn parse_attributes(input: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(input)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

fn take_attribute(attributes: &mut Vec<(String, String)>, name: &str) -> Option<String> {
    let index = attributes.iter().position(|(k, _)| k == name)?;
    Some(attributes.remove(index).1)
}

fn is_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://") || reference.starts_with("//")
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn interpolate(template: &str, scope: &Scope) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            scope.lookup(&caps[1]).map(value_to_string).unwrap_or_default()
        })
        .into_owned()
}

/// The built-in template system.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use stx::{HtmlTemplateSystem, MemorySource, TemplateSystem, Vfs};
///
/// let vfs = Arc::new(Vfs::new());
/// vfs.register(Arc::new(MemorySource::new().with_file("hi.html", "<p>{name}</p>")), "", 0)?;
///
/// let templates = HtmlTemplateSystem::new(vfs);
/// let (compiled, _) = templates.compile("/hi.html")?;
/// let mut scope = templates.new_scope();
/// scope.set("name", "World")?;
/// assert_eq!(templates.execute(&compiled.template, &mut scope)?, "<p>World</p>");
/// ```
#[derive(Debug)]
pub struct HtmlTemplateSystem {
    vfs: Arc<Vfs>,
    store: AssetStore,
    globals: Map<String, Value>,
}

impl HtmlTemplateSystem {
    /// Creates a template system reading from `vfs`.
    pub fn new(vfs: Arc<Vfs>) -> Self {
        Self {
            vfs,
            store: AssetStore::new(),
            globals: Map::new(),
        }
    }

    /// Seeds every new scope with `globals`.
    pub fn with_globals(mut self, globals: Map<String, Value>) -> Self {
        self.globals = globals;
        self
    }

    /// The VFS templates are read from.
    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    /// The store interning declared assets.
    pub fn asset_store(&self) -> &AssetStore {
        &self.store
    }

    fn compile_file(&self, path: &str, depth: usize, state: &mut CompileState) -> Result<Vec<Node>> {
        let source = self.vfs.resolve_string(path)?;
        let mut nodes = Vec::new();
        let mut last = 0;

        for caps in TOKEN_RE.captures_iter(&source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            self.push_text(&mut nodes, &source[last..whole.start()], path)?;
            last = whole.end();

            if let Some(raw) = caps.name("raw") {
                nodes.push(Node::Value {
                    path: raw.as_str().to_string(),
                    raw: true,
                });
            } else if let Some(value) = caps.name("value") {
                nodes.push(Node::Value {
                    path: value.as_str().to_string(),
                    raw: false,
                });
            } else if let Some(include) = caps.name("include") {
                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(StxError::compile(
                        path,
                        format!("include nesting deeper than {} levels", MAX_INCLUDE_DEPTH),
                    ));
                }
                let target = join_path(path, include.as_str());
                let included = self.compile_file(&target, depth + 1, state).map_err(|e| match e {
                    StxError::FileNotFound(missing) => {
                        StxError::compile(path, format!("included template {} not found", missing))
                    }
                    other => other,
                })?;
                nodes.extend(included);
            } else if let Some(page) = caps.name("page") {
                let mut attributes = parse_attributes(page.as_str());
                let layout = take_attribute(&mut attributes, "layout").unwrap_or_default();
                let title = take_attribute(&mut attributes, "title").unwrap_or_default();
                if state.page.is_none() {
                    state.page = Some(PageConfig::new(layout.clone(), title.clone()));
                }
                nodes.push(Node::Page { layout, title });
            } else if let Some(script) = caps.name("script") {
                let attributes = parse_attributes(script.as_str());
                if attributes.iter().any(|(k, _)| k == "src") {
                    let asset = self.declare_asset(path, AssetType::Javascript, attributes)?;
                    state.assets.push(asset);
                } else {
                    self.push_text(&mut nodes, whole.as_str(), path)?;
                }
            } else if let Some(link) = caps.name("link") {
                let attributes = parse_attributes(link.as_str());
                let is_stylesheet = attributes
                    .iter()
                    .any(|(k, v)| k == "rel" && v.eq_ignore_ascii_case("stylesheet"));
                if is_stylesheet && attributes.iter().any(|(k, _)| k == "href") {
                    let asset = self.declare_asset(path, AssetType::Stylesheet, attributes)?;
                    state.assets.push(asset);
                } else {
                    self.push_text(&mut nodes, whole.as_str(), path)?;
                }
            }
        }
        self.push_text(&mut nodes, &source[last..], path)?;

        Ok(nodes)
    }

    fn push_text(&self, nodes: &mut Vec<Node>, text: &str, path: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(pos) = text.find("{@") {
            let snippet: String = text[pos..].chars().take(24).collect();
            return Err(StxError::compile(path, format!("unknown directive near '{}'", snippet)));
        }
        match nodes.last_mut() {
            Some(Node::Text(previous)) => previous.push_str(text),
            _ => nodes.push(Node::Text(text.to_string())),
        }
        Ok(())
    }

    fn declare_asset(
        &self,
        path: &str,
        kind: AssetType,
        mut attributes: Vec<(String, String)>,
    ) -> Result<AssetRef> {
        let reference_attr = match kind {
            AssetType::Javascript => "src",
            AssetType::Stylesheet => "href",
        };
        let reference = take_attribute(&mut attributes, reference_attr).unwrap_or_default();
        let integrity = take_attribute(&mut attributes, "integrity");
        let depends = take_attribute(&mut attributes, "depends").unwrap_or_default();
        let priority = match take_attribute(&mut attributes, "priority") {
            Some(value) => value.trim().parse::<i32>().map_err(|_| {
                StxError::compile(path, format!("invalid asset priority '{}' on {}", value, reference))
            })?,
            None => 0,
        };
        // Markup for these is generated by the bundler
        take_attribute(&mut attributes, "type");
        take_attribute(&mut attributes, "rel");

        let mut asset = if is_url(&reference) {
            Asset::from_url(kind, reference)
        } else {
            let origin = join_path(path, &reference);
            let content = self.vfs.resolve(&origin).map_err(|e| {
                if e.is_not_found() {
                    StxError::compile(path, format!("asset {} not found", origin))
                } else {
                    e
                }
            })?;
            Asset::from_content(kind, origin, content)
        };

        if let Some(integrity) = integrity {
            asset = asset.with_integrity(integrity);
        }
        for dependency in depends.split_whitespace() {
            let dependency = if is_url(dependency) {
                dependency.to_string()
            } else {
                join_path(path, dependency)
            };
            asset = asset.with_dependency(dependency);
        }
        for (name, value) in attributes {
            asset = asset.with_attribute(name, value);
        }

        self.store.intern(asset.with_priority(priority))
    }
}

impl TemplateSystem for HtmlTemplateSystem {
    type Template = HtmlTemplate;

    fn compile(&self, path: &str) -> Result<(Arc<Compiled<HtmlTemplate>>, CompileContext)> {
        let path = normalize_path(path);
        let mut state = CompileState::default();
        let nodes = self.compile_file(&path, 0, &mut state)?;

        let compiled = Compiled {
            path: path.clone(),
            template: HtmlTemplate { path, nodes },
            assets: state.assets,
        };
        Ok((Arc::new(compiled), CompileContext { page: state.page }))
    }

    fn new_scope(&self) -> Scope {
        Scope::with_values(self.globals.clone())
    }

    fn execute(&self, template: &HtmlTemplate, scope: &mut Scope) -> Result<String> {
        let mut out = String::new();
        for node in &template.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Value { path, raw } => {
                    let value = scope.lookup(path).map(value_to_string).unwrap_or_default();
                    if *raw {
                        out.push_str(&value);
                    } else {
                        out.push_str(&escape_html(&value));
                    }
                }
                Node::Page { layout, title } => {
                    let title = interpolate(title, scope);
                    scope.set_page(PageConfig::new(layout.clone(), title));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::json;

    fn system(files: &[(&str, &str)]) -> HtmlTemplateSystem {
        let source = MemorySource::new();
        for (path, content) in files {
            source.add_file(path, *content);
        }
        let vfs = Arc::new(Vfs::new());
        vfs.register(Arc::new(source), "", 0).unwrap();
        HtmlTemplateSystem::new(vfs)
    }

    fn render(system: &HtmlTemplateSystem, path: &str, scope: &mut Scope) -> String {
        let (compiled, _) = system.compile(path).unwrap();
        system.execute(&compiled.template, scope).unwrap()
    }

    #[test]
    fn test_values_are_escaped_unless_raw() {
        let system = system(&[("t.html", "<p>{name}</p>{@html body}<i>{missing}</i>")]);
        let mut scope = system.new_scope();
        scope.set("name", "<b>Ann</b>").unwrap();
        scope.set("body", "<em>hi</em>").unwrap();
        assert_eq!(
            render(&system, "/t.html", &mut scope),
            "<p>&lt;b&gt;Ann&lt;/b&gt;</p><em>hi</em><i></i>"
        );
    }

    #[test]
    fn test_dotted_lookup_and_globals() {
        let mut globals = Map::new();
        globals.insert("site".into(), json!({ "name": "Docs" }));
        let system = system(&[("t.html", "{site.name}: {count}")]).with_globals(globals);
        let mut scope = system.new_scope();
        scope.set("count", 2).unwrap();
        assert_eq!(render(&system, "t.html", &mut scope), "Docs: 2");
    }

    #[test]
    fn test_include_relative_and_absolute() {
        let system = system(&[
            ("blog/post.html", "<article>{@include \"../_partials/head.html\"}</article>"),
            ("_partials/head.html", "<h1>{title}</h1>{@include \"/_partials/foot.html\"}"),
            ("_partials/foot.html", "<footer/>"),
        ]);
        let mut scope = system.new_scope();
        scope.set("title", "Hi").unwrap();
        assert_eq!(
            render(&system, "/blog/post.html", &mut scope),
            "<article><h1>Hi</h1><footer/></article>"
        );
    }

    #[test]
    fn test_missing_include_is_compile_error() {
        let system = system(&[("t.html", "{@include \"nope.html\"}")]);
        let err = system.compile("/t.html").unwrap_err();
        assert!(matches!(err, StxError::TemplateCompile { ref path, .. } if path == "/t.html"));
    }

    #[test]
    fn test_missing_template_is_not_found() {
        let system = system(&[]);
        assert!(matches!(system.compile("/x.html").unwrap_err(), StxError::FileNotFound(_)));
    }

    #[test]
    fn test_include_depth_limit() {
        let system = system(&[("loop.html", "{@include \"loop.html\"}")]);
        let err = system.compile("/loop.html").unwrap_err();
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn test_unknown_directive() {
        let system = system(&[("t.html", "{@each items}")]);
        assert!(matches!(system.compile("/t.html").unwrap_err(), StxError::TemplateCompile { .. }));
    }

    #[test]
    fn test_page_directive() {
        let system = system(&[(
            "p.html",
            "<page layout=\"blog\" title=\"Post {post.title}\"/><h1>{post.title}</h1>",
        )]);
        let (compiled, context) = system.compile("/p.html").unwrap();
        assert_eq!(context.page, Some(PageConfig::new("blog", "Post {post.title}")));

        let mut scope = system.new_scope();
        scope.set("post", json!({ "title": "One" })).unwrap();
        let html = system.execute(&compiled.template, &mut scope).unwrap();
        assert_eq!(html, "<h1>One</h1>");
        assert_eq!(scope.page(), Some(&PageConfig::new("blog", "Post One")));
    }

    #[test]
    fn test_asset_declarations() {
        let system = system(&[
            (
                "about/index.html",
                "<script src=\"util.js\" depends=\"/js/base.js\" defer></script>\n\
                 <link rel=\"stylesheet\" href=\"/css/site.css\" media=\"screen\">\n\
                 <script src=\"https://cdn.example.com/lib.js\" integrity=\"sha384-x\"></script>\n\
                 <script>inline()</script>\n\
                 <link rel=\"icon\" href=\"/favicon.ico\">",
            ),
            ("about/util.js", "util()"),
            ("js/base.js", "base()"),
            ("css/site.css", "body{}"),
        ]);
        let (compiled, _) = system.compile("/about/index.html").unwrap();
        let assets = &compiled.assets;
        assert_eq!(assets.len(), 3);

        assert_eq!(assets[0].origin(), "/about/util.js");
        assert_eq!(assets[0].content(), Some(&b"util()"[..]));
        assert_eq!(assets[0].dependencies(), &["/js/base.js".to_string()]);
        assert_eq!(assets[0].attributes(), &[("defer".to_string(), String::new())]);

        assert_eq!(assets[1].kind(), AssetType::Stylesheet);
        assert_eq!(assets[1].attributes(), &[("media".to_string(), "screen".to_string())]);

        assert_eq!(assets[2].url(), Some("https://cdn.example.com/lib.js"));
        assert_eq!(assets[2].integrity(), Some("sha384-x"));

        let mut scope = system.new_scope();
        let html = system.execute(&compiled.template, &mut scope).unwrap();
        assert!(!html.contains("util.js"));
        assert!(html.contains("<script>inline()</script>"));
        assert!(html.contains("<link rel=\"icon\" href=\"/favicon.ico\">"));
    }

    #[test]
    fn test_recompile_reuses_assets() {
        let system = system(&[("t.html", "<script src=\"/a.js\"></script>"), ("a.js", "a")]);
        let (first, _) = system.compile("/t.html").unwrap();
        let (second, _) = system.compile("/t.html").unwrap();
        assert_eq!(first.assets[0].id(), second.assets[0].id());
    }

    #[test]
    fn test_missing_asset_is_compile_error() {
        let system = system(&[("t.html", "<script src=\"gone.js\"></script>")]);
        let err = system.compile("/t.html").unwrap_err();
        assert!(err.to_string().contains("/gone.js"));
    }

    #[test]
    fn test_invalid_priority() {
        let system = system(&[("t.html", "<script src=\"/a.js\" priority=\"high\"></script>"), ("a.js", "")]);
        assert!(system.compile("/t.html").is_err());
    }
}
