// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Route listing command.

use console::style;
use std::fmt::Write;
use stx::{AssetType, HtmlTemplateSystem, Site};

use super::{build_site, print_failures};
use crate::config::Config;

/// Compiles the site and prints every route with its bundles.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    let working_dir = std::env::current_dir()?;

    let site = build_site(&config, &working_dir)?;
    let report = site.compile()?;

    print!("{}", describe_routes(&site)?);
    print_failures(&report);
    Ok(())
}

/// One block per route: the template and layout behind it, then the
/// resolved script and stylesheet names in bundle order, then any cycles.
pub fn describe_routes(site: &Site<HtmlTemplateSystem>) -> anyhow::Result<String> {
    let routes = site.routes()?;
    let bundle = site.bundler().snapshot()?;
    let mut out = String::new();

    for (route, page) in routes.routes() {
        writeln!(
            out,
            "{} {} {}",
            style(route).green().bold(),
            style("->").dim(),
            style(format!("{} ({})", page.path, page.config.layout)).dim()
        )?;
        for (label, kind) in [("scripts", AssetType::Javascript), ("styles", AssetType::Stylesheet)] {
            let names: Vec<String> = bundle
                .assets(route, kind)
                .into_iter()
                .map(|a| a.name)
                .collect();
            if !names.is_empty() {
                writeln!(out, "    {:<8} {}", style(label).cyan(), names.join(", "))?;
            }
        }
    }

    for cycle in bundle.cycles() {
        writeln!(
            out,
            "{} {} {}: {}",
            style("cycle").yellow().bold(),
            cycle.page,
            cycle.kind.extension(),
            cycle.blocked.join(", ")
        )?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_describe_routes() {
        console::set_colors_enabled(false);
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("web/_layout")).unwrap();
        fs::create_dir_all(dir.path().join("web/docs")).unwrap();
        fs::write(
            dir.path().join("web/_layout/root.html"),
            "<link rel=\"stylesheet\" href=\"/site.css\">{@html styles}{@html content}{@html scripts}",
        )
        .unwrap();
        fs::write(dir.path().join("web/site.css"), "body{}").unwrap();
        fs::write(dir.path().join("web/app.js"), "run()").unwrap();
        fs::write(dir.path().join("web/index.html"), "<script src=\"/app.js\"></script>home").unwrap();
        fs::write(dir.path().join("web/docs/index.html"), "docs").unwrap();

        let site = build_site(&Config::default(), dir.path()).unwrap();
        site.compile().unwrap();

        let out = describe_routes(&site).unwrap();
        assert!(out.contains("/ -> /index.html (root.html)"));
        assert!(out.contains("/docs/ -> /docs/index.html (root.html)"));
        assert!(out.contains("app"));
        assert!(out.contains("site"));
        assert!(!out.contains("cycle"));
    }
}
