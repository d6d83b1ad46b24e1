// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Project initialization command for creating new stx projects.

use include_dir::{include_dir, Dir, DirEntry};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CONFIG_FILE;

static DEFAULT_TEMPLATE: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates/default");

/// Initializes a new stx project.
pub async fn run(name: Option<String>) -> anyhow::Result<()> {
    // "." or no argument initializes the current directory
    let is_current_dir = matches!(name.as_deref(), Some(".") | None);
    let (project_dir, project_name) = resolve_project_path(name)?;

    scaffold(&project_dir, &project_name)?;
    print_success(&project_name, is_current_dir);

    Ok(())
}

/// Writes the default project into `project_dir`.
///
/// Refuses to touch a directory that already holds an `stx.toml`.
pub fn scaffold(project_dir: &Path, project_name: &str) -> anyhow::Result<()> {
    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "{} already exists in {}",
            CONFIG_FILE,
            project_dir.display()
        );
    }

    if project_dir.exists() {
        tracing::info!("Initializing stx project in existing directory: {}", project_name);
    } else {
        fs::create_dir_all(project_dir)?;
        tracing::info!("Created project directory: {}", project_name);
    }

    for entry in DEFAULT_TEMPLATE.entries() {
        extract_entry(entry, project_dir, project_name)?;
    }
    Ok(())
}

fn resolve_project_path(name: Option<String>) -> anyhow::Result<(PathBuf, String)> {
    match name.as_deref() {
        Some(".") | None => {
            let current_dir = std::env::current_dir()?;
            let dir_name = current_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "my-stx-site".to_string());
            Ok((current_dir, dir_name))
        }
        Some(name) => {
            let project_path = Path::new(name).to_path_buf();
            let dir_name = project_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string());
            Ok((project_path, dir_name))
        }
    }
}

fn extract_entry(entry: &DirEntry, target: &Path, project_name: &str) -> anyhow::Result<()> {
    match entry {
        DirEntry::Dir(dir) => {
            fs::create_dir_all(target.join(dir.path()))?;
            for child in dir.entries() {
                extract_entry(child, target, project_name)?;
            }
        }
        DirEntry::File(file) => {
            let file_path = file.path();
            let file_name = file_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid file name: {:?}", file_path))?;

            let target_name = match file_name {
                "gitignore" => ".gitignore",
                name => name.strip_suffix(".tmpl").unwrap_or(name),
            };
            let target_path = match file_path.parent() {
                Some(parent) => target.join(parent).join(target_name),
                None => target.join(target_name),
            };
            if let Some(parent) = target_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = file
                .contents_utf8()
                .ok_or_else(|| anyhow::anyhow!("Non-UTF8 file: {:?}", file_path))?;
            let content = if file_name.ends_with(".tmpl") {
                content.replace("{{project_name}}", project_name)
            } else {
                content.to_string()
            };

            fs::write(&target_path, content)?;
        }
    }
    Ok(())
}

fn print_success(project_name: &str, is_current_dir: bool) {
    println!("Created stx project: {}", project_name);
    println!();
    println!("Next steps:");
    if !is_current_dir {
        println!("  cd {}", project_name);
    }
    println!("  stx dev");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_site;
    use crate::config::Config;
    use tempfile::tempdir;

    #[test]
    fn test_scaffold_compiles() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("blog");
        scaffold(&project, "blog").unwrap();

        assert!(project.join(".gitignore").exists());
        assert!(project.join("web/_layout/root.html").exists());

        let config = Config::load_from(&project).unwrap();
        assert_eq!(config.project.name, "blog");
        assert_eq!(config.globals["site_name"], "blog");

        let site = build_site(&config, &project).unwrap();
        let report = site.compile().unwrap();
        assert!(report.is_ok(), "{:?}", report.failures);
        let mut pages = report.pages.clone();
        pages.sort();
        assert_eq!(pages, vec!["/", "/about/"]);

        let body = String::from_utf8(site.handle("/about/").body_bytes().to_vec()).unwrap();
        assert!(body.contains("<title>About | blog</title>"));
        let site_js = body.find("/assets/js/site.js").unwrap();
        let about_js = body.find("/assets/js/about.js").unwrap();
        assert!(site_js < about_js);
    }

    #[test]
    fn test_scaffold_refuses_existing_project() {
        let dir = tempdir().unwrap();
        scaffold(dir.path(), "x").unwrap();
        assert!(scaffold(dir.path(), "x").is_err());
    }
}
