// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Development server command with live reload support.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stx::{HtmlTemplateSystem, Site};
use tokio::sync::broadcast;

use super::{build_site, live_reload_asset, print_failures, print_report, server_addr};
use crate::config::Config;
use crate::server::http::{create_server, AppState};
use crate::server::livereload::ReloadEvent;
use crate::watcher::{only_stylesheets, FileWatcher};

/// Runs the development server with live reload.
pub async fn run(host: Option<String>, port: Option<u16>, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let working_dir = std::env::current_dir()?;

    let site = build_site(&config, &working_dir)?;
    let live_reload = !config.live_reload.disabled;
    if live_reload {
        site.add_required_asset(live_reload_asset(&site, &config.live_reload)?)?;
    }

    let start = Instant::now();
    let report = site.compile()?;
    if quiet {
        print_failures(&report);
    } else {
        print_report(&report, start.elapsed());
        println!();
    }

    let (reload_tx, _) = broadcast::channel::<ReloadEvent>(16);

    // The watcher stops when dropped
    let _watcher = FileWatcher::new(
        config.source_dirs(&working_dir),
        Duration::from_millis(config.live_reload.debounce),
        config.live_reload.glob_set()?,
        on_change(site.clone(), reload_tx.clone(), quiet),
    )?;

    let addr = server_addr(&config, host, port);
    if !quiet {
        println!(
            "{} {}",
            style("Server:").cyan(),
            style(format!("http://{}", addr)).green().bold()
        );
        println!(
            "{} {}",
            style("Status:").cyan(),
            style("Watching for changes...").dim()
        );
        println!();
    }

    let state = Arc::new(AppState {
        site,
        reload_tx,
        live_reload: live_reload.then(|| config.live_reload.endpoint.clone()),
        dev: true,
    });
    create_server(&addr, state).await?;

    Ok(())
}

/// Recompiles the site and notifies connected browsers.
fn on_change(
    site: Arc<Site<HtmlTemplateSystem>>,
    reload_tx: broadcast::Sender<ReloadEvent>,
    quiet: bool,
) -> impl Fn(Vec<PathBuf>) + Send + 'static {
    move |paths: Vec<PathBuf>| {
        let start = Instant::now();
        let display = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let spinner = (!quiet).then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(spinner_style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} stx {msg}") {
                pb.set_style(spinner_style);
            }
            pb.set_message(display.clone());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        });

        let report = match site.recompile() {
            Ok(report) => report,
            Err(e) => {
                if let Some(pb) = spinner {
                    pb.finish_and_clear();
                }
                eprintln!("  {} {}", style("✗").red(), style(format!("Recompile failed: {}", e)).red());
                return;
            }
        };

        // The client decides whether a stylesheet change reloads the page
        let event = if only_stylesheets(&paths) {
            ReloadEvent::Css
        } else {
            ReloadEvent::Page
        };
        // No receivers just means no browser is connected
        let _ = reload_tx.send(event);

        if let Some(pb) = spinner {
            pb.finish_with_message(format!(
                "{} {} {}",
                style("✓").green(),
                style(&display).dim(),
                style(format!("{}ms", start.elapsed().as_millis())).dim()
            ));
        }
        print_failures(&report);
    }
}
