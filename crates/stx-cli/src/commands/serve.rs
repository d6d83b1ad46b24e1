// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Server command. No live reload, no file watching.

use console::style;
use std::sync::Arc;
use std::time::Instant;

use super::{build_site, print_failures, print_report, server_addr};
use crate::config::Config;
use crate::server::http::{create_server, AppState};

/// Compiles the site once and serves it.
pub async fn run(host: Option<String>, port: Option<u16>, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let working_dir = std::env::current_dir()?;

    let site = build_site(&config, &working_dir)?;
    let start = Instant::now();
    let report = site.compile()?;
    if quiet {
        print_failures(&report);
    } else {
        print_report(&report, start.elapsed());
    }

    let addr = server_addr(&config, host, port);
    if !quiet {
        println!(
            "{} {}",
            style("Serving:").cyan(),
            style(format!("http://{}", addr)).green().bold()
        );
    }

    create_server(&addr, Arc::new(AppState::new(site))).await
}
