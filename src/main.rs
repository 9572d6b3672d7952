//! CLI entry point for the featureservice tool.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use featureservice_core::{FeatureService, ServiceOptions};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries feature data only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let options = ServiceOptions {
        layer: args.layer,
        max_page_size: args.max_page_size,
        max_concurrency: args.concurrency.map(usize::from),
        backoff_unit: Duration::from_millis(args.backoff_ms),
        request_timeout: Duration::from_secs(args.timeout_secs),
    };
    let service = FeatureService::new(&args.url, options)?;

    let mut out = open_output(&args)?;

    if args.metadata {
        let metadata = service.resolve_metadata().await?;
        serde_json::to_writer_pretty(&mut out, metadata)?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    if args.plan {
        let plan = service.plan().await?;
        serde_json::to_writer_pretty(&mut out, &plan)?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    if let Some(field) = &args.statistics {
        let stats = service.statistics(field, &args.stats).await?;
        serde_json::to_writer_pretty(&mut out, &stats)?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    let mut pages = service.fetch_all().await?;
    let progress = progress_bar(pages.planned(), args.quiet);
    let mut features = 0_usize;

    while let Some(result) = pages.recv().await {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                progress.abandon();
                out.flush()?;
                return Err(e).context("layer fetch aborted");
            }
        };

        for feature in page.into_features() {
            serde_json::to_writer(&mut out, &feature)?;
            out.write_all(b"\n")?;
            features += 1;
        }
        progress.inc(1);
    }

    out.flush()?;
    progress.finish_and_clear();

    let stats = pages.stats();
    info!(
        features,
        pages = stats.completed(),
        retried = stats.retried(),
        "Fetch complete"
    );

    Ok(())
}

fn open_output(args: &Args) -> Result<Box<dyn Write>> {
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn progress_bar(pages: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(Some(pages as u64), ProgressDrawTarget::stderr());
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} pages ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}
