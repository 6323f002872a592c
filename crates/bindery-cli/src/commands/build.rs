/// Build command implementation
use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use bindery_build::{no_progress, BuildSummary, OutputMode, ProgressEvent};
use bindery_package::{IndexEntry, VersionSource};

use super::{apply_overrides, make_builder, parse_languages};

pub struct BuildArgs {
    pub languages: Vec<String>,
    pub all: bool,
    pub manifest: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub platform: Option<String>,
    pub tools: Vec<String>,
    pub pre_release: Option<String>,
    pub jobs: Option<usize>,
    pub verbose: bool,
    pub quiet: bool,
    pub json: bool,
}

pub fn run(args: BuildArgs) -> Result<bool> {
    let mode = OutputMode::from_flags(args.verbose, args.quiet, args.json);

    let mut builder = apply_overrides(
        make_builder(args.manifest.as_deref())?,
        args.platform.as_deref(),
        &args.tools,
        args.out.as_deref(),
    )?;
    if args.all {
        builder = builder.all_languages();
    } else if !args.languages.is_empty() {
        builder = builder.with_languages(parse_languages(&args.languages)?);
    }
    if let Some(tag) = args.pre_release {
        builder = builder.with_pre_release(tag);
    }
    if let Some(jobs) = args.jobs {
        builder = builder.with_jobs(jobs);
    }

    let summary = if mode.show_progress() {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:32.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let progress = |event: ProgressEvent<'_>| match event {
            ProgressEvent::Begin { total } => bar.set_length(total as u64),
            ProgressEvent::Started { id } => bar.set_message(id.to_string()),
            ProgressEvent::Finished { .. } => bar.inc(1),
        };
        let summary = builder.build(&progress)?;
        bar.finish_and_clear();
        summary
    } else {
        builder.build(&no_progress)?
    };

    report(&summary, mode)?;
    Ok(summary.success)
}

fn report(summary: &BuildSummary, mode: OutputMode) -> Result<()> {
    if mode.is_json() {
        println!("{}", summary.to_json()?);
        return Ok(());
    }

    for line in summary.failure_lines() {
        eprintln!("{} {}", "failed:".red().bold(), line);
    }
    if mode == OutputMode::Quiet {
        return Ok(());
    }

    for line in summary.skip_lines() {
        eprintln!("{} {}", "warning:".yellow().bold(), line);
    }
    if summary.version_source == VersionSource::Sentinel {
        eprintln!(
            "{} not a git checkout; patch version defaulted to 0",
            "warning:".yellow().bold()
        );
    }

    if mode.is_verbose() {
        for line in summary.node_lines() {
            println!("{}", line);
        }
    }

    println!("{}", summary.human_block());
    for line in package_lines(&summary.packages) {
        println!("{}", line);
    }
    Ok(())
}

/// One line per produced package, indented to match the summary block
fn package_lines(packages: &[IndexEntry]) -> Vec<String> {
    packages
        .iter()
        .map(|entry| format!("  {} {}", entry.language, entry.file))
        .collect()
}
