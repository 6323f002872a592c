/// Plan command implementation
use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

use super::{apply_overrides, make_builder, parse_languages};

pub struct PlanArgs {
    pub languages: Vec<String>,
    pub all: bool,
    pub manifest: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub platform: Option<String>,
    pub tools: Vec<String>,
    pub pre_release: Option<String>,
    pub json: bool,
}

pub fn run(args: PlanArgs) -> Result<bool> {
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

    let (resolved, plans) = builder.preview()?;

    if args.json {
        let value = json!({
            "platform": resolved.profile.tag(),
            "version": resolved.version.to_string(),
            "languages": resolved.languages,
            "skipped": resolved.skipped,
            "nodes": plans,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(true);
    }

    for skip in &resolved.skipped {
        eprintln!(
            "{} skipping {}: missing {}",
            "warning:".yellow().bold(),
            skip.language,
            skip.missing.join(", ")
        );
    }

    println!(
        "Plan for {} v{} on {}:",
        builder.manifest().product.name,
        resolved.version,
        resolved.profile.tag()
    );
    let mut stale = 0usize;
    for plan in &plans {
        if plan.staleness.is_stale() {
            stale += 1;
            println!("  {} {} ({})", "build".cyan(), plan.id, plan.staleness);
        } else {
            println!("  {} {}", "fresh".green(), plan.id);
        }
    }
    if stale == 0 {
        println!("Everything is up to date.");
    } else {
        println!("{} of {} nodes would run.", stale, plans.len());
    }

    Ok(true)
}
