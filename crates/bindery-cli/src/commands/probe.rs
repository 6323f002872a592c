/// Probe command implementation
use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::env;
use std::path::{Path, PathBuf};

use bindery_build::{
    BuildError, CapabilitySet, LanguageStatus, PlatformProfile, ProbeOptions, KNOWN_TOOLS,
};
use bindery_config::{find_manifest, ProjectManifest};

use super::parse_tool_overrides;

/// Generator assumed when no manifest is in reach
const DEFAULT_GENERATOR: &str = "swig";

pub struct ProbeArgs {
    pub manifest: Option<PathBuf>,
    pub platform: Option<String>,
    pub tools: Vec<String>,
    pub json: bool,
}

pub fn run(args: ProbeArgs) -> Result<bool> {
    let codegen_tool = manifest_codegen_tool(args.manifest.as_deref())?;

    let mut options = ProbeOptions {
        platform: args.platform,
        ..ProbeOptions::default()
    };
    for (name, path) in parse_tool_overrides(&args.tools)? {
        options.tools.insert(name, path);
    }
    if !KNOWN_TOOLS.contains(&codegen_tool.as_str()) {
        options.extra_tools.push(codegen_tool.clone());
    }

    let profile = PlatformProfile::probe(&options)?;
    let capabilities = CapabilitySet::derive(&profile, &codegen_tool);

    if args.json {
        let value = json!({
            "platform": profile,
            "capabilities": capabilities,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(true);
    }

    println!(
        "Platform:  {} ({}-bit)",
        profile.tag(),
        profile.pointer_width
    );
    match &profile.compiler {
        Some(compiler) => println!(
            "Compiler:  {} ({})",
            compiler.kind.as_str(),
            compiler.path.display()
        ),
        None => println!("Compiler:  {}", "not found".red()),
    }

    println!("Tools:");
    if profile.tools.is_empty() {
        println!("  (none found)");
    }
    for (name, path) in &profile.tools {
        println!("  {:<10} {}", name, path.display());
    }

    println!("Languages:");
    for (lang, status) in capabilities.iter() {
        match status {
            LanguageStatus::Available { .. } => {
                println!("  {:<8} {}", lang.as_str(), "ok".green());
            }
            LanguageStatus::Missing { missing } => {
                println!(
                    "  {:<8} {} {}",
                    lang.as_str(),
                    "missing".red(),
                    missing.join(", ")
                );
            }
        }
    }

    Ok(true)
}

/// The wrapper generator named by the manifest, or the default when
/// probing outside a project
fn manifest_codegen_tool(manifest: Option<&Path>) -> Result<String> {
    match manifest {
        Some(path) => {
            let manifest = ProjectManifest::from_file(path).map_err(BuildError::from)?;
            Ok(manifest.codegen.tool)
        }
        None => {
            let cwd = env::current_dir()?;
            match find_manifest(&cwd) {
                Ok(path) => {
                    let manifest = ProjectManifest::from_file(&path).map_err(BuildError::from)?;
                    Ok(manifest.codegen.tool)
                }
                Err(_) => Ok(DEFAULT_GENERATOR.to_string()),
            }
        }
    }
}
