/// Command implementations for the bindery CLI
pub mod build;
pub mod clean;
pub mod plan;
pub mod probe;

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use bindery_build::{BuildError, Builder, Language};

/// Construct a builder from an explicit manifest path or by searching
/// upward from the current directory.
pub(crate) fn make_builder(manifest: Option<&Path>) -> Result<Builder> {
    match manifest {
        Some(path) => Builder::from_manifest(path)
            .with_context(|| format!("cannot load {}", path.display())),
        None => {
            let cwd = env::current_dir().context("cannot determine current directory")?;
            Builder::new(&cwd).context("cannot locate bindery.toml")
        }
    }
}

/// Parse language names, surfacing unknown names as configuration errors.
pub(crate) fn parse_languages(names: &[String]) -> Result<Vec<Language>> {
    names
        .iter()
        .map(|name| {
            name.parse::<Language>()
                .map_err(|e| anyhow::Error::from(BuildError::config(e)))
        })
        .collect()
}

/// Parse repeated `--tool NAME=PATH` overrides.
pub(crate) fn parse_tool_overrides(specs: &[String]) -> Result<Vec<(String, PathBuf)>> {
    specs
        .iter()
        .map(|spec| match spec.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => {
                Ok((name.to_string(), PathBuf::from(path)))
            }
            _ => Err(anyhow::Error::from(BuildError::config(format!(
                "invalid --tool '{spec}': expected NAME=PATH"
            )))),
        })
        .collect()
}

/// Apply the platform/tool/output overrides shared by build and plan.
/// `BINDERY_TOOL_<NAME>` environment overrides are honored by the probe
/// itself, below any explicit `--tool` flag.
pub(crate) fn apply_overrides(
    mut builder: Builder,
    platform: Option<&str>,
    tools: &[String],
    out: Option<&Path>,
) -> Result<Builder> {
    if let Some(tag) = platform {
        builder = builder.with_platform(tag);
    }
    for (name, path) in parse_tool_overrides(tools)? {
        builder = builder.with_tool(name, path);
    }
    if let Some(dir) = out {
        builder = builder.with_out_dir(dir);
    }
    Ok(builder)
}
