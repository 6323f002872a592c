/// Clean command implementation
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use super::make_builder;

pub struct CleanArgs {
    pub manifest: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

pub fn run(args: CleanArgs) -> Result<bool> {
    let out_dir = match args.out {
        // An explicit directory needs no manifest
        Some(dir) => dir,
        None => make_builder(args.manifest.as_deref())?
            .out_dir()
            .to_path_buf(),
    };

    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)
            .with_context(|| format!("cannot remove {}", out_dir.display()))?;
        println!("Removed {}", out_dir.display());
    } else {
        println!("Nothing to clean: {} does not exist", out_dir.display());
    }
    Ok(true)
}
