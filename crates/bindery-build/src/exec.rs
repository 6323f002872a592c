//! Node execution
//!
//! Runs one node's action to completion: external tools with captured
//! output, plus the in-process steps (rename application, package staging,
//! archiving). The scheduler decides *whether* a node runs; this module
//! only knows *how*.

use std::fs;
use std::process::{Command, Stdio};

use bindery_package::{self as package, PackStep};

use crate::action::{Action, ToolCommand};
use crate::codegen;
use crate::error::{BuildError, BuildResult};
use crate::graph::BuildNode;

/// Execute a node's action; on success every declared output exists
pub fn execute(node: &BuildNode) -> BuildResult<()> {
    match &node.action {
        Action::Compile(command) | Action::Link(command) => {
            ensure_output_parents(node)?;
            run_tool(command)?;
        }
        Action::Classes(command) => {
            // javac adds to an existing tree; start clean so the class
            // directory reflects exactly this run
            for output in &node.outputs {
                if output.exists() {
                    fs::remove_dir_all(output).map_err(|e| BuildError::io(output, e))?;
                }
                fs::create_dir_all(output).map_err(|e| BuildError::io(output, e))?;
            }
            run_tool(command)?;
        }
        Action::Codegen(action) => {
            ensure_output_parents(node)?;
            run_tool(&action.command)?;
            codegen::apply_renames(action)?;
        }
        Action::Package(request) => {
            // Re-stage from scratch; leftovers from a previous layout
            // must not leak into the package
            if request.stage_dir.exists() {
                fs::remove_dir_all(&request.stage_dir)
                    .map_err(|e| BuildError::io(&request.stage_dir, e))?;
            }
            let staged = package::stage(request)?;
            match &staged.step {
                PackStep::Command(pack) => {
                    let command = ToolCommand {
                        program: pack.program.clone(),
                        args: pack.args.clone(),
                        cwd: Some(pack.cwd.clone()),
                    };
                    run_tool(&command)?;
                    package::normalize_artifact(&pack.produced, &staged.artifact)?;
                }
                PackStep::Archive {
                    root,
                    prefix,
                    archive,
                } => {
                    package::create_archive(root, prefix, archive)?;
                }
            }
        }
    }
    verify_outputs(node)
}

fn ensure_output_parents(node: &BuildNode) -> BuildResult<()> {
    for output in &node.outputs {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
    }
    Ok(())
}

/// An action that "succeeded" without materializing its outputs would be
/// re-run forever; surface it as a failure instead
fn verify_outputs(node: &BuildNode) -> BuildResult<()> {
    for output in &node.outputs {
        if !output.exists() {
            return Err(BuildError::BuildFailed(format!(
                "'{}' did not produce {}",
                node.id,
                output.display()
            )));
        }
    }
    Ok(())
}

/// Run an external tool, capturing its output.
///
/// Non-zero exit becomes an error carrying the tool's diagnostics verbatim.
pub fn run_tool(command: &ToolCommand) -> BuildResult<()> {
    let mut invocation = Command::new(&command.program);
    invocation
        .args(&command.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &command.cwd {
        invocation.current_dir(cwd);
    }

    let output = invocation
        .spawn()
        .map_err(|e| BuildError::spawn(command.program.display(), e))?
        .wait_with_output()
        .map_err(|e| BuildError::spawn(command.program.display(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        return Err(BuildError::CommandFailed {
            program: command.program.display().to_string(),
            status: output.status.to_string(),
            stderr: if stderr.trim().is_empty() { stdout } else { stderr },
        });
    }
    Ok(())
}
