//! Node actions
//!
//! An [`Action`] is the complete description of the work one node performs.
//! Its serialized form is the node's action definition: the scheduler hashes
//! it into the action fingerprint, so any change to a command line, a rename
//! set or a staging request re-keys the node.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use bindery_package::PackageRequest;

use crate::codegen::CodegenAction;

/// External tool invocation
#[derive(Debug, Clone, Serialize)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(mut self, path: &Path) -> Self {
        self.args.push(path.display().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// What a node does when it runs
#[derive(Debug, Clone, Serialize)]
pub enum Action {
    /// Run the wrapper generator, then apply collision renames
    Codegen(CodegenAction),
    /// Compile one source file to an object file
    Compile(ToolCommand),
    /// Link objects into a shared library
    Link(ToolCommand),
    /// Compile Java binding sources to class files
    Classes(ToolCommand),
    /// Stage and assemble one language's package
    Package(PackageRequest),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Codegen(_) => ActionKind::Codegen,
            Action::Compile(_) => ActionKind::Compile,
            Action::Link(_) => ActionKind::Link,
            Action::Classes(_) => ActionKind::Classes,
            Action::Package(_) => ActionKind::Package,
        }
    }
}

/// Action discriminant, used for rule keying and node labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Codegen,
    Compile,
    Link,
    Classes,
    Package,
}

impl ActionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Codegen => "codegen",
            ActionKind::Compile => "compile",
            ActionKind::Link => "link",
            ActionKind::Classes => "classes",
            ActionKind::Package => "package",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
