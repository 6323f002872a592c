//! Platform probing and toolchain discovery
//!
//! The probe runs once per invocation and produces an immutable
//! [`PlatformProfile`]: operating system, CPU architecture, the native
//! compiler, and the location of every known tool binary. Probing never
//! fails on a missing tool; gaps are recorded and surface later as
//! capability warnings or errors. Only an unparseable `--platform`
//! override is fatal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{BuildError, BuildResult};

/// Tool binaries the probe always looks for
pub const KNOWN_TOOLS: &[&str] = &["swig", "dotnet", "javac", "jar", "python3"];

/// Pseudo-tool name for overriding the native compiler
pub const COMPILER_TOOL: &str = "cc";

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

impl Os {
    /// Detect the host operating system at compile time
    #[cfg(target_os = "linux")]
    pub const fn current() -> Self {
        Os::Linux
    }

    #[cfg(target_os = "macos")]
    pub const fn current() -> Self {
        Os::Macos
    }

    #[cfg(target_os = "windows")]
    pub const fn current() -> Self {
        Os::Windows
    }

    /// OS name as used in platform tags
    pub const fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
        }
    }

    /// Shared library file name for a library stem
    pub fn shared_library_name(&self, stem: &str) -> String {
        match self {
            Os::Linux => format!("lib{}.so", stem),
            Os::Macos => format!("lib{}.dylib", stem),
            Os::Windows => format!("{}.dll", stem),
        }
    }

    /// Object file extension
    pub const fn object_extension(&self) -> &'static str {
        match self {
            Os::Windows => "obj",
            _ => "o",
        }
    }

    /// Linker flag that requests a shared library
    pub const fn shared_flag(&self) -> &'static str {
        match self {
            Os::Macos => "-dynamiclib",
            _ => "-shared",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Os {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" => Ok(Os::Macos),
            "windows" => Ok(Os::Windows),
            _ => Err(()),
        }
    }
}

/// CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// Detect the host architecture at compile time
    #[cfg(target_arch = "x86_64")]
    pub const fn current() -> Self {
        Arch::X86_64
    }

    #[cfg(target_arch = "aarch64")]
    pub const fn current() -> Self {
        Arch::Aarch64
    }

    /// Architecture name as used in platform tags
    pub const fn as_str(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        }
    }

    pub const fn pointer_width(&self) -> u32 {
        64
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            "aarch64" | "arm64" => Ok(Arch::Aarch64),
            _ => Err(()),
        }
    }
}

/// Native compiler family, identified from the binary name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    Gcc,
    Clang,
    Msvc,
}

impl CompilerKind {
    fn from_binary(name: &str) -> Self {
        if name.contains("clang") {
            CompilerKind::Clang
        } else if name == "cl" || name == "cl.exe" {
            CompilerKind::Msvc
        } else {
            CompilerKind::Gcc
        }
    }

    pub const fn is_msvc(&self) -> bool {
        matches!(self, CompilerKind::Msvc)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            CompilerKind::Gcc => "gcc",
            CompilerKind::Clang => "clang",
            CompilerKind::Msvc => "msvc",
        }
    }
}

/// Resolved native compiler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compiler {
    pub kind: CompilerKind,
    pub path: PathBuf,
}

/// Overrides applied before any PATH search
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// Target platform tag ("linux-x86_64"); `None` probes the host
    pub platform: Option<String>,
    /// Explicit tool locations (`--tool NAME=PATH`)
    pub tools: BTreeMap<String, PathBuf>,
    /// Extra tool names to look for beyond [`KNOWN_TOOLS`]
    pub extra_tools: Vec<String>,
}

/// Immutable result of the platform probe
#[derive(Debug, Clone, Serialize)]
pub struct PlatformProfile {
    pub os: Os,
    pub arch: Arch,
    pub pointer_width: u32,
    /// Native compiler, when one was found
    pub compiler: Option<Compiler>,
    /// Resolved tool binaries by name
    pub tools: BTreeMap<String, PathBuf>,
}

impl PlatformProfile {
    /// Probe the platform and toolchain.
    ///
    /// Resolution order per tool: explicit override, then the
    /// `BINDERY_TOOL_<NAME>` environment variable, then PATH search.
    pub fn probe(options: &ProbeOptions) -> BuildResult<Self> {
        let (os, arch) = match &options.platform {
            Some(tag) => parse_tag(tag)?,
            None => (Os::current(), Arch::current()),
        };

        let compiler = resolve_override(options, COMPILER_TOOL)
            .map(|path| Compiler {
                kind: CompilerKind::from_binary(&binary_name(&path)),
                path,
            })
            .or_else(|| find_compiler(os));

        let mut tools = BTreeMap::new();
        let names = KNOWN_TOOLS
            .iter()
            .map(|n| n.to_string())
            .chain(options.extra_tools.iter().cloned());
        for name in names {
            if let Some(path) = resolve_override(options, &name).or_else(|| find_in_path(&name)) {
                tools.insert(name, path);
            }
        }

        Ok(Self {
            os,
            arch,
            pointer_width: arch.pointer_width(),
            compiler,
            tools,
        })
    }

    /// Platform tag, `<os>-<arch>`
    pub fn tag(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Resolved path of a tool binary
    pub fn tool(&self, name: &str) -> Option<&Path> {
        self.tools.get(name).map(PathBuf::as_path)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Shared library file name for this platform
    pub fn shared_library_name(&self, stem: &str) -> String {
        self.os.shared_library_name(stem)
    }
}

/// Parse a platform tag like "linux-x86_64"
pub fn parse_tag(tag: &str) -> BuildResult<(Os, Arch)> {
    let (os, arch) = tag
        .split_once('-')
        .ok_or_else(|| BuildError::UnknownPlatform(tag.to_string()))?;
    let os = Os::from_str(os).map_err(|_| BuildError::UnknownPlatform(tag.to_string()))?;
    let arch = Arch::from_str(arch).map_err(|_| BuildError::UnknownPlatform(tag.to_string()))?;
    Ok((os, arch))
}

fn resolve_override(options: &ProbeOptions, name: &str) -> Option<PathBuf> {
    if let Some(path) = options.tools.get(name) {
        return Some(path.clone());
    }
    let var = format!("BINDERY_TOOL_{}", name.to_uppercase().replace('-', "_"));
    env::var_os(&var).map(PathBuf::from)
}

fn binary_name(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn find_compiler(os: Os) -> Option<Compiler> {
    let candidates: &[&str] = match os {
        Os::Windows => &["cl", "clang", "gcc"],
        _ => &["cc", "gcc", "clang"],
    };
    candidates.iter().find_map(|name| {
        find_in_path(name).map(|path| Compiler {
            kind: CompilerKind::from_binary(name),
            path,
        })
    })
}

/// Locate an executable on PATH
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        let with_exe = dir.join(format!("{}.exe", name));
        if with_exe.is_file() {
            return Some(with_exe);
        }
    }
    None
}
