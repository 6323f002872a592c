use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use bindery_build::BuildError;

mod commands;

/// Multi-language build and packaging orchestrator.
///
/// Bindery builds a native library and its generated language bindings
/// into one distributable package per target ecosystem: csharp (.nupkg),
/// java (.jar), python (sdist) and cpp (tar.gz). Builds are incremental;
/// unchanged nodes are skipped on re-invocation.
///
/// EXAMPLES:
///     bindery build                 Build every capable language
///     bindery build java python     Build exactly these languages
///     bindery probe                 Show platform and toolchain status
///     bindery plan --json           Show the node plan without building
///     bindery clean                 Remove the output tree
///
/// ENVIRONMENT VARIABLES:
///     BINDERY_PLATFORM      Target platform tag (like --platform)
///     BINDERY_PRERELEASE    Pre-release tag (like --pre-release)
///     BINDERY_JOBS          Parallel jobs (like --jobs)
///     BINDERY_TOOL_<NAME>   Pin a tool binary, bypassing PATH search
///     BINDERY_JSON          JSON output (like --json)
///     NO_COLOR              Disable colored output
#[derive(Parser)]
#[command(name = "bindery")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build packages for target language ecosystems
    ///
    /// Probes the platform, plans the dependency graph and runs every
    /// stale node: wrapper generation, native compile and link, then
    /// per-language packaging into the dist/ directory.
    ///
    /// EXAMPLES:
    ///     bindery build                   Build every capable language
    ///     bindery build python            Fail if python tools are missing
    ///     bindery build -j 2 --verbose    Two jobs, per-node output
    ///     bindery build --tool swig=/opt/swig/bin/swig
    #[command(visible_alias = "b")]
    Build {
        /// Target languages (default: every language with a complete
        /// toolchain; missing toolchains for explicit languages are fatal)
        #[arg(value_name = "LANG")]
        languages: Vec<String>,
        /// Build every capable language, skipping incomplete toolchains
        #[arg(long, conflicts_with = "languages")]
        all: bool,
        /// Path to bindery.toml (default: search upward from the
        /// current directory)
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,
        /// Output directory (default: <project>/target/bindery)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Target platform tag, e.g. linux-x86_64
        #[arg(long, env = "BINDERY_PLATFORM")]
        platform: Option<String>,
        /// Pin a tool binary as NAME=PATH (repeatable; "cc" pins the
        /// native compiler)
        #[arg(long = "tool", value_name = "NAME=PATH")]
        tools: Vec<String>,
        /// Append a semver pre-release tag to the resolved version
        #[arg(long, env = "BINDERY_PRERELEASE")]
        pre_release: Option<String>,
        /// Number of parallel jobs (default: available CPUs)
        #[arg(long, short = 'j', env = "BINDERY_JOBS")]
        jobs: Option<usize>,
        /// Verbose output (per-node lines)
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Quiet output (errors only)
        #[arg(long, short = 'q')]
        quiet: bool,
        /// JSON summary on stdout
        #[arg(long, env = "BINDERY_JSON")]
        json: bool,
    },

    /// Probe the host platform and toolchains
    ///
    /// Reports the detected OS, architecture and native compiler, every
    /// resolved tool binary, and per-language capability. Never fails:
    /// gaps are reported, not fatal.
    ///
    /// EXAMPLES:
    ///     bindery probe                   Human-readable report
    ///     bindery probe --json            Machine-readable report
    ///     bindery probe --platform linux-aarch64
    Probe {
        /// Path to bindery.toml (optional; supplies the generator name)
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,
        /// Target platform tag instead of probing the host
        #[arg(long, env = "BINDERY_PLATFORM")]
        platform: Option<String>,
        /// Pin a tool binary as NAME=PATH (repeatable)
        #[arg(long = "tool", value_name = "NAME=PATH")]
        tools: Vec<String>,
        /// JSON output
        #[arg(long, env = "BINDERY_JSON")]
        json: bool,
    },

    /// Show the build plan and staleness without executing
    ///
    /// Plans the same node graph as `build` and reports, per node,
    /// whether it would run and why. Nothing is executed and nothing in
    /// the output tree changes.
    ///
    /// EXAMPLES:
    ///     bindery plan                    Plan every capable language
    ///     bindery plan java --json        Machine-readable plan
    Plan {
        /// Target languages (default: every capable language)
        #[arg(value_name = "LANG")]
        languages: Vec<String>,
        /// Plan every capable language
        #[arg(long, conflicts_with = "languages")]
        all: bool,
        /// Path to bindery.toml
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,
        /// Output directory (default: <project>/target/bindery)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Target platform tag
        #[arg(long, env = "BINDERY_PLATFORM")]
        platform: Option<String>,
        /// Pin a tool binary as NAME=PATH (repeatable)
        #[arg(long = "tool", value_name = "NAME=PATH")]
        tools: Vec<String>,
        /// Pre-release tag (affects package node fingerprints)
        #[arg(long, env = "BINDERY_PRERELEASE")]
        pre_release: Option<String>,
        /// JSON output
        #[arg(long, env = "BINDERY_JSON")]
        json: bool,
    },

    /// Remove the build output tree
    ///
    /// EXAMPLES:
    ///     bindery clean                   Remove <project>/target/bindery
    ///     bindery clean --out build/      Remove an explicit directory
    Clean {
        /// Path to bindery.toml (used to locate the default output tree)
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,
        /// Output directory to remove
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     bindery completions bash > ~/.bash_completions/bindery.bash
    ///     bindery completions zsh > ~/.zfunc/_bindery
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn dispatch(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Build {
            languages,
            all,
            manifest,
            out,
            platform,
            tools,
            pre_release,
            jobs,
            verbose,
            quiet,
            json,
        } => commands::build::run(commands::build::BuildArgs {
            languages,
            all,
            manifest,
            out,
            platform,
            tools,
            pre_release,
            jobs,
            verbose,
            quiet,
            json,
        }),
        Commands::Probe {
            manifest,
            platform,
            tools,
            json,
        } => commands::probe::run(commands::probe::ProbeArgs {
            manifest,
            platform,
            tools,
            json,
        }),
        Commands::Plan {
            languages,
            all,
            manifest,
            out,
            platform,
            tools,
            pre_release,
            json,
        } => commands::plan::run(commands::plan::PlanArgs {
            languages,
            all,
            manifest,
            out,
            platform,
            tools,
            pre_release,
            json,
        }),
        Commands::Clean { manifest, out } => {
            commands::clean::run(commands::clean::CleanArgs { manifest, out })
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(true)
        }
    }
}

/// Configuration mistakes exit 2; execution failures exit 1
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<BuildError>() {
        Some(build_err) if build_err.is_configuration() => 2,
        _ => 1,
    }
}
