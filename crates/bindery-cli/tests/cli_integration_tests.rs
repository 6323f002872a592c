//! Comprehensive CLI integration tests
//!
//! Tests the complete CLI experience including:
//! - Command aliases
//! - Help messages and examples
//! - Shell completions
//! - Flag parsing
//! - Error handling

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn bindery_cmd() -> Command {
    Command::cargo_bin("bindery").unwrap()
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP MESSAGE TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod help_messages {
    use super::*;

    #[test]
    fn test_main_help_shows_all_commands() {
        let mut cmd = bindery_cmd();
        cmd.arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build"))
            .stdout(predicate::str::contains("probe"))
            .stdout(predicate::str::contains("plan"))
            .stdout(predicate::str::contains("clean"))
            .stdout(predicate::str::contains("completions"));
    }

    #[test]
    fn test_main_help_shows_examples() {
        let mut cmd = bindery_cmd();
        cmd.arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("EXAMPLES"))
            .stdout(predicate::str::contains("bindery build java python"));
    }

    #[test]
    fn test_main_help_shows_environment_variables() {
        let mut cmd = bindery_cmd();
        cmd.arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ENVIRONMENT VARIABLES"))
            .stdout(predicate::str::contains("BINDERY_PLATFORM"))
            .stdout(predicate::str::contains("BINDERY_TOOL_"))
            .stdout(predicate::str::contains("NO_COLOR"));
    }

    #[test]
    fn test_build_help_comprehensive() {
        let mut cmd = bindery_cmd();
        cmd.args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--tool"))
            .stdout(predicate::str::contains("NAME=PATH"))
            .stdout(predicate::str::contains("--pre-release"))
            .stdout(predicate::str::contains("--all"))
            .stdout(predicate::str::contains("EXAMPLES"));
    }

    #[test]
    fn test_probe_help_comprehensive() {
        let mut cmd = bindery_cmd();
        cmd.args(["probe", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("toolchain"))
            .stdout(predicate::str::contains("--platform"))
            .stdout(predicate::str::contains("EXAMPLES"));
    }

    #[test]
    fn test_plan_help_comprehensive() {
        let mut cmd = bindery_cmd();
        cmd.args(["plan", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("staleness"))
            .stdout(predicate::str::contains("--json"))
            .stdout(predicate::str::contains("EXAMPLES"));
    }

    #[test]
    fn test_clean_help_comprehensive() {
        let mut cmd = bindery_cmd();
        cmd.args(["clean", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--out"))
            .stdout(predicate::str::contains("EXAMPLES"));
    }

    #[test]
    fn test_completions_help_comprehensive() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("bash"))
            .stdout(predicate::str::contains("zsh"))
            .stdout(predicate::str::contains("fish"))
            .stdout(predicate::str::contains("EXAMPLES"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// COMMAND ALIAS TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod command_aliases {
    use super::*;

    #[test]
    fn test_alias_b_equivalent_to_build() {
        // Both should show same help content
        let build_help = bindery_cmd().args(["build", "--help"]).output().unwrap();

        let b_help = bindery_cmd().args(["b", "--help"]).output().unwrap();

        assert_eq!(
            String::from_utf8_lossy(&build_help.stdout),
            String::from_utf8_lossy(&b_help.stdout)
        );
    }

    #[test]
    fn test_aliases_shown_in_main_help() {
        let mut cmd = bindery_cmd();
        cmd.arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("[aliases: b]"));
    }

    #[test]
    fn test_alias_b_with_flags() {
        // Alias should work with flags
        let mut cmd = bindery_cmd();
        cmd.args(["b", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--tool"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// SHELL COMPLETION TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod shell_completions {
    use super::*;

    #[test]
    fn test_bash_completion_generated() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("_bindery"))
            .stdout(predicate::str::contains("COMPREPLY"));
    }

    #[test]
    fn test_zsh_completion_generated() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "zsh"])
            .assert()
            .success()
            .stdout(predicate::str::contains("#compdef bindery"))
            .stdout(predicate::str::contains("_bindery"));
    }

    #[test]
    fn test_fish_completion_generated() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "fish"])
            .assert()
            .success()
            .stdout(predicate::str::contains("complete -c bindery"));
    }

    #[test]
    fn test_powershell_completion_generated() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "powershell"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Register-ArgumentCompleter"));
    }

    #[test]
    fn test_bash_completion_includes_commands() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("build"))
            .stdout(predicate::str::contains("probe"))
            .stdout(predicate::str::contains("plan"))
            .stdout(predicate::str::contains("clean"));
    }

    #[test]
    fn test_bash_completion_includes_aliases() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("bindery__build"))
            .stdout(predicate::str::contains("bindery,b"));
    }

    #[test]
    fn test_zsh_completion_includes_descriptions() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "zsh"])
            .assert()
            .success()
            // Zsh completions include command descriptions
            .stdout(predicate::str::contains(
                "Build packages for target language ecosystems",
            ));
    }

    #[test]
    fn test_completion_invalid_shell() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions", "invalid-shell"]).assert().failure();
    }

    #[test]
    fn test_completion_no_shell_arg() {
        let mut cmd = bindery_cmd();
        cmd.args(["completions"]).assert().failure();
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// FLAG PARSING TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod flag_parsing {
    use super::*;

    #[test]
    fn test_build_jobs_short_flag() {
        let mut cmd = bindery_cmd();
        cmd.args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-j"))
            .stdout(predicate::str::contains("--jobs"));
    }

    #[test]
    fn test_build_manifest_short_flag() {
        let mut cmd = bindery_cmd();
        cmd.args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-m"))
            .stdout(predicate::str::contains("--manifest"));
    }

    #[test]
    fn test_build_out_short_flag() {
        let mut cmd = bindery_cmd();
        cmd.args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-o"))
            .stdout(predicate::str::contains("--out"));
    }

    #[test]
    fn test_build_verbosity_flags() {
        let mut cmd = bindery_cmd();
        cmd.args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-v"))
            .stdout(predicate::str::contains("--verbose"))
            .stdout(predicate::str::contains("-q"))
            .stdout(predicate::str::contains("--quiet"))
            .stdout(predicate::str::contains("--json"));
    }

    #[test]
    fn test_plan_pre_release_flag() {
        let mut cmd = bindery_cmd();
        cmd.args(["plan", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--pre-release"));
    }

    #[test]
    fn test_probe_tool_flag() {
        let mut cmd = bindery_cmd();
        cmd.args(["probe", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--tool"))
            .stdout(predicate::str::contains("NAME=PATH"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// VERSION AND METADATA TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod version_metadata {
    use super::*;

    #[test]
    fn test_version_flag() {
        let mut cmd = bindery_cmd();
        cmd.arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("bindery"));
    }

    #[test]
    fn test_version_short_flag() {
        let mut cmd = bindery_cmd();
        cmd.arg("-V")
            .assert()
            .success()
            .stdout(predicate::str::contains("bindery"));
    }

    #[test]
    fn test_help_short_flag() {
        let mut cmd = bindery_cmd();
        cmd.arg("-h")
            .assert()
            .success()
            .stdout(predicate::str::contains("bindery"));
    }

    #[test]
    fn test_subcommand_version_propagated() {
        // Version should be available on subcommands with --version
        let mut cmd = bindery_cmd();
        cmd.args(["probe", "--version"])
            .assert()
            .success()
            .stdout(predicate::str::contains("bindery"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ERROR HANDLING TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod error_handling {
    use super::*;

    #[test]
    fn test_unknown_command_error() {
        let mut cmd = bindery_cmd();
        cmd.arg("unknown-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn test_all_conflicts_with_languages() {
        let mut cmd = bindery_cmd();
        cmd.args(["build", "java", "--all"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be used"));
    }

    #[test]
    fn test_invalid_jobs_value() {
        let mut cmd = bindery_cmd();
        cmd.args(["build", "-j", "not-a-number"]).assert().failure();
    }

    #[test]
    fn test_no_command_shows_usage() {
        let mut cmd = bindery_cmd();
        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("Usage"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// SUBCOMMAND STRUCTURE TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod subcommand_structure {
    use super::*;

    #[test]
    fn test_all_commands_have_help() {
        let commands = ["build", "probe", "plan", "clean", "completions"];

        for cmd_name in commands {
            let mut cmd = bindery_cmd();
            cmd.args([cmd_name, "--help"]).assert().success();
        }
    }

    #[test]
    fn test_alias_has_help() {
        let mut cmd = bindery_cmd();
        cmd.args(["b", "--help"]).assert().success();
    }

    #[test]
    fn test_help_after_help() {
        // This should be handled gracefully
        let mut cmd = bindery_cmd();
        cmd.args(["--help"]).assert().success();
    }
}
