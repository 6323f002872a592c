//! Wrapper generator integration and symbol renaming
//!
//! The generator is an external tool; this module owns everything around
//! it: scanning interface descriptions for exported names at plan time,
//! deriving rename rules for names exported by more than one module of the
//! same language, and rewriting the generated sources afterwards.
//!
//! Renaming operates on identifier tokens, never on substrings: a rule
//! `Solver -> AcousticSolver` leaves `MySolver` and `Solver2` alone.
//! Rewriting covers string literals on purpose, so entry-point references
//! in generated glue ("Solver_new") follow the renamed C symbols. Rules
//! are filtered to names present in the generator's symbol index; after
//! one application the index only contains renamed symbols, which makes a
//! second application a no-op.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use bindery_config::Language;

use crate::action::ToolCommand;
use crate::error::{BuildError, BuildResult};

/// One symbol rename, baked into the owning node's action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    pub from: String,
    pub to: String,
}

/// Rename rules per module name
pub type RenameTable = BTreeMap<String, Vec<RenameRule>>;

/// Generator invocation plus the post-processing it implies
#[derive(Debug, Clone, Serialize)]
pub struct CodegenAction {
    pub module: String,
    pub language: Language,
    pub command: ToolCommand,
    /// Generated glue source (`<module>_wrap.c`)
    pub glue: PathBuf,
    /// Generated binding file (`<module>.cs` / `.java` / `.py`)
    pub binding: PathBuf,
    /// Generator-emitted symbol index (`<module>.symbols`)
    pub symbols: PathBuf,
    /// Collision renames for this module, applied after generation
    pub renames: Vec<RenameRule>,
}

/// Scan an interface description for exported names.
///
/// Captures `struct`/`class`/`enum` tags and top-level function
/// declarators; bodies, comments, directives and `%{ ... %}` verbatim
/// blocks are skipped.
pub fn scan_interface_exports(path: &Path) -> BuildResult<BTreeSet<String>> {
    let source = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    Ok(scan_exports(&source))
}

pub fn scan_exports(source: &str) -> BTreeSet<String> {
    let tokens = lex(source);
    let mut exports = BTreeSet::new();
    let mut depth = 0usize;

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Symbol('{') => depth += 1,
            Token::Symbol('}') => depth = depth.saturating_sub(1),
            Token::Ident(word) if depth == 0 => {
                if word == "struct" || word == "class" || word == "enum" {
                    if let Some(Token::Ident(name)) = tokens.get(i + 1) {
                        exports.insert(name.clone());
                        i += 1;
                    }
                } else if matches!(tokens.get(i + 1), Some(Token::Symbol('('))) {
                    // declarator: a type token directly before the name
                    let prev = if i == 0 { None } else { tokens.get(i - 1) };
                    if matches!(prev, Some(Token::Ident(_)) | Some(Token::Symbol('*'))) {
                        exports.insert(word.clone());
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    exports
}

/// Derive rename rules from the per-module export sets of one language.
///
/// A name exported by two or more modules collides; every exporting module
/// gets a rule `name -> <ModulePascal>_name`.
pub fn collision_renames(exports: &BTreeMap<String, BTreeSet<String>>) -> RenameTable {
    let mut owners: BTreeMap<&String, Vec<&String>> = BTreeMap::new();
    for (module, names) in exports {
        for name in names {
            owners.entry(name).or_default().push(module);
        }
    }

    let mut table = RenameTable::new();
    for (name, modules) in owners {
        if modules.len() < 2 {
            continue;
        }
        for module in modules {
            table.entry(module.clone()).or_default().push(RenameRule {
                from: name.clone(),
                to: format!("{}_{}", pascal_case(module), name),
            });
        }
    }
    for rules in table.values_mut() {
        rules.sort_by(|a, b| a.from.cmp(&b.from));
    }
    table
}

/// Scan every module interface and derive the invocation's rename table
pub fn plan_renames<'a, I>(modules: I) -> BuildResult<RenameTable>
where
    I: IntoIterator<Item = (&'a str, &'a Path)>,
{
    let mut exports = BTreeMap::new();
    for (name, interface) in modules {
        exports.insert(name.to_string(), scan_interface_exports(interface)?);
    }
    Ok(collision_renames(&exports))
}

/// Load a symbol index: one exported symbol per line, sorted on load
pub fn read_symbol_index(path: &Path) -> BuildResult<BTreeSet<String>> {
    let content = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Apply an action's rename rules to its generated files.
///
/// Rules are filtered to symbols present in the generator's index, then
/// applied to the glue source, the binding file and the index itself.
/// Returns whether anything was rewritten.
pub fn apply_renames(action: &CodegenAction) -> BuildResult<bool> {
    if action.renames.is_empty() {
        return Ok(false);
    }
    let index = read_symbol_index(&action.symbols)?;
    let effective: Vec<RenameRule> = action
        .renames
        .iter()
        .filter(|rule| index.contains(&rule.from))
        .cloned()
        .collect();
    if effective.is_empty() {
        return Ok(false);
    }

    let mut rewrote = false;
    for path in [&action.glue, &action.binding, &action.symbols] {
        let source = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        let rewritten = rewrite_identifiers(&source, &effective);
        if rewritten != source {
            fs::write(path, rewritten).map_err(|e| BuildError::io(path, e))?;
            rewrote = true;
        }
    }
    Ok(rewrote)
}

/// Rewrite identifier tokens according to the rules; everything else is
/// copied through untouched
pub fn rewrite_identifiers(source: &str, rules: &[RenameRule]) -> String {
    if rules.is_empty() {
        return source.to_string();
    }
    let map: BTreeMap<&str, &str> = rules
        .iter()
        .map(|rule| (rule.from.as_str(), rule.to.as_str()))
        .collect();

    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match map.get(word.as_str()) {
                Some(to) => out.push_str(to),
                None => out.push_str(&word),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

pub(crate) fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Symbol(char),
}

/// Tokenize an interface description, dropping comments, string literals,
/// `%{ ... %}` blocks and directive/preprocessor lines
fn lex(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i = (i + 2).min(chars.len());
        } else if c == '%' && chars.get(i + 1) == Some(&'{') {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '%' && chars[i + 1] == '}') {
                i += 1;
            }
            i = (i + 2).min(chars.len());
        } else if c == '%' || c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Symbol(c));
            i += 1;
        }
    }
    tokens
}
