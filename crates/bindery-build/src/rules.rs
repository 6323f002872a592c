//! Rule registry and build planning
//!
//! Rules turn the project manifest into nodes. Each rule is a pure
//! function keyed by (action kind, language); the standard registry covers
//! the whole pipeline: core compiles (language-neutral, shared by every
//! link), codegen + glue compile for glue languages, Java class compiles,
//! one link and one package node per language. Planning never touches the
//! output tree.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use bindery_config::{Language, ProjectManifest};
use bindery_package::{canonical_artifact_name, ArtifactVersion, PackageRequest};

use crate::action::{Action, ActionKind, ToolCommand};
use crate::codegen::{CodegenAction, RenameTable};
use crate::error::{BuildError, BuildResult};
use crate::graph::{BuildGraph, BuildNode};
use crate::layout::OutputLayout;
use crate::platform::PlatformProfile;

/// Everything a rule may consult while planning
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub manifest: &'a ProjectManifest,
    pub project_root: &'a Path,
    pub profile: &'a PlatformProfile,
    /// Requested languages that passed the capability gate, canonical order
    pub languages: &'a [Language],
    pub version: &'a ArtifactVersion,
    pub layout: &'a OutputLayout,
    /// Plan-time collision renames, per module
    pub renames: &'a RenameTable,
}

type RuleFn = fn(&PlanContext<'_>, Option<Language>) -> BuildResult<Vec<BuildNode>>;

/// One registry entry
pub struct Rule {
    pub kind: ActionKind,
    pub language: Option<Language>,
    build: RuleFn,
}

impl Rule {
    fn new(kind: ActionKind, language: Option<Language>, build: RuleFn) -> Self {
        Self {
            kind,
            language,
            build,
        }
    }
}

/// Ordered rule registry
pub struct Rules {
    entries: Vec<Rule>,
}

impl Rules {
    /// The standard pipeline for the given languages
    pub fn standard(languages: &[Language]) -> Self {
        let mut entries = vec![Rule::new(ActionKind::Compile, None, core_compile_nodes)];
        for &lang in languages {
            if lang.has_glue() {
                entries.push(Rule::new(ActionKind::Codegen, Some(lang), codegen_nodes));
                entries.push(Rule::new(ActionKind::Compile, Some(lang), glue_compile_nodes));
            }
            if lang == Language::Java {
                entries.push(Rule::new(ActionKind::Classes, Some(lang), class_nodes));
            }
            entries.push(Rule::new(ActionKind::Link, Some(lang), link_nodes));
            entries.push(Rule::new(ActionKind::Package, Some(lang), package_nodes));
        }
        Self { entries }
    }

    /// Run every rule and assemble the validated graph
    pub fn plan(&self, ctx: &PlanContext<'_>) -> BuildResult<BuildGraph> {
        let mut nodes = Vec::new();
        for rule in &self.entries {
            nodes.extend((rule.build)(ctx, rule.language)?);
        }
        BuildGraph::from_nodes(nodes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn core_compile_nodes(
    ctx: &PlanContext<'_>,
    _lang: Option<Language>,
) -> BuildResult<Vec<BuildNode>> {
    let obj_dir = ctx.layout.core_obj_dir();
    let mut nodes = Vec::new();
    for source in core_sources(ctx)? {
        let object = object_for(ctx, &obj_dir, &source);
        let command = compile_command(ctx, &source, &object)?;
        let id = format!("compile:core:{}", stem_of(&source));
        nodes.push(
            BuildNode::new(id, Action::Compile(command))
                .with_inputs(vec![source])
                .with_outputs(vec![object]),
        );
    }
    Ok(nodes)
}

fn codegen_nodes(ctx: &PlanContext<'_>, lang: Option<Language>) -> BuildResult<Vec<BuildNode>> {
    let Some(lang) = lang else {
        return Ok(Vec::new());
    };
    let tool_name = &ctx.manifest.codegen.tool;
    let tool = ctx
        .profile
        .tool(tool_name)
        .ok_or_else(|| BuildError::MissingToolchain {
            language: lang.to_string(),
            missing: tool_name.clone(),
        })?;

    let mut nodes = Vec::new();
    for module in &ctx.manifest.modules {
        let interface = ctx.project_root.join(&module.interface);
        let gen_dir = ctx.layout.gen_dir(lang, &module.name);
        let paths = match GeneratedPaths::for_module(ctx, lang, &module.name) {
            Some(paths) => paths,
            None => continue,
        };

        let mut command = ToolCommand::new(tool);
        if let Some(flag) = lang.codegen_flag() {
            command = command.arg(flag);
        }
        command = command
            .arg("-module")
            .arg(&module.name)
            .arg("-outdir")
            .path_arg(&gen_dir)
            .arg("-o")
            .path_arg(&paths.glue);
        match (lang, ctx.manifest.languages.get(&lang)) {
            (Language::Java, Some(settings)) => {
                if let Some(package) = &settings.package {
                    command = command.arg("-package").arg(package);
                }
            }
            (Language::Csharp, Some(settings)) => {
                if let Some(namespace) = &settings.namespace {
                    command = command.arg("-namespace").arg(namespace);
                }
            }
            _ => {}
        }
        command = command
            .args(ctx.manifest.codegen.flags.clone())
            .path_arg(&interface);

        let action = CodegenAction {
            module: module.name.clone(),
            language: lang,
            command,
            glue: paths.glue.clone(),
            binding: paths.binding.clone(),
            symbols: paths.symbols.clone(),
            renames: ctx.renames.get(&module.name).cloned().unwrap_or_default(),
        };

        nodes.push(
            BuildNode::new(
                format!("codegen:{}:{}", lang, module.name),
                Action::Codegen(action),
            )
            .for_language(lang)
            .with_inputs(vec![interface])
            .with_outputs(vec![paths.glue, paths.binding, paths.symbols]),
        );
    }
    Ok(nodes)
}

fn glue_compile_nodes(
    ctx: &PlanContext<'_>,
    lang: Option<Language>,
) -> BuildResult<Vec<BuildNode>> {
    let Some(lang) = lang else {
        return Ok(Vec::new());
    };
    let obj_dir = ctx.layout.lang_obj_dir(lang);
    let mut nodes = Vec::new();
    for module in &ctx.manifest.modules {
        let paths = match GeneratedPaths::for_module(ctx, lang, &module.name) {
            Some(paths) => paths,
            None => continue,
        };
        let object = obj_dir.join(format!(
            "{}_wrap.{}",
            module.name,
            ctx.profile.os.object_extension()
        ));
        let command = compile_command(ctx, &paths.glue, &object)?;
        nodes.push(
            BuildNode::new(
                format!("compile:{}:{}_wrap", lang, module.name),
                Action::Compile(command),
            )
            .for_language(lang)
            .with_inputs(vec![paths.glue])
            .with_outputs(vec![object]),
        );
    }
    Ok(nodes)
}

fn class_nodes(ctx: &PlanContext<'_>, lang: Option<Language>) -> BuildResult<Vec<BuildNode>> {
    let Some(lang) = lang else {
        return Ok(Vec::new());
    };
    let javac = ctx
        .profile
        .tool("javac")
        .ok_or_else(|| BuildError::MissingToolchain {
            language: lang.to_string(),
            missing: "javac".to_string(),
        })?;

    let mut nodes = Vec::new();
    for module in &ctx.manifest.modules {
        let paths = match GeneratedPaths::for_module(ctx, lang, &module.name) {
            Some(paths) => paths,
            None => continue,
        };
        let classes_dir = ctx.layout.classes_dir(&module.name);
        let command = ToolCommand::new(javac)
            .arg("-d")
            .path_arg(&classes_dir)
            .path_arg(&paths.binding);
        nodes.push(
            BuildNode::new(
                format!("classes:{}:{}", lang, module.name),
                Action::Classes(command),
            )
            .for_language(lang)
            .with_inputs(vec![paths.binding])
            .with_outputs(vec![classes_dir]),
        );
    }
    Ok(nodes)
}

fn link_nodes(ctx: &PlanContext<'_>, lang: Option<Language>) -> BuildResult<Vec<BuildNode>> {
    let Some(lang) = lang else {
        return Ok(Vec::new());
    };
    let obj_dir = ctx.layout.core_obj_dir();
    let mut objects: Vec<PathBuf> = core_sources(ctx)?
        .iter()
        .map(|source| object_for(ctx, &obj_dir, source))
        .collect();
    if lang.has_glue() {
        let lang_obj_dir = ctx.layout.lang_obj_dir(lang);
        for module in &ctx.manifest.modules {
            objects.push(lang_obj_dir.join(format!(
                "{}_wrap.{}",
                module.name,
                ctx.profile.os.object_extension()
            )));
        }
    }

    let library = library_path(ctx, lang);
    let command = link_command(ctx, &objects, &library)?;
    Ok(vec![BuildNode::new(
        format!("link:{}", lang),
        Action::Link(command),
    )
    .for_language(lang)
    .with_inputs(objects)
    .with_outputs(vec![library])])
}

fn package_nodes(ctx: &PlanContext<'_>, lang: Option<Language>) -> BuildResult<Vec<BuildNode>> {
    let Some(lang) = lang else {
        return Ok(Vec::new());
    };
    let library = library_path(ctx, lang);
    let mut inputs = vec![library.clone()];
    let mut binding_dirs = Vec::new();
    let mut class_dirs = Vec::new();

    match lang {
        Language::Csharp | Language::Python => {
            for module in &ctx.manifest.modules {
                binding_dirs.push(ctx.layout.gen_dir(lang, &module.name));
                if let Some(paths) = GeneratedPaths::for_module(ctx, lang, &module.name) {
                    inputs.push(paths.binding);
                }
            }
        }
        Language::Java => {
            for module in &ctx.manifest.modules {
                let classes_dir = ctx.layout.classes_dir(&module.name);
                inputs.push(classes_dir.clone());
                class_dirs.push(classes_dir);
            }
        }
        Language::Cpp => {}
    }

    let include_dir = match lang {
        Language::Cpp => ctx
            .manifest
            .core
            .include
            .first()
            .map(|dir| ctx.project_root.join(dir)),
        _ => None,
    };

    let pack_tool = match lang {
        Language::Csharp => ctx.profile.tool("dotnet"),
        Language::Java => ctx.profile.tool("jar"),
        Language::Python => ctx.profile.tool("python3"),
        Language::Cpp => None,
    }
    .map(Path::to_path_buf);

    let request = PackageRequest {
        language: lang,
        product: ctx.manifest.product.clone(),
        settings: ctx.manifest.languages.get(&lang).cloned(),
        version: ctx.version.clone(),
        modules: ctx
            .manifest
            .modules
            .iter()
            .map(|m| m.name.clone())
            .collect(),
        platform: ctx.profile.tag(),
        tool: pack_tool,
        binding_dirs,
        class_dirs,
        library,
        include_dir,
        stage_dir: ctx.layout.stage_dir(lang),
        dist_dir: ctx.layout.dist_dir(),
    };

    let artifact = ctx.layout.dist_dir().join(canonical_artifact_name(
        &ctx.manifest.product.name,
        lang,
        ctx.version,
    ));

    Ok(vec![BuildNode::new(
        format!("package:{}", lang),
        Action::Package(request),
    )
    .for_language(lang)
    .with_inputs(inputs)
    .with_outputs(vec![artifact])])
}

/// Per-module generated file paths; `None` for languages without glue
struct GeneratedPaths {
    glue: PathBuf,
    binding: PathBuf,
    symbols: PathBuf,
}

impl GeneratedPaths {
    fn for_module(ctx: &PlanContext<'_>, lang: Language, module: &str) -> Option<Self> {
        let ext = lang.binding_extension()?;
        let gen_dir = ctx.layout.gen_dir(lang, module);
        Some(Self {
            glue: gen_dir.join(format!("{}_wrap.c", module)),
            binding: gen_dir.join(format!("{}.{}", module, ext)),
            symbols: gen_dir.join(format!("{}.symbols", module)),
        })
    }
}

/// Shared library path for one language's glue + core
fn library_path(ctx: &PlanContext<'_>, lang: Language) -> PathBuf {
    let stem = format!("{}_{}", ctx.manifest.product.name, lang);
    ctx.layout.lib_dir().join(ctx.profile.shared_library_name(&stem))
}

/// Discover core sources in manifest order, directories walked
/// deterministically
fn core_sources(ctx: &PlanContext<'_>) -> BuildResult<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in &ctx.manifest.core.sources {
        let path = ctx.project_root.join(entry);
        if path.is_dir() {
            for found in WalkDir::new(&path).sort_by_file_name() {
                let found = found.map_err(|e| {
                    BuildError::config(format!("cannot walk {}: {}", path.display(), e))
                })?;
                if found.file_type().is_file() && is_c_source(found.path()) {
                    sources.push(found.into_path());
                }
            }
        } else if path.is_file() {
            sources.push(path);
        } else {
            return Err(BuildError::config(format!(
                "core source path {} does not exist",
                path.display()
            )));
        }
    }
    if sources.is_empty() {
        return Err(BuildError::config("no core sources found"));
    }
    Ok(sources)
}

fn is_c_source(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("c") | Some("cc") | Some("cpp") | Some("cxx")
    )
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string())
}

fn object_for(ctx: &PlanContext<'_>, obj_dir: &Path, source: &Path) -> PathBuf {
    obj_dir.join(format!(
        "{}.{}",
        stem_of(source),
        ctx.profile.os.object_extension()
    ))
}

fn compile_command(
    ctx: &PlanContext<'_>,
    source: &Path,
    object: &Path,
) -> BuildResult<ToolCommand> {
    let compiler = ctx
        .profile
        .compiler
        .as_ref()
        .ok_or_else(|| BuildError::config("no native compiler found"))?;

    let mut command = ToolCommand::new(&compiler.path);
    if compiler.kind.is_msvc() {
        command = command.arg("/nologo").arg("/c");
        for dir in &ctx.manifest.core.include {
            command = command.arg(format!("/I{}", ctx.project_root.join(dir).display()));
        }
        for define in &ctx.manifest.core.defines {
            command = command.arg(format!("/D{}", define));
        }
        command = command
            .arg(format!("/Fo:{}", object.display()))
            .path_arg(source);
    } else {
        command = command.arg("-c").arg("-fPIC");
        for dir in &ctx.manifest.core.include {
            command = command.arg(format!("-I{}", ctx.project_root.join(dir).display()));
        }
        for define in &ctx.manifest.core.defines {
            command = command.arg(format!("-D{}", define));
        }
        command = command.arg("-o").path_arg(object).path_arg(source);
    }
    Ok(command)
}

fn link_command(
    ctx: &PlanContext<'_>,
    objects: &[PathBuf],
    library: &Path,
) -> BuildResult<ToolCommand> {
    let compiler = ctx
        .profile
        .compiler
        .as_ref()
        .ok_or_else(|| BuildError::config("no native compiler found"))?;

    let mut command = ToolCommand::new(&compiler.path);
    if compiler.kind.is_msvc() {
        command = command
            .arg("/nologo")
            .arg("/LD")
            .arg(format!("/Fe:{}", library.display()));
        for object in objects {
            command = command.path_arg(object);
        }
    } else {
        command = command
            .arg(ctx.profile.os.shared_flag())
            .arg("-o")
            .path_arg(library);
        for object in objects {
            command = command.path_arg(object);
        }
    }
    Ok(command)
}
