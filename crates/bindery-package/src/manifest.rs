//! Per-language package manifest templates
//!
//! Each target language's packaging tool wants its own metadata file next
//! to the staged artifacts. The files are rendered from built-in templates
//! with `@KEY@` placeholders; substitution is plain text replacement, so a
//! template never interprets the values it embeds.

use crate::version::ArtifactVersion;
use bindery_config::{Language, LanguageSettings, ProductConfig};

/// Values substituted into every manifest template
#[derive(Debug, Clone)]
pub struct ManifestContext<'a> {
    pub product: &'a ProductConfig,
    pub settings: Option<&'a LanguageSettings>,
    pub version: &'a ArtifactVersion,
    /// Module names, canonical order
    pub modules: &'a [String],
    /// File name of the shared library staged with the package
    pub library_file: &'a str,
    /// Platform tag ("linux-x86_64", …) for human-readable fields
    pub platform: &'a str,
}

/// Render the manifest file content for one language's package.
///
/// Returns `(file name within the staging directory, content)`.
pub fn render_package_manifest(lang: Language, ctx: &ManifestContext<'_>) -> (String, String) {
    match lang {
        Language::Csharp => (
            format!("{}.csproj", package_id(ctx, lang)),
            render(CSPROJ_TEMPLATE, ctx, lang),
        ),
        Language::Java => ("MANIFEST.MF".to_string(), render(MANIFEST_MF_TEMPLATE, ctx, lang)),
        Language::Python => ("setup.py".to_string(), render(SETUP_PY_TEMPLATE, ctx, lang)),
        Language::Cpp => (
            format!("{}.pc", ctx.product.name),
            render(PC_TEMPLATE, ctx, lang),
        ),
    }
}

/// Package identifier used where the packaging tool wants a name distinct
/// from the file name (`<product>_<language>`)
pub fn package_id(ctx: &ManifestContext<'_>, lang: Language) -> String {
    format!("{}_{}", ctx.product.name, lang)
}

fn render(template: &str, ctx: &ManifestContext<'_>, lang: Language) -> String {
    let settings = ctx.settings;
    let namespace = settings
        .and_then(|s| s.namespace.clone())
        .unwrap_or_else(|| pascal_case(&ctx.product.name));
    let java_package = settings
        .and_then(|s| s.package.clone())
        .unwrap_or_else(|| ctx.product.name.clone());
    let python_module = settings
        .and_then(|s| s.module.clone())
        .unwrap_or_else(|| ctx.product.name.clone());

    let substitutions = [
        ("@PRODUCT@", ctx.product.name.clone()),
        ("@PACKAGE_ID@", package_id(ctx, lang)),
        ("@VERSION@", ctx.version.to_string()),
        (
            "@DESCRIPTION@",
            ctx.product.description.clone().unwrap_or_default(),
        ),
        ("@AUTHORS@", ctx.product.authors.join(", ")),
        ("@NAMESPACE@", namespace),
        ("@JAVA_PACKAGE@", java_package),
        ("@PYTHON_MODULE@", python_module),
        ("@MODULES@", ctx.modules.join(", ")),
        ("@LIBRARY@", ctx.library_file.to_string()),
        ("@PLATFORM@", ctx.platform.to_string()),
    ];

    let mut out = template.to_string();
    for (key, value) in substitutions {
        out = out.replace(key, &value);
    }
    out
}

fn pascal_case(name: &str) -> String {
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

const CSPROJ_TEMPLATE: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>netstandard2.0</TargetFramework>
    <PackageId>@PACKAGE_ID@</PackageId>
    <Version>@VERSION@</Version>
    <Description>@DESCRIPTION@</Description>
    <Authors>@AUTHORS@</Authors>
    <RootNamespace>@NAMESPACE@</RootNamespace>
    <AllowUnsafeBlocks>true</AllowUnsafeBlocks>
    <IncludeBuildOutput>true</IncludeBuildOutput>
  </PropertyGroup>
  <ItemGroup>
    <None Include="runtimes/**" Pack="true" PackagePath="runtimes/" />
  </ItemGroup>
</Project>
"#;

const MANIFEST_MF_TEMPLATE: &str = r#"Manifest-Version: 1.0
Implementation-Title: @PRODUCT@
Implementation-Version: @VERSION@
Implementation-Vendor: @AUTHORS@
Bundle-NativeCode: native/@LIBRARY@
Bindery-Modules: @MODULES@
Bindery-Platform: @PLATFORM@
"#;

const SETUP_PY_TEMPLATE: &str = r#"from setuptools import setup

setup(
    name="@PRODUCT@",
    version="@VERSION@",
    description="@DESCRIPTION@",
    packages=["@PYTHON_MODULE@"],
    package_data={"@PYTHON_MODULE@": ["@LIBRARY@"]},
    include_package_data=True,
    zip_safe=False,
)
"#;

const PC_TEMPLATE: &str = r#"prefix=${pcfiledir}
libdir=${prefix}/lib
includedir=${prefix}/include

Name: @PRODUCT@
Description: @DESCRIPTION@
Version: @VERSION@
Libs: -L${libdir} -l@PRODUCT@_cpp
Cflags: -I${includedir}
"#;
