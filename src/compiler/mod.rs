//! Template compiler.
//!
//! The pipeline for one template file:
//! - Tree: the front-end's parse of the file, validated
//! - Directive: imports, parameters and layout from the first block
//! - Layout: the parent layout is compiled on demand and its parameters recorded
//! - Codegen: a walk of the tree into typed segments, escaping expressions
//! - Sections/Layout: the rendered text is split into sections and composed
//!   into the writer body, delegating to the layout when there is one

mod codegen;
mod directive;
mod error;
mod escape;
mod layout;
mod registry;
mod sections;
mod segment;
mod tree;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;

pub use directive::{
    Declarations, DeclarationGrammar, Directive, ImportPath, LAYOUT_MODULE, LayoutRef, Param,
    ParamKind, RustGrammar,
};
pub use error::{CompileError, CompileErrorKind, CompileResult};
pub use escape::{Emission, EscapeAnalyzer};
pub use layout::{LayoutCall, compose, layout_arguments};
pub use registry::LayoutRegistry;
pub use sections::{BODY, Sections};
pub use segment::{Segment, SegmentKind, Segments};
pub use tree::{Child, Mode, Node, NodeId, Token, TokenKind, Tree};

use codegen::Emitter;

/// Imports every generated file starts with.
const STD_IMPORTS: [&str; 1] = ["std::io"];

/// Lint allowances for the generated functions.
const GENERATED_ALLOW: &str = "#[allow(non_snake_case, unused_variables, unused_mut)]";

/// Turns template source into a [`Tree`].
///
/// Tokenizing and parsing template text is left to the front-end; the
/// compiler only relies on the shape documented on [`Tree`].
pub trait TemplateParser: Send + Sync {
    fn parse(&self, source: &str, path: &Path) -> CompileResult<Tree>;
}

/// Compiler options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Escape top-level expressions (default `true`).
    pub html_escape: bool,
    /// Keep the file stem as-is instead of capitalizing it for function names.
    pub name_not_change: bool,
    /// Dump the tree and generated code to stderr.
    pub debug: bool,
    /// Directory that `crate::...` layout references are resolved against.
    pub source_root: PathBuf,
    /// Input directory that `out_dir_abs` prefixes are mapped back onto.
    pub in_dir_abs: Option<PathBuf>,
    pub out_dir_abs: Option<PathBuf>,
    /// Template file extension, without the dot.
    pub extension: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            html_escape: true,
            name_not_change: false,
            debug: false,
            source_root: PathBuf::from("."),
            in_dir_abs: None,
            out_dir_abs: None,
            extension: "rshtml".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from string options (`htmlEscape`, `NameNotChange`,
    /// `Debug`, `InDirAbs`, `OutDirAbs`). Unknown keys are logged and ignored.
    pub fn from_options<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in options {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "htmlEscape" | "NameNotChange" | "Debug" => {
                    let Some(flag) = parse_flag(value) else {
                        log::warn!("ignoring option {key}: `{value}` is not a boolean");
                        continue;
                    };
                    match key {
                        "htmlEscape" => config.html_escape = flag,
                        "NameNotChange" => config.name_not_change = flag,
                        _ => config.debug = flag,
                    }
                }
                "InDirAbs" => config.in_dir_abs = Some(PathBuf::from(value)),
                "OutDirAbs" => config.out_dir_abs = Some(PathBuf::from(value)),
                _ => log::warn!("ignoring unknown option {key}"),
            }
        }
        config
    }

    pub fn with_html_escape(mut self, enabled: bool) -> Self {
        self.html_escape = enabled;
        self
    }

    pub fn with_name_not_change(mut self, keep: bool) -> Self {
        self.name_not_change = keep;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    /// Maps layout paths under `out_dir` back onto `in_dir`.
    pub fn with_dirs(mut self, in_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        self.in_dir_abs = Some(in_dir.into());
        self.out_dir_abs = Some(out_dir.into());
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// The function name for a template stem.
    fn function_name(&self, stem: &str) -> String {
        if self.name_not_change {
            stem.to_string()
        } else {
            capitalize(stem)
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Output of compiling one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// The generated Rust source.
    pub source: String,
    /// Output module name: the template's directory name.
    pub module: String,
    /// Base function name; the writer is `Write<name>`.
    pub name: String,
    pub params: Vec<Param>,
    /// Every `use` path of the generated file, in order.
    pub imports: Vec<String>,
    /// The layout reference, as written in the directive.
    pub layout: Option<String>,
    /// Section names, `body` first.
    pub sections: Vec<String>,
}

/// Compiles templates, sharing compiled layouts through a [`LayoutRegistry`].
pub struct Compiler<'r> {
    registry: &'r LayoutRegistry,
    config: CompilerConfig,
    grammar: Box<dyn DeclarationGrammar>,
    parser: Box<dyn TemplateParser>,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r LayoutRegistry, parser: impl TemplateParser + 'static) -> Self {
        Self {
            registry,
            config: CompilerConfig::default(),
            grammar: Box::new(RustGrammar),
            parser: Box::new(parser),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the grammar used for directive blocks.
    pub fn with_grammar(mut self, grammar: impl DeclarationGrammar + 'static) -> Self {
        self.grammar = Box::new(grammar);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &LayoutRegistry {
        self.registry
    }

    /// Reads, parses and compiles the template at `path`.
    pub fn compile_file(&self, path: &Path) -> CompileResult<Compiled> {
        let canonical = path
            .canonicalize()
            .map_err(|err| CompileError::unreadable(path, &err))?;
        let mut stack = vec![canonical];
        self.compile_path(path, &mut stack)
    }

    /// Parses and compiles `source` as if it were read from `path`.
    pub fn compile_source(&self, source: &str, path: &Path) -> CompileResult<Compiled> {
        let tree = self
            .parser
            .parse(source, path)
            .map_err(|err| err.with_file(path))?;
        self.compile_tree(&tree, path)
    }

    /// Compiles an already parsed template. `path` names the template for the
    /// module name, function name and layout cycle checks.
    pub fn compile_tree(&self, tree: &Tree, path: &Path) -> CompileResult<Compiled> {
        let mut stack = vec![path.canonicalize().unwrap_or_else(|_| path.to_path_buf())];
        self.compile_with(tree, path, &mut stack)
    }

    fn compile_path(&self, path: &Path, stack: &mut Vec<PathBuf>) -> CompileResult<Compiled> {
        let source =
            fs::read_to_string(path).map_err(|err| CompileError::unreadable(path, &err))?;
        let tree = self
            .parser
            .parse(&source, path)
            .map_err(|err| err.with_file(path))?;
        self.compile_with(&tree, path, stack)
    }

    fn compile_with(
        &self,
        tree: &Tree,
        path: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> CompileResult<Compiled> {
        tree.validate().map_err(|err| err.with_file(path))?;

        if self.config.debug {
            eprintln!("[razorc] tree of {}:\n{}", path.display(), tree.dump());
        }

        let module = module_name(path);
        let name = self.config.function_name(&file_stem(path));

        let block = tree.directive_block();
        let directive = match block {
            Some(block) => directive::analyze(tree, block, self.grammar.as_ref())
                .map_err(|err| err.with_file(path))?,
            None => Directive::default(),
        };

        let layout_params = match &directive.layout {
            Some(layout) => self.resolve_layout(layout, path, stack)?,
            None => None,
        };

        let mut imports: IndexSet<String> = STD_IMPORTS.iter().map(|s| s.to_string()).collect();
        imports.extend(directive.imports.iter().cloned());

        let escape = EscapeAnalyzer::new(self.config.html_escape, &module, &directive.params);
        let text = Emitter::new(tree, block, escape, &mut imports)
            .emit()
            .render();
        let sections = Sections::extract(&text);

        let call = directive.layout.as_ref().map(|layout| LayoutCall {
            module: layout_module(layout),
            function: format!("Write{}", self.config.function_name(&layout.name)),
            params: layout_params.as_deref().unwrap_or(&[]),
        });
        let body = compose(&sections, &directive.params, call.as_ref());

        let source = render_file(path, &module, &name, &imports, &directive.params, &body);

        if self.config.debug {
            eprintln!("[razorc] generated for {}:\n{}", path.display(), source);
        }
        log::debug!(
            "compiled {} into {module}::{name} ({} section(s))",
            path.display(),
            sections.len()
        );

        Ok(Compiled {
            source,
            module,
            name,
            params: directive.params,
            imports: imports.into_iter().collect(),
            layout: directive.layout.as_ref().map(LayoutRef::path),
            sections: sections.names().map(str::to_string).collect(),
        })
    }

    /// Parameters of the layout `layout` names, compiling it on first use.
    ///
    /// A layout file that does not exist yields `None`; the caller then passes
    /// every section to the layout.
    fn resolve_layout(
        &self,
        layout: &LayoutRef,
        referrer: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> CompileResult<Option<Arc<[Param]>>> {
        let path = self.layout_path(layout);
        if !path.exists() {
            log::debug!("layout {} not found at {}", layout.path(), path.display());
            return Ok(None);
        }

        let canonical = path
            .canonicalize()
            .map_err(|err| CompileError::unreadable(&path, &err).with_context("layout resolution"))?;
        if stack.contains(&canonical) {
            return Err(CompileError::cycle(stack, &canonical));
        }
        if let Some(params) = self.registry.get(&canonical) {
            log::debug!("layout {} already registered", canonical.display());
            return Ok(Some(params));
        }

        stack.push(canonical.clone());
        let result = self.compile_path(&canonical, stack);
        stack.pop();

        let compiled = result.map_err(|err| {
            CompileError::new(err.kind)
                .with_file(referrer)
                .with_context("layout compilation")
                .with_found(layout.path())
                .with_source(err)
        })?;

        log::info!(
            "registered layout {} with {} param(s)",
            canonical.display(),
            compiled.params.len()
        );
        Ok(Some(self.registry.set(canonical, compiled.params)))
    }

    /// The template file a layout reference points at.
    fn layout_path(&self, layout: &LayoutRef) -> PathBuf {
        let mut path = self.config.source_root.clone();
        for segment in layout
            .segments
            .iter()
            .skip_while(|s| matches!(s.as_str(), "crate" | "self" | "super" | ""))
        {
            path.push(segment);
        }
        path.set_extension(&self.config.extension);

        if let (Some(in_dir), Some(out_dir)) = (&self.config.in_dir_abs, &self.config.out_dir_abs)
            && let Ok(rest) = path.strip_prefix(out_dir)
        {
            path = in_dir.join(rest);
        }
        path
    }
}

/// The directory name of `path`, used as the output module name.
fn module_name(path: &Path) -> String {
    let dir_name = |p: &Path| {
        p.parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    };
    dir_name(path)
        .or_else(|| path.canonicalize().ok().as_deref().and_then(dir_name))
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `layout::base` for `crate::views::layout::base`.
fn layout_module(layout: &LayoutRef) -> String {
    match layout.segments.len() {
        0 | 1 => layout.name.clone(),
        len => format!("{}::{}", layout.segments[len - 2], layout.name),
    }
}

/// Uppercases the first character.
pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Assembles the generated file around the composed writer body.
fn render_file(
    path: &Path,
    module: &str,
    name: &str,
    imports: &IndexSet<String>,
    params: &[Param],
    body: &str,
) -> String {
    let signature = params
        .iter()
        .map(Param::signature)
        .collect::<Vec<_>>()
        .join(", ");
    let arguments: String = params.iter().map(|p| format!(", {}", p.name)).collect();
    let writer_params: String = params.iter().map(|p| format!(", {}", p.signature())).collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "// Code generated by razorc from {}. DO NOT EDIT.",
        path.display()
    );
    let _ = writeln!(out, "// module: {module}");
    for import in imports {
        let _ = writeln!(out, "use {import};");
    }
    out.push('\n');

    let _ = writeln!(out, "{GENERATED_ALLOW}");
    let _ = writeln!(out, "pub fn {name}({signature}) -> String {{");
    out.push_str("let mut _buffer: Vec<u8> = Vec::new();\n");
    let _ = writeln!(out, "let _ = Write{name}(&mut _buffer{arguments});");
    out.push_str("String::from_utf8_lossy(&_buffer).into_owned()\n}\n\n");

    let _ = writeln!(out, "{GENERATED_ALLOW}");
    let _ = writeln!(
        out,
        "pub fn Write{name}(w: &mut dyn io::Write{writer_params}) -> io::Result<()> {{"
    );
    out.push_str(body);
    out.push_str("Ok(())\n}\n");
    out
}
