//! Directive block analysis.
//!
//! The first Block of a template declares what the generated functions need:
//! imports (one of which may name the parent layout) and typed parameters.
//! Parsing is delegated to a [`DeclarationGrammar`]; the default
//! [`RustGrammar`] reads Rust `use` items and `let name: Type;` declarations.

use proc_macro2::{Delimiter, Spacing, TokenStream, TokenTree};
use quote::ToTokens;
use rustc_hash::FxHashSet;
use syn::{Item, Pat, Stmt, Type, UseTree};

use super::error::{CompileError, CompileResult};
use super::tree::{Child, NodeId, Tree};

/// Second-to-last import path segment marking a layout reference.
pub const LAYOUT_MODULE: &str = "layout";

/// Name of the wrapper function the directive text is parsed inside.
const WRAPPER_FN: &str = "__razorc_directive";

/// Whether a parameter is a plain value or a writable section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Value,
    /// The declared type is the runtime's `Section` closure type.
    Section,
}

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Declared type, rendered as source text.
    pub ty: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            kind,
        }
    }

    /// `name: Type`, as written in a function signature.
    pub fn signature(&self) -> String {
        format!("{}: {}", self.name, self.ty)
    }
}

/// One flattened import path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    pub leading_colon: bool,
    pub segments: Vec<String>,
    pub alias: Option<String>,
    pub glob: bool,
}

impl ImportPath {
    /// Renders the path the way it is written after `use`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.leading_colon {
            out.push_str("::");
        }
        out.push_str(&self.segments.join("::"));
        if self.glob {
            out.push_str("::*");
        }
        if let Some(ref alias) = self.alias {
            out.push_str(" as ");
            out.push_str(alias);
        }
        out
    }

    /// True when the path names a module inside a `layout` module.
    pub fn is_layout(&self) -> bool {
        !self.glob
            && self.segments.len() >= 2
            && self.segments[self.segments.len() - 2] == LAYOUT_MODULE
    }

    /// The path with its last segment removed.
    pub fn parent(&self) -> ImportPath {
        ImportPath {
            leading_colon: self.leading_colon,
            segments: self.segments[..self.segments.len().saturating_sub(1)].to_vec(),
            alias: None,
            glob: false,
        }
    }
}

/// Everything a declaration grammar extracts from directive text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub imports: Vec<ImportPath>,
    pub params: Vec<Param>,
}

/// Parses the declaration syntax of the target language.
pub trait DeclarationGrammar: Send + Sync {
    /// Parses directive text into imports and parameters, in declaration order.
    fn parse(&self, source: &str) -> CompileResult<Declarations>;
}

/// Declaration grammar for Rust output, built on `syn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustGrammar;

impl DeclarationGrammar for RustGrammar {
    fn parse(&self, source: &str) -> CompileResult<Declarations> {
        let unit = format!("fn {WRAPPER_FN}() {{\n{source}\n}}");
        let file = syn::parse_file(&unit).map_err(|err| {
            // Line 1 of the unit is the wrapper's signature.
            let line = err.span().start().line.saturating_sub(1);
            CompileError::directive(format!("line {line}: {err}"))
        })?;

        let mut items = file.items.into_iter();
        let (Some(Item::Fn(wrapper)), None) = (items.next(), items.next()) else {
            return Err(CompileError::directive("directive text closes its wrapper early"));
        };

        let mut decls = Declarations::default();
        for stmt in wrapper.block.stmts {
            match stmt {
                Stmt::Item(Item::Use(item)) => {
                    let prefix = ImportPath {
                        leading_colon: item.leading_colon.is_some(),
                        segments: Vec::new(),
                        alias: None,
                        glob: false,
                    };
                    flatten_use_tree(&item.tree, prefix, &mut decls.imports);
                }
                Stmt::Local(local) => collect_params(&local.pat, &mut decls.params)?,
                other => {
                    log::debug!(
                        "ignoring directive statement `{}`",
                        tokens_to_source(other.to_token_stream())
                    );
                }
            }
        }

        Ok(decls)
    }
}

fn flatten_use_tree(tree: &UseTree, mut prefix: ImportPath, out: &mut Vec<ImportPath>) {
    match tree {
        UseTree::Path(path) => {
            prefix.segments.push(path.ident.to_string());
            flatten_use_tree(&path.tree, prefix, out);
        }
        UseTree::Name(name) => {
            if name.ident != "self" {
                prefix.segments.push(name.ident.to_string());
            }
            out.push(prefix);
        }
        UseTree::Rename(rename) => {
            if rename.ident != "self" {
                prefix.segments.push(rename.ident.to_string());
            }
            prefix.alias = Some(rename.rename.to_string());
            out.push(prefix);
        }
        UseTree::Glob(_) => {
            prefix.glob = true;
            out.push(prefix);
        }
        UseTree::Group(group) => {
            for item in &group.items {
                flatten_use_tree(item, prefix.clone(), out);
            }
        }
    }
}

fn collect_params(pat: &Pat, out: &mut Vec<Param>) -> CompileResult<()> {
    let Pat::Type(typed) = pat else {
        return Err(CompileError::directive(format!(
            "parameter `{}` has no declared type",
            tokens_to_source(pat.to_token_stream())
        ))
        .with_help("declare parameters as `let name: Type;`"));
    };

    match (typed.pat.as_ref(), typed.ty.as_ref()) {
        (Pat::Ident(ident), ty) => {
            out.push(make_param(&ident.ident.to_string(), ty));
            Ok(())
        }
        (Pat::Tuple(names), Type::Tuple(types)) if names.elems.len() == types.elems.len() => {
            for (name, ty) in names.elems.iter().zip(types.elems.iter()) {
                let Pat::Ident(ident) = name else {
                    return Err(unsupported_pattern(name));
                };
                out.push(make_param(&ident.ident.to_string(), ty));
            }
            Ok(())
        }
        (other, _) => Err(unsupported_pattern(other)),
    }
}

fn unsupported_pattern(pat: &Pat) -> CompileError {
    CompileError::directive(format!(
        "unsupported parameter pattern `{}`",
        tokens_to_source(pat.to_token_stream())
    ))
}

fn make_param(name: &str, ty: &Type) -> Param {
    let kind = if is_section_type(ty) {
        ParamKind::Section
    } else {
        ParamKind::Value
    };
    Param::new(name, tokens_to_source(ty.to_token_stream()), kind)
}

/// `Section`, `runtime::Section`, `razorc::runtime::Section` and friends.
fn is_section_type(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    if path.qself.is_some() {
        return false;
    }
    let segments: Vec<String> = path.path.segments.iter().map(|s| s.ident.to_string()).collect();
    match segments.split_last() {
        Some((last, init)) => {
            last == "Section" && init.iter().all(|s| s == "razorc" || s == "runtime")
        }
        None => false,
    }
}

/// Renders a token stream as compact source text (`&'a str`, `Vec<u8>`).
fn tokens_to_source(tokens: TokenStream) -> String {
    let mut output = String::new();
    let mut iter = tokens.into_iter().peekable();

    while let Some(tt) = iter.next() {
        match tt {
            TokenTree::Group(g) => {
                let inner = tokens_to_source(g.stream());
                let (open, close) = match g.delimiter() {
                    Delimiter::Parenthesis => ("(", ")"),
                    Delimiter::Brace => ("{ ", " }"),
                    Delimiter::Bracket => ("[", "]"),
                    Delimiter::None => ("", ""),
                };
                output.push_str(open);
                output.push_str(&inner);
                output.push_str(close);
                // `Fn(&str) -> T`
                if matches!(iter.peek(), Some(TokenTree::Punct(p)) if p.as_char() == '-') {
                    output.push(' ');
                }
            }
            TokenTree::Ident(ident) => {
                output.push_str(&ident.to_string());
                let next_needs_space = match iter.peek() {
                    Some(TokenTree::Punct(p)) => !matches!(
                        p.as_char(),
                        '(' | '[' | '.' | ':' | ';' | ',' | ')' | ']' | '<' | '>' | '?' | '!'
                    ),
                    Some(TokenTree::Group(g)) => g.delimiter() == Delimiter::Brace,
                    None => false,
                    _ => true,
                };
                if next_needs_space {
                    output.push(' ');
                }
            }
            TokenTree::Punct(p) => {
                output.push(p.as_char());
                if p.spacing() == Spacing::Alone {
                    let no_space_after =
                        matches!(p.as_char(), '&' | '\'' | '*' | '<' | ':' | '.' | '!' | '?');
                    let next_closes = match iter.peek() {
                        Some(TokenTree::Punct(next)) => matches!(next.as_char(), ',' | '>' | ';'),
                        Some(TokenTree::Group(g)) => p.as_char() == '<' && g.delimiter() == Delimiter::Parenthesis,
                        None => true,
                        _ => false,
                    };
                    if !no_space_after && !next_closes {
                        output.push(' ');
                    }
                }
            }
            TokenTree::Literal(lit) => output.push_str(&lit.to_string()),
        }
    }

    output
}

/// Result of analyzing a directive block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    /// Rendered import paths, in declaration order.
    pub imports: Vec<String>,
    pub params: Vec<Param>,
    pub layout: Option<LayoutRef>,
}

/// A parent layout named by an import such as `crate::views::layout::base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRef {
    /// Full path segments, `["crate", "views", "layout", "base"]`.
    pub segments: Vec<String>,
    /// The layout template's base name, `base`.
    pub name: String,
}

impl LayoutRef {
    /// The reference as written in the import, `crate::views::layout::base`.
    pub fn path(&self) -> String {
        self.segments.join("::")
    }
}

/// The directive block's text, without a wrapping `{` `}` pair.
pub fn directive_text(tree: &Tree, block: NodeId) -> String {
    let children = &tree.node(block).children;
    if has_wrapping_braces(children) {
        let mut out = String::new();
        for child in &children[1..children.len() - 1] {
            match child {
                Child::Token(token) => out.push_str(token.value()),
                Child::Node(id) => out.push_str(&tree.text_of(*id)),
            }
        }
        out
    } else {
        tree.text_of(block)
    }
}

/// True when the first and last children are the literal tokens `{` and `}`.
pub(crate) fn has_wrapping_braces(children: &[Child]) -> bool {
    if children.len() < 2 {
        return false;
    }
    matches!(
        (&children[0], &children[children.len() - 1]),
        (Child::Token(open), Child::Token(close)) if open.text == "{" && close.text == "}"
    )
}

/// Parses the directive block and sorts its imports into plain imports and
/// the layout reference.
pub fn analyze(
    tree: &Tree,
    block: NodeId,
    grammar: &dyn DeclarationGrammar,
) -> CompileResult<Directive> {
    let text = directive_text(tree, block);
    log::debug!("directive block: {text:?}");

    let decls = grammar.parse(&text)?;

    let mut seen = FxHashSet::default();
    for param in &decls.params {
        if !seen.insert(param.name.as_str()) {
            return Err(CompileError::directive(format!(
                "parameter `{}` is declared more than once",
                param.name
            )));
        }
    }

    let mut directive = Directive {
        params: decls.params,
        ..Directive::default()
    };

    for import in decls.imports {
        if import.is_layout() {
            directive.imports.push(import.parent().render());
            directive.layout = Some(LayoutRef {
                name: import.segments[import.segments.len() - 1].clone(),
                segments: import.segments,
            });
        } else {
            directive.imports.push(import.render());
        }
    }

    log::debug!(
        "directive declares {} param(s), layout {:?}",
        directive.params.len(),
        directive.layout.as_ref().map(LayoutRef::path)
    );

    Ok(directive)
}
