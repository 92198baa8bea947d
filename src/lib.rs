//! Razor-style template compiler emitting Rust source.
//!
//! A template interleaves HTML markup with embedded Rust code. The first code
//! block (the directive block) declares the template's imports and parameters:
//!
//! ```text
//! @{
//!     use crate::models::User;
//!     use crate::views::layout::base;
//!
//!     let user: &User;
//!     let title: &str;
//! }
//! <h1>@user.name</h1>
//! ```
//!
//! Compiling it produces a Rust module with two functions: `Index(user, title)`
//! returning the rendered `String`, and `WriteIndex(w, user, title)` writing to
//! any `&mut dyn io::Write`. Expressions are HTML-escaped unless they start with
//! `raw`, `html` or `helper`.
//!
//! # Layouts
//!
//! Importing a module under a `layout` module (`crate::views::layout::base`)
//! makes it the template's layout. The layout template is compiled first, its
//! parameters are recorded in a [`LayoutRegistry`], and the child's writer ends
//! by calling the layout's writer with its sections:
//!
//! ```text
//! section scripts {
//!     <script src="/app.js"></script>
//! }
//! ```
//!
//! # Front-end
//!
//! Tokenizing and parsing template text is done by a [`TemplateParser`]; the
//! compiler works on the resulting [`Tree`].
//!
//! ```ignore
//! let registry = LayoutRegistry::new();
//! let compiler = Compiler::new(&registry, MyParser)
//!     .with_config(CompilerConfig::new().with_source_root("src"));
//! let compiled = compiler.compile_file(Path::new("src/views/index.rshtml"))?;
//! std::fs::write("src/views/index.rs", compiled.source)?;
//! ```

mod compiler;
pub mod runtime;

pub use compiler::{
    BODY, Child, CompileError, CompileErrorKind, CompileResult, Compiled, Compiler,
    CompilerConfig, Declarations, DeclarationGrammar, Directive, Emission, EscapeAnalyzer,
    ImportPath, LAYOUT_MODULE, LayoutCall, LayoutRef, LayoutRegistry, Mode, Node, NodeId, Param,
    ParamKind, RustGrammar, Segment, SegmentKind, Segments, Sections, TemplateParser,
    Token, TokenKind, Tree, compose, layout_arguments,
};
