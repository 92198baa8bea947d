//! Layout resolution across template files.

mod common;

use std::sync::atomic::Ordering;

use common::{BASE_LAYOUT, LineParser, write_template};
use razorc::{CompileErrorKind, Compiler, CompilerConfig, LayoutRegistry, ParamKind};
use tempfile::TempDir;

const CHILD: &str = r#"
@use crate::views::layout::base
@let title: &str
<h1>Welcome</h1>
"#;

fn config(root: &TempDir) -> CompilerConfig {
    CompilerConfig::new().with_source_root(root.path())
}

#[test]
fn compiles_layout_before_child() {
    let root = TempDir::new().unwrap();
    let base = write_template(root.path(), "views/layout/base.rshtml", BASE_LAYOUT);
    let child = write_template(root.path(), "views/index.rshtml", CHILD);

    let registry = LayoutRegistry::new();
    let (parser, parses) = LineParser::counted();
    let compiler = Compiler::new(&registry, parser).with_config(config(&root));
    let compiled = compiler.compile_file(&child).unwrap();

    assert_eq!(parses.load(Ordering::SeqCst), 2);
    let params = registry.lookup(&base.canonicalize().unwrap());
    let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["body", "title"]);
    assert_eq!(params[0].kind, ParamKind::Section);

    assert_eq!(compiled.layout.as_deref(), Some("crate::views::layout::base"));
    assert!(compiled.source.contains("use crate::views::layout;\n"));
    assert!(
        compiled
            .source
            .contains("layout::base::WriteBase(w, &body, title)?;\n")
    );
}

#[test]
fn layout_is_compiled_once() {
    let root = TempDir::new().unwrap();
    write_template(root.path(), "views/layout/base.rshtml", BASE_LAYOUT);
    let first = write_template(root.path(), "views/index.rshtml", CHILD);
    let second = write_template(root.path(), "views/about.rshtml", CHILD);

    let registry = LayoutRegistry::new();
    let (parser, parses) = LineParser::counted();
    let compiler = Compiler::new(&registry, parser).with_config(config(&root));
    compiler.compile_file(&first).unwrap();
    compiler.compile_file(&second).unwrap();

    assert_eq!(parses.load(Ordering::SeqCst), 3);
    assert_eq!(registry.len(), 1);
}

#[test]
fn registry_is_shared_across_threads() {
    let root = TempDir::new().unwrap();
    write_template(root.path(), "views/layout/base.rshtml", BASE_LAYOUT);
    let children: Vec<_> = (0..4)
        .map(|i| write_template(root.path(), &format!("views/page{i}.rshtml"), CHILD))
        .collect();

    let registry = LayoutRegistry::new();
    let (parser, _) = LineParser::counted();
    let compiler = Compiler::new(&registry, parser).with_config(config(&root));

    std::thread::scope(|scope| {
        let handles: Vec<_> = children
            .iter()
            .map(|child| {
                let compiler = &compiler;
                scope.spawn(move || compiler.compile_file(child))
            })
            .collect();
        for handle in handles {
            let compiled = handle.join().unwrap().unwrap();
            assert!(compiled.source.contains("WriteBase(w, &body, title)"));
        }
    });

    assert_eq!(registry.len(), 1);
}

#[test]
fn sections_are_passed_by_layout_param_order() {
    let root = TempDir::new().unwrap();
    write_template(
        root.path(),
        "views/layout/main.rshtml",
        r#"
@use razorc::runtime::Section
@let title: &str
@let scripts: Section
@let body: Section
@let footer: Section
@body
"#,
    );
    let child = write_template(
        root.path(),
        "views/index.rshtml",
        r#"
@use crate::views::layout::main
@section scripts <script src="/app.js"></script>
<p>hello</p>
"#,
    );

    let registry = LayoutRegistry::new();
    let (parser, _) = LineParser::counted();
    let compiled = Compiler::new(&registry, parser)
        .with_config(config(&root))
        .compile_file(&child)
        .unwrap();

    assert_eq!(compiled.sections, vec!["body", "scripts"]);
    assert!(compiled.source.contains(
        "layout::main::WriteMain(w, \"\", &scripts, &body, &razorc::runtime::empty_section)?;\n"
    ));
}

#[test]
fn missing_layout_file_passes_all_sections() {
    let root = TempDir::new().unwrap();
    let child = write_template(
        root.path(),
        "views/index.rshtml",
        "@use crate::views::layout::gone\n@section head <meta>\n<p>x</p>\n",
    );

    let registry = LayoutRegistry::new();
    let (parser, parses) = LineParser::counted();
    let compiled = Compiler::new(&registry, parser)
        .with_config(config(&root))
        .compile_file(&child)
        .unwrap();

    assert_eq!(parses.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
    assert!(compiled.source.contains("layout::gone::WriteGone(w, &body, &head)?;\n"));
}

#[test]
fn output_dir_maps_back_to_input_dir() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_template(input.path(), "views/layout/base.rshtml", BASE_LAYOUT);
    let child = write_template(input.path(), "views/index.rshtml", CHILD);

    let registry = LayoutRegistry::new();
    let (parser, parses) = LineParser::counted();
    let config = CompilerConfig::new()
        .with_source_root(output.path())
        .with_dirs(input.path(), output.path());
    Compiler::new(&registry, parser)
        .with_config(config)
        .compile_file(&child)
        .unwrap();

    assert_eq!(parses.load(Ordering::SeqCst), 2);
    assert_eq!(registry.len(), 1);
}

#[test]
fn layout_cycle_is_an_error() {
    let root = TempDir::new().unwrap();
    let a = write_template(
        root.path(),
        "views/layout/a.rshtml",
        "@use crate::views::layout::b\n<a>\n",
    );
    let b = write_template(
        root.path(),
        "views/layout/b.rshtml",
        "@use crate::views::layout::a\n<b>\n",
    );

    for start in [&a, &b] {
        let registry = LayoutRegistry::new();
        let (parser, parses) = LineParser::counted();
        let err = Compiler::new(&registry, parser)
            .with_config(config(&root))
            .compile_file(start)
            .unwrap_err();

        assert_eq!(err.kind, CompileErrorKind::LayoutCycle);
        assert_eq!(parses.load(Ordering::SeqCst), 2);
        assert!(registry.is_empty());
        let mut innermost = &err;
        while let Some(source) = innermost.source.as_deref() {
            innermost = source;
        }
        let chain = innermost.found.as_deref().unwrap();
        assert_eq!(chain.matches(" -> ").count(), 2, "{chain}");
    }
}

#[test]
fn cycle_below_a_child_is_an_error() {
    let root = TempDir::new().unwrap();
    write_template(root.path(), "views/layout/a.rshtml", "@use crate::views::layout::b\n");
    write_template(root.path(), "views/layout/b.rshtml", "@use crate::views::layout::a\n");
    let child = write_template(
        root.path(),
        "views/index.rshtml",
        "@use crate::views::layout::a\n<p>\n",
    );

    let registry = LayoutRegistry::new();
    let (parser, _) = LineParser::counted();
    let err = Compiler::new(&registry, parser)
        .with_config(config(&root))
        .compile_file(&child)
        .unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::LayoutCycle);
    assert!(err.file.as_deref().is_some_and(|f| f.ends_with("index.rshtml")));
}

#[test]
fn layout_errors_name_the_referencing_file() {
    let root = TempDir::new().unwrap();
    write_template(root.path(), "views/layout/base.rshtml", "!unclosed tag\n");
    let child = write_template(root.path(), "views/index.rshtml", CHILD);

    let registry = LayoutRegistry::new();
    let (parser, _) = LineParser::counted();
    let err = Compiler::new(&registry, parser)
        .with_config(config(&root))
        .compile_file(&child)
        .unwrap_err();

    assert_eq!(err.kind, CompileErrorKind::TemplateSyntax);
    assert!(err.file.as_deref().is_some_and(|f| f.ends_with("index.rshtml")));
    let source = err.source.as_deref().unwrap();
    assert!(source.file.as_deref().is_some_and(|f| f.ends_with("base.rshtml")));
    assert!(registry.is_empty());
}

#[test]
fn unreadable_layout_is_an_error() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("views/layout/base.rshtml")).unwrap();
    let child = write_template(root.path(), "views/index.rshtml", CHILD);

    let registry = LayoutRegistry::new();
    let (parser, _) = LineParser::counted();
    let err = Compiler::new(&registry, parser)
        .with_config(config(&root))
        .compile_file(&child)
        .unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::UnreadableFile);
}
