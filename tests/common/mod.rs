//! Shared fixtures for integration tests.
//!
//! `LineParser` is a minimal line-oriented template front-end:
//!
//! - `@use <path>` and `@let <name>: <type>` lines form the directive block
//! - `@section <name> <markup>` is a one-line section
//! - `@<expr>` is an expression
//! - `!<message>` fails the parse
//! - anything else is markup

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use razorc::{CompileError, CompileResult, Mode, NodeId, TemplateParser, Token, TokenKind, Tree};

pub struct LineParser {
    parses: Arc<AtomicUsize>,
}

impl LineParser {
    /// A parser and a handle on the number of parses it has done.
    pub fn counted() -> (Self, Arc<AtomicUsize>) {
        let parses = Arc::new(AtomicUsize::new(0));
        (
            Self {
                parses: Arc::clone(&parses),
            },
            parses,
        )
    }
}

impl TemplateParser for LineParser {
    fn parse(&self, source: &str, path: &Path) -> CompileResult<Tree> {
        self.parses.fetch_add(1, Ordering::SeqCst);

        let mut declarations = Vec::new();
        let mut content = Vec::new();
        for line in source.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(message) = line.strip_prefix('!') {
                return Err(CompileError::syntax(message).with_file(path));
            }
            if let Some(import) = line.strip_prefix("@use ") {
                declarations.push(format!("use {import};"));
            } else if let Some(param) = line.strip_prefix("@let ") {
                declarations.push(format!("let {param};"));
            } else {
                content.push(line);
            }
        }

        let mut tree = Tree::new();
        if !declarations.is_empty() {
            let block = tree.push_node(NodeId::ROOT, Mode::Block);
            tree.push_text(block, "{");
            tree.push_text(block, format!("\n{}\n", declarations.join("\n")));
            tree.push_text(block, "}");
        }

        for line in content {
            if let Some(rest) = line.strip_prefix("@section ") {
                let (name, markup) = rest.split_once(' ').unwrap_or((rest, ""));
                let block = tree.push_node(NodeId::ROOT, Mode::Block);
                tree.push_text(block, format!("section {name} {{"));
                let node = tree.push_node(block, Mode::Markup);
                tree.push_text(node, format!("{markup}\n"));
                tree.push_text(block, "}");
            } else if let Some(expr) = line.strip_prefix('@') {
                let node = tree.push_node(NodeId::ROOT, Mode::Expression);
                tree.push_token(node, Token::new(TokenKind::At, "@"));
                let split = expr
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(expr.len());
                let (lead, rest) = expr.split_at(split);
                tree.push_text(node, lead);
                if !rest.is_empty() {
                    tree.push_text(node, rest);
                }
            } else {
                let node = tree.push_node(NodeId::ROOT, Mode::Markup);
                tree.push_text(node, format!("{line}\n"));
            }
        }

        Ok(tree)
    }
}

/// Writes `content` to `root/relative`, creating directories.
pub fn write_template(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// The standard layout used by most tests: a body section and a title.
pub const BASE_LAYOUT: &str = r#"
@use razorc::runtime::Section
@let body: Section
@let title: &str
<html><head><title>
@title
</title></head><body>
@body
</body></html>
"#;
