//! Code emission from the template tree.
//!
//! A single pre-order walk turns the tree into typed [`Segments`]:
//!
//! - Markup tokens become Markup segments (direct writes of string literals)
//! - Block tokens become Raw segments (embedded code, kept verbatim)
//! - top-level Expressions become Statement segments wrapped according to the
//!   [`EscapeAnalyzer`]; nested Expressions contribute their tokens verbatim
//!
//! The directive block has already been analyzed and is skipped.

use indexmap::IndexSet;

use super::directive::has_wrapping_braces;
use super::escape::{Emission, EscapeAnalyzer, RAW_MARKER, RUNTIME_IMPORT};
use super::segment::{SegmentKind, Segments};
use super::tree::{Child, Mode, NodeId, TokenKind, Tree};

/// Walks a validated tree and collects its output segments.
pub struct Emitter<'a> {
    tree: &'a Tree,
    directive: Option<NodeId>,
    escape: EscapeAnalyzer<'a>,
    imports: &'a mut IndexSet<String>,
    segments: Segments,
}

impl<'a> Emitter<'a> {
    /// `imports` receives the runtime import the first time an escape is emitted.
    pub fn new(
        tree: &'a Tree,
        directive: Option<NodeId>,
        escape: EscapeAnalyzer<'a>,
        imports: &'a mut IndexSet<String>,
    ) -> Self {
        Self {
            tree,
            directive,
            escape,
            imports,
            segments: Segments::new(),
        }
    }

    /// Walks the whole tree and returns the merged segments.
    pub fn emit(mut self) -> Segments {
        self.visit(NodeId::ROOT);
        self.segments
    }

    fn visit(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.node(id).mode {
            Mode::Program => {
                for child in &tree.node(id).children {
                    if let Child::Node(child) = child {
                        self.visit(*child);
                    }
                }
            }
            Mode::Markup => self.visit_children(id, SegmentKind::Markup),
            Mode::Block => self.visit_block(id),
            Mode::Expression => self.visit_expression(id),
        }
    }

    /// Token values become `kind` segments; child nodes are visited in place.
    fn visit_children(&mut self, id: NodeId, kind: SegmentKind) {
        let tree = self.tree;
        for child in &tree.node(id).children {
            match child {
                Child::Token(token) => self.segments.push(kind, token.value()),
                Child::Node(child) => self.visit(*child),
            }
        }
    }

    fn visit_block(&mut self, id: NodeId) {
        if self.directive == Some(id) {
            return;
        }

        let tree = self.tree;
        let children = &tree.node(id).children;
        // A brace pair wrapping the whole block only delimits it.
        let inner = if has_wrapping_braces(children) {
            &children[1..children.len() - 1]
        } else {
            &children[..]
        };

        for child in inner {
            match child {
                Child::Token(token) => self.segments.push(SegmentKind::Raw, token.value()),
                Child::Node(child) => self.visit(*child),
            }
        }
    }

    fn visit_expression(&mut self, id: NodeId) {
        let tree = self.tree;
        if tree.is_nested_expression(id) {
            self.visit_children(id, SegmentKind::Statement);
            return;
        }

        let children = &tree.node(id).children;
        // The `@` marker carries no value; the leading child is the first one after it.
        let Some(lead) = children.iter().position(|child| !is_marker(child)) else {
            return;
        };

        let emission = if tree.is_homogeneous(id) {
            self.escape.decide(tree.child_value(&children[lead]))
        } else {
            Emission::Raw
        };
        if emission == Emission::Escape {
            self.imports.insert(RUNTIME_IMPORT.to_string());
        }

        self.segments.push(SegmentKind::Statement, emission.prefix());
        for (idx, child) in children.iter().enumerate() {
            match child {
                Child::Token(token) if idx == lead && token.value() == RAW_MARKER => {}
                Child::Token(token) => self.segments.push(SegmentKind::Statement, token.value()),
                Child::Node(child) => self.visit(*child),
            }
        }
        self.segments.push(SegmentKind::Statement, emission.suffix());
    }
}

fn is_marker(child: &Child) -> bool {
    matches!(child, Child::Token(token) if token.kind != TokenKind::Text)
}
