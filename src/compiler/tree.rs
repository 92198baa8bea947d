//! Template tree consumed by the compiler.
//!
//! The tree is produced by a template front-end (see [`TemplateParser`]) and
//! stored in an arena: nodes refer to their children and parent through
//! [`NodeId`] indices, so the parent link never owns anything.
//!
//! ## Shape
//!
//! - exactly one [`Mode::Program`] node, the root, at [`NodeId::ROOT`]
//! - the root's children are top-level Markup/Block/Expression nodes in
//!   source order
//! - Expression nodes may nest other Expression nodes
//!
//! [`TemplateParser`]: crate::TemplateParser

use std::fmt::Write as _;

use super::error::{CompileError, CompileResult};

/// Index of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The Program root every tree starts with.
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The syntactic mode of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The whole template.
    Program,
    /// Literal output text.
    Markup,
    /// Embedded code, emitted verbatim.
    Block,
    /// A value whose rendered result is written to the sink.
    Expression,
}

impl Mode {
    /// Maps the numeric node kind used by front-ends to a mode.
    pub fn from_code(code: u8) -> CompileResult<Self> {
        match code {
            0 => Ok(Self::Program),
            1 => Ok(Self::Markup),
            2 => Ok(Self::Block),
            3 => Ok(Self::Expression),
            other => Err(CompileError::unknown_node(other)),
        }
    }

    /// Short name used in tree dumps.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Program => "PRG",
            Self::Markup => "MKP",
            Self::Block => "BLK",
            Self::Expression => "EXP",
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = CompileError;

    fn try_from(code: u8) -> CompileResult<Self> {
        Self::from_code(code)
    }
}

/// Kind of a literal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The `@` that introduces an expression.
    At,
    /// The `@:` escaped-literal marker.
    AtColon,
    /// Any other text.
    Text,
}

/// A literal token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// A plain text token.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Text, text)
    }

    /// The text this token contributes to generated code. Markers contribute nothing.
    pub fn value(&self) -> &str {
        match self.kind {
            TokenKind::At | TokenKind::AtColon => "",
            TokenKind::Text => &self.text,
        }
    }
}

/// An element of a node's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Token(Token),
    Node(NodeId),
}

/// A node of the template tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub mode: Mode,
    pub children: Vec<Child>,
    /// Back-reference to the containing node; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Tag name given by the front-end, used where a node stands in for a token.
    pub label: String,
}

/// Arena-backed template tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree holding only the Program root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                mode: Mode::Program,
                children: Vec::new(),
                parent: None,
                label: String::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1 && self.nodes[0].children.is_empty()
    }

    /// Appends a new child node of `mode` under `parent` and returns its id.
    pub fn push_node(&mut self, parent: NodeId, mode: Mode) -> NodeId {
        self.push_labeled(parent, mode, "")
    }

    /// Like [`Tree::push_node`], recording a tag name for the node.
    pub fn push_labeled(&mut self, parent: NodeId, mode: Mode, label: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            mode,
            children: Vec::new(),
            parent: Some(parent),
            label: label.to_string(),
        });
        self.nodes[parent.index()].children.push(Child::Node(id));
        id
    }

    /// Appends a token to `parent`'s children.
    pub fn push_token(&mut self, parent: NodeId, token: Token) {
        self.nodes[parent.index()].children.push(Child::Token(token));
    }

    /// Appends a plain text token to `parent`'s children.
    pub fn push_text(&mut self, parent: NodeId, text: impl Into<String>) {
        self.push_token(parent, Token::text(text));
    }

    /// The value a child contributes: token value, or the label of a node.
    pub fn child_value<'a>(&'a self, child: &'a Child) -> &'a str {
        match child {
            Child::Token(token) => token.value(),
            Child::Node(id) => &self.node(*id).label,
        }
    }

    /// True when no direct child of `id` is a non-Expression node.
    pub fn is_homogeneous(&self, id: NodeId) -> bool {
        self.node(id).children.iter().all(|child| match child {
            Child::Token(_) => true,
            Child::Node(child) => self.node(*child).mode == Mode::Expression,
        })
    }

    /// True when the parent of `id` is an Expression.
    pub fn is_nested_expression(&self, id: NodeId) -> bool {
        self.node(id)
            .parent
            .is_some_and(|parent| self.node(parent).mode == Mode::Expression)
    }

    /// The first Block in a pre-order walk from the root: the directive block.
    pub fn directive_block(&self) -> Option<NodeId> {
        self.find_block(NodeId::ROOT)
    }

    fn find_block(&self, id: NodeId) -> Option<NodeId> {
        for child in &self.node(id).children {
            if let Child::Node(child) = child {
                if self.node(*child).mode == Mode::Block {
                    return Some(*child);
                }
                if let Some(found) = self.find_block(*child) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Concatenated token values of `id`'s subtree, in order.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in &self.node(id).children {
            match child {
                Child::Token(token) => out.push_str(token.value()),
                Child::Node(child) => self.collect_text(*child, out),
            }
        }
    }

    /// Checks the structural contract: a single Program root and consistent
    /// parent links.
    pub fn validate(&self) -> CompileResult<()> {
        let root = self.node(NodeId::ROOT);
        if root.mode != Mode::Program || root.parent.is_some() {
            return Err(CompileError::malformed(format!(
                "root node is {} instead of PRG",
                root.mode.name()
            )));
        }

        for (index, node) in self.nodes.iter().enumerate().skip(1) {
            if node.mode == Mode::Program {
                return Err(CompileError::malformed(format!(
                    "nested PRG node at index {index}"
                )));
            }
            let Some(parent) = node.parent else {
                return Err(CompileError::malformed(format!(
                    "node {index} has no parent"
                )));
            };
            let linked = self
                .nodes
                .get(parent.index())
                .is_some_and(|p| p.children.contains(&Child::Node(NodeId(index as u32))));
            if !linked {
                return Err(CompileError::malformed(format!(
                    "node {index} is not a child of its parent {}",
                    parent.0
                )));
            }
        }

        Ok(())
    }

    /// Indented dump of the tree, one line per node or token.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(NodeId::ROOT, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let pad = "  ".repeat(depth);
        let _ = writeln!(out, "{pad}{}[{}] {}", node.mode.name(), id.0, node.label);
        for child in &node.children {
            match child {
                Child::Token(token) => {
                    let _ = writeln!(out, "{pad}  {:?} {:?}", token.kind, token.text);
                }
                Child::Node(child) => self.dump_node(*child, depth + 1, out),
            }
        }
    }
}
