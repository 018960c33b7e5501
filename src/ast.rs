//! AST module for Descent parse results
//!
//! A successful parse produces a [`ParseTree`]: an arena of nodes addressed by
//! [`NodeId`], plus the shared [`TokenStream`] the nodes index into. Callers
//! walk the tree through [`AstNode`], a copyable `(tree, id)` view.
//!
//! Every node carries a half-open token span `[start, end)`. A nonterminal's
//! span ends where its last child ends (or where it starts, for an empty
//! production). A terminal node binds exactly one token and has width 1. The
//! text of a node is derived from the tokens in its span, never stored.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::grammar::{SymbolId, SymbolTable};
use crate::lexer::{Token, TokenStream};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A half-open interval of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted span [{start}, {end})");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Index of a node inside one arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeData {
    pub(crate) symbol: SymbolId,
    pub(crate) children: Vec<NodeId>,
    /// Index of the bound token, for terminal nodes.
    pub(crate) token: Option<usize>,
    pub(crate) span: Span,
}

/// Append-only node storage used while a parse session runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct Arena {
    nodes: Vec<NodeData>,
}

impl Arena {
    pub(crate) fn push(&mut self, node: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Drops every node pushed after the arena had `len` nodes.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }
}

// ============================================================================
// PARSE TREE
// ============================================================================

/// The result of a successful parse.
///
/// Only the nodes reachable from the root are kept, numbered in pre-order, so
/// two parses of the same input build identical trees regardless of how much
/// backtracking or caching happened along the way.
#[derive(Debug, Clone)]
pub struct ParseTree {
    symbols: Arc<SymbolTable>,
    tokens: TokenStream,
    nodes: Vec<NodeData>,
}

impl ParseTree {
    /// Copies the subtree under `root` out of a session arena.
    pub(crate) fn compact(
        symbols: Arc<SymbolTable>,
        tokens: TokenStream,
        arena: &Arena,
        root: NodeId,
    ) -> Self {
        let mut nodes: Vec<NodeData> = Vec::new();
        // (arena id, slot in the parent's children to patch)
        let mut pending: Vec<(NodeId, Option<(usize, usize)>)> = vec![(root, None)];
        while let Some((id, parent)) = pending.pop() {
            let source = arena.get(id);
            let new_id = NodeId(nodes.len() as u32);
            if let Some((parent, slot)) = parent {
                nodes[parent].children[slot] = new_id;
            }
            let index = nodes.len();
            nodes.push(NodeData {
                symbol: source.symbol,
                children: source.children.clone(),
                token: source.token,
                span: source.span,
            });
            for (slot, &child) in source.children.iter().enumerate().rev() {
                pending.push((child, Some((index, slot))));
            }
        }
        Self {
            symbols,
            tokens,
            nodes,
        }
    }

    pub fn root(&self) -> AstNode<'_> {
        AstNode {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    pub fn span(&self) -> Span {
        self.nodes[0].span
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<AstNode<'_>> {
        (id.index() < self.nodes.len()).then_some(AstNode { tree: self, id })
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = AstNode<'_>> + '_ {
        (0..self.nodes.len()).map(move |index| AstNode {
            tree: self,
            id: NodeId(index as u32),
        })
    }

    /// Indented rendering of the whole tree.
    pub fn pretty(&self) -> String {
        self.root().pretty()
    }
}

/// Structural equality: same symbols, spans, bound tokens and children.
impl PartialEq for ParseTree {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}

impl Serialize for ParseTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root(), f)
    }
}

// ============================================================================
// NODE VIEW
// ============================================================================

/// A node of a [`ParseTree`].
#[derive(Clone, Copy)]
pub struct AstNode<'t> {
    tree: &'t ParseTree,
    id: NodeId,
}

impl<'t> AstNode<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.index()]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t ParseTree {
        self.tree
    }

    /// The grammar symbol this node derives; the token kind for terminals.
    pub fn symbol(&self) -> &'t str {
        self.tree.symbols.name(self.data().symbol)
    }

    pub fn is_terminal(&self) -> bool {
        self.data().token.is_some()
    }

    /// The bound token, for terminal nodes.
    pub fn token(&self) -> Option<&'t Token> {
        self.data().token.map(|index| &self.tree.tokens[index])
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn children(&self) -> Children<'t> {
        Children {
            tree: self.tree,
            ids: self.data().children.iter(),
        }
    }

    pub fn child(&self, index: usize) -> Option<AstNode<'t>> {
        self.data().children.get(index).map(|&id| AstNode {
            tree: self.tree,
            id,
        })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    /// The tokens covered by this node.
    pub fn tokens(&self) -> &'t [Token] {
        self.tree.tokens.slice(self.span().range())
    }

    /// Concatenated text of the covered tokens.
    pub fn text(&self) -> String {
        self.tree.tokens.text(self.span().range())
    }

    /// Whether this node was built from the production `head -> body`.
    pub fn matches_production(&self, head: &str, body: &[&str]) -> bool {
        self.symbol() == head
            && self.child_count() == body.len()
            && self
                .children()
                .zip(body)
                .all(|(child, &symbol)| child.symbol() == symbol)
    }

    pub fn matches_any(&self, productions: &[(&str, &[&str])]) -> bool {
        productions
            .iter()
            .any(|&(head, body)| self.matches_production(head, body))
    }

    /// Indented `Symbol [start, end) text` listing of this subtree.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        let mut pending = vec![(*self, 0usize)];
        while let Some((node, depth)) = pending.pop() {
            let indent = "  ".repeat(depth);
            match node.token() {
                Some(token) => out.push_str(&format!("{indent}{} {:?}\n", node.symbol(), token.text)),
                None => out.push_str(&format!(
                    "{indent}{} {} {:?}\n",
                    node.symbol(),
                    node.span(),
                    node.text()
                )),
            }
            pending.extend(node.children().rev().map(|child| (child, depth + 1)));
        }
        out
    }
}

impl PartialEq for AstNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.symbol() == other.symbol()
            && self.span() == other.span()
            && self.token() == other.token()
            && self.child_count() == other.child_count()
            && self.children().zip(other.children()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for AstNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("AstNode");
        debug.field("symbol", &self.symbol()).field("span", &self.span());
        match self.token() {
            Some(token) => debug.field("token", token),
            None => debug.field("children", &self.children().collect::<Vec<_>>()),
        };
        debug.finish()
    }
}

impl fmt::Display for AstNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

impl Serialize for AstNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("AstNode", 4)?;
        node.serialize_field("symbol", self.symbol())?;
        node.serialize_field("span", &self.span())?;
        node.serialize_field("token", &self.token())?;
        node.serialize_field("children", &SerializeChildren(*self))?;
        node.end()
    }
}

struct SerializeChildren<'t>(AstNode<'t>);

impl Serialize for SerializeChildren<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.children())
    }
}

/// Iterator over the children of an [`AstNode`].
#[derive(Debug, Clone)]
pub struct Children<'t> {
    tree: &'t ParseTree,
    ids: std::slice::Iter<'t, NodeId>,
}

impl<'t> Iterator for Children<'t> {
    type Item = AstNode<'t>;

    fn next(&mut self) -> Option<AstNode<'t>> {
        let tree = self.tree;
        self.ids.next().map(|&id| AstNode { tree, id })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        self.ids.next_back().map(|&id| AstNode { tree, id })
    }
}

impl ExactSizeIterator for Children<'_> {}
