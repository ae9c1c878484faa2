//! Alias table of the parser.
//!
//! Aliases are ordered token patterns with typed parameter holes. They are
//! stored in a trie keyed by token kind (identifier edges compare the
//! literal); `<param>` holes are a dedicated edge that triggers a
//! sub-expression parse during matching. Ties between equally long matches
//! break by declaration order.

use crate::lexer::token::{DdpType, Token, TokenKind};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    Keyword(TokenKind),
    Ident(String),
    Param { name: String, typ: DdpType, is_reference: bool },
}

impl PatternElement {
    /// Pattern identity ignores the hole's parameter name (it belongs to
    /// the declaring function, not to the surface form): two holes are
    /// the same when type and reference-ness agree, like the trie's
    /// shared param edge.
    fn same_shape(&self, other: &PatternElement) -> bool {
        match (self, other) {
            (
                PatternElement::Param { typ: a, is_reference: a_ref, .. },
                PatternElement::Param { typ: b, is_reference: b_ref, .. },
            ) => a == b && a_ref == b_ref,
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub pattern: Vec<PatternElement>,
    /// name of the function this alias invokes
    pub func: String,
    /// the surface pattern as written, for diagnostics
    pub source: String,
}

impl Alias {
    /// The parameter holes in pattern order.
    pub fn params(&self) -> impl Iterator<Item = (&str, DdpType, bool)> {
        self.pattern.iter().filter_map(|el| match el {
            PatternElement::Param { name, typ, is_reference } => {
                Some((name.as_str(), *typ, *is_reference))
            }
            _ => None,
        })
    }

    pub fn param_count(&self) -> usize {
        self.params().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EdgeKey {
    Kind(TokenKind),
    Ident(String),
}

impl EdgeKey {
    fn for_token(tok: &Token) -> EdgeKey {
        match tok.kind {
            TokenKind::Identifier => EdgeKey::Ident(tok.literal.clone()),
            kind => EdgeKey::Kind(kind),
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    edges: HashMap<EdgeKey, usize>,
    param_edge: Option<usize>,
    /// aliases whose pattern ends at this node, in declaration order
    completions: Vec<usize>,
}

#[derive(Debug)]
pub struct AliasTable {
    aliases: Vec<Alias>,
    nodes: Vec<Node>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self { aliases: Vec::new(), nodes: vec![Node::default()] }
    }

    /// Insert an alias. If a pattern identical in both token shape and
    /// hole types already exists, the new alias is discarded and the
    /// existing one is returned so the caller can diagnose the overlap.
    pub fn insert(&mut self, alias: Alias) -> Option<&Alias> {
        let mut node = 0usize;
        for element in &alias.pattern {
            node = match element {
                PatternElement::Keyword(kind) => self.child(node, EdgeKey::Kind(*kind)),
                PatternElement::Ident(name) => self.child(node, EdgeKey::Ident(name.clone())),
                PatternElement::Param { .. } => {
                    if let Some(next) = self.nodes[node].param_edge {
                        next
                    } else {
                        let next = self.new_node();
                        self.nodes[node].param_edge = Some(next);
                        next
                    }
                }
            };
        }

        if let Some(&existing) = self.nodes[node].completions.iter().find(|&&idx| {
            let pattern = &self.aliases[idx].pattern;
            pattern.len() == alias.pattern.len()
                && pattern.iter().zip(&alias.pattern).all(|(a, b)| a.same_shape(b))
        }) {
            return Some(&self.aliases[existing]);
        }

        let idx = self.aliases.len();
        self.aliases.push(alias);
        self.nodes[node].completions.push(idx);
        None
    }

    fn child(&mut self, node: usize, key: EdgeKey) -> usize {
        if let Some(&next) = self.nodes[node].edges.get(&key) {
            return next;
        }
        let next = self.new_node();
        self.nodes[node].edges.insert(key, next);
        next
    }

    fn new_node(&mut self) -> usize {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    pub const ROOT: usize = 0;

    /// Whether any alias pattern starts with this token.
    pub fn begins_alias(&self, tok: &Token) -> bool {
        self.nodes[Self::ROOT].edges.contains_key(&EdgeKey::for_token(tok))
    }

    /// Follow the literal edge matching `tok`, if present.
    pub fn next_literal(&self, node: usize, tok: &Token) -> Option<usize> {
        self.nodes[node].edges.get(&EdgeKey::for_token(tok)).copied()
    }

    /// Follow the parameter-hole edge, if present.
    pub fn param_edge(&self, node: usize) -> Option<usize> {
        self.nodes[node].param_edge
    }

    /// Aliases completing at this node, in declaration order.
    pub fn completions(&self, node: usize) -> &[usize] {
        &self.nodes[node].completions
    }

    pub fn alias(&self, idx: usize) -> &Alias {
        &self.aliases[idx]
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new()
    }
}
