// --- File: src/core/index/trie.rs
use super::{corrupt, Collector, PrefixIndex};
use crate::core::cancel::Cancellation;
use crate::core::types::{NodeId, NodeKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ROOT: NodeId = 0;

#[derive(Clone, Serialize, Deserialize)]
struct TrieNode {
    // Ordered so that sibling visitation is the same for the same history.
    children: BTreeMap<char, NodeId>,
    kind: NodeKind,
}

impl TrieNode {
    fn new() -> Self {
        Self { children: BTreeMap::new(), kind: NodeKind::Internal }
    }
}

/// Character trie stored as an arena; node 0 is the root.
/// Lookups and inserts are O(length of key), collection adds O(matches).
#[derive(Clone, Serialize, Deserialize)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    len: usize,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Self { nodes: vec![TrieNode::new()], len: 0 }
    }

    fn locate(&self, key: &str) -> Option<NodeId> {
        let mut node_idx = ROOT;
        for c in key.chars() {
            node_idx = *self.nodes[node_idx].children.get(&c)?;
        }
        Some(node_idx)
    }

    /// Number of nodes in the arena, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl PrefixIndex for Trie {
    fn insert(&mut self, word: &str) -> bool {
        let mut node_idx = ROOT;
        for c in word.chars() {
            let next_idx = if let Some(&id) = self.nodes[node_idx].children.get(&c) {
                id
            } else {
                let new_node_id = self.nodes.len();
                self.nodes.push(TrieNode::new());
                self.nodes[node_idx].children.insert(c, new_node_id);
                new_node_id
            };
            node_idx = next_idx;
        }

        let node = &mut self.nodes[node_idx];
        if node.kind.is_terminal() {
            return false;
        }
        node.kind = NodeKind::Terminal(word.to_string());
        self.len += 1;
        true
    }

    fn collect_until(&self, prefix: &str, cancel: &Cancellation) -> Result<Vec<String>> {
        let mut collector = Collector::new(cancel);
        let Some(start) = self.locate(prefix) else {
            return collector.finish();
        };

        // Depth-first, children pushed in reverse so they pop in ascending order.
        let mut stack = vec![start];
        while let Some(node_idx) = stack.pop() {
            collector.visit()?;
            let node = &self.nodes[node_idx];
            if let Some(word) = node.kind.word() {
                collector.push(word);
            }
            stack.extend(node.children.values().rev().copied());
        }
        collector.finish()
    }

    fn exists_prefix(&self, prefix: &str) -> bool {
        // Every leaf is terminal, so reaching a node means a word lies below it.
        // The empty root is the one exception.
        match self.locate(prefix) {
            Some(ROOT) => self.len > 0,
            Some(_) => true,
            None => false,
        }
    }

    fn contains(&self, word: &str) -> bool {
        self.locate(word).is_some_and(|idx| self.nodes[idx].kind.is_terminal())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(corrupt("trie has no root"));
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut terminals = 0;
        let mut stack = vec![(ROOT, String::new())];
        while let Some((node_idx, path)) = stack.pop() {
            if seen[node_idx] {
                return Err(corrupt(format!("trie node {node_idx} is reachable twice")));
            }
            seen[node_idx] = true;
            let node = &self.nodes[node_idx];
            match &node.kind {
                NodeKind::Terminal(word) if *word != path => {
                    return Err(corrupt(format!("trie terminal {word:?} sits on path {path:?}")));
                }
                NodeKind::Terminal(_) => terminals += 1,
                NodeKind::Internal if node_idx != ROOT && node.children.is_empty() => {
                    return Err(corrupt(format!("trie leaf {node_idx} completes no word")));
                }
                NodeKind::Internal => {}
            }
            for (&c, &child) in &node.children {
                if child >= self.nodes.len() {
                    return Err(corrupt(format!("trie child id {child} out of range")));
                }
                let mut child_path = path.clone();
                child_path.push(c);
                stack.push((child, child_path));
            }
        }
        if seen.iter().any(|&s| !s) {
            return Err(corrupt("trie contains unreachable nodes"));
        }
        if terminals != self.len {
            return Err(corrupt(format!("trie counts {} words but holds {terminals}", self.len)));
        }
        Ok(())
    }
}
