// File: src/core/index/ordered.rs
use super::{corrupt, Collector, PrefixIndex};
use crate::core::cancel::Cancellation;
use crate::core::types::NodeId;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Serialize, Deserialize)]
struct OrderedNode {
    word: String,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// Binary search tree keyed on whole words.
///
/// There is no per-character localisation, so `collect` tests every node.
/// All traversals are iterative: trees grown from sorted input are as deep as
/// they are large.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct OrderedTree {
    nodes: Vec<OrderedNode>,
    root: Option<NodeId>,
}

impl OrderedTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a height-balanced tree from sorted, de-duplicated words by
    /// inserting range midpoints first.
    pub fn build_balanced(sorted: &[String]) -> Self {
        let mut tree = Self::new();
        let mut ranges = vec![(0, sorted.len())];
        while let Some((start, end)) = ranges.pop() {
            if start >= end {
                continue;
            }
            let mid = start + (end - start) / 2;
            tree.insert(&sorted[mid]);
            ranges.push((mid + 1, end));
            ranges.push((start, mid));
        }
        tree
    }

    /// Longest root-to-leaf path, counted in nodes.
    pub fn height(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|id| (id, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let node = &self.nodes[id];
            stack.extend(node.left.map(|l| (l, depth + 1)));
            stack.extend(node.right.map(|r| (r, depth + 1)));
        }
        deepest
    }

    fn find(&self, word: &str) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.nodes[id];
            current = match word.cmp(&node.word) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }
}

impl PrefixIndex for OrderedTree {
    fn insert(&mut self, word: &str) -> bool {
        let new_id = self.nodes.len();
        let Some(mut current) = self.root else {
            self.nodes.push(OrderedNode { word: word.to_string(), left: None, right: None });
            self.root = Some(new_id);
            return true;
        };
        loop {
            let node = &mut self.nodes[current];
            let slot = match word.cmp(&node.word) {
                Ordering::Less => &mut node.left,
                Ordering::Greater => &mut node.right,
                Ordering::Equal => return false,
            };
            match *slot {
                Some(next) => current = next,
                None => {
                    *slot = Some(new_id);
                    break;
                }
            }
        }
        self.nodes.push(OrderedNode { word: word.to_string(), left: None, right: None });
        true
    }

    fn collect_until(&self, prefix: &str, cancel: &Cancellation) -> Result<Vec<String>> {
        let mut collector = Collector::new(cancel);
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            collector.visit()?;
            let node = &self.nodes[id];
            if node.word.starts_with(prefix) {
                collector.push(&node.word);
            }
            stack.extend(node.right);
            stack.extend(node.left);
        }
        collector.finish()
    }

    fn exists_prefix(&self, prefix: &str) -> bool {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.word.starts_with(prefix) {
                return true;
            }
            stack.extend(node.right);
            stack.extend(node.left);
        }
        false
    }

    fn contains(&self, word: &str) -> bool {
        self.find(word).is_some()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.nodes.is_empty() {
                return Ok(());
            }
            return Err(corrupt("ordered tree has nodes but no root"));
        };

        let mut seen = vec![false; self.nodes.len()];
        // (node, exclusive lower bound, exclusive upper bound)
        let mut stack: Vec<(NodeId, Option<&str>, Option<&str>)> = vec![(root, None, None)];
        while let Some((id, low, high)) = stack.pop() {
            if id >= self.nodes.len() {
                return Err(corrupt(format!("ordered node id {id} out of range")));
            }
            if seen[id] {
                return Err(corrupt(format!("ordered node {id} is reachable twice")));
            }
            seen[id] = true;
            let node = &self.nodes[id];
            let word = node.word.as_str();
            if word.is_empty() || low.is_some_and(|l| word <= l) || high.is_some_and(|h| word >= h) {
                return Err(corrupt(format!("ordered node {word:?} breaks the search order")));
            }
            if let Some(left) = node.left {
                stack.push((left, low, Some(word)));
            }
            if let Some(right) = node.right {
                stack.push((right, Some(word), high));
            }
        }
        if seen.iter().any(|&s| !s) {
            return Err(corrupt("ordered tree contains unreachable nodes"));
        }
        Ok(())
    }
}
