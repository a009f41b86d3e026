// File: src/core/index/ternary.rs
use super::{corrupt, Collector, PrefixIndex};
use crate::core::cancel::Cancellation;
use crate::core::types::{NodeId, NodeKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Serialize, Deserialize)]
struct TernaryNode {
    ch: char,
    lo: Option<NodeId>,
    eq: Option<NodeId>,
    hi: Option<NodeId>,
    kind: NodeKind,
}

impl TernaryNode {
    fn new(ch: char) -> Self {
        Self { ch, lo: None, eq: None, hi: None, kind: NodeKind::Internal }
    }
}

/// Ternary search tree: `lo`/`hi` stay on the same character position,
/// `eq` advances to the next one. In-order collection is lexicographic.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TernaryTree {
    nodes: Vec<TernaryNode>,
    root: Option<NodeId>,
    len: usize,
}

enum Link {
    Lo,
    Eq,
    Hi,
}

impl TernaryTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_node(&mut self, ch: char) -> NodeId {
        self.nodes.push(TernaryNode::new(ch));
        self.nodes.len() - 1
    }

    /// Follows `link` from `parent`, creating a node for `ch` when it is missing.
    fn child_or_insert(&mut self, parent: NodeId, link: Link, ch: char) -> NodeId {
        let existing = match link {
            Link::Lo => self.nodes[parent].lo,
            Link::Eq => self.nodes[parent].eq,
            Link::Hi => self.nodes[parent].hi,
        };
        if let Some(id) = existing {
            return id;
        }
        let id = self.push_node(ch);
        let node = &mut self.nodes[parent];
        match link {
            Link::Lo => node.lo = Some(id),
            Link::Eq => node.eq = Some(id),
            Link::Hi => node.hi = Some(id),
        }
        id
    }

    /// Node holding the last character of `key`. `None` for the empty key.
    fn locate(&self, key: &str) -> Option<NodeId> {
        let chars: Vec<char> = key.chars().collect();
        let mut pos = 0;
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.nodes[id];
            let c = *chars.get(pos)?;
            current = match c.cmp(&node.ch) {
                Ordering::Less => node.lo,
                Ordering::Greater => node.hi,
                Ordering::Equal if pos + 1 == chars.len() => return Some(id),
                Ordering::Equal => {
                    pos += 1;
                    node.eq
                }
            };
        }
        None
    }

    /// In-order walk (`lo`, own word, `eq`, `hi`) on an explicit stack. Sibling
    /// chains grow with the alphabet at one position, so recursion is not safe.
    fn walk_in_order(&self, start: Option<NodeId>, collector: &mut Collector<'_>) -> Result<()> {
        // (node, children already scheduled)
        let mut stack: Vec<(NodeId, bool)> = start.map(|id| (id, false)).into_iter().collect();
        while let Some((id, scheduled)) = stack.pop() {
            let node = &self.nodes[id];
            if scheduled {
                if let Some(word) = node.kind.word() {
                    collector.push(word);
                }
                continue;
            }
            collector.visit()?;
            stack.extend(node.hi.map(|hi| (hi, false)));
            stack.extend(node.eq.map(|eq| (eq, false)));
            stack.push((id, true));
            stack.extend(node.lo.map(|lo| (lo, false)));
        }
        Ok(())
    }
}

impl PrefixIndex for TernaryTree {
    fn insert(&mut self, word: &str) -> bool {
        let chars: Vec<char> = word.chars().collect();
        let Some(&first) = chars.first() else {
            return false;
        };

        let mut current = match self.root {
            Some(id) => id,
            None => {
                let id = self.push_node(first);
                self.root = Some(id);
                id
            }
        };
        let mut pos = 0;
        loop {
            let c = chars[pos];
            match c.cmp(&self.nodes[current].ch) {
                Ordering::Less => current = self.child_or_insert(current, Link::Lo, c),
                Ordering::Greater => current = self.child_or_insert(current, Link::Hi, c),
                Ordering::Equal if pos + 1 == chars.len() => break,
                Ordering::Equal => {
                    pos += 1;
                    current = self.child_or_insert(current, Link::Eq, chars[pos]);
                }
            }
        }

        let node = &mut self.nodes[current];
        if node.kind.is_terminal() {
            return false;
        }
        node.kind = NodeKind::Terminal(word.to_string());
        self.len += 1;
        true
    }

    fn collect_until(&self, prefix: &str, cancel: &Cancellation) -> Result<Vec<String>> {
        let mut collector = Collector::new(cancel);
        if prefix.is_empty() {
            self.walk_in_order(self.root, &mut collector)?;
            return collector.finish();
        }
        if let Some(id) = self.locate(prefix) {
            let node = &self.nodes[id];
            if let Some(word) = node.kind.word() {
                collector.push(word);
            }
            self.walk_in_order(node.eq, &mut collector)?;
        }
        collector.finish()
    }

    fn exists_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return self.len > 0;
        }
        self.locate(prefix).is_some()
    }

    fn contains(&self, word: &str) -> bool {
        self.locate(word).is_some_and(|id| self.nodes[id].kind.is_terminal())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.nodes.is_empty() && self.len == 0 {
                return Ok(());
            }
            return Err(corrupt("ternary tree has nodes but no root"));
        };

        let in_range = |id: NodeId| {
            if id < self.nodes.len() {
                Ok(id)
            } else {
                Err(corrupt(format!("ternary node id {id} out of range")))
            }
        };

        let mut seen = vec![false; self.nodes.len()];
        let mut terminals = 0;
        // (node, characters fixed by the eq-edges above it)
        let mut stack = vec![(in_range(root)?, String::new())];
        while let Some((id, path)) = stack.pop() {
            if seen[id] {
                return Err(corrupt(format!("ternary node {id} is reachable twice")));
            }
            seen[id] = true;
            let node = &self.nodes[id];
            let mut through = path.clone();
            through.push(node.ch);
            if let Some(word) = node.kind.word() {
                if word != through {
                    return Err(corrupt(format!("ternary terminal {word:?} sits on path {through:?}")));
                }
                terminals += 1;
            }
            if let Some(lo) = node.lo {
                stack.push((in_range(lo)?, path.clone()));
            }
            if let Some(hi) = node.hi {
                stack.push((in_range(hi)?, path.clone()));
            }
            if let Some(eq) = node.eq {
                stack.push((in_range(eq)?, through));
            }
        }
        if seen.iter().any(|&s| !s) {
            return Err(corrupt("ternary tree contains unreachable nodes"));
        }
        if terminals != self.len {
            return Err(corrupt(format!("ternary tree counts {} words but holds {terminals}", self.len)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(words: &[&str]) -> TernaryTree {
        let mut tst = TernaryTree::new();
        for word in words {
            tst.insert(word);
        }
        tst
    }

    #[test]
    fn collection_is_lexicographic_without_ranking() {
        let tst = tree(&["the", "of", "cat", "case", "category", "car", "online", "only"]);
        assert_eq!(tst.collect("ca").unwrap(), vec!["car", "case", "cat", "category"]);
        assert_eq!(tst.collect("on").unwrap(), vec!["online", "only"]);
        assert_eq!(tst.collect("").unwrap(), vec!["car", "case", "cat", "category", "of", "online", "only", "the"]);
    }

    #[test]
    fn prefix_that_is_itself_a_word_is_included() {
        let tst = tree(&["car", "cart"]);
        assert_eq!(tst.collect("car").unwrap(), vec!["car", "cart"]);
        assert!(tst.contains("car"));
        assert!(!tst.contains("ca"));
    }

    #[test]
    fn insert_is_idempotent_and_skips_empty() {
        let mut tst = tree(&["dog"]);
        assert!(!tst.insert("dog"));
        assert!(!tst.insert(""));
        assert_eq!(tst.len(), 1);
        tst.validate().unwrap();
    }

    #[test]
    fn missing_prefix_yields_nothing() {
        let tst = tree(&["dog", "door"]);
        assert!(tst.collect("dx").unwrap().is_empty());
        assert!(!tst.exists_prefix("doors"));
        assert!(tst.exists_prefix("doo"));
    }

    #[test]
    fn wide_sibling_chain_collects_without_recursion() {
        let mut tst = TernaryTree::new();
        let words: Vec<String> = (0..20_000u32)
            .filter_map(|i| char::from_u32(0x4E00 + i))
            .map(|c| format!("a{c}"))
            .collect();
        for word in &words {
            tst.insert(word);
        }
        let got = tst.collect("a").unwrap();
        assert_eq!(got.len(), words.len());
        assert_eq!(got, words);
        assert_eq!(tst.collect("").unwrap().len(), words.len());
        tst.validate().unwrap();
    }

    #[test]
    fn validate_rejects_cycle() {
        let mut tst = tree(&["ab"]);
        tst.nodes[1].eq = Some(0);
        assert!(tst.validate().is_err());
    }
}
