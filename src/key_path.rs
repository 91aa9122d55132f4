//! Key paths and the nested key tree shared by the hierarchical formats.
//!
//! Flat formats treat a term key as one opaque segment. Nested formats
//! (JSON/YAML nested) split it on a delimiter and build an object tree from
//! the segments, which is where overlapping depths (`a` vs `a.b`) surface
//! as [`Error::KeyConflict`].

use std::collections::HashMap;

use crate::{
    error::Error,
    types::{Record, RecordIssue},
};

/// How a raw key string maps onto path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode<'a> {
    /// The whole key is one segment.
    Flat,
    /// The key is split on `delimiter`.
    Nested { delimiter: &'a str },
}

impl<'a> KeyMode<'a> {
    pub fn nested(delimiter: &'a str) -> Self {
        KeyMode::Nested { delimiter }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, KeyMode::Nested { .. })
    }
}

/// A parsed term key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parses `raw` according to `mode`.
    ///
    /// Fails with [`Error::MalformedKey`] for empty or whitespace-only keys
    /// and, in nested mode, for empty segments (`a..b`, `.a`, `a.`).
    pub fn parse(raw: &str, mode: KeyMode<'_>) -> Result<Self, Error> {
        if raw.trim().is_empty() {
            return Err(malformed(raw, "key is empty or whitespace only"));
        }
        let segments = match mode {
            KeyMode::Flat => vec![raw.to_string()],
            KeyMode::Nested { delimiter } if delimiter.is_empty() => vec![raw.to_string()],
            KeyMode::Nested { delimiter } => {
                let segments: Vec<String> = raw.split(delimiter).map(str::to_string).collect();
                if segments.iter().any(String::is_empty) {
                    return Err(malformed(raw, "key contains an empty segment"));
                }
                segments
            }
        };
        Ok(KeyPath { segments })
    }

    /// Builds a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Renders the path back into a key string.
    pub fn render(&self, mode: KeyMode<'_>) -> String {
        match mode {
            KeyMode::Flat => self.segments.concat(),
            KeyMode::Nested { delimiter } => self.segments.join(delimiter),
        }
    }

    /// Returns the path extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        KeyPath { segments }
    }

    /// Rendered forms of every proper ancestor, shallowest first.
    pub fn ancestors(&self, mode: KeyMode<'_>) -> Vec<String> {
        (1..self.segments.len())
            .map(|len| KeyPath::from_segments(self.segments[..len].iter().cloned()).render(mode))
            .collect()
    }
}

fn malformed(key: &str, reason: &str) -> Error {
    Error::MalformedKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// A node of a [`KeyTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(String),
    Branch(Branch),
}

/// An insertion-ordered map of child nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    children: Vec<(String, Node)>,
    index: HashMap<String, usize>,
}

impl Branch {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn into_children(self) -> Vec<(String, Node)> {
        self.children
    }

    fn get_mut(&mut self, segment: &str) -> Option<&mut Node> {
        let position = *self.index.get(segment)?;
        self.children.get_mut(position).map(|(_, node)| node)
    }

    fn push(&mut self, segment: &str, node: Node) -> &mut Node {
        let position = self.children.len();
        self.index.insert(segment.to_string(), position);
        self.children.push((segment.to_string(), node));
        &mut self.children[position].1
    }
}

/// Builds a nested object tree from key paths, preserving insertion order.
#[derive(Debug, Clone, Default)]
pub struct KeyTree {
    root: Branch,
}

impl KeyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Inserts `value` at `path`.
    ///
    /// A leaf met on the way down, or an existing node at the target
    /// position, is a [`Error::KeyConflict`]; the tree is left unchanged.
    pub fn insert(&mut self, path: &KeyPath, value: String, mode: KeyMode<'_>) -> Result<(), Error> {
        let Some((last, parents)) = path.segments.split_last() else {
            return Err(malformed("", "key is empty or whitespace only"));
        };

        let conflict = |depth: usize| Error::KeyConflict {
            key: path.render(mode),
            conflicting: KeyPath::from_segments(path.segments[..depth].iter().cloned())
                .render(mode),
        };

        // Walk once read-only so a failed insert never leaves empty branches behind.
        let mut probe = &self.root;
        for (depth, segment) in parents.iter().enumerate() {
            match probe.index.get(segment).map(|&i| &probe.children[i].1) {
                None => break,
                Some(Node::Leaf(_)) => return Err(conflict(depth + 1)),
                Some(Node::Branch(branch)) => probe = branch,
            }
            if depth + 1 == parents.len() && probe.index.contains_key(last) {
                return Err(conflict(path.depth()));
            }
        }
        if parents.is_empty() && self.root.index.contains_key(last) {
            return Err(conflict(path.depth()));
        }

        let mut branch = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            if branch.get_mut(segment).is_none() {
                branch.push(segment, Node::Branch(Branch::default()));
            }
            match branch.get_mut(segment) {
                Some(Node::Branch(child)) => branch = child,
                _ => return Err(conflict(depth + 1)),
            }
        }
        branch.push(last, Node::Leaf(value));
        Ok(())
    }

    /// Builds a tree from records, in order.
    ///
    /// Records whose key is malformed or collides with an earlier key are
    /// left out and reported.
    pub fn from_records(records: &[Record], mode: KeyMode<'_>) -> Result<(Self, Vec<RecordIssue>), Error> {
        let mut tree = KeyTree::new();
        let mut skipped = Vec::new();
        for record in records {
            let inserted = KeyPath::parse(&record.key, mode)
                .and_then(|path| tree.insert(&path, record.value.clone(), mode));
            if let Err(error) = inserted {
                tracing::warn!(key = %record.key, %error, "leaving key out of nested document");
                skipped.push(RecordIssue::from_record_error(&record.key, error)?);
            }
        }
        Ok((tree, skipped))
    }

    pub fn into_root(self) -> Branch {
        self.root
    }

    /// Folds the tree into another representation (a JSON or YAML value).
    pub fn fold<T>(self, leaf: &impl Fn(String) -> T, branch: &impl Fn(Vec<(String, T)>) -> T) -> T {
        fold_branch(self.root, leaf, branch)
    }
}

fn fold_branch<T>(
    node: Branch,
    leaf: &impl Fn(String) -> T,
    branch: &impl Fn(Vec<(String, T)>) -> T,
) -> T {
    let children = node
        .children
        .into_iter()
        .map(|(segment, child)| {
            let folded = match child {
                Node::Leaf(value) => leaf(value),
                Node::Branch(inner) => fold_branch(inner, leaf, branch),
            };
            (segment, folded)
        })
        .collect();
    branch(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOT: KeyMode<'static> = KeyMode::Nested { delimiter: "." };

    #[test]
    fn test_flat_keys_stay_opaque() {
        let path = KeyPath::parse("menu.file.open", KeyMode::Flat).unwrap();
        assert_eq!(path.depth(), 1);
        assert_eq!(path.render(KeyMode::Flat), "menu.file.open");
    }

    #[test]
    fn test_nested_keys_split_on_delimiter() {
        let path = KeyPath::parse("menu.file.open", DOT).unwrap();
        assert_eq!(path.segments(), ["menu", "file", "open"]);
        assert_eq!(path.render(DOT), "menu.file.open");

        let path = KeyPath::parse("menu/file", KeyMode::nested("/")).unwrap();
        assert_eq!(path.segments(), ["menu", "file"]);
    }

    #[test]
    fn test_empty_segments_are_malformed() {
        for raw in ["a..b", ".a", "a.", "."] {
            let err = KeyPath::parse(raw, DOT).unwrap_err();
            assert!(matches!(err, Error::MalformedKey { .. }), "{raw}");
        }
        // The same keys are fine when flat.
        assert!(KeyPath::parse("a..b", KeyMode::Flat).is_ok());
    }

    #[test]
    fn test_whitespace_keys_are_malformed() {
        assert!(KeyPath::parse("", KeyMode::Flat).is_err());
        assert!(KeyPath::parse("   ", KeyMode::Flat).is_err());
        assert!(KeyPath::parse("\t", DOT).is_err());
    }

    #[test]
    fn test_ancestors() {
        let path = KeyPath::parse("a.b.c", DOT).unwrap();
        assert_eq!(path.ancestors(DOT), vec!["a", "a.b"]);
        assert!(KeyPath::parse("a", DOT).unwrap().ancestors(DOT).is_empty());
    }

    #[test]
    fn test_tree_preserves_insertion_order() {
        let mut tree = KeyTree::new();
        for key in ["z.b", "a", "z.a"] {
            let path = KeyPath::parse(key, DOT).unwrap();
            tree.insert(&path, key.to_uppercase(), DOT).unwrap();
        }
        let root = tree.into_root().into_children();
        assert_eq!(root[0].0, "z");
        assert_eq!(root[1].0, "a");
        match &root[0].1 {
            Node::Branch(branch) => {
                let keys: Vec<_> = branch.children.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, ["b", "a"]);
            }
            Node::Leaf(_) => panic!("expected branch"),
        }
    }

    #[test]
    fn test_deeper_key_under_leaf_conflicts() {
        let mut tree = KeyTree::new();
        tree.insert(&KeyPath::parse("a", DOT).unwrap(), "1".into(), DOT)
            .unwrap();
        let err = tree
            .insert(&KeyPath::parse("a.b", DOT).unwrap(), "2".into(), DOT)
            .unwrap_err();
        match err {
            Error::KeyConflict { key, conflicting } => {
                assert_eq!(key, "a.b");
                assert_eq!(conflicting, "a");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_key_over_branch_conflicts_without_overwriting() {
        let mut tree = KeyTree::new();
        tree.insert(&KeyPath::parse("a.b.c", DOT).unwrap(), "1".into(), DOT)
            .unwrap();
        assert!(
            tree.insert(&KeyPath::parse("a.b", DOT).unwrap(), "2".into(), DOT)
                .is_err()
        );
        assert!(
            tree.insert(&KeyPath::parse("a", DOT).unwrap(), "3".into(), DOT)
                .is_err()
        );
        let folded = tree.fold(&|leaf| leaf, &|children| {
            children
                .into_iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect::<Vec<_>>()
                .join(",")
        });
        assert_eq!(folded, "a:b:c:1");
    }

    #[test]
    fn test_duplicate_leaf_conflicts() {
        let mut tree = KeyTree::new();
        let path = KeyPath::parse("a.b", DOT).unwrap();
        tree.insert(&path, "1".into(), DOT).unwrap();
        assert!(tree.insert(&path, "2".into(), DOT).is_err());
    }

    #[test]
    fn test_failed_insert_leaves_no_empty_branch() {
        let mut tree = KeyTree::new();
        tree.insert(&KeyPath::parse("a", DOT).unwrap(), "1".into(), DOT)
            .unwrap();
        assert!(
            tree.insert(&KeyPath::parse("a.b.c", DOT).unwrap(), "2".into(), DOT)
                .is_err()
        );
        let root = tree.into_root().into_children();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].1, Node::Leaf("1".to_string()));
    }
}
