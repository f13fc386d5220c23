//! Authority dependency tree.
//!
//! Static configuration describing which authorities an authority implies.
//! Used only to build display views; it never grants anything.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

use super::constants::{ROLE_AUTHORITY_READ, ROLE_AUTHORITY_UPDATE};

/// Ordered mapping from an authority to the authorities it depends on.
///
/// Declaration order is kept for both keys and dependency lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityDependencyTree {
    entries: Vec<(String, Vec<String>)>,
}

impl AuthorityDependencyTree {
    /// Build a tree from `(authority, dependencies)` pairs.
    ///
    /// A repeated authority keeps its first position and takes the last
    /// dependency list.
    pub fn new<I, K, D, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut tree = Self {
            entries: Vec::new(),
        };
        for (key, deps) in entries {
            tree.insert(key.into(), deps.into_iter().map(Into::into).collect());
        }
        tree
    }

    fn insert(&mut self, key: String, deps: Vec<String>) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            *existing = deps;
        } else {
            self.entries.push((key, deps));
        }
    }

    /// Parse a JSON object of the form `{"authority": ["dependency", ...]}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid authority dependency tree")
    }

    /// Load a tree from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read authority tree from {}", path.display())
        })?;
        Self::from_json_str(&json)
    }

    /// Dependencies declared for `authority`.
    #[must_use]
    pub fn dependencies_of(&self, authority: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == authority)
            .map(|(_, deps)| deps.as_slice())
    }

    /// Iterate entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// View of the tree restricted to `held` authorities.
    ///
    /// A key is kept if and only if it is held, even when none of its
    /// dependencies are. Each list keeps only held dependencies in declared
    /// order.
    #[must_use]
    pub fn filtered_for(&self, held: &BTreeSet<String>) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .filter(|(key, _)| held.contains(key))
            .map(|(key, deps)| {
                let visible = deps.iter().filter(|d| held.contains(*d)).cloned().collect();
                (key.clone(), visible)
            })
            .collect()
    }
}

impl Default for AuthorityDependencyTree {
    fn default() -> Self {
        Self::new([
            (ROLE_AUTHORITY_READ, vec![]),
            (ROLE_AUTHORITY_UPDATE, vec![ROLE_AUTHORITY_READ]),
        ])
    }
}

impl<'de> Deserialize<'de> for AuthorityDependencyTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TreeVisitor;

        impl<'de> Visitor<'de> for TreeVisitor {
            type Value = AuthorityDependencyTree;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from authority to a list of authorities")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries: Vec<(String, Vec<String>)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, deps)) = map.next_entry::<String, Vec<String>>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!(
                            "duplicate authority `{key}`"
                        )));
                    }
                    entries.push((key, deps));
                }
                Ok(AuthorityDependencyTree { entries })
            }
        }

        deserializer.deserialize_map(TreeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(authorities: &[&str]) -> BTreeSet<String> {
        authorities.iter().map(|a| (*a).to_string()).collect()
    }

    #[test]
    fn test_filter_drops_unheld_keys_and_dependencies() {
        let tree = AuthorityDependencyTree::new([
            ("update", vec!["read"]),
            ("delete", vec!["read", "write"]),
        ]);

        let view = tree.filtered_for(&held(&["update", "read"]));

        assert_eq!(view.len(), 1);
        assert_eq!(view["update"], vec!["read".to_string()]);
        assert!(!view.contains_key("delete"));
    }

    #[test]
    fn test_filter_keeps_held_key_with_no_visible_dependencies() {
        let tree = AuthorityDependencyTree::new([("delete", vec!["read", "write"])]);

        let view = tree.filtered_for(&held(&["delete"]));

        assert_eq!(view.get("delete"), Some(&Vec::new()));
    }

    #[test]
    fn test_filter_preserves_declared_dependency_order() {
        let tree = AuthorityDependencyTree::new([("admin", vec!["zeta", "alpha", "mid"])]);

        let view = tree.filtered_for(&held(&["admin", "zeta", "mid", "alpha"]));

        assert_eq!(view["admin"], vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_json_keeps_declaration_order() {
        let tree = AuthorityDependencyTree::from_json_str(
            r#"{"zeta": ["b", "a"], "alpha": [], "mid": ["zeta"]}"#,
        )
        .unwrap();

        let keys: Vec<&str> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(tree.dependencies_of("zeta").unwrap(), ["b", "a"]);
    }

    #[test]
    fn test_json_rejects_duplicate_authority() {
        let result = AuthorityDependencyTree::from_json_str(r#"{"a": [], "a": ["b"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_rejects_non_list_dependencies() {
        let result = AuthorityDependencyTree::from_json_str(r#"{"a": "b"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_tree_links_update_to_read() {
        let tree = AuthorityDependencyTree::default();
        assert_eq!(
            tree.dependencies_of(ROLE_AUTHORITY_UPDATE).unwrap(),
            [ROLE_AUTHORITY_READ]
        );
        assert_eq!(tree.dependencies_of(ROLE_AUTHORITY_READ).unwrap().len(), 0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authorities.json");
        std::fs::write(&path, r#"{"report+export": ["report+read"]}"#).unwrap();

        let tree = AuthorityDependencyTree::from_file(&path).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.dependencies_of("report+export").unwrap(),
            ["report+read"]
        );
    }

    #[test]
    fn test_new_merges_repeated_authority() {
        let tree = AuthorityDependencyTree::new([("a", vec!["x"]), ("b", vec![]), ("a", vec!["y"])]);

        let keys: Vec<&str> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(tree.dependencies_of("a").unwrap(), ["y"]);
    }
}
