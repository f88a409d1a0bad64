//! Dot-path `key.path=value` tables (`*_tbl.txt`).

use crate::Error;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct KvNode {
    /// Full dot-separated path; unique within the table.
    pub path: String,
    /// Last path segment.
    pub name: String,
    /// Empty for group nodes.
    pub value: String,
    /// Paths of the immediate children, in first-seen order.
    pub children: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct KvTable {
    nodes: Vec<KvNode>,
    index: HashMap<String, usize>,
    roots: Vec<String>,
}

impl KvTable {
    pub fn parse(input: &str) -> Result<Self, Error> {
        parse_kv_table(input)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &str) -> Result<Self, Error> {
        Self::parse(input)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level paths, in first-seen order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn node(&self, path: &str) -> Option<&KvNode> {
        self.index.get(path).map(|&i| &self.nodes[i])
    }

    pub fn has_key(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn get_children_count(&self, path: &str) -> Result<usize, Error> {
        Ok(self.require(path)?.children.len())
    }

    /// Value of a leaf node. Group nodes are rejected.
    pub fn get_value(&self, path: &str) -> Result<&str, Error> {
        let node = self.require(path)?;
        if !node.children.is_empty() {
            return Err(Error::KvNotLeaf {
                path: path.to_string(),
                children: node.children.len(),
            });
        }
        Ok(&node.value)
    }

    /// Whether the `child`-th child of `path` has a child of its own named `key`.
    pub fn child_has_key(&self, path: &str, child: usize, key: &str) -> Result<bool, Error> {
        Ok(self.grandchild(path, child, key)?.is_some())
    }

    /// Value of the node named `key` under the `child`-th child of `path`.
    ///
    /// `child_get_value("module", 3, "name")` reads `module.<4th id>.name`.
    pub fn child_get_value(&self, path: &str, child: usize, key: &str) -> Result<&str, Error> {
        self.grandchild(path, child, key)?
            .map(|node| node.value.as_str())
            .ok_or_else(|| Error::KvChildKeyNotFound {
                path: path.to_string(),
                index: child,
                key: key.to_string(),
            })
    }

    pub fn child_get_path(&self, path: &str, child: usize, key: &str) -> Result<&str, Error> {
        self.grandchild(path, child, key)?
            .map(|node| node.path.as_str())
            .ok_or_else(|| Error::KvChildKeyNotFound {
                path: path.to_string(),
                index: child,
                key: key.to_string(),
            })
    }

    fn require(&self, path: &str) -> Result<&KvNode, Error> {
        self.node(path).ok_or_else(|| Error::KvKeyNotFound {
            path: path.to_string(),
        })
    }

    fn grandchild(&self, path: &str, child: usize, key: &str) -> Result<Option<&KvNode>, Error> {
        let node = self.require(path)?;
        let child_path = node
            .children
            .get(child)
            .ok_or_else(|| Error::KvChildIndexOutOfRange {
                path: path.to_string(),
                index: child,
                count: node.children.len(),
            })?;
        let child_node = self.require(child_path)?;
        Ok(child_node
            .children
            .iter()
            .filter_map(|p| self.node(p))
            .find(|n| n.name == key))
    }

    fn insert_path(&mut self, key: &str, line: usize) -> Result<usize, Error> {
        let mut accumulated = String::with_capacity(key.len());
        let mut current: Option<usize> = None;

        for part in key.split('.') {
            if part.is_empty() {
                return Err(Error::KvParse {
                    line,
                    message: format!("empty path segment in key '{key}'"),
                });
            }
            if !accumulated.is_empty() {
                accumulated.push('.');
            }
            accumulated.push_str(part);

            let index = match self.index.get(&accumulated) {
                Some(&existing) => existing,
                None => {
                    let index = self.nodes.len();
                    self.nodes.push(KvNode {
                        path: accumulated.clone(),
                        name: part.to_string(),
                        ..KvNode::default()
                    });
                    self.index.insert(accumulated.clone(), index);
                    match current {
                        Some(parent) => self.nodes[parent].children.push(accumulated.clone()),
                        None => self.roots.push(accumulated.clone()),
                    }
                    index
                }
            };
            current = Some(index);
        }

        current.ok_or_else(|| Error::KvParse {
            line,
            message: "empty key".to_string(),
        })
    }
}

impl FromStr for KvTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kv_table(s)
    }
}

fn parse_kv_table(input: &str) -> Result<KvTable, Error> {
    let mut table = KvTable::default();

    for (i, raw_line) in input.split('\n').enumerate() {
        let line_number = i + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            log::debug!("kv table line {line_number}: ignoring line without exactly one '='");
            continue;
        };

        let leaf = table.insert_path(key, line_number)?;
        table.nodes[leaf].value = value.to_string();
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grandchild_queries_go_through_the_nth_child() {
        let table = KvTable::from_str("a.b.x=1\na.b.y=2").unwrap();

        assert_eq!(table.get_children_count("a").unwrap(), 1);
        assert_eq!(table.child_get_value("a", 0, "x").unwrap(), "1");
        assert_eq!(table.child_get_value("a", 0, "y").unwrap(), "2");
        assert!(table.child_has_key("a", 0, "x").unwrap());
        assert!(!table.child_has_key("a", 0, "z").unwrap());
        assert_eq!(table.child_get_path("a", 0, "y").unwrap(), "a.b.y");
    }

    #[test]
    fn prefixes_are_shared_and_children_keep_insertion_order() {
        let table = KvTable::from_str(
            r#"
# comment
module.0.id=1
module.0.name=Miku
module.1.id=2
   # indented comment
module.data_list.length=2
"#,
        )
        .unwrap();

        assert_eq!(table.roots(), ["module".to_string()]);
        let module = table.node("module").unwrap();
        assert_eq!(
            module.children,
            ["module.0", "module.1", "module.data_list"]
        );
        assert_eq!(table.node("module.0").unwrap().name, "0");
        assert_eq!(table.get_value("module.0.name").unwrap(), "Miku");
        assert_eq!(table.get_value("module.data_list.length").unwrap(), "2");
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn get_value_rejects_group_nodes() {
        let table = KvTable::from_str("a.b=1").unwrap();
        assert!(matches!(
            table.get_value("a"),
            Err(Error::KvNotLeaf { children: 1, .. })
        ));
    }

    #[test]
    fn later_lines_overwrite_values() {
        let table = KvTable::from_str("a=1\na=2").unwrap();
        assert_eq!(table.get_value("a").unwrap(), "2");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lines_without_single_equals_are_ignored() {
        let table = KvTable::from_str("a\nb=1=2\nc=3").unwrap();
        assert!(!table.has_key("a"));
        assert!(!table.has_key("b"));
        assert_eq!(table.get_value("c").unwrap(), "3");
    }

    #[test]
    fn values_may_be_empty() {
        let table = KvTable::from_str("a.b=").unwrap();
        assert_eq!(table.get_value("a.b").unwrap(), "");
    }

    #[test]
    fn empty_segment_is_a_parse_error() {
        let err = KvTable::from_str("ok=1\na..b=1").unwrap_err();
        assert!(matches!(err, Error::KvParse { line: 2, .. }));
    }

    #[test]
    fn query_preconditions_fail_fast() {
        let table = KvTable::from_str("a.b.x=1").unwrap();
        assert!(matches!(
            table.get_children_count("missing"),
            Err(Error::KvKeyNotFound { .. })
        ));
        assert!(matches!(
            table.child_get_value("a", 1, "x"),
            Err(Error::KvChildIndexOutOfRange { index: 1, count: 1, .. })
        ));
        assert!(matches!(
            table.child_get_value("a", 0, "nope"),
            Err(Error::KvChildKeyNotFound { .. })
        ));
    }
}
