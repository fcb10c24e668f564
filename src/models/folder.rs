use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::FolderTotals;

/// Deepest level a folder may sit at; roots are level 1.
pub const MAX_FOLDER_DEPTH: i64 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub level: i64,
    #[serde(default)]
    pub totals: FolderTotals,
    pub created_at: String,
}

impl Folder {
    /// Level for a new folder under `parent`, or `None` when the depth cap would be exceeded.
    pub fn child_level(parent: Option<&Folder>) -> Option<i64> {
        let level = parent.map(|p| p.level + 1).unwrap_or(1);
        (level <= MAX_FOLDER_DEPTH).then_some(level)
    }
}

/// Folder with its children nested, for callers that render the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub id: i64,
    pub name: String,
    pub level: i64,
    pub totals: FolderTotals,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Nest a flat folder set. Folders whose parent is missing from the set become roots.
    pub fn build_forest(folders: &[Folder]) -> Vec<FolderNode> {
        let known: HashSet<i64> = folders.iter().map(|f| f.id).collect();
        let mut children: HashMap<i64, Vec<&Folder>> = HashMap::new();
        let mut roots: Vec<&Folder> = Vec::new();
        for folder in folders {
            match folder.parent_id {
                Some(pid) if known.contains(&pid) && pid != folder.id => {
                    children.entry(pid).or_default().push(folder)
                }
                _ => roots.push(folder),
            }
        }
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        let mut seen = HashSet::new();
        roots
            .into_iter()
            .map(|f| Self::build_node(f, &children, &mut seen))
            .collect()
    }

    fn build_node(
        folder: &Folder,
        children: &HashMap<i64, Vec<&Folder>>,
        seen: &mut HashSet<i64>,
    ) -> FolderNode {
        seen.insert(folder.id);
        let mut kids: Vec<&Folder> = children
            .get(&folder.id)
            .map(|v| v.iter().copied().filter(|c| !seen.contains(&c.id)).collect())
            .unwrap_or_default();
        kids.sort_by(|a, b| a.name.cmp(&b.name));
        FolderNode {
            id: folder.id,
            name: folder.name.clone(),
            level: folder.level,
            totals: folder.totals,
            children: kids
                .into_iter()
                .map(|c| Self::build_node(c, children, seen))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: i64, parent_id: Option<i64>, name: &str, level: i64) -> Folder {
        Folder {
            id,
            user_id: 1,
            parent_id,
            name: name.to_string(),
            level,
            totals: FolderTotals::default(),
            created_at: String::new(),
        }
    }

    #[test]
    fn child_level_respects_cap() {
        assert_eq!(Folder::child_level(None), Some(1));
        let l3 = folder(3, Some(2), "c", 3);
        assert_eq!(Folder::child_level(Some(&l3)), Some(4));
        let l4 = folder(4, Some(3), "d", 4);
        assert_eq!(Folder::child_level(Some(&l4)), None);
    }

    #[test]
    fn forest_nests_children_and_promotes_orphans() {
        let folders = vec![
            folder(1, None, "Region B", 1),
            folder(2, None, "Region A", 1),
            folder(3, Some(1), "District", 2),
            folder(4, Some(99), "Orphan", 2),
        ];
        let forest = FolderNode::build_forest(&folders);
        let names: Vec<&str> = forest.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Orphan", "Region A", "Region B"]);
        let region_b = &forest[2];
        assert_eq!(region_b.children.len(), 1);
        assert_eq!(region_b.children[0].id, 3);
    }
}
