//! Rolls per-document totals up the folder forest.
//!
//! `FolderTotals(f) = Σ contributions of documents directly in f + Σ FolderTotals(child)`.
//! Pure: the caller fetches the full folder and document sets once, and persists
//! the result once per run.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Document, DocumentStatus, Folder, FolderTotals};

/// What a single document adds to its folder.
///
/// Scanned documents add their three totals; summary-scanned documents add the
/// sum of their associations' areas to `total_area` only; anything else adds nothing.
pub fn document_contribution(doc: &Document) -> FolderTotals {
    let mut sum = FolderTotals::default();
    match doc.status {
        DocumentStatus::Scanned => {
            if let Some(totals) = &doc.totals {
                sum += totals;
            }
        }
        DocumentStatus::SummaryScanned => {
            sum.total_area = doc.associations.iter().map(|a| a.total_area).sum();
        }
        _ => {}
    }
    sum
}

/// Children-by-parent and documents-by-folder lookups over borrowed entity sets.
pub struct FolderIndex<'a> {
    folders: Vec<&'a Folder>,
    children: HashMap<i64, Vec<i64>>,
    documents: HashMap<i64, Vec<&'a Document>>,
}

impl<'a> FolderIndex<'a> {
    pub fn new(folders: &'a [Folder], documents: &'a [Document]) -> Self {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for folder in folders {
            if let Some(pid) = folder.parent_id {
                if pid != folder.id {
                    children.entry(pid).or_default().push(folder.id);
                }
            }
        }

        let mut by_folder: HashMap<i64, Vec<&'a Document>> = HashMap::new();
        for doc in documents {
            if let Some(fid) = doc.folder_id {
                by_folder.entry(fid).or_default().push(doc);
            }
        }

        FolderIndex {
            folders: folders.iter().collect(),
            children,
            documents: by_folder,
        }
    }

    pub fn children_of(&self, folder_id: i64) -> &[i64] {
        self.children.get(&folder_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn documents_in(&self, folder_id: i64) -> &[&'a Document] {
        self.documents.get(&folder_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Post-order sum of `folder_id`'s subtree. The flag is set when the walk ran
    /// into a folder already on the current path; such partial sums are never
    /// memoised, so every folder on a corrupted cycle reports the whole cycle once.
    fn walk(
        &self,
        folder_id: i64,
        memo: &mut HashMap<i64, FolderTotals>,
        on_stack: &mut HashSet<i64>,
    ) -> (FolderTotals, bool) {
        if let Some(done) = memo.get(&folder_id) {
            return (*done, false);
        }
        if !on_stack.insert(folder_id) {
            tracing::warn!(folder_id, "folder reached twice on one path; ignoring the repeat");
            return (FolderTotals::default(), true);
        }

        let mut sum: FolderTotals = self
            .documents_in(folder_id)
            .iter()
            .map(|doc| document_contribution(doc))
            .sum();
        let mut cyclic = false;
        for &child in self.children_of(folder_id) {
            let (child_sum, child_cyclic) = self.walk(child, memo, on_stack);
            sum += child_sum;
            cyclic |= child_cyclic;
        }

        on_stack.remove(&folder_id);
        if !cyclic {
            memo.insert(folder_id, sum);
        }
        (sum, cyclic)
    }
}

/// Totals for one folder's subtree. A folder id absent from the set still sums
/// whatever documents and folders point at it.
pub fn aggregate_folder(index: &FolderIndex<'_>, folder_id: i64) -> FolderTotals {
    index.walk(folder_id, &mut HashMap::new(), &mut HashSet::new()).0
}

/// Totals for every folder in the set, each subtree computed once.
pub fn aggregate_all(folders: &[Folder], documents: &[Document]) -> BTreeMap<i64, FolderTotals> {
    let index = FolderIndex::new(folders, documents);
    let mut memo = HashMap::with_capacity(folders.len());
    let mut on_stack = HashSet::new();
    let mut out = BTreeMap::new();
    for folder in &index.folders {
        let (totals, _) = index.walk(folder.id, &mut memo, &mut on_stack);
        out.insert(folder.id, totals);
    }
    tracing::debug!(folders = out.len(), documents = documents.len(), "aggregated folder totals");
    out
}
