mod document;
mod folder;
mod totals;

pub use document::{Document, DocumentStatus, SummaryAssociation};
pub use folder::{Folder, FolderNode, MAX_FOLDER_DEPTH};
pub use totals::{DocumentTotals, FolderTotals};
