pub mod folder_aggregator;
pub mod key_resolver;
pub mod row_classifier;
pub mod totals_extractor;

pub use folder_aggregator::{aggregate_all, aggregate_folder, document_contribution, FolderIndex};
pub use key_resolver::{parse_numeric, resolve_field, AliasTable, CanonicalField};
pub use row_classifier::{classify_row, RowKind};
pub use totals_extractor::{reduce_document, reduce_page, AreaTotals};
