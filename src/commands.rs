//! Request-handling entry points: fetch, run the engine, persist.
//!
//! Every command holds the state lock for its whole fetch/compute/write cycle,
//! so aggregation runs for the same store never interleave.

use crate::db::Db;
use crate::error::{AppError, DbError};
use crate::models::{Document, DocumentStatus, DocumentTotals, Folder, FolderNode, FolderTotals};
use crate::services::{aggregate_all, reduce_document, AliasTable};
use crate::types::{ExtractionResult, SummaryExtraction};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub struct AppState {
    pub db: Mutex<Option<Db>>,
    pub aliases: AliasTable,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        AppState {
            db: Mutex::new(Some(db)),
            aliases: AliasTable::default(),
        }
    }

    pub fn with_aliases(db: Db, aliases: AliasTable) -> Self {
        AppState {
            db: Mutex::new(Some(db)),
            aliases,
        }
    }
}

fn with_db<T>(state: &AppState, f: impl FnOnce(&Db) -> Result<T, AppError>) -> Result<T, AppError> {
    let guard = state.db.lock().map_err(|_| DbError::Poisoned)?;
    let db = guard.as_ref().ok_or(AppError::NotInitialised)?;
    f(db)
}

fn recompute(db: &Db, user_id: i64) -> Result<BTreeMap<i64, FolderTotals>, AppError> {
    let folders = db.list_folders(user_id)?;
    let documents = db.list_documents(user_id)?;
    let totals = aggregate_all(&folders, &documents);
    db.save_folder_totals(&totals)?;
    tracing::info!(user_id, folders = totals.len(), "recomputed folder totals");
    Ok(totals)
}

fn require_document(db: &Db, id: i64) -> Result<Document, AppError> {
    Ok(db
        .get_document(id)?
        .ok_or(DbError::NotFound { entity: "document", id })?)
}

pub fn register_document(
    state: &AppState,
    user_id: i64,
    folder_id: Option<i64>,
    file_name: &str,
) -> Result<Document, AppError> {
    with_db(state, |db| Ok(db.create_document(user_id, folder_id, file_name)?))
}

pub fn begin_scan(state: &AppState, document_id: i64) -> Result<(), AppError> {
    with_db(state, |db| Ok(db.set_document_status(document_id, &DocumentStatus::Processing)?))
}

/// Reduce a raw AI extraction to document totals, persist it, and refresh the owner's folders.
pub fn scan_document(state: &AppState, document_id: i64, raw_json: &str) -> Result<DocumentTotals, AppError> {
    with_db(state, |db| {
        let doc = require_document(db, document_id)?;
        let result = match ExtractionResult::from_json_str(raw_json) {
            Ok(result) => result,
            Err(e) => {
                db.mark_scan_failed(document_id, &format!("Invalid extraction JSON: {}", e))?;
                return Err(AppError::InvalidPayload(e));
            }
        };
        if result.is_empty() {
            db.mark_scan_failed(document_id, "Extraction returned no pages")?;
            return Err(AppError::EmptyExtraction(document_id));
        }

        let totals = reduce_document(&result, &state.aliases);
        db.save_scan_result(document_id, &result, &totals)?;
        if totals.is_empty() {
            tracing::warn!(document_id, confidence = totals.confidence, "no totals recovered; document may need a rescan");
        } else {
            tracing::info!(
                document_id,
                area = totals.total_area,
                irrigated = totals.total_irrigated_area,
                planted = totals.total_planted_area,
                "saved document totals"
            );
        }
        recompute(db, doc.user_id)?;
        Ok(totals)
    })
}

/// Persist a summary-mode scan (association list) and refresh the owner's folders.
pub fn scan_summary_document(
    state: &AppState,
    document_id: i64,
    raw_json: &str,
) -> Result<SummaryExtraction, AppError> {
    with_db(state, |db| {
        let doc = require_document(db, document_id)?;
        let summary = match SummaryExtraction::from_json_str(raw_json) {
            Ok(summary) => summary,
            Err(e) => {
                db.mark_scan_failed(document_id, &format!("Invalid summary JSON: {}", e))?;
                return Err(AppError::InvalidPayload(e));
            }
        };
        db.save_summary_scan(document_id, &summary.associations)?;
        tracing::info!(document_id, associations = summary.associations.len(), "saved summary scan");
        recompute(db, doc.user_id)?;
        Ok(summary)
    })
}

pub fn recompute_folder_totals(state: &AppState, user_id: i64) -> Result<BTreeMap<i64, FolderTotals>, AppError> {
    with_db(state, |db| recompute(db, user_id))
}

/// Folder hierarchy with the totals from the last aggregation run.
pub fn get_folder_tree(state: &AppState, user_id: i64) -> Result<Vec<FolderNode>, AppError> {
    with_db(state, |db| {
        let folders = db.list_folders(user_id)?;
        Ok(FolderNode::build_forest(&folders))
    })
}

pub fn create_folder(
    state: &AppState,
    user_id: i64,
    parent_id: Option<i64>,
    name: &str,
) -> Result<Folder, AppError> {
    with_db(state, |db| Ok(db.create_folder(user_id, parent_id, name)?))
}

pub fn rename_folder(state: &AppState, folder_id: i64, name: &str) -> Result<(), AppError> {
    with_db(state, |db| Ok(db.rename_folder(folder_id, name)?))
}

pub fn delete_folder(state: &AppState, folder_id: i64) -> Result<usize, AppError> {
    with_db(state, |db| {
        let folder = db
            .get_folder(folder_id)?
            .ok_or(DbError::NotFound { entity: "folder", id: folder_id })?;
        let removed = db.delete_folder(folder_id)?;
        recompute(db, folder.user_id)?;
        Ok(removed)
    })
}

pub fn move_document(state: &AppState, document_id: i64, folder_id: Option<i64>) -> Result<(), AppError> {
    with_db(state, |db| {
        let doc = require_document(db, document_id)?;
        db.move_document(document_id, folder_id)?;
        recompute(db, doc.user_id)?;
        Ok(())
    })
}

pub fn delete_document(state: &AppState, document_id: i64) -> Result<(), AppError> {
    with_db(state, |db| {
        let doc = require_document(db, document_id)?;
        db.delete_document(document_id)?;
        recompute(db, doc.user_id)?;
        Ok(())
    })
}
