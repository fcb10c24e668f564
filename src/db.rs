use crate::error::DbError;
use crate::models::{Document, DocumentStatus, DocumentTotals, Folder, FolderTotals, SummaryAssociation};
use crate::types::{AssociationEntry, ExtractedPage, ExtractedRow, ExtractionResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

pub struct Db {
    conn: Mutex<Connection>,
}

const DOCUMENT_COLUMNS: &str = "id, user_id, folder_id, file_name, status, total_area, total_irrigated_area, \
     total_planted_area, confidence, error_message, scanned_at, created_at";

const FOLDER_COLUMNS: &str =
    "id, user_id, parent_id, name, level, total_area, total_irrigated_area, total_planted_area, created_at";

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn folder_from_row(row: &Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        parent_id: row.get(2)?,
        name: row.get(3)?,
        level: row.get(4)?,
        totals: FolderTotals::new(row.get(5)?, row.get(6)?, row.get(7)?),
        created_at: row.get(8)?,
    })
}

fn document_from_row(row: &Row) -> rusqlite::Result<Document> {
    let total_area: Option<f64> = row.get(5)?;
    let totals = total_area.map(|total_area| -> rusqlite::Result<DocumentTotals> {
        Ok(DocumentTotals {
            total_area,
            total_irrigated_area: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            total_planted_area: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
            confidence: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
        })
    });
    Ok(Document {
        id: row.get(0)?,
        user_id: row.get(1)?,
        folder_id: row.get(2)?,
        file_name: row.get(3)?,
        status: DocumentStatus::parse(&row.get::<_, String>(4)?),
        totals: totals.transpose()?,
        associations: Vec::new(),
        error_message: row.get(9)?,
        scanned_at: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn migrate(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT CURRENT_TIMESTAMP
        );
        INSERT INTO schema_version (version) SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM schema_version LIMIT 1);
        CREATE TABLE IF NOT EXISTS folders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            parent_id INTEGER REFERENCES folders(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            level INTEGER NOT NULL,
            total_area REAL NOT NULL DEFAULT 0,
            total_irrigated_area REAL NOT NULL DEFAULT 0,
            total_planted_area REAL NOT NULL DEFAULT 0,
            totals_updated_at TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            folder_id INTEGER REFERENCES folders(id) ON DELETE SET NULL,
            file_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            total_area REAL,
            total_irrigated_area REAL,
            total_planted_area REAL,
            confidence REAL,
            error_message TEXT,
            scanned_at TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS document_pages (
            document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            page_number INTEGER NOT NULL,
            table_data TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (document_id, position)
        );
        CREATE INDEX IF NOT EXISTS idx_folders_user ON folders(user_id);
        CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id);
        CREATE INDEX IF NOT EXISTS idx_documents_folder ON documents(folder_id);
        ",
    )?;

    // Migration 002: association entries for summary-mode scans (run once when version < 2)
    let current_version: i64 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |r| r.get(0))
        .unwrap_or(1);
    if current_version < 2 {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS summary_associations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                association_id TEXT NOT NULL,
                name TEXT NOT NULL,
                total_area REAL NOT NULL DEFAULT 0,
                confidence REAL NOT NULL DEFAULT 0,
                usage TEXT NOT NULL DEFAULT '',
                notice TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_summary_associations_document ON summary_associations(document_id);
            UPDATE schema_version SET version = 2;
            ",
        )?;
    }
    Ok(())
}

impl Db {
    pub fn new(db_path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        migrate(&conn)?;
        tracing::debug!(path = %db_path.display(), "opened survey database");
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // ── Folders ──

    pub fn get_folder(&self, id: i64) -> Result<Option<Folder>, DbError> {
        let conn = self.lock()?;
        let folder = conn
            .query_row(
                &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?1"),
                params![id],
                folder_from_row,
            )
            .optional()?;
        Ok(folder)
    }

    /// Create a folder under `parent_id` (or at the root), enforcing the depth cap.
    pub fn create_folder(&self, user_id: i64, parent_id: Option<i64>, name: &str) -> Result<Folder, DbError> {
        let parent = match parent_id {
            Some(pid) => {
                let parent = self
                    .get_folder(pid)?
                    .ok_or(DbError::NotFound { entity: "folder", id: pid })?;
                if parent.user_id != user_id {
                    return Err(DbError::ForeignOwner { entity: "folder", id: pid });
                }
                Some(parent)
            }
            None => None,
        };
        let level = Folder::child_level(parent.as_ref()).ok_or(DbError::FolderDepthExceeded)?;

        let created_at = now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO folders (user_id, parent_id, name, level, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, parent_id, name.trim(), level, created_at],
        )?;
        Ok(Folder {
            id: conn.last_insert_rowid(),
            user_id,
            parent_id,
            name: name.trim().to_string(),
            level,
            totals: FolderTotals::default(),
            created_at,
        })
    }

    pub fn rename_folder(&self, id: i64, name: &str) -> Result<(), DbError> {
        let conn = self.lock()?;
        let changed = conn.execute("UPDATE folders SET name = ?1 WHERE id = ?2", params![name.trim(), id])?;
        if changed == 0 {
            return Err(DbError::NotFound { entity: "folder", id });
        }
        Ok(())
    }

    pub fn list_folders(&self, user_id: i64) -> Result<Vec<Folder>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ?1 ORDER BY level, name"
        ))?;
        let folders = stmt
            .query_map(params![user_id], folder_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(folders)
    }

    /// Delete a folder and its whole subtree; documents inside move to the root.
    /// Returns the number of folders removed.
    pub fn delete_folder(&self, id: i64) -> Result<usize, DbError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let subtree = "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM folders WHERE id = ?1
                UNION SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
            )";
        tx.execute(
            &format!("{subtree} UPDATE documents SET folder_id = NULL WHERE folder_id IN (SELECT id FROM subtree)"),
            params![id],
        )?;
        let removed = tx.execute(
            &format!("{subtree} DELETE FROM folders WHERE id IN (SELECT id FROM subtree)"),
            params![id],
        )?;
        tx.commit()?;
        if removed == 0 {
            return Err(DbError::NotFound { entity: "folder", id });
        }
        Ok(removed)
    }

    /// Persist one aggregation run in a single transaction.
    pub fn save_folder_totals(&self, totals: &BTreeMap<i64, FolderTotals>) -> Result<(), DbError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let updated_at = now();
            let mut stmt = tx.prepare(
                "UPDATE folders SET total_area = ?1, total_irrigated_area = ?2, total_planted_area = ?3,
                 totals_updated_at = ?4 WHERE id = ?5",
            )?;
            for (id, t) in totals {
                stmt.execute(params![
                    t.total_area,
                    t.total_irrigated_area,
                    t.total_planted_area,
                    updated_at,
                    id
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Documents ──

    pub fn create_document(&self, user_id: i64, folder_id: Option<i64>, file_name: &str) -> Result<Document, DbError> {
        if let Some(fid) = folder_id {
            self.check_folder_owner(fid, user_id)?;
        }
        let created_at = now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (user_id, folder_id, file_name, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, folder_id, file_name, DocumentStatus::Pending.as_str(), created_at],
        )?;
        Ok(Document {
            id: conn.last_insert_rowid(),
            user_id,
            folder_id,
            file_name: file_name.to_string(),
            status: DocumentStatus::Pending,
            totals: None,
            associations: Vec::new(),
            error_message: None,
            scanned_at: None,
            created_at,
        })
    }

    fn check_folder_owner(&self, folder_id: i64, user_id: i64) -> Result<(), DbError> {
        let folder = self
            .get_folder(folder_id)?
            .ok_or(DbError::NotFound { entity: "folder", id: folder_id })?;
        if folder.user_id != user_id {
            return Err(DbError::ForeignOwner { entity: "folder", id: folder_id });
        }
        Ok(())
    }

    pub fn get_document(&self, id: i64) -> Result<Option<Document>, DbError> {
        let conn = self.lock()?;
        let doc = conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                params![id],
                document_from_row,
            )
            .optional()?;
        let Some(mut doc) = doc else {
            return Ok(None);
        };
        let mut stmt = conn.prepare(
            "SELECT association_id, name, total_area, confidence, usage, notice
             FROM summary_associations WHERE document_id = ?1 ORDER BY position",
        )?;
        doc.associations = stmt
            .query_map(params![id], |row| {
                Ok(SummaryAssociation {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    total_area: row.get(2)?,
                    confidence: row.get(3)?,
                    usage: row.get(4)?,
                    notice: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(doc))
    }

    /// Every document the user owns, with summary associations attached.
    pub fn list_documents(&self, user_id: i64) -> Result<Vec<Document>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))?;
        let mut docs = stmt
            .query_map(params![user_id], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT a.document_id, a.association_id, a.name, a.total_area, a.confidence, a.usage, a.notice
             FROM summary_associations a JOIN documents d ON d.id = a.document_id
             WHERE d.user_id = ?1 ORDER BY a.document_id, a.position",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                SummaryAssociation {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    total_area: row.get(3)?,
                    confidence: row.get(4)?,
                    usage: row.get(5)?,
                    notice: row.get(6)?,
                },
            ))
        })?;
        let mut by_doc: HashMap<i64, Vec<SummaryAssociation>> = HashMap::new();
        for row in rows {
            let (doc_id, assoc) = row?;
            by_doc.entry(doc_id).or_default().push(assoc);
        }
        for doc in &mut docs {
            if let Some(list) = by_doc.remove(&doc.id) {
                doc.associations = list;
            }
        }
        Ok(docs)
    }

    pub fn move_document(&self, id: i64, folder_id: Option<i64>) -> Result<(), DbError> {
        let doc = self
            .get_document(id)?
            .ok_or(DbError::NotFound { entity: "document", id })?;
        if let Some(fid) = folder_id {
            self.check_folder_owner(fid, doc.user_id)?;
        }
        let conn = self.lock()?;
        conn.execute("UPDATE documents SET folder_id = ?1 WHERE id = ?2", params![folder_id, id])?;
        Ok(())
    }

    pub fn delete_document(&self, id: i64) -> Result<(), DbError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(DbError::NotFound { entity: "document", id });
        }
        Ok(())
    }

    pub fn set_document_status(&self, id: i64, status: &DocumentStatus) -> Result<(), DbError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE documents SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound { entity: "document", id });
        }
        Ok(())
    }

    /// Replace the document's pages and totals with a fresh scan.
    pub fn save_scan_result(
        &self,
        id: i64,
        result: &ExtractionResult,
        totals: &DocumentTotals,
    ) -> Result<(), DbError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE documents SET status = ?1, total_area = ?2, total_irrigated_area = ?3,
             total_planted_area = ?4, confidence = ?5, error_message = NULL, scanned_at = ?6 WHERE id = ?7",
            params![
                DocumentStatus::Scanned.as_str(),
                totals.total_area,
                totals.total_irrigated_area,
                totals.total_planted_area,
                totals.confidence,
                now(),
                id
            ],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound { entity: "document", id });
        }
        tx.execute("DELETE FROM document_pages WHERE document_id = ?1", params![id])?;
        tx.execute("DELETE FROM summary_associations WHERE document_id = ?1", params![id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO document_pages (document_id, position, page_number, table_data, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, page) in result.pages.iter().enumerate() {
                let table_data = serde_json::to_string(&page.rows)?;
                stmt.execute(params![id, position as i64, page.page_number, table_data, page.summary_text])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace the document's association entries with a fresh summary-mode scan.
    pub fn save_summary_scan(&self, id: i64, associations: &[AssociationEntry]) -> Result<(), DbError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE documents SET status = ?1, total_area = NULL, total_irrigated_area = NULL,
             total_planted_area = NULL, confidence = NULL, error_message = NULL, scanned_at = ?2 WHERE id = ?3",
            params![DocumentStatus::SummaryScanned.as_str(), now(), id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound { entity: "document", id });
        }
        tx.execute("DELETE FROM summary_associations WHERE document_id = ?1", params![id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO summary_associations
                 (document_id, position, association_id, name, total_area, confidence, usage, notice)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (position, a) in associations.iter().enumerate() {
                stmt.execute(params![
                    id,
                    position as i64,
                    a.id,
                    a.name,
                    a.total_area,
                    a.confidence,
                    a.usage,
                    a.notice
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn mark_scan_failed(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE documents SET status = ?1, error_message = ?2 WHERE id = ?3",
            params![DocumentStatus::Failed.as_str(), error_message, id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound { entity: "document", id });
        }
        Ok(())
    }

    pub fn get_pages(&self, document_id: i64) -> Result<Vec<ExtractedPage>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT page_number, table_data, summary FROM document_pages WHERE document_id = ?1 ORDER BY position",
        )?;
        let raw = stmt
            .query_map(params![document_id], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut pages = Vec::with_capacity(raw.len());
        for (page_number, table_data, summary_text) in raw {
            let rows: Vec<ExtractedRow> = serde_json::from_str(&table_data)?;
            pages.push(ExtractedPage {
                page_number,
                rows,
                summary_text,
            });
        }
        Ok(pages)
    }
}
