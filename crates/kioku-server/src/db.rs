//! Authoritative project storage.
//!
//! Projects, tasks, and kanban cards live in normalized tables; block
//! content is a JSON column on the project row since the server only ever
//! reads and writes it whole (patch application happens in memory against
//! the loaded list). Saves replace child rows inside one transaction, so a
//! reconciliation is a bounded number of statements regardless of how many
//! children a project has.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use kioku_types::{
    CardId, CardPriority, Document, DocumentId, DocumentStatus, KanbanCard, Task, TaskId, UserId,
};

use crate::error::ServiceError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'active',
    favorite INTEGER NOT NULL DEFAULT 0,
    due_date INTEGER,
    content TEXT NOT NULL DEFAULT '[]',
    content_version INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner, updated_at DESC);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    text TEXT NOT NULL,
    tag TEXT,
    ord INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, ord);

CREATE TABLE IF NOT EXISTS kanban_cards (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    column_name TEXT NOT NULL,
    text TEXT NOT NULL,
    priority TEXT,
    ord INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_cards_project ON kanban_cards(project_id, column_name, ord);
"#;

/// Database handle for the reconciliation service.
pub struct ProjectDb {
    conn: Mutex<Connection>,
}

impl ProjectDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing and single-process use).
    pub fn in_memory() -> Result<Self, ServiceError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace a project and its children atomically.
    pub fn save(&self, doc: &Document) -> Result<(), ServiceError> {
        let content = serde_json::to_string(&doc.blocks)?;
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO projects
             (id, owner, title, description, status, favorite, due_date,
              content, content_version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.id.as_str(),
                doc.owner.as_str(),
                doc.title,
                doc.description,
                doc.status.as_str(),
                doc.favorite,
                doc.due_date,
                content,
                doc.content_version as i64,
                doc.created_at,
                doc.updated_at,
            ],
        )?;

        // Children are replaced wholesale; the reconciliation-by-id logic
        // runs in memory before this write.
        tx.execute(
            "DELETE FROM tasks WHERE project_id = ?1",
            params![doc.id.as_str()],
        )?;
        for task in &doc.tasks {
            tx.execute(
                "INSERT INTO tasks (id, project_id, text, tag, ord, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    task.id.as_str(),
                    doc.id.as_str(),
                    task.text,
                    task.tag,
                    task.order,
                    task.created_at,
                    task.updated_at,
                ],
            )?;
        }

        tx.execute(
            "DELETE FROM kanban_cards WHERE project_id = ?1",
            params![doc.id.as_str()],
        )?;
        for card in &doc.kanban_cards {
            tx.execute(
                "INSERT INTO kanban_cards
                 (id, project_id, column_name, text, priority, ord, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    card.id.as_str(),
                    doc.id.as_str(),
                    card.column,
                    card.text,
                    card.priority.map(|p| priority_str(p)),
                    card.order,
                    card.created_at,
                    card.updated_at,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Load one project with its children.
    pub fn load(&self, id: &DocumentId) -> Result<Option<Document>, ServiceError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, owner, title, description, status, favorite, due_date,
                        content, content_version, created_at, updated_at
                 FROM projects WHERE id = ?1",
                params![id.as_str()],
                map_project_row,
            )
            .optional()?;

        let Some(mut doc) = row else {
            return Ok(None);
        };
        doc.tasks = load_tasks(&conn, id)?;
        doc.kanban_cards = load_cards(&conn, id)?;
        Ok(Some(doc))
    }

    /// All projects for one owner, most recently updated first.
    pub fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Document>, ServiceError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, owner, title, description, status, favorite, due_date,
                    content, content_version, created_at, updated_at
             FROM projects WHERE owner = ?1 ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![owner.as_str()], map_project_row)?;

        let mut docs = Vec::new();
        for row in rows {
            let mut doc = row?;
            doc.tasks = load_tasks(&conn, &doc.id)?;
            doc.kanban_cards = load_cards(&conn, &doc.id)?;
            docs.push(doc);
        }
        Ok(docs)
    }

    /// Delete a project; cascades to children. Returns whether a row existed.
    pub fn delete(&self, id: &DocumentId) -> Result<bool, ServiceError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM projects WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(n > 0)
    }

    /// Overwrite content and version without touching other fields.
    pub fn set_content(
        &self,
        id: &DocumentId,
        blocks_json: &str,
        version: u64,
        updated_at: i64,
    ) -> Result<(), ServiceError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE projects SET content = ?2, content_version = ?3, updated_at = ?4
             WHERE id = ?1",
            params![id.as_str(), blocks_json, version as i64, updated_at],
        )?;
        Ok(())
    }
}

fn priority_str(p: CardPriority) -> &'static str {
    match p {
        CardPriority::Low => "low",
        CardPriority::Medium => "medium",
        CardPriority::High => "high",
    }
}

fn map_project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let status: String = row.get(4)?;
    let content: String = row.get(7)?;
    Ok(Document {
        id: DocumentId::from(row.get::<_, String>(0)?),
        owner: UserId::from(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        status: DocumentStatus::from_str(&status).unwrap_or_default(),
        favorite: row.get(5)?,
        due_date: row.get(6)?,
        blocks: serde_json::from_str(&content).unwrap_or_default(),
        content_version: row.get::<_, i64>(8)? as u64,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        tasks: Vec::new(),
        kanban_cards: Vec::new(),
    })
}

fn load_tasks(conn: &Connection, project: &DocumentId) -> Result<Vec<Task>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, text, tag, ord, created_at, updated_at
         FROM tasks WHERE project_id = ?1 ORDER BY ord, created_at",
    )?;
    let rows = stmt.query_map(params![project.as_str()], |row| {
        Ok(Task {
            id: TaskId::from(row.get::<_, String>(0)?),
            document_id: project.clone(),
            text: row.get(1)?,
            tag: row.get(2)?,
            order: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(ServiceError::from)
}

fn load_cards(conn: &Connection, project: &DocumentId) -> Result<Vec<KanbanCard>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, column_name, text, priority, ord, created_at, updated_at
         FROM kanban_cards WHERE project_id = ?1 ORDER BY column_name, ord, created_at",
    )?;
    let rows = stmt.query_map(params![project.as_str()], |row| {
        let priority: Option<String> = row.get(3)?;
        Ok(KanbanCard {
            id: CardId::from(row.get::<_, String>(0)?),
            document_id: project.clone(),
            column: row.get(1)?,
            text: row.get(2)?,
            priority: priority.as_deref().and_then(|s| s.parse::<CardPriority>().ok()),
            order: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(ServiceError::from)
}
