use std::{fs, path::PathBuf};

use rusqlite::{Connection, ErrorCode};
use tauri::{AppHandle, Manager};
use thiserror::Error;
use tracing::{debug, info};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer held the database lock past the busy timeout.
    /// Retryable; the operation was not applied.
    #[error("database is busy, please try again")]
    Busy(#[source] rusqlite::Error),
    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("app data directory unavailable: {0}")]
    DataDir(#[from] tauri::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => StoreError::Busy(err),
            _ => StoreError::Sqlite(err),
        }
    }
}

const DB_FILE: &str = "tasbeeh_tracker.db";

fn db_path(app: &AppHandle) -> StoreResult<PathBuf> {
    let data_dir = app.path().app_data_dir()?;
    fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join(DB_FILE))
}

fn open_connection(app: &AppHandle) -> StoreResult<Connection> {
    let conn = Connection::open(db_path(app)?)?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// Open the application database and bring its schema up to date. Called
/// once at startup; the returned connection lives for the whole process.
pub fn open_and_init(app: &AppHandle) -> StoreResult<Connection> {
    let path = db_path(app)?;
    let conn = open_connection(app)?;
    init_schema(&conn)?;
    info!("database ready at {}", path.display());
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS contributions (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          created_at TEXT NOT NULL,
          entered_by TEXT NOT NULL,
          category TEXT NOT NULL,
          count INTEGER NOT NULL,
          amount_pkr INTEGER NOT NULL DEFAULT 0,
          note TEXT
        );
        CREATE TABLE IF NOT EXISTS user_prefs (
          user_name TEXT PRIMARY KEY,
          reminder_time TEXT NOT NULL DEFAULT '20:00',
          reminder_text TEXT NOT NULL DEFAULT 'Take 5 minutes today for tasbeeh, zikr, or recitation.'
        );",
    )?;
    ensure_contribution_columns(conn)?;
    Ok(())
}

/// Schema steps for `contributions` tables written by older releases.
/// Each step is idempotent; they always run, in this order.
const SCHEMA_STEPS: [(&str, fn(&Connection) -> StoreResult<()>); 5] = [
    ("entered_by column", add_entered_by_column),
    ("category column", add_category_column),
    ("count column", add_count_column),
    ("amount_pkr column", add_amount_pkr_column),
    ("text defaults", normalize_text_columns),
];

pub fn ensure_contribution_columns(conn: &Connection) -> StoreResult<()> {
    for (name, step) in SCHEMA_STEPS {
        step(conn)?;
        debug!(step = name, "schema step applied");
    }
    Ok(())
}

fn add_entered_by_column(conn: &Connection) -> StoreResult<()> {
    if table_has_column(conn, "contributions", "entered_by")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE contributions ADD COLUMN entered_by TEXT", [])?;
    if table_has_column(conn, "contributions", "member")? {
        conn.execute(
            "UPDATE contributions SET entered_by = COALESCE(entered_by, member, 'Family')",
            [],
        )?;
    } else {
        conn.execute(
            "UPDATE contributions SET entered_by = COALESCE(entered_by, 'Family')",
            [],
        )?;
    }
    Ok(())
}

fn add_category_column(conn: &Connection) -> StoreResult<()> {
    if table_has_column(conn, "contributions", "category")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE contributions ADD COLUMN category TEXT", [])?;
    if table_has_column(conn, "contributions", "type")? {
        conn.execute(
            "UPDATE contributions SET category = COALESCE(category, type, 'Other Good Deeds')",
            [],
        )?;
    } else {
        conn.execute(
            "UPDATE contributions SET category = COALESCE(category, 'Other Good Deeds')",
            [],
        )?;
    }
    Ok(())
}

fn add_count_column(conn: &Connection) -> StoreResult<()> {
    if !table_has_column(conn, "contributions", "count")? {
        conn.execute(
            "ALTER TABLE contributions ADD COLUMN count INTEGER NOT NULL DEFAULT 1",
            [],
        )?;
    }
    Ok(())
}

fn add_amount_pkr_column(conn: &Connection) -> StoreResult<()> {
    if !table_has_column(conn, "contributions", "amount_pkr")? {
        conn.execute(
            "ALTER TABLE contributions ADD COLUMN amount_pkr INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

fn normalize_text_columns(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "UPDATE contributions SET entered_by = COALESCE(NULLIF(TRIM(entered_by), ''), 'Family')",
        [],
    )?;
    conn.execute(
        "UPDATE contributions SET category = COALESCE(NULLIF(TRIM(category), ''), 'Other Good Deeds')",
        [],
    )?;
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
