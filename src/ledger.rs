use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql};
use serde::Serialize;

use crate::db::{table_has_column, StoreResult};

pub const DEED_CATEGORIES: [&str; 3] = ["Zikr", "Quran Recitation / Verses", "Darood"];
pub const SADAQAH_CATEGORY: &str = "Sadaqah";

pub const DEFAULT_ENTERED_BY: &str = "Family";
pub const FALLBACK_CATEGORY: &str = "Other Good Deeds";

/// One logged act. Rows are append-only: never updated, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub id: i64,
    pub created_at: String,
    pub entered_by: String,
    pub category: String,
    pub count: i64,
    pub amount_pkr: i64,
    pub note: String,
}

fn normalize(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn add_entry(
    conn: &Connection,
    entered_by: &str,
    category: &str,
    count: i64,
    amount_pkr: i64,
    note: &str,
) -> StoreResult<Contribution> {
    let entered_by = normalize(entered_by, DEFAULT_ENTERED_BY);
    let category = normalize(category, FALLBACK_CATEGORY);
    let created_at = now_timestamp();
    let note_value: Option<String> = {
        let trimmed = note.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };

    let mut columns = vec!["created_at", "entered_by", "category", "count", "amount_pkr", "note"];
    let mut values: Vec<&dyn ToSql> = vec![
        &created_at,
        &entered_by,
        &category,
        &count,
        &amount_pkr,
        &note_value,
    ];

    // Tables migrated from older releases still carry these columns.
    if table_has_column(conn, "contributions", "member")? {
        columns.push("member");
        values.push(&entered_by);
    }
    if table_has_column(conn, "contributions", "type")? {
        columns.push("type");
        values.push(&category);
    }

    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO contributions ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    );
    conn.execute(&sql, values.as_slice())?;
    let id = conn.last_insert_rowid();

    Ok(Contribution {
        id,
        created_at,
        entered_by,
        category,
        count,
        amount_pkr,
        note: note_value.unwrap_or_default(),
    })
}

pub fn fetch_all(conn: &Connection) -> StoreResult<Vec<Contribution>> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, entered_by, category, count, amount_pkr, COALESCE(note, '')
         FROM contributions
         ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Contribution {
            id: row.get(0)?,
            created_at: row.get(1)?,
            entered_by: row.get(2)?,
            category: row.get(3)?,
            count: row.get(4)?,
            amount_pkr: row.get(5)?,
            note: row.get(6)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }

    Ok(records)
}

/// Date of the newest entry for the given contributor, if any.
pub fn last_entry_date(conn: &Connection, entered_by: &str) -> StoreResult<Option<NaiveDate>> {
    let created_at: Option<String> = conn
        .query_row(
            "SELECT created_at FROM contributions WHERE entered_by = ?1
             ORDER BY created_at DESC LIMIT 1",
            [entered_by],
            |row| row.get(0),
        )
        .optional()?;

    Ok(created_at.and_then(|ts| {
        NaiveDate::parse_from_str(ts.get(0..10).unwrap_or_default(), "%Y-%m-%d").ok()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rusqlite::{params, Connection};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory");
        crate::db::init_schema(&conn).expect("init schema");
        conn
    }

    #[test]
    fn insert_then_read_back() {
        let conn = test_conn();

        add_entry(&conn, "Family", "Zikr", 3, 0, "").expect("insert");
        let records = fetch_all(&conn).expect("fetch");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.entered_by, "Family");
        assert_eq!(record.category, "Zikr");
        assert_eq!(record.count, 3);
        assert_eq!(record.amount_pkr, 0);
        assert_eq!(record.note, "");
    }

    #[test]
    fn insert_grows_ledger_by_one() {
        let conn = test_conn();

        add_entry(&conn, "Family", "Darood", 1, 0, "").expect("first insert");
        assert_eq!(fetch_all(&conn).expect("fetch").len(), 1);

        add_entry(&conn, "Family", "Sadaqah", 1, 500, "for the mosque").expect("second insert");
        assert_eq!(fetch_all(&conn).expect("fetch").len(), 2);
    }

    #[test]
    fn blank_inputs_are_defaulted() {
        let conn = test_conn();

        let record = add_entry(&conn, "   ", "", 1, 0, "  ").expect("insert");
        assert_eq!(record.entered_by, DEFAULT_ENTERED_BY);
        assert_eq!(record.category, FALLBACK_CATEGORY);
        assert_eq!(record.note, "");

        let stored = &fetch_all(&conn).expect("fetch")[0];
        assert_eq!(stored.entered_by, DEFAULT_ENTERED_BY);
        assert_eq!(stored.category, FALLBACK_CATEGORY);
    }

    #[test]
    fn inputs_are_trimmed() {
        let conn = test_conn();

        let record = add_entry(&conn, "  Ammar ", " Zikr ", 5, 0, " evening ").expect("insert");
        assert_eq!(record.entered_by, "Ammar");
        assert_eq!(record.category, "Zikr");
        assert_eq!(record.note, "evening");
    }

    #[test]
    fn empty_note_is_stored_as_null() {
        let conn = test_conn();

        add_entry(&conn, "Family", "Zikr", 1, 0, "").expect("insert");
        let stored_note: Option<String> = conn
            .query_row("SELECT note FROM contributions", [], |row| row.get(0))
            .expect("read note");
        assert_eq!(stored_note, None);
    }

    #[test]
    fn created_at_is_a_utc_iso_timestamp() {
        let conn = test_conn();

        let record = add_entry(&conn, "Family", "Zikr", 1, 0, "").expect("insert");
        NaiveDateTime::parse_from_str(&record.created_at, "%Y-%m-%dT%H:%M:%S%.f")
            .expect("created_at parses as ISO-8601");
    }

    #[test]
    fn fetch_all_orders_newest_first() {
        let conn = test_conn();
        for (ts, count) in [
            ("2024-01-01T10:00:00", 1),
            ("2024-01-03T10:00:00", 3),
            ("2024-01-02T10:00:00", 2),
        ] {
            conn.execute(
                "INSERT INTO contributions (created_at, entered_by, category, count, amount_pkr)
                 VALUES (?1, 'Family', 'Zikr', ?2, 0)",
                params![ts, count],
            )
            .expect("insert row");
        }

        let counts: Vec<i64> = fetch_all(&conn)
            .expect("fetch")
            .iter()
            .map(|r| r.count)
            .collect();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn insert_mirrors_into_legacy_columns() {
        let conn = Connection::open_in_memory().expect("open in-memory");
        conn.execute_batch(
            "CREATE TABLE contributions (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              created_at TEXT NOT NULL,
              member TEXT,
              type TEXT,
              note TEXT
            );",
        )
        .expect("create legacy schema");
        crate::db::init_schema(&conn).expect("migrate");

        add_entry(&conn, "Ammar", "Darood", 1, 0, "").expect("insert");

        let (member, legacy_type): (String, String) = conn
            .query_row("SELECT member, type FROM contributions", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("read legacy columns");
        assert_eq!(member, "Ammar");
        assert_eq!(legacy_type, "Darood");
    }

    #[test]
    fn last_entry_date_tracks_the_newest_entry() {
        let conn = test_conn();
        assert_eq!(last_entry_date(&conn, "Family").expect("query"), None);

        conn.execute(
            "INSERT INTO contributions (created_at, entered_by, category, count, amount_pkr)
             VALUES ('2024-03-01T22:10:00', 'Family', 'Zikr', 1, 0)",
            [],
        )
        .expect("insert row");
        conn.execute(
            "INSERT INTO contributions (created_at, entered_by, category, count, amount_pkr)
             VALUES ('2024-03-04T06:00:00', 'Family', 'Darood', 1, 0)",
            [],
        )
        .expect("insert row");

        let last = last_entry_date(&conn, "Family").expect("query");
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 3, 4));

        // Other contributors do not count
        assert_eq!(last_entry_date(&conn, "Guest").expect("query"), None);
    }
}
