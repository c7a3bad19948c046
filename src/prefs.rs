use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::StoreResult;
use crate::ledger;

pub const DEFAULT_REMINDER_TIME: &str = "20:00";
pub const DEFAULT_REMINDER_TEXT: &str = "Take 5 minutes today for tasbeeh, zikr, or recitation.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderPrefs {
    pub reminder_time: String,
    pub reminder_text: String,
}

impl Default for ReminderPrefs {
    fn default() -> Self {
        Self {
            reminder_time: DEFAULT_REMINDER_TIME.to_string(),
            reminder_text: DEFAULT_REMINDER_TEXT.to_string(),
        }
    }
}

fn non_blank_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Stored preference for the user, or the defaults. Never creates a row.
pub fn get_pref(conn: &Connection, user_name: &str) -> StoreResult<ReminderPrefs> {
    let row = conn
        .query_row(
            "SELECT reminder_time, reminder_text FROM user_prefs WHERE user_name = ?1",
            [user_name],
            |row| {
                Ok(ReminderPrefs {
                    reminder_time: row.get(0)?,
                    reminder_text: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(row.unwrap_or_default())
}

pub fn save_pref(
    conn: &Connection,
    user_name: &str,
    reminder_time: &str,
    reminder_text: &str,
) -> StoreResult<ReminderPrefs> {
    let reminder_time = non_blank_or(reminder_time, DEFAULT_REMINDER_TIME);
    let reminder_text = non_blank_or(reminder_text, DEFAULT_REMINDER_TEXT);

    conn.execute(
        "INSERT INTO user_prefs (user_name, reminder_time, reminder_text)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_name) DO UPDATE SET
             reminder_time = excluded.reminder_time,
             reminder_text = excluded.reminder_text",
        params![user_name, reminder_time, reminder_text],
    )?;

    Ok(ReminderPrefs {
        reminder_time,
        reminder_text,
    })
}

/// The reminder to show on open, if nothing has been logged today.
pub fn reminder_due(conn: &Connection, user_name: &str) -> StoreResult<Option<ReminderPrefs>> {
    reminder_due_on(conn, user_name, Utc::now().date_naive())
}

pub fn reminder_due_on(
    conn: &Connection,
    user_name: &str,
    today: NaiveDate,
) -> StoreResult<Option<ReminderPrefs>> {
    match ledger::last_entry_date(conn, user_name)? {
        Some(last) if last >= today => Ok(None),
        _ => Ok(Some(get_pref(conn, user_name)?)),
    }
}
