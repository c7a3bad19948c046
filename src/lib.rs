mod daily;
mod db;
mod ledger;
mod prefs;
mod summary;

use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use tauri::{Manager, State};
use tracing_subscriber::EnvFilter;

use crate::daily::{DailyCache, DailyCards};
use crate::db::StoreResult;
use crate::ledger::{Contribution, SADAQAH_CATEGORY};
use crate::prefs::ReminderPrefs;
use crate::summary::{CategoryTotal, SadaqahTotals};

/// The whole household logs under one shared name.
const USER_NAME: &str = "Family";

/// The process-wide store: one connection, opened and migrated at startup.
struct Store(Mutex<Connection>);

struct DailyState(Mutex<DailyCache>);

fn with_conn<T>(
    store: &Store,
    op: impl FnOnce(&Connection) -> StoreResult<T>,
) -> Result<T, String> {
    let conn = store
        .0
        .lock()
        .map_err(|_| "store lock poisoned".to_string())?;
    op(&conn).map_err(|err| err.to_string())
}

#[derive(Serialize)]
struct DeedsSummary {
    category_totals: Vec<CategoryTotal>,
    total_deeds: i64,
    added_today: i64,
}

#[tauri::command(rename_all = "snake_case")]
fn add_deed(store: State<'_, Store>, category: String, count: i64) -> Result<Contribution, String> {
    if count < 1 {
        return Err("count must be >= 1".to_string());
    }

    with_conn(&store, |conn| {
        ledger::add_entry(conn, USER_NAME, &category, count, 0, "")
    })
}

#[tauri::command(rename_all = "snake_case")]
fn add_sadaqah(
    store: State<'_, Store>,
    amount_pkr: i64,
    note: Option<String>,
) -> Result<Contribution, String> {
    if amount_pkr < 1 {
        return Err("amount_pkr must be >= 1".to_string());
    }

    with_conn(&store, |conn| {
        ledger::add_entry(
            conn,
            USER_NAME,
            SADAQAH_CATEGORY,
            1,
            amount_pkr,
            note.as_deref().unwrap_or(""),
        )
    })
}

#[tauri::command(rename_all = "snake_case")]
fn list_contributions(store: State<'_, Store>) -> Result<Vec<Contribution>, String> {
    with_conn(&store, ledger::fetch_all)
}

#[tauri::command(rename_all = "snake_case")]
fn deeds_summary(store: State<'_, Store>) -> Result<DeedsSummary, String> {
    let records = with_conn(&store, ledger::fetch_all)?;

    Ok(DeedsSummary {
        category_totals: summary::category_totals(&records),
        total_deeds: summary::deed_total(&records),
        added_today: summary::today_total(&records, Utc::now().date_naive()),
    })
}

#[tauri::command(rename_all = "snake_case")]
fn sadaqah_summary(store: State<'_, Store>) -> Result<SadaqahTotals, String> {
    let records = with_conn(&store, ledger::fetch_all)?;
    Ok(summary::sadaqah_totals(&records))
}

#[tauri::command(rename_all = "snake_case")]
fn get_reminder(store: State<'_, Store>) -> Result<ReminderPrefs, String> {
    with_conn(&store, |conn| prefs::get_pref(conn, USER_NAME))
}

#[tauri::command(rename_all = "snake_case")]
fn save_reminder(
    store: State<'_, Store>,
    reminder_time: String,
    reminder_text: String,
) -> Result<ReminderPrefs, String> {
    with_conn(&store, |conn| {
        prefs::save_pref(conn, USER_NAME, &reminder_time, &reminder_text)
    })
}

#[tauri::command(rename_all = "snake_case")]
fn reminder_notice(store: State<'_, Store>) -> Result<Option<ReminderPrefs>, String> {
    with_conn(&store, |conn| prefs::reminder_due(conn, USER_NAME))
}

#[tauri::command(rename_all = "snake_case")]
fn daily_cards(state: State<'_, DailyState>) -> Result<DailyCards, String> {
    let client = daily::http_client().map_err(|err| err.to_string())?;
    let mut cache = state
        .0
        .lock()
        .map_err(|_| "daily cache poisoned".to_string())?;
    Ok(cache.get_or_load(|| daily::load_cards(&client)))
}

#[tauri::command(rename_all = "snake_case")]
fn refresh_daily_cards(state: State<'_, DailyState>) -> Result<DailyCards, String> {
    let client = daily::http_client().map_err(|err| err.to_string())?;
    let mut cache = state
        .0
        .lock()
        .map_err(|_| "daily cache poisoned".to_string())?;
    Ok(cache.refresh(|| daily::load_cards(&client)))
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tasbeeh_tracker_lib=info")),
        )
        .init();

    tauri::Builder::default()
        .manage(DailyState(Mutex::new(DailyCache::default())))
        .setup(|app| {
            let conn = db::open_and_init(app.handle())?;
            app.manage(Store(Mutex::new(conn)));
            Ok(())
        })
        .plugin(tauri_plugin_opener::init())
        .invoke_handler(tauri::generate_handler![
            add_deed,
            add_sadaqah,
            list_contributions,
            deeds_summary,
            sadaqah_summary,
            get_reminder,
            save_reminder,
            reminder_notice,
            daily_cards,
            refresh_daily_cards
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
