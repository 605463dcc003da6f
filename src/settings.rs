use std::path::Path;

use chrono::Datelike;
use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::Settings;

const KEY_YEAR: &str = "current_year";
const KEY_TAXATION: &str = "default_taxation";
const KEY_FILE_BASE: &str = "file_base_folder";

pub fn ensure_defaults(conn: &Connection, file_base: &Path) -> Result<(), AppError> {
  let year = chrono::Utc::now().year();
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_YEAR, year.to_string()],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_TAXATION, "DIFFERENZ"],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_FILE_BASE, file_base.to_string_lossy().to_string()],
  )?;
  Ok(())
}

pub fn get_settings(conn: &Connection) -> Result<Settings, AppError> {
  let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
  let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

  let mut current_year = chrono::Utc::now().year();
  let mut default_taxation = "DIFFERENZ".to_string();
  let mut file_base_folder = String::new();

  for row in rows {
    let (key, value) = row?;
    match key.as_str() {
      KEY_YEAR => {
        current_year = value.parse().unwrap_or(current_year);
      }
      KEY_TAXATION => {
        default_taxation = value;
      }
      KEY_FILE_BASE => {
        file_base_folder = value;
      }
      _ => {}
    }
  }

  Ok(Settings {
    current_year,
    default_taxation,
    file_base_folder,
  })
}

pub fn update_settings(conn: &Connection, settings: &Settings) -> Result<(), AppError> {
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_YEAR, settings.current_year.to_string()],
  )?;
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_TAXATION, settings.default_taxation.clone()],
  )?;
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_FILE_BASE, settings.file_base_folder.clone()],
  )?;
  Ok(())
}
