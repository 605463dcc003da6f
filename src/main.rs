#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod audit;
mod commands;
mod db;
mod domain;
mod error;
mod export;
mod files;
mod models;
mod pdf;
mod reports;
mod settings;

use std::path::PathBuf;

use db::Db;

pub struct AppState {
  pub db: Db,
  pub app_dir: PathBuf,
  pub file_base: PathBuf,
}

fn main() {
  let app_dir = db::resolve_app_dir().expect("Failed to resolve app data directory");
  let (db, file_base) = db::init_db(&app_dir).expect("Failed to initialize database");

  tauri::Builder::default()
    .plugin(tauri_plugin_dialog::init())
    .manage(AppState {
      db,
      app_dir,
      file_base,
    })
    .invoke_handler(tauri::generate_handler![
      commands::get_settings,
      commands::update_settings,
      commands::get_company_profile,
      commands::save_company_profile,
      commands::create_device,
      commands::update_device,
      commands::mark_device_sold,
      commands::delete_device,
      commands::get_device,
      commands::calculate_device,
      commands::list_devices,
      commands::add_device_file,
      commands::list_device_files,
      commands::delete_device_file,
      commands::open_device_file,
      commands::read_device_file,
      commands::generate_eigenbeleg,
      commands::get_month_kpis,
      commands::get_year_kpis,
      commands::get_year_charts,
      commands::export_excel,
      commands::export_csv,
      commands::create_backup,
      commands::restore_backup,
      commands::list_audit_log,
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}
