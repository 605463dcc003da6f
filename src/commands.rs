use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tauri::State;

use crate::audit::log::{append_audit, list_audit};
use crate::db;
use crate::domain::{calc, validation};
use crate::error::AppError;
use crate::export::{csv, excel};
use crate::files::{attachments, backup};
use crate::models::*;
use crate::pdf::eigenbeleg;
use crate::reports;
use crate::settings;
use crate::AppState;

fn fetch_device(conn: &Connection, device_id: &str) -> Result<Device, AppError> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM devices WHERE device_id = ?1",
        reports::DEVICE_COLUMNS
      ),
      params![device_id],
      reports::map_device_row,
    )
    .optional()?
    .ok_or_else(|| AppError::new("DEVICE_NOT_FOUND", "Geraet nicht gefunden"))
}

fn fetch_profile(conn: &Connection) -> Result<Option<CompanyProfile>, AppError> {
  let profile = conn
    .query_row(
      "SELECT owner_name, street, postal_code, city, country, vat_id, tax_number, email, phone, logo_path
       FROM company_profile WHERE id = 1",
      [],
      |row| {
        Ok(CompanyProfile {
          owner_name: row.get(0)?,
          street: row.get(1)?,
          postal_code: row.get(2)?,
          city: row.get(3)?,
          country: row.get(4)?,
          vat_id: row.get(5)?,
          tax_number: row.get(6)?,
          email: row.get(7)?,
          phone: row.get(8)?,
          logo_path: row.get(9)?,
        })
      },
    )
    .optional()?;
  Ok(profile)
}

fn validate_money_fields(input: &[(f64, &str)]) -> Result<(), AppError> {
  for (amount, field) in input {
    validation::ensure_non_negative(*amount, field)?;
  }
  Ok(())
}

#[tauri::command]
pub fn get_settings(state: State<AppState>) -> Result<Settings, AppError> {
  db::with_conn(&state.db, |conn| {
    let mut settings = settings::get_settings(conn)?;
    if settings.file_base_folder.trim().is_empty()
      || !PathBuf::from(&settings.file_base_folder).exists()
    {
      settings.file_base_folder = state.file_base.to_string_lossy().to_string();
    }
    Ok(settings)
  })
}

#[tauri::command]
pub fn update_settings(state: State<AppState>, settings_input: Settings, actor: Option<String>) -> Result<Settings, AppError> {
  if settings_input.default_taxation != "DIFFERENZ" && settings_input.default_taxation != "REGEL" {
    return Err(AppError::new("INVALID_TAXATION", "Besteuerung muss DIFFERENZ oder REGEL sein"));
  }
  let file_path = PathBuf::from(&settings_input.file_base_folder);
  if !settings_input.file_base_folder.trim().is_empty() {
    fs::create_dir_all(&file_path)?;
  }

  db::with_conn(&state.db, |conn| {
    settings::update_settings(conn, &settings_input)?;
    append_audit(
      conn,
      actor,
      "UPDATE_SETTINGS",
      "SETTINGS",
      None,
      None,
      serde_json::to_string(&settings_input).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;
    Ok(settings_input)
  })
}

#[tauri::command]
pub fn get_company_profile(state: State<AppState>) -> Result<Option<CompanyProfile>, AppError> {
  db::with_conn(&state.db, |conn| fetch_profile(conn))
}

#[tauri::command]
pub fn save_company_profile(state: State<AppState>, profile: CompanyProfile, actor: Option<String>) -> Result<CompanyProfile, AppError> {
  if profile.owner_name.trim().is_empty() {
    return Err(AppError::new("PROFILE_NAME_MISSING", "Inhabername fehlt"));
  }
  db::with_conn(&state.db, |conn| {
    let now = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO company_profile (id, owner_name, street, postal_code, city, country, vat_id, tax_number, email, phone, logo_path, created_at, updated_at)
       VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
       ON CONFLICT(id) DO UPDATE SET
         owner_name = ?1, street = ?2, postal_code = ?3, city = ?4, country = ?5,
         vat_id = ?6, tax_number = ?7, email = ?8, phone = ?9, logo_path = ?10, updated_at = ?11",
      params![
        profile.owner_name,
        profile.street,
        profile.postal_code,
        profile.city,
        profile.country,
        profile.vat_id,
        profile.tax_number,
        profile.email,
        profile.phone,
        profile.logo_path,
        now
      ],
    )?;
    append_audit(
      conn,
      actor,
      "UPDATE_PROFILE",
      "PROFILE",
      None,
      None,
      serde_json::to_string(&profile).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;
    Ok(profile)
  })
}

#[tauri::command]
pub fn create_device(state: State<AppState>, input: DeviceInput, actor: Option<String>) -> Result<Device, AppError> {
  let payload_json = serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_string());
  validation::ensure_device_id(&input.device_id)?;
  validation::parse_date(&input.purchase_date)?;
  validate_money_fields(&[
    (input.purchase_price, "Einkaufspreis"),
    (input.repair_cost.unwrap_or(0.0), "Reparaturkosten"),
    (input.shipping_in.unwrap_or(0.0), "Versand ein"),
    (input.shipping_out.unwrap_or(0.0), "Versand aus"),
    (input.platform_fees.unwrap_or(0.0), "Plattformgebuehren"),
  ])?;

  db::with_conn(&state.db, |conn| {
    let default_differential = settings::get_settings(conn)?.default_taxation == "DIFFERENZ";
    let differential = input.differential_tax.unwrap_or(default_differential);
    let now = Utc::now().to_rfc3339();

    let existing: i64 = conn.query_row(
      "SELECT COUNT(*) FROM devices WHERE device_id = ?1",
      params![input.device_id],
      |row| row.get(0),
    )?;
    if existing > 0 {
      return Err(AppError::new("DEVICE_ID_TAKEN", "Geraete-ID bereits vergeben"));
    }

    conn.execute(
      "INSERT INTO devices (device_id, model, storage, color, condition, status, purchase_date,
         purchase_price, repair_cost, shipping_in, shipping_out, platform_fees, seller_name,
         differential_tax, defect_notes, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5, 'STOCK', ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
      params![
        input.device_id,
        input.model,
        input.storage,
        input.color,
        input.condition,
        input.purchase_date,
        input.purchase_price,
        input.repair_cost.unwrap_or(0.0),
        input.shipping_in.unwrap_or(0.0),
        input.shipping_out.unwrap_or(0.0),
        input.platform_fees.unwrap_or(0.0),
        input.seller_name,
        differential as i64,
        input.defect_notes,
        now
      ],
    )?;

    append_audit(
      conn,
      actor,
      "DEVICE_CREATE",
      "DEVICE",
      Some(input.device_id.clone()),
      None,
      payload_json,
      None,
    )?;
    fetch_device(conn, &input.device_id)
  })
}

#[tauri::command]
pub fn update_device(state: State<AppState>, input: DeviceUpdateInput, actor: Option<String>) -> Result<Device, AppError> {
  let payload_json = serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_string());
  validation::ensure_device_id(&input.device_id)?;
  validation::ensure_status(&input.status)?;
  validation::parse_date(&input.purchase_date)?;
  for date in [&input.repair_date, &input.sale_date, &input.shipping_date] {
    if let Some(date) = date {
      validation::parse_date(date)?;
    }
  }
  if let Some(sale_price) = input.sale_price {
    validation::ensure_non_negative(sale_price, "Verkaufspreis")?;
  }
  validate_money_fields(&[
    (input.purchase_price, "Einkaufspreis"),
    (input.repair_cost.unwrap_or(0.0), "Reparaturkosten"),
    (input.shipping_in.unwrap_or(0.0), "Versand ein"),
    (input.shipping_out.unwrap_or(0.0), "Versand aus"),
    (input.platform_fees.unwrap_or(0.0), "Plattformgebuehren"),
  ])?;
  validation::ensure_sold_fields(&input.status, input.sale_price, input.sale_date.as_deref())?;

  db::with_conn(&state.db, |conn| {
    let existing = fetch_device(conn, &input.device_id)?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
      "UPDATE devices SET model = ?1, storage = ?2, color = ?3, condition = ?4, status = ?5,
         purchase_date = ?6, repair_date = ?7, sale_date = ?8, shipping_date = ?9,
         purchase_price = ?10, repair_cost = ?11, shipping_in = ?12, shipping_out = ?13,
         sale_price = ?14, platform_fees = ?15, seller_name = ?16, differential_tax = ?17,
         defect_notes = ?18, updated_at = ?19
       WHERE id = ?20",
      params![
        input.model,
        input.storage,
        input.color,
        input.condition,
        input.status,
        input.purchase_date,
        input.repair_date,
        input.sale_date,
        input.shipping_date,
        input.purchase_price,
        input.repair_cost.unwrap_or(0.0),
        input.shipping_in.unwrap_or(0.0),
        input.shipping_out.unwrap_or(0.0),
        input.sale_price,
        input.platform_fees.unwrap_or(0.0),
        input.seller_name,
        input.differential_tax.unwrap_or(existing.differential_tax) as i64,
        input.defect_notes,
        now,
        existing.id
      ],
    )?;

    append_audit(
      conn,
      actor,
      "DEVICE_UPDATE",
      "DEVICE",
      Some(input.device_id.clone()),
      None,
      payload_json,
      None,
    )?;
    fetch_device(conn, &input.device_id)
  })
}

#[tauri::command]
pub fn mark_device_sold(state: State<AppState>, input: MarkSoldInput, actor: Option<String>) -> Result<Device, AppError> {
  let payload_json = serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_string());
  validation::parse_date(&input.sale_date)?;
  validation::ensure_non_negative(input.sale_price, "Verkaufspreis")?;
  validate_money_fields(&[
    (input.platform_fees.unwrap_or(0.0), "Plattformgebuehren"),
    (input.shipping_out.unwrap_or(0.0), "Versand aus"),
  ])?;

  db::with_conn(&state.db, |conn| {
    let device = fetch_device(conn, &input.device_id)?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
      "UPDATE devices SET status = 'SOLD', sale_date = ?1, sale_price = ?2,
         platform_fees = ?3, shipping_out = ?4, updated_at = ?5
       WHERE id = ?6",
      params![
        input.sale_date,
        input.sale_price,
        input.platform_fees.unwrap_or(device.platform_fees),
        input.shipping_out.unwrap_or(device.shipping_out),
        now,
        device.id
      ],
    )?;

    append_audit(
      conn,
      actor,
      "DEVICE_SOLD",
      "DEVICE",
      Some(input.device_id.clone()),
      None,
      payload_json,
      None,
    )?;
    fetch_device(conn, &input.device_id)
  })
}

#[tauri::command]
pub fn delete_device(state: State<AppState>, device_id: String, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let device = fetch_device(conn, &device_id)?;
    attachments::delete_device_dir(&state.file_base, &device.purchase_date, &device_id)?;
    conn.execute("DELETE FROM devices WHERE id = ?1", params![device.id])?;
    append_audit(
      conn,
      actor,
      "DEVICE_DELETE",
      "DEVICE",
      Some(device_id.clone()),
      None,
      "{}".to_string(),
      None,
    )?;
    Ok(())
  })
}

#[tauri::command]
pub fn get_device(state: State<AppState>, device_id: String) -> Result<Device, AppError> {
  db::with_conn(&state.db, |conn| fetch_device(conn, &device_id))
}

#[tauri::command]
pub fn calculate_device(state: State<AppState>, device_id: String) -> Result<CalculationResult, AppError> {
  db::with_conn(&state.db, |conn| {
    let device = fetch_device(conn, &device_id)?;
    Ok(calc::calculate(&device))
  })
}

#[tauri::command]
pub fn list_devices(state: State<AppState>, filter: DeviceFilter) -> Result<Paginated<Device>, AppError> {
  if let Some(status) = &filter.status {
    validation::ensure_status(status)?;
  }
  let page = filter.page.max(1);
  let page_size = filter.page_size.clamp(1, 500);
  let search = filter
    .search
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| format!("%{s}%"));

  db::with_conn(&state.db, |conn| {
    let mut where_clauses = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    if let Some(status) = &filter.status {
      args.push(Box::new(status.clone()));
      where_clauses.push(format!("status = ?{}", args.len()));
    }
    if let Some(search) = &search {
      args.push(Box::new(search.clone()));
      let idx = args.len();
      where_clauses.push(format!(
        "(device_id LIKE ?{idx} OR model LIKE ?{idx} OR seller_name LIKE ?{idx})"
      ));
    }
    let where_sql = if where_clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", where_clauses.join(" AND "))
    };

    let total: i64 = conn.query_row(
      &format!("SELECT COUNT(*) FROM devices {where_sql}"),
      rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
      |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
      "SELECT {} FROM devices {where_sql} ORDER BY purchase_date DESC, device_id LIMIT {} OFFSET {}",
      reports::DEVICE_COLUMNS,
      page_size,
      (page - 1) * page_size
    ))?;
    let rows = stmt.query_map(
      rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
      reports::map_device_row,
    )?;
    let mut items = Vec::new();
    for row in rows {
      items.push(row?);
    }

    Ok(Paginated { total, items })
  })
}

#[tauri::command]
pub fn add_device_file(state: State<AppState>, input: DeviceFileInput, actor: Option<String>) -> Result<DeviceFile, AppError> {
  validation::ensure_file_category(&input.category)?;
  if input.category == "EIGENBELEG" {
    return Err(AppError::new(
      "EIGENBELEG_GENERATED_ONLY",
      "Eigenbelege werden ueber die Beleg-Erstellung erzeugt",
    ));
  }

  db::with_conn(&state.db, |conn| {
    let device = fetch_device(conn, &input.device_id)?;
    let (path, name, size) = attachments::copy_attachment(
      &input.source_path,
      &state.file_base,
      &device.purchase_date,
      &device.device_id,
    )?;
    let mime = attachments::guess_mime(&name);
    let now = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO device_files (device_id, file_name, file_path, file_size, mime_type, category, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      params![device.id, name, path, size, mime, input.category, now],
    )?;
    let id = conn.last_insert_rowid();

    append_audit(
      conn,
      actor,
      "FILE_ADD",
      "FILE",
      Some(device.device_id.clone()),
      Some(id.to_string()),
      serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;

    Ok(DeviceFile {
      id,
      device_id: device.id,
      file_name: name,
      file_path: path,
      file_size: size,
      mime_type: mime.to_string(),
      category: input.category.clone(),
      created_at: now,
    })
  })
}

#[tauri::command]
pub fn list_device_files(state: State<AppState>, device_id: String) -> Result<Vec<DeviceFile>, AppError> {
  db::with_conn(&state.db, |conn| {
    let device = fetch_device(conn, &device_id)?;
    let mut stmt = conn.prepare(
      "SELECT id, device_id, file_name, file_path, file_size, mime_type, category, created_at
       FROM device_files WHERE device_id = ?1 ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![device.id], |row| {
      Ok(DeviceFile {
        id: row.get(0)?,
        device_id: row.get(1)?,
        file_name: row.get(2)?,
        file_path: row.get(3)?,
        file_size: row.get(4)?,
        mime_type: row.get(5)?,
        category: row.get(6)?,
        created_at: row.get(7)?,
      })
    })?;
    let mut files = Vec::new();
    for row in rows {
      files.push(row?);
    }
    Ok(files)
  })
}

#[tauri::command]
pub fn delete_device_file(state: State<AppState>, file_id: i64, actor: Option<String>) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    let (path, device_row_id): (String, i64) = conn
      .query_row(
        "SELECT file_path, device_id FROM device_files WHERE id = ?1",
        params![file_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?
      .ok_or_else(|| AppError::new("FILE_NOT_FOUND", "Datei nicht gefunden"))?;

    attachments::delete_file(&path)?;
    conn.execute("DELETE FROM device_files WHERE id = ?1", params![file_id])?;
    append_audit(
      conn,
      actor,
      "FILE_DELETE",
      "FILE",
      Some(device_row_id.to_string()),
      Some(file_id.to_string()),
      "{}".to_string(),
      None,
    )?;
    Ok(())
  })
}

#[tauri::command]
pub fn open_device_file(state: State<AppState>, file_id: i64) -> Result<(), AppError> {
  let path = db::with_conn(&state.db, |conn| {
    conn
      .query_row(
        "SELECT file_path FROM device_files WHERE id = ?1",
        params![file_id],
        |row| row.get::<_, String>(0),
      )
      .optional()?
      .ok_or_else(|| AppError::new("FILE_NOT_FOUND", "Datei nicht gefunden"))
  })?;
  attachments::open_file(&path)
}

#[tauri::command]
pub fn read_device_file(state: State<AppState>, file_id: i64) -> Result<String, AppError> {
  let path = db::with_conn(&state.db, |conn| {
    conn
      .query_row(
        "SELECT file_path FROM device_files WHERE id = ?1",
        params![file_id],
        |row| row.get::<_, String>(0),
      )
      .optional()?
      .ok_or_else(|| AppError::new("FILE_NOT_FOUND", "Datei nicht gefunden"))
  })?;
  attachments::read_file_base64(&path)
}

#[tauri::command]
pub fn generate_eigenbeleg(state: State<AppState>, request: EigenbelegRequest, actor: Option<String>) -> Result<DeviceFile, AppError> {
  db::with_conn(&state.db, |conn| {
    let device = fetch_device(conn, &request.device_id)?;
    if device.seller_name.trim().is_empty() {
      return Err(AppError::new("SELLER_MISSING", "Verkaeufername fehlt fuer den Eigenbeleg"));
    }
    let profile = fetch_profile(conn)?
      .ok_or_else(|| AppError::new("PROFILE_MISSING", "Firmenprofil fehlt fuer den Eigenbeleg"))?;

    let bytes = eigenbeleg::render(&device, &profile, request.reason.as_deref())?;
    let date_iso = Utc::now().format("%Y-%m-%d").to_string();
    let (path, name, size) = attachments::write_eigenbeleg(
      &bytes,
      &state.file_base,
      &device.purchase_date,
      &device.device_id,
      &date_iso,
    )?;

    // One Eigenbeleg per device; a regenerated receipt replaces the row and
    // leaves the old file overwritten or orphaned under the same folder.
    if let Some((old_id, old_path)) = conn
      .query_row(
        "SELECT id, file_path FROM device_files WHERE device_id = ?1 AND category = 'EIGENBELEG'",
        params![device.id],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
      )
      .optional()?
    {
      if old_path != path {
        attachments::delete_file(&old_path)?;
      }
      conn.execute("DELETE FROM device_files WHERE id = ?1", params![old_id])?;
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO device_files (device_id, file_name, file_path, file_size, mime_type, category, created_at)
       VALUES (?1, ?2, ?3, ?4, 'application/pdf', 'EIGENBELEG', ?5)",
      params![device.id, name, path, size, now],
    )?;
    let id = conn.last_insert_rowid();

    append_audit(
      conn,
      actor,
      "EIGENBELEG_CREATE",
      "FILE",
      Some(device.device_id.clone()),
      Some(id.to_string()),
      serde_json::to_string(&request).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;

    Ok(DeviceFile {
      id,
      device_id: device.id,
      file_name: name,
      file_path: path,
      file_size: size,
      mime_type: "application/pdf".to_string(),
      category: "EIGENBELEG".to_string(),
      created_at: now,
    })
  })
}

#[tauri::command]
pub fn get_month_kpis(state: State<AppState>, year: i32, month: i32) -> Result<PeriodKpis, AppError> {
  if !(1..=12).contains(&month) {
    return Err(AppError::new("INVALID_MONTH", "Monat muss zwischen 1 und 12 liegen"));
  }
  db::with_conn(&state.db, |conn| reports::get_period_kpis(conn, year, Some(month)))
}

#[tauri::command]
pub fn get_year_kpis(state: State<AppState>, year: i32) -> Result<PeriodKpis, AppError> {
  db::with_conn(&state.db, |conn| reports::get_period_kpis(conn, year, None))
}

#[tauri::command]
pub fn get_year_charts(state: State<AppState>, year: i32) -> Result<YearCharts, AppError> {
  db::with_conn(&state.db, |conn| reports::get_year_charts(conn, year))
}

fn resolve_export_path(state: &State<AppState>, request: &ExportRequest, extension: &str) -> Result<PathBuf, AppError> {
  if let Some(output) = &request.output_path {
    if let Some(parent) = PathBuf::from(output).parent() {
      fs::create_dir_all(parent)?;
    }
    return Ok(PathBuf::from(output));
  }
  let export_dir = state.app_dir.join("Exporte");
  fs::create_dir_all(&export_dir)?;
  let name = match (request.month, request.month_from, request.month_to) {
    (Some(month), _, _) => format!("Export_{}_{:02}.{extension}", request.year, month),
    (None, Some(from), Some(to)) => {
      format!("Export_{}_{:02}-{:02}.{extension}", request.year, from, to)
    }
    _ => format!("Export_{}.{extension}", request.year),
  };
  Ok(export_dir.join(name))
}

#[tauri::command]
pub fn export_excel(state: State<AppState>, request: ExportRequest) -> Result<String, AppError> {
  for month in [request.month, request.month_from, request.month_to].into_iter().flatten() {
    if !(1..=12).contains(&month) {
      return Err(AppError::new("INVALID_MONTH", "Monat muss zwischen 1 und 12 liegen"));
    }
  }
  let path = resolve_export_path(&state, &request, "xlsx")?;
  db::with_conn(&state.db, |conn| {
    match (request.month, request.month_from, request.month_to) {
      (Some(month), _, _) => excel::export_month(conn, request.year, month, &path)?,
      (None, Some(from), Some(to)) if from <= to => {
        excel::export_range(conn, request.year, from, to, &path)?
      }
      _ => excel::export_year(conn, request.year, &path)?,
    }
    append_audit(
      conn,
      request.actor.clone(),
      "EXPORT_EXCEL",
      "EXPORT",
      None,
      None,
      serde_json::to_string(&request).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;
    Ok(path.to_string_lossy().to_string())
  })
}

#[tauri::command]
pub fn export_csv(state: State<AppState>, request: ExportRequest) -> Result<String, AppError> {
  let path = resolve_export_path(&state, &request, "csv")?;
  db::with_conn(&state.db, |conn| {
    csv::export_year_csv(conn, request.year, &path)?;
    append_audit(
      conn,
      request.actor.clone(),
      "EXPORT_CSV",
      "EXPORT",
      None,
      None,
      serde_json::to_string(&request).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;
    Ok(path.to_string_lossy().to_string())
  })
}

#[tauri::command]
pub fn create_backup(state: State<AppState>, request: BackupRequest) -> Result<String, AppError> {
  db::with_conn(&state.db, |conn| {
    db::checkpoint(conn)?;
    let archive = backup::create_backup(
      &state.app_dir,
      &state.db.db_path,
      &state.file_base,
      request.include_files,
      request.output_path.clone(),
    )?;
    append_audit(
      conn,
      request.actor.clone(),
      "BACKUP_CREATE",
      "BACKUP",
      None,
      None,
      serde_json::to_string(&request).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;
    Ok(archive)
  })
}

#[tauri::command]
pub fn restore_backup(state: State<AppState>, request: RestoreRequest) -> Result<(), AppError> {
  backup::restore_backup(&request.archive_path, &state.db.db_path, &state.file_base)?;
  db::reload_connection(&state.db)?;
  db::with_conn(&state.db, |conn| {
    append_audit(
      conn,
      request.actor.clone(),
      "BACKUP_RESTORE",
      "BACKUP",
      None,
      None,
      serde_json::to_string(&request).unwrap_or_else(|_| "{}".to_string()),
      None,
    )?;
    Ok(())
  })
}

#[tauri::command]
pub fn list_audit_log(state: State<AppState>, limit: Option<i64>) -> Result<Vec<AuditLogEntry>, AppError> {
  db::with_conn(&state.db, |conn| list_audit(conn, limit.unwrap_or(200)))
}
