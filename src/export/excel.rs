use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection};
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, Workbook, Worksheet};

use crate::domain::calc;
use crate::error::AppError;
use crate::reports;

pub fn export_year(conn: &Connection, year: i32, path: &Path) -> Result<(), AppError> {
  let mut workbook = Workbook::new();
  write_year_sheet(&mut workbook, conn, year)?;
  for month in 1..=12 {
    write_month_sheet(&mut workbook, conn, year, month)?;
  }
  write_stock_sheet(&mut workbook, conn)?;
  workbook
    .save(path)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;
  Ok(())
}

pub fn export_month(conn: &Connection, year: i32, month: i32, path: &Path) -> Result<(), AppError> {
  let mut workbook = Workbook::new();
  write_month_sheet(&mut workbook, conn, year, month)?;
  workbook
    .save(path)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;
  Ok(())
}

pub fn export_range(
  conn: &Connection,
  year: i32,
  month_from: i32,
  month_to: i32,
  path: &Path,
) -> Result<(), AppError> {
  let mut workbook = Workbook::new();
  let kpis = reports::get_range_kpis(conn, year, month_from, month_to)?;
  write_kpi_sheet(
    &mut workbook,
    "ZEITRAUM",
    &format!("Zeitraum {year} {month_from:02}-{month_to:02}"),
    &kpis,
  )?;
  for month in month_from..=month_to {
    write_month_sheet(&mut workbook, conn, year, month)?;
  }
  workbook
    .save(path)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;
  Ok(())
}

fn write_year_sheet(workbook: &mut Workbook, conn: &Connection, year: i32) -> Result<(), AppError> {
  let kpis = reports::get_period_kpis(conn, year, None)?;
  write_kpi_sheet(workbook, "JAHR", &format!("Jahresuebersicht {year}"), &kpis)
}

fn write_kpi_sheet(
  workbook: &mut Workbook,
  sheet_name: &str,
  title: &str,
  kpis: &crate::models::PeriodKpis,
) -> Result<(), AppError> {
  let sheet = workbook.add_worksheet();
  sheet
    .set_name(sheet_name)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;

  let header = Format::new()
    .set_bold()
    .set_font_color(Color::White)
    .set_background_color(Color::RGB(0x1A2433));
  let label = Format::new().set_bold();
  let money = Format::new().set_num_format("[$EUR] #,##0.00");
  let count = Format::new().set_num_format("0");

  sheet.merge_range(0, 0, 0, 3, title, &header)?;

  let money_rows = vec![
    ("Einkauf Total", kpis.purchase_total),
    ("Kosten Total", kpis.cost_total),
    ("Verkauf Total", kpis.sale_total),
    ("USt. Total", kpis.vat_total),
    ("Gewinn Total", kpis.profit_total),
    ("Gewinn nach USt.", kpis.net_profit_total),
    ("Gebundenes Kapital", kpis.stock_capital),
  ];
  let count_rows = vec![
    ("Verkaufte Geraete", kpis.sold_count),
    ("Auf Lager", kpis.stock_count),
    ("In Reparatur", kpis.repair_count),
  ];

  let mut row = 2;
  for (label_text, value) in count_rows {
    sheet.write_string_with_format(row, 0, label_text, &label)?;
    sheet.write_number_with_format(row, 1, value as f64, &count)?;
    row += 1;
  }
  for (label_text, value) in money_rows {
    sheet.write_string_with_format(row, 0, label_text, &label)?;
    sheet.write_number_with_format(row, 1, value, &money)?;
    row += 1;
  }

  sheet.set_column_width(0, 28)?;
  sheet.set_column_width(1, 18)?;
  Ok(())
}

fn write_month_sheet(workbook: &mut Workbook, conn: &Connection, year: i32, month: i32) -> Result<(), AppError> {
  let month_name = match month {
    1 => "JAN",
    2 => "FEB",
    3 => "MAR",
    4 => "APR",
    5 => "MAI",
    6 => "JUN",
    7 => "JUL",
    8 => "AUG",
    9 => "SEP",
    10 => "OKT",
    11 => "NOV",
    12 => "DEZ",
    _ => "MON",
  };

  let mut sheet = workbook.add_worksheet();
  sheet
    .set_name(month_name)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;

  let header = Format::new()
    .set_bold()
    .set_background_color(Color::RGB(0xE2E8F0))
    .set_align(FormatAlign::Center);
  let title = Format::new().set_bold().set_font_size(14.0);
  let money = Format::new().set_num_format("[$EUR] #,##0.00");
  let date_format = Format::new().set_num_format("dd.mm.yyyy");

  sheet.write_string_with_format(0, 0, &format!("{month_name} {year}"), &title)?;

  let headers = [
    "Geraete-ID",
    "Modell",
    "Verkaeufer",
    "Kaufdatum",
    "Verkaufsdatum",
    "Einkauf",
    "Kosten Total",
    "Verkauf",
    "Marge",
    "USt.",
    "Gewinn",
    "Gewinn nach USt.",
    "Besteuerung",
  ];
  for (idx, label) in headers.iter().enumerate() {
    sheet.write_string_with_format(2, idx as u16, *label, &header)?;
  }

  let mut row = 3;
  let mut totals = [0.0_f64; 7];
  for device in reports::sold_devices(conn, year, Some(month))? {
    let result = calc::calculate(&device);
    sheet.write_string(row, 0, &device.device_id)?;
    sheet.write_string(row, 1, &device.model)?;
    sheet.write_string(row, 2, &device.seller_name)?;
    write_date(&mut sheet, row, 3, &device.purchase_date, &date_format)?;
    if let Some(sale_date) = &device.sale_date {
      write_date(&mut sheet, row, 4, sale_date, &date_format)?;
    }
    let sale_price = device.sale_price.unwrap_or(0.0);
    sheet.write_number_with_format(row, 5, device.purchase_price, &money)?;
    sheet.write_number_with_format(row, 6, result.total_costs, &money)?;
    sheet.write_number_with_format(row, 7, sale_price, &money)?;
    sheet.write_number_with_format(row, 8, result.taxable_margin, &money)?;
    sheet.write_number_with_format(row, 9, result.vat, &money)?;
    sheet.write_number_with_format(row, 10, result.actual_profit, &money)?;
    sheet.write_number_with_format(row, 11, result.net_profit, &money)?;
    sheet.write_string(row, 12, if device.differential_tax { "Differenz" } else { "Regel" })?;
    for (idx, value) in [
      device.purchase_price,
      result.total_costs,
      sale_price,
      result.taxable_margin,
      result.vat,
      result.actual_profit,
      result.net_profit,
    ]
    .into_iter()
    .enumerate()
    {
      totals[idx] += value;
    }
    row += 1;
  }

  if row > 3 {
    let total_label = Format::new().set_bold();
    let total_money = Format::new().set_bold().set_num_format("[$EUR] #,##0.00");
    sheet.write_string_with_format(row, 0, "Total", &total_label)?;
    for (idx, value) in totals.into_iter().enumerate() {
      sheet.write_number_with_format(row, (idx + 5) as u16, calc::round2(value), &total_money)?;
    }
  }

  sheet.set_column_width(0, 14)?;
  sheet.set_column_width(1, 22)?;
  sheet.set_column_width(2, 18)?;
  sheet.set_column_width(3, 12)?;
  sheet.set_column_width(4, 14)?;
  for col in 5..=11 {
    sheet.set_column_width(col, 14)?;
  }
  sheet.set_column_width(12, 12)?;

  if row > 3 {
    sheet.autofilter(2, 0, row - 1, 12)?;
  }
  sheet.set_freeze_panes(3, 0)?;
  Ok(())
}

fn write_stock_sheet(workbook: &mut Workbook, conn: &Connection) -> Result<(), AppError> {
  let mut sheet = workbook.add_worksheet();
  sheet
    .set_name("BESTAND")
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;

  let header = Format::new()
    .set_bold()
    .set_background_color(Color::RGB(0xE2E8F0))
    .set_align(FormatAlign::Center);
  let title = Format::new().set_bold().set_font_size(14.0);
  let money = Format::new().set_num_format("[$EUR] #,##0.00");
  let date_format = Format::new().set_num_format("dd.mm.yyyy");

  sheet.write_string_with_format(0, 0, "Bestand und Reparatur", &title)?;

  let headers = [
    "Geraete-ID",
    "Modell",
    "Status",
    "Kaufdatum",
    "Einkauf",
    "Reparatur",
    "Versand ein",
    "Gebundenes Kapital",
    "Maengel",
  ];
  for (idx, label) in headers.iter().enumerate() {
    sheet.write_string_with_format(2, idx as u16, *label, &header)?;
  }

  let mut stmt = conn.prepare(
    "SELECT device_id, model, status, purchase_date, purchase_price, repair_cost, shipping_in, defect_notes
     FROM devices WHERE status IN ('STOCK', 'REPAIR')
     ORDER BY purchase_date, device_id",
  )?;
  let rows = stmt.query_map(params![], |row| {
    Ok((
      row.get::<_, String>(0)?,
      row.get::<_, String>(1)?,
      row.get::<_, String>(2)?,
      row.get::<_, String>(3)?,
      row.get::<_, f64>(4)?,
      row.get::<_, f64>(5)?,
      row.get::<_, f64>(6)?,
      row.get::<_, Option<String>>(7)?,
    ))
  })?;

  let mut row = 3;
  for item in rows {
    let (device_id, model, status, purchase_date, purchase_price, repair_cost, shipping_in, notes) = item?;
    sheet.write_string(row, 0, &device_id)?;
    sheet.write_string(row, 1, &model)?;
    sheet.write_string(row, 2, &status)?;
    write_date(&mut sheet, row, 3, &purchase_date, &date_format)?;
    sheet.write_number_with_format(row, 4, purchase_price, &money)?;
    sheet.write_number_with_format(row, 5, repair_cost, &money)?;
    sheet.write_number_with_format(row, 6, shipping_in, &money)?;
    sheet.write_number_with_format(row, 7, purchase_price + repair_cost + shipping_in, &money)?;
    sheet.write_string(row, 8, notes.as_deref().unwrap_or(""))?;
    row += 1;
  }

  sheet.set_column_width(0, 14)?;
  sheet.set_column_width(1, 22)?;
  sheet.set_column_width(2, 10)?;
  sheet.set_column_width(3, 12)?;
  for col in 4..=7 {
    sheet.set_column_width(col, 14)?;
  }
  sheet.set_column_width(8, 30)?;

  if row > 3 {
    sheet.autofilter(2, 0, row - 1, 8)?;
  }
  sheet.set_freeze_panes(3, 0)?;
  Ok(())
}

fn write_date(sheet: &mut Worksheet, row: u32, col: u16, date: &str, format: &Format) -> Result<(), AppError> {
  let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
    .map_err(|_| AppError::new("INVALID_DATE", "Ungueltiges Datum"))?;
  let year = u16::try_from(parsed.year()).map_err(|_| AppError::new("INVALID_DATE", "Ungueltiges Datum"))?;
  let date = ExcelDateTime::from_ymd(year, parsed.month() as u8, parsed.day() as u8)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;
  sheet.write_datetime_with_format(row, col, &date, format)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::open_test_db;

  #[test]
  fn year_export_writes_a_workbook() {
    let conn = open_test_db();
    conn
      .execute(
        "INSERT INTO devices (device_id, model, status, purchase_date, purchase_price,
           sale_price, sale_date, seller_name, differential_tax, created_at, updated_at)
         VALUES ('A', 'iPhone 12', 'SOLD', '2025-01-10', 1000.0, 1190.0, '2025-04-15', 'Max', 1, '', '')",
        [],
      )
      .expect("insert");

    let tmp = std::env::temp_dir().join(format!("handyflip_xlsx_{}.xlsx", std::process::id()));
    export_year(&conn, 2025, &tmp).expect("export");
    assert!(tmp.exists());
    assert!(std::fs::metadata(&tmp).expect("meta").len() > 0);
    std::fs::remove_file(&tmp).ok();
  }
}
