use std::fs::File;
use std::io::Write;
use std::path::Path;

use rusqlite::Connection;

use crate::domain::calc;
use crate::error::AppError;
use crate::reports;

pub fn export_year_csv(conn: &Connection, year: i32, path: &Path) -> Result<(), AppError> {
  let mut file = File::create(path)?;
  writeln!(
    file,
    "device_id,model,storage,color,seller_name,purchase_date,sale_date,purchase_price,repair_cost,shipping_in,shipping_out,platform_fees,sale_price,total_costs,taxable_margin,vat,actual_profit,net_profit,taxation"
  )?;

  for device in reports::sold_devices(conn, year, None)? {
    let result = calc::calculate(&device);
    writeln!(
      file,
      "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
      escape_csv(&device.device_id),
      escape_csv(&device.model),
      escape_csv(device.storage.as_deref().unwrap_or("")),
      escape_csv(device.color.as_deref().unwrap_or("")),
      escape_csv(&device.seller_name),
      escape_csv(&device.purchase_date),
      escape_csv(device.sale_date.as_deref().unwrap_or("")),
      device.purchase_price,
      device.repair_cost,
      device.shipping_in,
      device.shipping_out,
      device.platform_fees,
      device.sale_price.unwrap_or(0.0),
      result.total_costs,
      result.taxable_margin,
      result.vat,
      result.actual_profit,
      result.net_profit,
      if device.differential_tax { "DIFFERENZ" } else { "REGEL" }
    )?;
  }

  Ok(())
}

fn escape_csv(value: &str) -> String {
  if value.contains(',') || value.contains('"') || value.contains('\n') {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::open_test_db;

  #[test]
  fn escapes_quotes_and_commas() {
    assert_eq!(escape_csv("iPhone 12"), "iPhone 12");
    assert_eq!(escape_csv("a,b"), "\"a,b\"");
    assert_eq!(escape_csv("sagt \"hi\""), "\"sagt \"\"hi\"\"\"");
  }

  #[test]
  fn year_csv_contains_calculated_columns() {
    let conn = open_test_db();
    conn
      .execute(
        "INSERT INTO devices (device_id, model, status, purchase_date, purchase_price,
           sale_price, sale_date, seller_name, differential_tax, created_at, updated_at)
         VALUES ('A', 'iPhone 12', 'SOLD', '2025-01-10', 1000.0, 1190.0, '2025-04-15', 'Max', 1, '', '')",
        [],
      )
      .expect("insert");

    let tmp = std::env::temp_dir().join(format!("handyflip_csv_{}.csv", std::process::id()));
    export_year_csv(&conn, 2025, &tmp).expect("export");
    let content = std::fs::read_to_string(&tmp).expect("read");
    assert!(content.lines().count() == 2);
    assert!(content.contains("30.35"));
    assert!(content.contains("159.65"));
    assert!(content.contains("DIFFERENZ"));
    std::fs::remove_file(&tmp).ok();
  }
}
