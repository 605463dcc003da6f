use rusqlite::{params, Connection};

use crate::domain::calc::{self, STATUS_REPAIR, STATUS_SOLD, STATUS_STOCK};
use crate::error::AppError;
use crate::models::{Device, MonthSeriesPoint, PeriodKpis, StatusSplit, YearCharts};

pub const DEVICE_COLUMNS: &str = "id, device_id, model, storage, color, condition, status, \
purchase_date, repair_date, sale_date, shipping_date, purchase_price, repair_cost, \
shipping_in, shipping_out, sale_price, platform_fees, seller_name, differential_tax, \
defect_notes, created_at, updated_at";

pub fn map_device_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Device> {
  Ok(Device {
    id: row.get(0)?,
    device_id: row.get(1)?,
    model: row.get(2)?,
    storage: row.get(3)?,
    color: row.get(4)?,
    condition: row.get(5)?,
    status: row.get(6)?,
    purchase_date: row.get(7)?,
    repair_date: row.get(8)?,
    sale_date: row.get(9)?,
    shipping_date: row.get(10)?,
    purchase_price: row.get(11)?,
    repair_cost: row.get(12)?,
    shipping_in: row.get(13)?,
    shipping_out: row.get(14)?,
    sale_price: row.get(15)?,
    platform_fees: row.get(16)?,
    seller_name: row.get(17)?,
    differential_tax: row.get::<_, i64>(18)? != 0,
    defect_notes: row.get(19)?,
    created_at: row.get(20)?,
    updated_at: row.get(21)?,
  })
}

/// Sold devices of a period, keyed by sale_date. A month of 0 or None means
/// the whole year.
pub fn sold_devices(conn: &Connection, year: i32, month: Option<i32>) -> Result<Vec<Device>, AppError> {
  let prefix = match month {
    Some(month) if month >= 1 => format!("{year}-{month:02}%"),
    _ => format!("{year}-%"),
  };
  let mut stmt = conn.prepare(&format!(
    "SELECT {DEVICE_COLUMNS} FROM devices
     WHERE status = 'SOLD' AND sale_date LIKE ?1 AND COALESCE(sale_price, 0) > 0
     ORDER BY sale_date, device_id"
  ))?;
  let rows = stmt.query_map(params![prefix], map_device_row)?;
  let mut devices = Vec::new();
  for row in rows {
    devices.push(row?);
  }
  Ok(devices)
}

pub fn sold_devices_in_range(
  conn: &Connection,
  year: i32,
  month_from: i32,
  month_to: i32,
) -> Result<Vec<Device>, AppError> {
  let mut devices = Vec::new();
  for month in month_from..=month_to {
    devices.extend(sold_devices(conn, year, Some(month))?);
  }
  Ok(devices)
}

/// All tax figures flow through the per-device calculation so exports, the
/// dashboard and the detail view can never disagree.
pub fn get_period_kpis(conn: &Connection, year: i32, month: Option<i32>) -> Result<PeriodKpis, AppError> {
  let sold = sold_devices(conn, year, month)?;
  aggregate_kpis(conn, &sold)
}

pub fn get_range_kpis(
  conn: &Connection,
  year: i32,
  month_from: i32,
  month_to: i32,
) -> Result<PeriodKpis, AppError> {
  let sold = sold_devices_in_range(conn, year, month_from, month_to)?;
  aggregate_kpis(conn, &sold)
}

fn aggregate_kpis(conn: &Connection, sold: &[Device]) -> Result<PeriodKpis, AppError> {
  let mut purchase_total = 0.0;
  let mut cost_total = 0.0;
  let mut sale_total = 0.0;
  let mut vat_total = 0.0;
  let mut profit_total = 0.0;
  let mut net_profit_total = 0.0;

  for device in sold {
    let result = calc::calculate(device);
    purchase_total += device.purchase_price;
    cost_total += result.total_costs;
    sale_total += device.sale_price.unwrap_or(0.0);
    vat_total += result.vat;
    profit_total += result.actual_profit;
    net_profit_total += result.net_profit;
  }

  let (stock_count, repair_count, stock_capital) = conn.query_row(
    "SELECT
        COALESCE(SUM(CASE WHEN status = 'STOCK' THEN 1 ELSE 0 END), 0),
        COALESCE(SUM(CASE WHEN status = 'REPAIR' THEN 1 ELSE 0 END), 0),
        COALESCE(SUM(CASE WHEN status IN ('STOCK', 'REPAIR')
          THEN purchase_price + repair_cost + shipping_in ELSE 0 END), 0)
     FROM devices",
    [],
    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, f64>(2)?)),
  )?;

  Ok(PeriodKpis {
    sold_count: sold.len() as i64,
    purchase_total: calc::round2(purchase_total),
    cost_total: calc::round2(cost_total),
    sale_total: calc::round2(sale_total),
    vat_total: calc::round2(vat_total),
    profit_total: calc::round2(profit_total),
    net_profit_total: calc::round2(net_profit_total),
    stock_count,
    repair_count,
    stock_capital: calc::round2(stock_capital),
  })
}

pub fn get_year_charts(conn: &Connection, year: i32) -> Result<YearCharts, AppError> {
  let sold = sold_devices(conn, year, None)?;

  let mut monthly: Vec<MonthSeriesPoint> = (1..=12)
    .map(|month| MonthSeriesPoint {
      month,
      sold_count: 0,
      sale_total: 0.0,
      net_profit_total: 0.0,
    })
    .collect();

  for device in &sold {
    let Some(sale_date) = &device.sale_date else { continue };
    let Some(month) = sale_month(sale_date) else { continue };
    let result = calc::calculate(device);
    let point = &mut monthly[(month - 1) as usize];
    point.sold_count += 1;
    point.sale_total += device.sale_price.unwrap_or(0.0);
    point.net_profit_total += result.net_profit;
  }
  for point in &mut monthly {
    point.sale_total = calc::round2(point.sale_total);
    point.net_profit_total = calc::round2(point.net_profit_total);
  }

  let mut statuses = Vec::new();
  for status in [STATUS_STOCK, STATUS_REPAIR, STATUS_SOLD] {
    let count: i64 = conn.query_row(
      "SELECT COUNT(*) FROM devices WHERE status = ?1",
      params![status],
      |row| row.get(0),
    )?;
    statuses.push(StatusSplit {
      status: status.to_string(),
      count,
    });
  }

  Ok(YearCharts { monthly, statuses })
}

fn sale_month(sale_date: &str) -> Option<i32> {
  sale_date
    .get(5..7)
    .and_then(|m| m.parse::<i32>().ok())
    .filter(|m| (1..=12).contains(m))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::open_test_db;

  fn insert_device(
    conn: &Connection,
    device_id: &str,
    status: &str,
    purchase_price: f64,
    sale_price: Option<f64>,
    sale_date: Option<&str>,
    differential: bool,
  ) {
    conn
      .execute(
        "INSERT INTO devices (device_id, model, status, purchase_date, purchase_price,
           sale_price, sale_date, seller_name, differential_tax, created_at, updated_at)
         VALUES (?1, 'iPhone 12', ?2, '2025-01-10', ?3, ?4, ?5, 'Max', ?6, '', '')",
        params![device_id, status, purchase_price, sale_price, sale_date, differential as i64],
      )
      .expect("insert");
  }

  #[test]
  fn month_kpis_only_count_sales_of_that_month() {
    let conn = open_test_db();
    insert_device(&conn, "A", "SOLD", 1000.0, Some(1190.0), Some("2025-04-15"), true);
    insert_device(&conn, "B", "SOLD", 500.0, Some(600.0), Some("2025-05-02"), true);
    insert_device(&conn, "C", "STOCK", 250.0, None, None, true);

    let april = get_period_kpis(&conn, 2025, Some(4)).expect("kpis");
    assert_eq!(april.sold_count, 1);
    assert_eq!(april.sale_total, 1190.0);
    assert_eq!(april.vat_total, 30.35);
    assert_eq!(april.net_profit_total, 159.65);
    assert_eq!(april.stock_count, 1);
    assert_eq!(april.stock_capital, 250.0);
  }

  #[test]
  fn year_kpis_aggregate_all_sold_devices() {
    let conn = open_test_db();
    insert_device(&conn, "A", "SOLD", 1000.0, Some(1190.0), Some("2025-04-15"), true);
    insert_device(&conn, "B", "SOLD", 500.0, Some(400.0), Some("2025-06-01"), true);

    let year = get_period_kpis(&conn, 2025, None).expect("kpis");
    assert_eq!(year.sold_count, 2);
    assert_eq!(year.sale_total, 1590.0);
    // Loss sale carries no VAT, only the margin sale does.
    assert_eq!(year.vat_total, 30.35);
    assert_eq!(year.profit_total, 90.0);
  }

  #[test]
  fn sold_without_positive_price_is_excluded() {
    let conn = open_test_db();
    insert_device(&conn, "A", "SOLD", 100.0, Some(0.0), Some("2025-04-15"), true);
    let kpis = get_period_kpis(&conn, 2025, None).expect("kpis");
    assert_eq!(kpis.sold_count, 0);
  }

  #[test]
  fn charts_bucket_sales_by_month_and_split_statuses() {
    let conn = open_test_db();
    insert_device(&conn, "A", "SOLD", 1000.0, Some(1190.0), Some("2025-04-15"), true);
    insert_device(&conn, "B", "SOLD", 100.0, Some(220.0), Some("2025-04-20"), true);
    insert_device(&conn, "C", "REPAIR", 80.0, None, None, true);

    let charts = get_year_charts(&conn, 2025).expect("charts");
    assert_eq!(charts.monthly.len(), 12);
    let april = &charts.monthly[3];
    assert_eq!(april.sold_count, 2);
    assert_eq!(april.sale_total, 1410.0);
    assert!(charts.monthly[0].sold_count == 0);

    let sold_split = charts.statuses.iter().find(|s| s.status == "SOLD").expect("split");
    assert_eq!(sold_split.count, 2);
  }
}
