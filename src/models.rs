use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
  pub current_year: i32,
  pub default_taxation: String,
  pub file_base_folder: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Device {
  pub id: i64,
  pub device_id: String,
  pub model: String,
  pub storage: Option<String>,
  pub color: Option<String>,
  pub condition: Option<String>,
  pub status: String,
  pub purchase_date: String,
  pub repair_date: Option<String>,
  pub sale_date: Option<String>,
  pub shipping_date: Option<String>,
  pub purchase_price: f64,
  pub repair_cost: f64,
  pub shipping_in: f64,
  pub shipping_out: f64,
  pub sale_price: Option<f64>,
  pub platform_fees: f64,
  pub seller_name: String,
  pub differential_tax: bool,
  pub defect_notes: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceInput {
  pub device_id: String,
  pub model: String,
  pub storage: Option<String>,
  pub color: Option<String>,
  pub condition: Option<String>,
  pub purchase_date: String,
  pub purchase_price: f64,
  pub repair_cost: Option<f64>,
  pub shipping_in: Option<f64>,
  pub shipping_out: Option<f64>,
  pub platform_fees: Option<f64>,
  pub seller_name: String,
  pub differential_tax: Option<bool>,
  pub defect_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceUpdateInput {
  pub device_id: String,
  pub model: String,
  pub storage: Option<String>,
  pub color: Option<String>,
  pub condition: Option<String>,
  pub status: String,
  pub purchase_date: String,
  pub repair_date: Option<String>,
  pub sale_date: Option<String>,
  pub shipping_date: Option<String>,
  pub purchase_price: f64,
  pub repair_cost: Option<f64>,
  pub shipping_in: Option<f64>,
  pub shipping_out: Option<f64>,
  pub sale_price: Option<f64>,
  pub platform_fees: Option<f64>,
  pub seller_name: String,
  pub differential_tax: Option<bool>,
  pub defect_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MarkSoldInput {
  pub device_id: String,
  pub sale_date: String,
  pub sale_price: f64,
  pub platform_fees: Option<f64>,
  pub shipping_out: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceFilter {
  pub status: Option<String>,
  pub search: Option<String>,
  pub page: i64,
  pub page_size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub total: i64,
  pub items: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompanyProfile {
  pub owner_name: String,
  pub street: String,
  pub postal_code: String,
  pub city: String,
  pub country: String,
  pub vat_id: Option<String>,
  pub tax_number: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub logo_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceFile {
  pub id: i64,
  pub device_id: i64,
  pub file_name: String,
  pub file_path: String,
  pub file_size: i64,
  pub mime_type: String,
  pub category: String,
  pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceFileInput {
  pub device_id: String,
  pub source_path: String,
  pub category: String,
}

/// Derived per device, never persisted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CalculationResult {
  pub total_costs: f64,
  pub taxable_margin: f64,
  pub actual_profit: f64,
  pub gross_profit: f64,
  pub vat: f64,
  pub net_profit: f64,
  pub is_final: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodKpis {
  pub sold_count: i64,
  pub purchase_total: f64,
  pub cost_total: f64,
  pub sale_total: f64,
  pub vat_total: f64,
  pub profit_total: f64,
  pub net_profit_total: f64,
  pub stock_count: i64,
  pub repair_count: i64,
  pub stock_capital: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthSeriesPoint {
  pub month: i32,
  pub sold_count: i64,
  pub sale_total: f64,
  pub net_profit_total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusSplit {
  pub status: String,
  pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct YearCharts {
  pub monthly: Vec<MonthSeriesPoint>,
  pub statuses: Vec<StatusSplit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EigenbelegRequest {
  pub device_id: String,
  pub reason: Option<String>,
  pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportRequest {
  pub year: i32,
  pub month: Option<i32>,
  pub month_from: Option<i32>,
  pub month_to: Option<i32>,
  pub output_path: Option<String>,
  pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupRequest {
  pub include_files: bool,
  pub output_path: Option<String>,
  pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreRequest {
  pub archive_path: String,
  pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogEntry {
  pub id: i64,
  pub ts: String,
  pub actor: Option<String>,
  pub action: String,
  pub entity_type: String,
  pub entity_id: Option<String>,
  pub ref_id: Option<String>,
  pub payload_json: String,
  pub details: Option<String>,
}
