use chrono::NaiveDate;

use crate::domain::calc::{STATUS_REPAIR, STATUS_SOLD, STATUS_STOCK};
use crate::error::AppError;

pub const FILE_CATEGORIES: [&str; 6] = ["PAYPAL", "INVOICE", "CHAT", "EIGENBELEG", "SALES_AD", "OTHER"];

pub fn parse_date(date: &str) -> Result<NaiveDate, AppError> {
  NaiveDate::parse_from_str(date, "%Y-%m-%d")
    .map_err(|_| AppError::new("INVALID_DATE", "Datum muss YYYY-MM-DD sein"))
}

pub fn ensure_non_negative(amount: f64, field: &str) -> Result<(), AppError> {
  if amount < 0.0 || !amount.is_finite() {
    Err(AppError::new(
      "INVALID_AMOUNT",
      format!("{field} darf nicht negativ sein"),
    ))
  } else {
    Ok(())
  }
}

pub fn ensure_status(status: &str) -> Result<(), AppError> {
  if status == STATUS_STOCK || status == STATUS_REPAIR || status == STATUS_SOLD {
    Ok(())
  } else {
    Err(AppError::new(
      "INVALID_STATUS",
      "Status muss STOCK, REPAIR oder SOLD sein",
    ))
  }
}

pub fn ensure_device_id(device_id: &str) -> Result<(), AppError> {
  if device_id.trim().is_empty() {
    Err(AppError::new("INVALID_ID", "Geraete-ID fehlt"))
  } else {
    Ok(())
  }
}

pub fn ensure_file_category(category: &str) -> Result<(), AppError> {
  if FILE_CATEGORIES.contains(&category) {
    Ok(())
  } else {
    Err(AppError::new("INVALID_CATEGORY", "Unbekannte Dateikategorie"))
  }
}

/// SOLD requires a sale price and a sale date; other statuses carry no extra
/// requirements (transitions are intentionally free-form).
pub fn ensure_sold_fields(
  status: &str,
  sale_price: Option<f64>,
  sale_date: Option<&str>,
) -> Result<(), AppError> {
  if status != STATUS_SOLD {
    return Ok(());
  }
  if sale_price.is_none() {
    return Err(AppError::new("SALE_PRICE_MISSING", "Verkaufspreis fehlt"));
  }
  match sale_date {
    Some(date) if !date.trim().is_empty() => {
      parse_date(date)?;
      Ok(())
    }
    _ => Err(AppError::new("SALE_DATE_MISSING", "Verkaufsdatum fehlt")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_iso_dates_only() {
    assert!(parse_date("2025-04-01").is_ok());
    assert!(parse_date("01.04.2025").is_err());
    assert!(parse_date("").is_err());
  }

  #[test]
  fn rejects_negative_amounts() {
    assert!(ensure_non_negative(0.0, "Betrag").is_ok());
    assert!(ensure_non_negative(12.34, "Betrag").is_ok());
    assert!(ensure_non_negative(-0.01, "Betrag").is_err());
    assert!(ensure_non_negative(f64::NAN, "Betrag").is_err());
  }

  #[test]
  fn sold_requires_price_and_date() {
    assert!(ensure_sold_fields("STOCK", None, None).is_ok());
    assert!(ensure_sold_fields("SOLD", None, Some("2025-04-01")).is_err());
    assert!(ensure_sold_fields("SOLD", Some(100.0), None).is_err());
    assert!(ensure_sold_fields("SOLD", Some(100.0), Some("")).is_err());
    assert!(ensure_sold_fields("SOLD", Some(100.0), Some("2025-04-01")).is_ok());
  }

  #[test]
  fn knows_file_categories() {
    assert!(ensure_file_category("EIGENBELEG").is_ok());
    assert!(ensure_file_category("RECHNUNG").is_err());
  }
}
