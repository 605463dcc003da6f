use crate::models::{CalculationResult, Device};

pub const VAT_RATE: f64 = 19.0;

pub const STATUS_STOCK: &str = "STOCK";
pub const STATUS_REPAIR: &str = "REPAIR";
pub const STATUS_SOLD: &str = "SOLD";

/// Extracts the VAT portion from a gross amount that already includes VAT.
pub fn vat_from_gross(gross: f64) -> f64 {
  gross * (VAT_RATE / (100.0 + VAT_RATE))
}

pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

/// Derives the tax-relevant figures for one device snapshot.
///
/// Unsold devices carry no VAT; the "profit" against a zero sale price is
/// negative and left to callers to suppress. Under Differenzbesteuerung
/// (§25a UStG) VAT is extracted from the margin only, and a non-positive
/// margin yields zero VAT. Under Regelbesteuerung VAT is extracted from the
/// full sale price regardless of margin sign.
pub fn calculate(device: &Device) -> CalculationResult {
  let sale_price = device.sale_price.unwrap_or(0.0);
  let is_sold = device.status == STATUS_SOLD;

  let total_costs = round2(
    device.purchase_price
      + device.repair_cost
      + device.shipping_in
      + device.shipping_out
      + device.platform_fees,
  );
  let taxable_margin = round2(sale_price - device.purchase_price);
  let actual_profit = round2(sale_price - total_costs);

  let vat = if !is_sold {
    0.0
  } else if device.differential_tax {
    if taxable_margin > 0.0 {
      round2(vat_from_gross(taxable_margin))
    } else {
      0.0
    }
  } else {
    round2(vat_from_gross(sale_price))
  };

  CalculationResult {
    total_costs,
    taxable_margin,
    actual_profit,
    gross_profit: actual_profit,
    vat,
    net_profit: round2(actual_profit - vat),
    is_final: is_sold,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn device() -> Device {
    Device {
      id: 1,
      device_id: "IP12-001".to_string(),
      model: "iPhone 12".to_string(),
      storage: Some("128GB".to_string()),
      color: Some("Schwarz".to_string()),
      condition: Some("Gut".to_string()),
      status: STATUS_STOCK.to_string(),
      purchase_date: "2025-03-10".to_string(),
      repair_date: None,
      sale_date: None,
      shipping_date: None,
      purchase_price: 0.0,
      repair_cost: 0.0,
      shipping_in: 0.0,
      shipping_out: 0.0,
      sale_price: None,
      platform_fees: 0.0,
      seller_name: "Max Mustermann".to_string(),
      differential_tax: true,
      defect_notes: None,
      created_at: String::new(),
      updated_at: String::new(),
    }
  }

  #[test]
  fn total_costs_are_additive() {
    let mut d = device();
    d.purchase_price = 300.0;
    d.repair_cost = 45.5;
    d.shipping_in = 4.99;
    d.shipping_out = 5.49;
    d.platform_fees = 31.2;
    let result = calculate(&d);
    assert_eq!(result.total_costs, 387.18);
    assert!(result.total_costs >= d.purchase_price);
    assert!(result.total_costs >= d.repair_cost);
  }

  #[test]
  fn differential_loss_has_zero_vat() {
    let mut d = device();
    d.status = STATUS_SOLD.to_string();
    d.purchase_price = 500.0;
    d.sale_price = Some(400.0);
    d.sale_date = Some("2025-04-01".to_string());
    let result = calculate(&d);
    assert_eq!(result.taxable_margin, -100.0);
    assert_eq!(result.vat, 0.0);
    assert_eq!(result.net_profit, result.actual_profit);
  }

  #[test]
  fn differential_margin_vat_is_extracted_from_gross_margin() {
    let mut d = device();
    d.status = STATUS_SOLD.to_string();
    d.purchase_price = 1000.0;
    d.sale_price = Some(1190.0);
    d.sale_date = Some("2025-04-01".to_string());
    let result = calculate(&d);
    assert_eq!(result.taxable_margin, 190.0);
    // 190 * 19 / 119 = 30.3487... rounded to cents
    assert_eq!(result.vat, 30.35);
    assert_eq!(result.actual_profit, 190.0);
    assert_eq!(result.net_profit, 159.65);
  }

  #[test]
  fn standard_taxation_uses_full_sale_price() {
    let mut d = device();
    d.status = STATUS_SOLD.to_string();
    d.differential_tax = false;
    d.purchase_price = 1100.0;
    d.sale_price = Some(1190.0);
    d.sale_date = Some("2025-04-01".to_string());
    let result = calculate(&d);
    assert_eq!(result.vat, 190.0);
  }

  #[test]
  fn standard_taxation_ignores_margin_sign() {
    let mut d = device();
    d.status = STATUS_SOLD.to_string();
    d.differential_tax = false;
    d.purchase_price = 2000.0;
    d.sale_price = Some(1190.0);
    let result = calculate(&d);
    assert_eq!(result.taxable_margin, -810.0);
    assert_eq!(result.vat, 190.0);
  }

  #[test]
  fn unsold_device_has_no_vat_and_is_not_final() {
    let mut d = device();
    d.purchase_price = 250.0;
    d.repair_cost = 30.0;
    let result = calculate(&d);
    assert_eq!(result.vat, 0.0);
    assert!(!result.is_final);
    // Unset sale price computes against zero, yielding a negative profit.
    assert_eq!(result.actual_profit, -280.0);
    assert_eq!(result.taxable_margin, -250.0);

    d.status = STATUS_REPAIR.to_string();
    let repair = calculate(&d);
    assert_eq!(repair.vat, 0.0);
    assert!(!repair.is_final);
  }

  #[test]
  fn gross_profit_aliases_actual_profit() {
    let mut d = device();
    d.status = STATUS_SOLD.to_string();
    d.purchase_price = 100.0;
    d.platform_fees = 12.0;
    d.sale_price = Some(180.0);
    let result = calculate(&d);
    assert_eq!(result.gross_profit, result.actual_profit);
  }

  #[test]
  fn calculation_is_deterministic() {
    let mut d = device();
    d.status = STATUS_SOLD.to_string();
    d.purchase_price = 333.33;
    d.repair_cost = 17.89;
    d.sale_price = Some(489.99);
    assert_eq!(calculate(&d), calculate(&d));
  }
}
