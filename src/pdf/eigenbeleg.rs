use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{Image, ImageTransform, Mm};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::domain::calc;
use crate::error::AppError;
use crate::models::{CompanyProfile, Device};
use crate::pdf::layout::{BelegWriter, TextStyle, MARGIN, PAGE_WIDTH};

pub const DEFAULT_REASON: &str =
  "Kauf von privat, keine Rechnung vorhanden (Differenzbesteuerung nach \u{a7}25a UStG)";

const LEGAL_NOTE: &str = "Differenzbesteuerung nach \u{a7}25a UStG; \
ein gesonderter Umsatzsteuerausweis erfolgt nicht.";

const LOGO_WIDTH_MM: f32 = 35.0;

/// Renders the self-receipt for a private purchase without invoice.
/// The section order is fixed; only the wrapped field values and the
/// optional logo vary per device.
pub fn render(
  device: &Device,
  profile: &CompanyProfile,
  reason: Option<&str>,
) -> Result<Vec<u8>, AppError> {
  let beleg_nr = format!("EB-{}", device.device_id);
  let token = receipt_token();
  let mut writer = BelegWriter::new("Eigenbeleg")?;
  writer.set_footer(&format!(
    "Eigenbeleg {} - erstellt am {}",
    beleg_nr,
    format_date_de(&today_iso())
  ));

  draw_logo(&writer, profile);

  writer.heading("Eigenbeleg", 18.0);
  writer.text_line(&format!("Beleg-Nr. {beleg_nr}"), TextStyle::SMALL);
  writer.vertical_gap(4.0);

  writer.label_value("Datum", &format_date_de(&device.purchase_date), TextStyle::REGULAR);
  writer.label_value("Verkaeufer", &device.seller_name, TextStyle::REGULAR);
  writer.label_value("Beschreibung", &device_title(device), TextStyle::REGULAR);
  writer.label_value("", &format!("Geraete-ID: {}", device.device_id), TextStyle::SMALL);
  if let Some(condition) = &device.condition {
    writer.label_value("Zustand", condition, TextStyle::REGULAR);
  }
  if let Some(notes) = &device.defect_notes {
    if !notes.trim().is_empty() {
      writer.label_value("Maengel", notes, TextStyle::REGULAR);
    }
  }
  writer.label_value("Betrag", &format_eur(device.purchase_price), TextStyle::EMPHASIS);
  writer.label_value(
    "Enthaltene USt.",
    &format!("0,00 \u{20ac} ({}% nur auf Marge bei Verkauf)", calc::VAT_RATE as i64),
    TextStyle::SMALL,
  );
  writer.separator();

  let reason = reason
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .unwrap_or(DEFAULT_REASON);
  writer.label_value("Grund fuer Eigenbeleg", reason, TextStyle::EMPHASIS);
  writer.label_value("Hinweis", LEGAL_NOTE, TextStyle::SMALL);
  writer.separator();

  writer.label_block("Aussteller", &issuer_lines(profile));
  writer.label_value("Erstellt am", &format_date_de(&today_iso()), TextStyle::REGULAR);
  if let Some(tax_number) = &profile.tax_number {
    writer.label_value("Steuernummer", tax_number, TextStyle::REGULAR);
  }
  if let Some(vat_id) = &profile.vat_id {
    writer.label_value("USt-IdNr.", vat_id, TextStyle::REGULAR);
  }
  writer.label_value("Beleg-Code", &token, TextStyle::SMALL);

  writer.vertical_gap(6.0);
  writer.signature_line(&format!("Unterschrift {}", profile.owner_name));

  writer.finish()
}

pub fn receipt_token() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(12)
    .map(char::from)
    .collect()
}

fn issuer_lines(profile: &CompanyProfile) -> Vec<String> {
  let mut lines = vec![
    profile.owner_name.clone(),
    profile.street.clone(),
    format!("{} {}", profile.postal_code, profile.city),
  ];
  if !profile.country.trim().is_empty() {
    lines.push(profile.country.clone());
  }
  lines
}

fn device_title(device: &Device) -> String {
  let mut title = device.model.clone();
  if let Some(storage) = &device.storage {
    title.push(' ');
    title.push_str(storage);
  }
  if let Some(color) = &device.color {
    title.push(' ');
    title.push_str(color);
  }
  title
}

/// Logo failures are cosmetic and must never block receipt creation, so
/// every step short-circuits to "no logo".
fn draw_logo(writer: &BelegWriter, profile: &CompanyProfile) {
  let Some(path) = &profile.logo_path else {
    return;
  };
  let Some(image) = load_image(Path::new(path)) else {
    return;
  };
  let dpi = 300.0;
  let px_width = image.image.width.0 as f32;
  let width_mm = px_width * 25.4 / dpi;
  let scale = if width_mm > 0.0 { LOGO_WIDTH_MM / width_mm } else { 1.0 };
  image.add_to_layer(
    writer.layer(),
    ImageTransform {
      translate_x: Some(Mm(PAGE_WIDTH - MARGIN - LOGO_WIDTH_MM)),
      translate_y: Some(Mm(260.0)),
      scale_x: Some(scale),
      scale_y: Some(scale),
      dpi: Some(dpi),
      ..Default::default()
    },
  );
}

fn load_image(path: &Path) -> Option<Image> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  let file = File::open(path).ok()?;
  let reader = BufReader::new(file);
  match ext.as_str() {
    "png" => Image::try_from(PngDecoder::new(reader).ok()?).ok(),
    "jpg" | "jpeg" => Image::try_from(JpegDecoder::new(reader).ok()?).ok(),
    _ => None,
  }
}

/// "1190.00" -> "1.190,00 EUR-sign", German grouping.
pub fn format_eur(amount: f64) -> String {
  let negative = amount < 0.0;
  let cents = (amount.abs() * 100.0).round() as i64;
  let whole = cents / 100;
  let frac = cents % 100;

  let digits = whole.to_string();
  let mut grouped = String::new();
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }

  let sign = if negative { "-" } else { "" };
  format!("{sign}{grouped},{frac:02} \u{20ac}")
}

pub fn format_date_de(iso: &str) -> String {
  let parts: Vec<&str> = iso.split('-').collect();
  if parts.len() == 3 {
    format!("{}.{}.{}", parts[2], parts[1], parts[0])
  } else {
    iso.to_string()
  }
}

fn today_iso() -> String {
  chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::calc::STATUS_STOCK;

  fn profile() -> CompanyProfile {
    CompanyProfile {
      owner_name: "Max Mustermann".to_string(),
      street: "Musterstrasse 1".to_string(),
      postal_code: "50667".to_string(),
      city: "Koeln".to_string(),
      country: "Deutschland".to_string(),
      vat_id: None,
      tax_number: Some("123/456/7890".to_string()),
      email: None,
      phone: None,
      logo_path: None,
    }
  }

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
      purchase_price: 350.0,
      repair_cost: 0.0,
      shipping_in: 0.0,
      shipping_out: 0.0,
      sale_price: None,
      platform_fees: 0.0,
      seller_name: "Erika Beispiel".to_string(),
      differential_tax: true,
      defect_notes: None,
      created_at: String::new(),
      updated_at: String::new(),
    }
  }

  #[test]
  fn formats_amounts_in_german_notation() {
    assert_eq!(format_eur(0.0), "0,00 \u{20ac}");
    assert_eq!(format_eur(250.0), "250,00 \u{20ac}");
    assert_eq!(format_eur(1190.0), "1.190,00 \u{20ac}");
    assert_eq!(format_eur(1234567.5), "1.234.567,50 \u{20ac}");
    assert_eq!(format_eur(-12.3), "-12,30 \u{20ac}");
  }

  #[test]
  fn formats_dates_for_display() {
    assert_eq!(format_date_de("2025-04-01"), "01.04.2025");
    assert_eq!(format_date_de("kaputt"), "kaputt");
  }

  #[test]
  fn receipt_token_is_twelve_alphanumerics() {
    let token = receipt_token();
    assert_eq!(token.len(), 12);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
  }

  #[test]
  fn renders_a_pdf_with_default_reason() {
    let bytes = render(&device(), &profile(), None).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
    assert!(bytes.len() > 1000);
  }

  #[test]
  fn blank_reason_falls_back_to_default() {
    let bytes = render(&device(), &profile(), Some("   ")).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[test]
  fn missing_logo_file_is_skipped_silently() {
    let mut p = profile();
    p.logo_path = Some("/nirgendwo/logo.png".to_string());
    let bytes = render(&device(), &p, None).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
  }
}
