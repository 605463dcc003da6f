use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub fn ensure_file_base(app_dir: &Path) -> Result<PathBuf, AppError> {
  let file_dir = app_dir.join("Dateien");
  fs::create_dir_all(&file_dir)?;
  Ok(file_dir)
}

/// Attachments live under `<YYYY-MM>/<deviceId>/`, keyed by the purchase
/// month so a folder browse mirrors the buying timeline.
pub fn device_dir(file_base: &Path, purchase_date: &str, device_id: &str) -> PathBuf {
  let month = if purchase_date.len() >= 7 { &purchase_date[..7] } else { "0000-00" };
  file_base.join(month).join(device_id)
}

pub fn copy_attachment(
  source_path: &str,
  file_base: &Path,
  purchase_date: &str,
  device_id: &str,
) -> Result<(String, String, i64), AppError> {
  let source = Path::new(source_path);
  if !source.exists() {
    return Err(AppError::new("FILE_NOT_FOUND", "Datei nicht gefunden"));
  }

  let target_dir = device_dir(file_base, purchase_date, device_id);
  fs::create_dir_all(&target_dir)?;

  let original = source
    .file_name()
    .and_then(|v| v.to_str())
    .unwrap_or("datei.bin");
  let (stem, ext) = split_name(original);

  let mut candidate = target_dir.join(original);
  let mut counter = 1;
  while candidate.exists() {
    candidate = target_dir.join(format!("{stem}_{counter}.{ext}"));
    counter += 1;
  }

  fs::copy(source, &candidate)?;
  let size = fs::metadata(&candidate)?.len() as i64;
  let name = candidate
    .file_name()
    .and_then(|v| v.to_str())
    .unwrap_or(original)
    .to_string();
  Ok((candidate.to_string_lossy().to_string(), name, size))
}

/// The generated receipt replaces any previous one for the device, so the
/// name is stable and the copy overwrites.
pub fn write_eigenbeleg(
  bytes: &[u8],
  file_base: &Path,
  purchase_date: &str,
  device_id: &str,
  date_iso: &str,
) -> Result<(String, String, i64), AppError> {
  let target_dir = device_dir(file_base, purchase_date, device_id);
  fs::create_dir_all(&target_dir)?;

  let name = eigenbeleg_filename(device_id, date_iso);
  let target = target_dir.join(&name);
  fs::write(&target, bytes)?;
  Ok((target.to_string_lossy().to_string(), name, bytes.len() as i64))
}

pub fn eigenbeleg_filename(device_id: &str, date_iso: &str) -> String {
  format!("Eigenbeleg_{device_id}_{date_iso}.pdf")
}

pub fn delete_file(path: &str) -> Result<(), AppError> {
  let target = Path::new(path);
  if target.exists() {
    fs::remove_file(target)?;
  }
  Ok(())
}

pub fn delete_device_dir(file_base: &Path, purchase_date: &str, device_id: &str) -> Result<(), AppError> {
  let dir = device_dir(file_base, purchase_date, device_id);
  if dir.exists() {
    fs::remove_dir_all(dir)?;
  }
  Ok(())
}

pub fn open_file(path: &str) -> Result<(), AppError> {
  if path.trim().is_empty() {
    return Err(AppError::new("FILE_PATH_EMPTY", "Dateipfad fehlt"));
  }
  open::that(path).map_err(|err| AppError::new("FILE_OPEN", err.to_string()))?;
  Ok(())
}

pub fn read_file_base64(path: &str) -> Result<String, AppError> {
  use base64::Engine;
  let bytes = fs::read(path)?;
  Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

pub fn guess_mime(file_name: &str) -> &'static str {
  let ext = file_name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
  match ext.as_str() {
    "pdf" => "application/pdf",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "txt" => "text/plain",
    "csv" => "text/csv",
    "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    _ => "application/octet-stream",
  }
}

fn split_name(name: &str) -> (String, String) {
  match name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
    _ => (name.to_string(), "bin".to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn device_dir_is_keyed_by_purchase_month() {
    let dir = device_dir(Path::new("/base"), "2025-03-10", "IP12-001");
    assert_eq!(dir, PathBuf::from("/base/2025-03/IP12-001"));
  }

  #[test]
  fn eigenbeleg_filename_is_stable() {
    assert_eq!(
      eigenbeleg_filename("IP12-001", "2025-04-01"),
      "Eigenbeleg_IP12-001_2025-04-01.pdf"
    );
  }

  #[test]
  fn copy_attachment_keeps_existing_files() {
    let tmp = std::env::temp_dir().join(format!("handyflip_att_{}", std::process::id()));
    let base = tmp.join("Dateien");
    std::fs::create_dir_all(&tmp).expect("tmp dir");
    let source = tmp.join("quittung.txt");
    std::fs::write(&source, b"hallo").expect("source");

    let (first, name1, size) =
      copy_attachment(source.to_str().expect("utf8"), &base, "2025-03-10", "IP12-001").expect("copy");
    assert_eq!(name1, "quittung.txt");
    assert_eq!(size, 5);
    let (second, name2, _) =
      copy_attachment(source.to_str().expect("utf8"), &base, "2025-03-10", "IP12-001").expect("copy");
    assert_eq!(name2, "quittung_1.txt");
    assert_ne!(first, second);

    std::fs::remove_dir_all(&tmp).ok();
  }

  #[test]
  fn missing_source_is_an_error() {
    let result = copy_attachment("/nirgendwo/nix.pdf", Path::new("/tmp"), "2025-03-10", "X");
    assert!(result.is_err());
  }

  #[test]
  fn guesses_common_mime_types() {
    assert_eq!(guess_mime("beleg.PDF"), "application/pdf");
    assert_eq!(guess_mime("foto.jpeg"), "image/jpeg");
    assert_eq!(guess_mime("unbekannt"), "application/octet-stream");
  }
}
