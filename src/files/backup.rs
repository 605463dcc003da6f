use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::AppError;

pub fn create_backup(
  app_dir: &Path,
  db_path: &Path,
  file_base: &Path,
  include_files: bool,
  output_path: Option<String>,
) -> Result<String, AppError> {
  let backup_dir = app_dir.join("Backups");
  fs::create_dir_all(&backup_dir)?;

  let filename = output_path.unwrap_or_else(|| {
    let stamp = Utc::now().format("%Y%m%d_%H%M");
    backup_dir
      .join(format!("backup_{stamp}.zip"))
      .to_string_lossy()
      .to_string()
  });

  if let Some(parent) = Path::new(&filename).parent() {
    fs::create_dir_all(parent)?;
  }

  let file = File::create(&filename)?;
  let mut zip = ZipWriter::new(file);
  let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

  zip.start_file("db.sqlite", options)?;
  let mut db_file = File::open(db_path)?;
  let mut buffer = Vec::new();
  db_file.read_to_end(&mut buffer)?;
  zip.write_all(&buffer)?;

  if include_files && file_base.exists() {
    for entry in WalkDir::new(file_base).into_iter().filter_map(Result::ok) {
      if entry.file_type().is_file() {
        let path = entry.path();
        let rel = path.strip_prefix(file_base).unwrap_or(path);
        let archive_name = Path::new("files").join(rel).to_string_lossy().to_string();
        zip.start_file(archive_name, options)?;
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        zip.write_all(&data)?;
      }
    }
  }

  zip.finish()?;
  Ok(filename)
}

pub fn restore_backup(
  archive_path: &str,
  db_path: &Path,
  file_base: &Path,
) -> Result<(), AppError> {
  let file = File::open(archive_path)?;
  let mut archive = ZipArchive::new(file)?;

  let temp_dir = std::env::temp_dir().join(format!("handyflip_restore_{}", Utc::now().timestamp()));
  fs::create_dir_all(&temp_dir)?;

  for i in 0..archive.len() {
    let mut file = archive.by_index(i)?;
    // Entries with ../ or absolute paths would escape the temp dir.
    let Some(rel) = file.enclosed_name() else {
      continue;
    };
    let outpath = temp_dir.join(rel);

    if file.is_dir() {
      fs::create_dir_all(&outpath)?;
    } else {
      if let Some(parent) = outpath.parent() {
        fs::create_dir_all(parent)?;
      }
      let mut outfile = File::create(&outpath)?;
      std::io::copy(&mut file, &mut outfile)?;
    }
  }

  let restored_db = temp_dir.join("db.sqlite");
  if restored_db.exists() {
    if db_path.exists() {
      let backup_path = db_path.with_extension("bak");
      fs::copy(db_path, backup_path)?;
    }
    fs::copy(restored_db, db_path)?;
  }

  let restored_files = temp_dir.join("files");
  if restored_files.exists() {
    fs::create_dir_all(file_base)?;
    for entry in WalkDir::new(&restored_files).into_iter().filter_map(Result::ok) {
      if entry.file_type().is_file() {
        let rel = entry.path().strip_prefix(&restored_files).unwrap_or(entry.path());
        let target = file_base.join(rel);
        if let Some(parent) = target.parent() {
          fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), target)?;
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backup_and_restore_round_trip() {
    let tmp = std::env::temp_dir().join(format!("handyflip_bak_{}", std::process::id()));
    let app_dir = tmp.join("app");
    let file_base = app_dir.join("Dateien");
    fs::create_dir_all(file_base.join("2025-03/IP12-001")).expect("dirs");

    let db_path = app_dir.join("handyflip.sqlite");
    fs::write(&db_path, b"sqlite-bytes").expect("db");
    fs::write(file_base.join("2025-03/IP12-001/beleg.pdf"), b"pdf-bytes").expect("file");

    let archive = create_backup(&app_dir, &db_path, &file_base, true, None).expect("backup");
    assert!(Path::new(&archive).exists());

    let restore_dir = tmp.join("restore");
    let restored_db = restore_dir.join("handyflip.sqlite");
    let restored_base = restore_dir.join("Dateien");
    fs::create_dir_all(&restore_dir).expect("restore dir");

    restore_backup(&archive, &restored_db, &restored_base).expect("restore");
    assert_eq!(fs::read(&restored_db).expect("db read"), b"sqlite-bytes");
    assert_eq!(
      fs::read(restored_base.join("2025-03/IP12-001/beleg.pdf")).expect("file read"),
      b"pdf-bytes"
    );

    fs::remove_dir_all(&tmp).ok();
  }

  #[test]
  fn restore_ignores_entries_that_point_outside_the_archive() {
    let tmp = std::env::temp_dir().join(format!("handyflip_slip_{}", std::process::id()));
    fs::create_dir_all(&tmp).expect("tmp dir");
    let escaped = std::env::temp_dir().join("evil.txt");
    fs::remove_file(&escaped).ok();

    let archive_path = tmp.join("manipuliert.zip");
    let mut zip = ZipWriter::new(File::create(&archive_path).expect("archive"));
    let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
    zip.start_file("../evil.txt", options).expect("entry");
    zip.write_all(b"ausbruch").expect("payload");
    zip.start_file("db.sqlite", options).expect("entry");
    zip.write_all(b"sqlite-bytes").expect("payload");
    zip.finish().expect("finish");

    let restored_db = tmp.join("restore/handyflip.sqlite");
    let restored_base = tmp.join("restore/Dateien");
    fs::create_dir_all(tmp.join("restore")).expect("restore dir");

    restore_backup(
      archive_path.to_str().expect("utf8"),
      &restored_db,
      &restored_base,
    )
    .expect("restore");

    assert!(!escaped.exists(), "entry escaped the extraction directory");
    assert_eq!(fs::read(&restored_db).expect("db read"), b"sqlite-bytes");

    fs::remove_dir_all(&tmp).ok();
  }

  #[test]
  fn backup_without_files_only_carries_the_db() {
    let tmp = std::env::temp_dir().join(format!("handyflip_bak_db_{}", std::process::id()));
    let app_dir = tmp.join("app");
    let file_base = app_dir.join("Dateien");
    fs::create_dir_all(&file_base).expect("dirs");
    let db_path = app_dir.join("handyflip.sqlite");
    fs::write(&db_path, b"x").expect("db");
    fs::write(file_base.join("a.txt"), b"y").expect("file");

    let archive = create_backup(&app_dir, &db_path, &file_base, false, None).expect("backup");
    let archive_file = File::open(&archive).expect("open");
    let zip = ZipArchive::new(archive_file).expect("zip");
    assert_eq!(zip.len(), 1);

    fs::remove_dir_all(&tmp).ok();
  }
}
