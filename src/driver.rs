//! Conversion driver: given a source path, dispatches to the CT or XLSX
//! reader and writes the sibling artifact in the opposite format
//! (`spec.md` §4.6). Each file is an independent unit of work; a failure
//! on one file does not abort a batch (`spec.md` §4.6, §5).
//!
//! Batch conversion over a directory's immediate entries runs files
//! concurrently via `rayon` (`SPEC_FULL.md` §B.4) — the codec holds no
//! shared state between files, so no synchronization is required between
//! workers (`spec.md` §5). Every write goes through a temporary sibling
//! path and is renamed into place on success, so a crash mid-write never
//! leaves a half-written file at the destination (`spec.md` §5).

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{CtError, DriverError, Result};
use crate::{ct, xlsx};

/// The outcome of converting one file (`spec.md` §4.6 "per-file result",
/// `SPEC_FULL.md` §B.5).
#[derive(Debug, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl ConversionReport {
    fn ok(input: PathBuf, output: PathBuf) -> Self {
        Self { input, output: Some(output), error: None }
    }

    fn failed(input: PathBuf, error: impl std::fmt::Display) -> Self {
        Self { input, output: None, error: Some(error.to_string()) }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Convert a single file, or every `.ct`/`.xlsx` file among a directory's
/// entries. Subdirectories are not recursed unless `recurse` is set
/// (`spec.md` §4.6).
pub fn convert_path(path: &Path, recurse: bool) -> Vec<ConversionReport> {
    if path.is_dir() {
        convert_dir(path, recurse)
    } else {
        vec![convert_file(path)]
    }
}

fn convert_dir(dir: &Path, recurse: bool) -> Vec<ConversionReport> {
    let entries = match collect_entries(dir, recurse) {
        Ok(entries) => entries,
        Err(e) => return vec![ConversionReport::failed(dir.to_path_buf(), e)],
    };

    entries.into_par_iter().map(|p| convert_file(&p)).collect()
}

fn collect_entries(dir: &Path, recurse: bool) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    for entry in fs::read_dir(dir)?.filter_map(std::result::Result::ok) {
        let p = entry.path();
        if p.is_file() && is_convertible(&p) {
            files.push(p);
        } else if recurse && p.is_dir() {
            subdirs.push(p);
        }
    }

    for subdir in subdirs {
        files.extend(collect_entries(&subdir, recurse)?);
    }

    Ok(files)
}

fn is_convertible(path: &Path) -> bool {
    matches!(lowercase_extension(path).as_deref(), Some("ct") | Some("xlsx"))
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension().and_then(OsStr::to_str).map(str::to_ascii_lowercase)
}

fn convert_file(path: &Path) -> ConversionReport {
    match try_convert(path) {
        Ok(output) => {
            info!("converted {} -> {}", path.display(), output.display());
            ConversionReport::ok(path.to_path_buf(), output)
        },
        Err(e) => {
            warn!("failed to convert {}: {e}", path.display());
            ConversionReport::failed(path.to_path_buf(), e)
        },
    }
}

fn try_convert(path: &Path) -> Result<PathBuf> {
    match lowercase_extension(path).as_deref() {
        Some("ct") => {
            let data = fs::read(path)?;
            let table = ct::read_ct(&data)?;
            let bytes = xlsx::write_xlsx(&table)?;
            let output = path.with_extension("xlsx");
            atomic_write(&output, &bytes)?;
            Ok(output)
        },
        Some("xlsx") => {
            let data = fs::read(path)?;
            let table = xlsx::read_xlsx(&data)?;
            let bytes = ct::write_ct(&table)?;
            let output = path.with_extension("ct");
            atomic_write(&output, &bytes)?;
            Ok(output)
        },
        _ => Err(CtError::Driver(DriverError::UnsupportedExtension(path.to_path_buf()))),
    }
}

/// Write to a temporary sibling path and rename into place (`spec.md` §5).
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().and_then(OsStr::to_str).unwrap_or("output").to_string();
    tmp_name.push_str(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Column, Table, TypeCode};
    use tempfile::tempdir;

    fn sample_ct_bytes() -> Vec<u8> {
        let table = Table::new(
            "2024-01-01 00:00:00".to_string(),
            vec![Column { name: "Id".to_string(), type_code: TypeCode::Dword }],
            vec![vec![Cell::Dword(1)], vec![Cell::Dword(2)]],
        )
        .unwrap();
        ct::write_ct(&table).unwrap()
    }

    #[test]
    fn ct_to_xlsx_round_trip() {
        let dir = tempdir().unwrap();
        let ct_path = dir.path().join("table.ct");
        fs::write(&ct_path, sample_ct_bytes()).unwrap();

        let reports = convert_path(&ct_path, false);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_success());

        let xlsx_path = dir.path().join("table.xlsx");
        assert!(xlsx_path.exists());

        let reports = convert_path(&xlsx_path, false);
        assert!(reports[0].is_success());
        let ct_path2 = dir.path().join("table.ct");
        assert!(ct_path2.exists());
    }

    #[test]
    fn unsupported_extension_fails_without_aborting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.txt");
        fs::write(&path, b"not a table").unwrap();

        let reports = convert_path(&path, false);
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_success());
    }

    #[test]
    fn directory_walk_converts_every_matching_file_independently() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ct"), sample_ct_bytes()).unwrap();
        fs::write(dir.path().join("b.ct"), sample_ct_bytes()).unwrap();
        fs::write(dir.path().join("ignore.txt"), b"nope").unwrap();

        let reports = convert_path(dir.path(), false);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(ConversionReport::is_success));
        assert!(dir.path().join("a.xlsx").exists());
        assert!(dir.path().join("b.xlsx").exists());
    }

    #[test]
    fn subdirectories_are_not_recursed_by_default() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.ct"), sample_ct_bytes()).unwrap();
        fs::write(sub.join("b.ct"), sample_ct_bytes()).unwrap();

        let reports = convert_path(dir.path(), false);
        assert_eq!(reports.len(), 1);
        assert!(!sub.join("b.xlsx").exists());
    }

    #[test]
    fn recurse_opts_into_subdirectories() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.ct"), sample_ct_bytes()).unwrap();
        fs::write(sub.join("b.ct"), sample_ct_bytes()).unwrap();

        let reports = convert_path(dir.path(), true);
        assert_eq!(reports.len(), 2);
        assert!(sub.join("b.xlsx").exists());
    }

    #[test]
    fn bad_checksum_reports_error_and_writes_no_output() {
        let dir = tempdir().unwrap();
        let mut bytes = sample_ct_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let ct_path = dir.path().join("corrupt.ct");
        fs::write(&ct_path, bytes).unwrap();

        let reports = convert_path(&ct_path, false);
        assert!(!reports[0].is_success());
        assert!(!dir.path().join("corrupt.xlsx").exists());
    }
}
