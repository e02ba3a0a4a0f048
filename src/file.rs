// src/file.rs

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::csv::write_row;

pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(io::Error::other(format!("Path exists but is not a directory: {}", dir.display())));
    }
    if !dir.exists() { fs::create_dir_all(dir)?; }
    Ok(())
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

/// Ensure parent dir exists; create/truncate file; optionally write header.
pub fn write_rows_start(path: &Path, headers: Option<&[String]>, sep: char) -> io::Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    if let Some(h) = headers {
        write_row(&mut out, h, sep)?;
    }
    out.flush()
}

/// Append rows to an existing CSV/TSV file (must be created already).
pub fn append_rows(path: &Path, rows: &[Vec<String>], sep: char) -> io::Result<()> {
    let file = OpenOptions::new().append(true).open(path)?;
    let mut out = BufWriter::new(file);
    for row in rows {
        write_row(&mut out, row, sep)?;
    }
    out.flush()
}

/// Replace all rows of a file via temp file + rename.
pub fn rewrite_rows(path: &Path, rows: &[Vec<String>], sep: char) -> io::Result<()> {
    write_atomic(path, crate::csv::rows_to_string(rows, sep).as_bytes())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    ensure_parent(path)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

/// `Ok(None)` when the file does not exist.
pub fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(t) => Ok(Some(t)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp_dir(name: &str) -> PathBuf {
        let mut d = std::env::temp_dir();
        d.push(format!("attendance_sync_file_{name}"));
        let _ = fs::remove_dir_all(&d);
        d
    }

    #[test]
    fn start_append_and_rewrite() {
        let dir = tmp_dir("rows");
        let path = dir.join("nested").join("t.csv");
        write_rows_start(&path, Some(row!["Name", "Gender"].as_slice()), ',').unwrap();
        append_rows(&path, &[row!["Bo", "M"]], ',').unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Name,Gender\nBo,M\n");

        rewrite_rows(&path, &[row!["Name"]], ',').unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Name\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_to_missing_file_fails() {
        let dir = tmp_dir("missing");
        assert!(append_rows(&dir.join("nope.csv"), &[row!["x"]], ',').is_err());
    }

    #[test]
    fn optional_read_and_remove() {
        let dir = tmp_dir("opt");
        let path = dir.join("state.json");
        assert_eq!(read_optional(&path).unwrap(), None);
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("{}"));
        assert!(remove_if_exists(&path).unwrap());
        assert!(!remove_if_exists(&path).unwrap());
        let _ = fs::remove_dir_all(&dir);
    }
}
