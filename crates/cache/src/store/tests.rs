//! Tests for entry file storage

use super::*;
use std::io::Write;
use tempfile::TempDir;

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_write_then_read() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("entry");

    assert_eq!(EntryStore::write(&path, b"Hello, World!")?, 13);
    assert_eq!(EntryStore::read(&path)?, b"Hello, World!");
    assert_eq!(EntryStore::size(&path)?, 13);

    // No temporary files are left behind
    assert_eq!(dir_names(temp_dir.path()), vec!["entry".to_string()]);
    Ok(())
}

#[test]
fn test_write_replaces_existing() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("entry");

    EntryStore::write(&path, b"old content that is longer")?;
    EntryStore::write(&path, b"new")?;
    assert_eq!(EntryStore::read(&path)?, b"new");
    Ok(())
}

#[test]
fn test_read_missing_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    match EntryStore::read(&temp_dir.path().join("missing")) {
        Err(CacheError::NotFound { path }) => assert!(path.ends_with("missing")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_write_into_missing_directory_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gone").join("entry");
    assert!(matches!(
        EntryStore::write(&path, b"x"),
        Err(CacheError::Io { .. })
    ));
}

#[test]
fn test_remove_reports_absence() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("entry");
    EntryStore::write(&path, b"x")?;

    assert!(EntryStore::remove(&path)?);
    assert!(!EntryStore::remove(&path)?);
    Ok(())
}

#[test]
fn test_pending_file_appears_only_on_commit() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("streamed");

    let mut pending = PendingFile::create(&path)?;
    pending.write_all(b"part one, ").unwrap();
    pending.write_all(b"part two").unwrap();
    assert!(!path.exists());

    assert_eq!(pending.commit()?, 18);
    assert_eq!(EntryStore::read(&path)?, b"part one, part two");
    assert_eq!(dir_names(temp_dir.path()), vec!["streamed".to_string()]);
    Ok(())
}

#[test]
fn test_dropped_pending_file_leaves_nothing() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("abandoned");

    {
        let mut pending = PendingFile::create(&path)?;
        pending.write_all(b"half a value").unwrap();
        let names = dir_names(temp_dir.path());
        assert_eq!(names.len(), 1);
        assert!(EntryStore::is_temp_file_name(&names[0]));
    }

    assert!(!path.exists());
    assert!(dir_names(temp_dir.path()).is_empty());
    Ok(())
}

#[test]
fn test_patch_rewrites_prefix() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("patched");

    let mut pending = PendingFile::create(&path)?;
    pending.write_all(b"0000-body").unwrap();
    pending.patch_at(0, b"1234")?;
    pending.write_all(b"-tail").unwrap();
    pending.commit()?;

    assert_eq!(EntryStore::read(&path)?, b"1234-body-tail");
    Ok(())
}
