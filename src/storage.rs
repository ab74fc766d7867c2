// Ethernet Bundle - Record Storage
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! JSON-backed store for interface records.
//!
//! Handles:
//! - Loading the primary document, falling back to the backup and then to
//!   the factory template
//! - Saving the primary document
//! - Writing the backup copy
//!
//! Writes go to a temporary file that is renamed over the target, so a crash
//! never leaves a half-written document behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::{Error, InterfaceRecord, Result};

/// Which document the records were loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Backup,
    Factory,
}

/// Ordered collection of interface records with save/backup primitives.
#[derive(Debug)]
pub struct RecordStore {
    /// Primary document path.
    primary_file: PathBuf,
    /// Backup document path.
    backup_file: PathBuf,
    /// Factory template path.
    factory_file: PathBuf,

    records: Vec<InterfaceRecord>,
    source: LoadSource,
}

impl RecordStore {
    /// Load `<name>.json` from `data_dir`, falling back to
    /// `<name>.backup.json` and then `<name>.factory.json`.
    pub fn load_or_fail(data_dir: &Path, name: &str) -> Result<Self> {
        let primary_file = data_dir.join(format!("{}.json", name));
        let backup_file = data_dir.join(format!("{}.backup.json", name));
        let factory_file = data_dir.join(format!("{}.factory.json", name));

        let candidates = [
            (LoadSource::Primary, primary_file.as_path()),
            (LoadSource::Backup, backup_file.as_path()),
            (LoadSource::Factory, factory_file.as_path()),
        ];

        let loaded = candidates
            .into_iter()
            .filter(|(_, path)| path.exists())
            .find_map(|(source, path)| match Self::read_document(path) {
                Ok(records) => {
                    info!("Loaded {} record(s) from {:?}", records.len(), path);
                    Some((source, records))
                }
                Err(e) => {
                    warn!("Ignoring unusable document {:?}: {}", path, e);
                    None
                }
            });

        let Some((source, records)) = loaded else {
            return Err(Error::ConfigReadFailed(format!(
                "Cannot load any configuration from {:?}",
                data_dir
            )));
        };

        Ok(Self {
            primary_file,
            backup_file,
            factory_file,
            records,
            source,
        })
    }

    /// Parse a document; empty arrays are treated as unusable.
    fn read_document(path: &Path) -> Result<Vec<InterfaceRecord>> {
        let file = File::open(path)?;
        let records: Vec<InterfaceRecord> = serde_json::from_reader(BufReader::new(file))?;
        if records.is_empty() {
            return Err(Error::ConfigParseFailed("document holds no records".to_string()));
        }
        Ok(records)
    }

    /// Serialize the persisted form of `records` to `path` via a temp file.
    fn write_document(path: &Path, records: &[InterfaceRecord]) -> Result<()> {
        let persisted: Vec<InterfaceRecord> = records.iter().map(|r| r.persisted()).collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::ConfigWriteFailed(format!("{:?}: {}", parent, e)))?;
        }

        let tmp = path.with_extension("json.tmp");
        let write = || -> Result<()> {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &persisted)
                .map_err(|e| Error::ConfigWriteFailed(e.to_string()))?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| Error::ConfigWriteFailed(e.to_string()))?
                .sync_all()?;
            fs::rename(&tmp, path)?;
            Ok(())
        };

        write().map_err(|e| match e {
            Error::Io(io) => Error::ConfigWriteFailed(format!("{:?}: {}", path, io)),
            other => other,
        })
    }

    /// Write the records to the primary document.
    pub fn save(&self) -> Result<()> {
        Self::write_document(&self.primary_file, &self.records)
    }

    /// Write the records to the backup document.
    pub fn backup(&self) -> Result<()> {
        Self::write_document(&self.backup_file, &self.records)
    }

    /// Save and back up in one step.
    pub fn save_and_backup(&self) -> Result<()> {
        self.save()?;
        self.backup()
    }

    /// Where the current records came from.
    pub fn source(&self) -> LoadSource {
        self.source
    }

    /// The factory template path (informational).
    pub fn factory_file(&self) -> &Path {
        &self.factory_file
    }

    /// All records in stored order.
    pub fn records(&self) -> &[InterfaceRecord] {
        &self.records
    }

    /// Replace the whole record list.
    pub fn replace_all(&mut self, records: Vec<InterfaceRecord>) {
        self.records = records;
    }

    /// Record with the given id.
    pub fn get(&self, id: u32) -> Option<&InterfaceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Mutable record with the given id.
    pub fn get_mut(&mut self, id: u32) -> Option<&mut InterfaceRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Replace the record carrying `record.id`. Returns `false` if absent.
    pub fn replace(&mut self, record: InterfaceRecord) -> bool {
        match self.get_mut(record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Whether the store still holds only the factory template.
    pub fn needs_seeding(&self) -> bool {
        self.records.len() == 1 && self.records[0].is_template()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, value: serde_json::Value) {
        fs::write(dir.path().join(file), value.to_string()).unwrap();
    }

    fn two_records() -> serde_json::Value {
        json!([
            {"id": 1, "enable": true, "enableDhcp": false, "ip": "192.168.31.127"},
            {"id": 2, "enable": false, "enableDhcp": true}
        ])
    }

    #[test]
    fn test_load_primary() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "ethernet.json", two_records());

        let store = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();
        assert_eq!(store.source(), LoadSource::Primary);
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.get(2).map(|r| r.enable_dhcp), Some(true));
        assert!(store.get(3).is_none());
    }

    #[test]
    fn test_corrupt_primary_falls_back_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ethernet.json"), "{ not json").unwrap();
        write(&dir, "ethernet.backup.json", two_records());

        let store = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();
        assert_eq!(store.source(), LoadSource::Backup);
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn test_loaded_from_backup_saves_to_primary() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "ethernet.backup.json", two_records());

        let store = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();
        assert_eq!(store.source(), LoadSource::Backup);
        assert_eq!(store.factory_file(), dir.path().join("ethernet.factory.json"));

        store.save().unwrap();
        let reloaded = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();
        assert_eq!(reloaded.source(), LoadSource::Primary);
        assert_eq!(reloaded.records().len(), 2);
    }

    #[test]
    fn test_factory_template_needs_seeding() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "ethernet.factory.json", json!([{"enable": true, "ip": "192.168.30.127"}]));

        let store = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();
        assert_eq!(store.source(), LoadSource::Factory);
        assert!(store.needs_seeding());
    }

    #[test]
    fn test_nothing_loadable_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ethernet.json"), "[]").unwrap();
        let err = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap_err();
        assert!(matches!(err, Error::ConfigReadFailed(_)));
    }

    #[test]
    fn test_save_and_backup_strip_derived_fields() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "ethernet.json", two_records());

        let mut store = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();
        let mut record = store.get(1).cloned().unwrap();
        record.mac = Some("78:ac:c0:c1:a8:fe".into());
        record.status = Some(true);
        record.ip = Some("192.168.31.40".into());
        assert!(store.replace(record));
        store.save_and_backup().unwrap();

        let backup = fs::read_to_string(dir.path().join("ethernet.backup.json")).unwrap();
        assert!(backup.contains("192.168.31.40"));
        assert!(!backup.contains("mac"));
        assert!(!dir.path().join("ethernet.json.tmp").exists());

        fs::remove_file(dir.path().join("ethernet.json")).unwrap();
        let reloaded = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();
        assert_eq!(reloaded.source(), LoadSource::Backup);
        assert_eq!(reloaded.get(1).unwrap().ip.as_deref(), Some("192.168.31.40"));
    }

    #[test]
    fn test_replace_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "ethernet.json", two_records());
        let mut store = RecordStore::load_or_fail(dir.path(), "ethernet").unwrap();

        let mut stray = store.get(1).cloned().unwrap();
        stray.id = 7;
        assert!(!store.replace(stray));
    }
}
