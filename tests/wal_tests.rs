// Write-ahead log: record framing, replay, rotation, sync policies.

use std::io::Write;
use std::path::{Path, PathBuf};

use rildb::types::ValueType;
use rildb::wal::reader::WALReader;
use rildb::wal::writer::{WALManager, WALWriter};
use rildb::wal::{SyncPolicy, WALRecord};

fn make_record(i: usize) -> WALRecord {
    WALRecord::put(format!("key{i}").into_bytes(), format!("val{i}").into_bytes())
}

/// Helper: write N put records to a WAL file, return the path.
fn write_test_wal(dir: &tempfile::TempDir, count: usize) -> PathBuf {
    let path = dir.path().join("test.wal");
    let mut writer = WALWriter::new(&path, SyncPolicy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(&make_record(i)).unwrap();
    }
    writer.sync().unwrap();
    path
}

fn read_all(path: &Path) -> Vec<WALRecord> {
    WALReader::new(path).unwrap().iter().collect()
}

fn wal_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "wal"))
        .count()
}

// =============================================================================
// Record format
// =============================================================================
#[test]
fn encode_decode_delete_record() {
    let record = WALRecord::delete(b"key".to_vec());
    let decoded = WALRecord::decode(&record.encode()).unwrap();

    assert_eq!(decoded.record_type, ValueType::Delete);
    assert_eq!(decoded.key, b"key");
    assert!(decoded.value.is_empty());
}

#[test]
fn association_list_value_survives_framing() {
    // A whole committed association list is one record.
    let value = b"alt.test 1\nalt.test2 7\ncomp.lang.rust 99\n".to_vec();
    let record = WALRecord::put(b"<m1@example>".to_vec(), value.clone());
    let encoded = record.encode();

    assert_eq!(record.encoded_size(), encoded.len());
    assert_eq!(WALRecord::decode(&encoded).unwrap().value, value);
}

#[test]
fn corrupted_payload_detected() {
    let mut encoded = make_record(0).encode();
    encoded[10] ^= 0xFF;
    assert!(WALRecord::decode(&encoded).is_err());
}

#[test]
fn truncated_record_fails() {
    let encoded = make_record(0).encode();
    assert!(WALRecord::decode(&encoded[..encoded.len() / 2]).is_err());
}

// =============================================================================
// Reader: everything before the first damaged record is replayed
// =============================================================================
#[test]
fn read_all_records_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_wal(&dir, 5);

    let records = read_all(&path);
    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(*record, make_record(i));
    }
}

#[test]
fn truncated_last_record_yields_preceding() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_wal(&dir, 5);

    let file_len = std::fs::metadata(&path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(file_len - 3).unwrap();

    let reader = WALReader::new(&path).unwrap();
    let mut iter = reader.iter();
    let records: Vec<WALRecord> = iter.by_ref().collect();
    assert_eq!(records.len(), 4);
    assert!(iter.offset() < reader.len(), "damaged tail must be reported");
}

#[test]
fn corrupt_crc_stops_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_wal(&dir, 5);

    let offset_of_record_2: usize = (0..2).map(|i| make_record(i).encoded_size()).sum();
    let mut raw = std::fs::read(&path).unwrap();
    raw[offset_of_record_2] ^= 0x01;
    std::fs::write(&path, &raw).unwrap();

    let records = read_all(&path);
    assert_eq!(records, vec![make_record(0), make_record(1)]);
}

#[test]
fn partial_first_record_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.wal");

    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(&[0xDE, 0xAD, 0x00]).unwrap();
    file.sync_all().unwrap();

    assert!(read_all(&path).is_empty());
}

// =============================================================================
// Writer
// =============================================================================
#[test]
fn reopened_writer_appends_and_tracks_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_wal(&dir, 2);
    let existing = std::fs::metadata(&path).unwrap().len();

    let mut writer = WALWriter::new(&path, SyncPolicy::EveryWrite).unwrap();
    assert_eq!(writer.offset(), existing);

    let record = make_record(2);
    writer.append(&record).unwrap();
    assert_eq!(writer.offset(), existing + record.encoded_size() as u64);
    assert_eq!(read_all(&path).len(), 3);
}

// =============================================================================
// Sync policies
// =============================================================================
#[test]
fn every_write_syncs_after_each_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut writer = WALWriter::new(&path, SyncPolicy::EveryWrite).unwrap();

    for i in 0..3 {
        writer.append(&make_record(i)).unwrap();
        assert_eq!(writer.writes_since_sync(), 0, "should reset after every write");
    }
}

#[test]
fn every_n_writes_syncs_after_nth_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut writer = WALWriter::new(&path, SyncPolicy::EveryNWrites(3)).unwrap();

    let observed: Vec<usize> = (0..6)
        .map(|i| {
            writer.append(&make_record(i)).unwrap();
            writer.writes_since_sync()
        })
        .collect();
    assert_eq!(observed, vec![1, 2, 0, 1, 2, 0]);
}

#[test]
fn every_n_millis_defers_sync_within_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut writer = WALWriter::new(&path, SyncPolicy::EveryNMillis(60_000)).unwrap();

    writer.append(&make_record(0)).unwrap();
    writer.append(&make_record(1)).unwrap();
    assert_eq!(writer.writes_since_sync(), 2);

    // Appends reach the OS even when no fsync is due.
    assert_eq!(read_all(&path).len(), 2);
}

// =============================================================================
// Manager: numbering, rotation, deletion
// =============================================================================
#[test]
fn writes_go_to_new_wal_after_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = WALManager::new(dir.path(), SyncPolicy::EveryWrite).unwrap();
    assert_eq!(wal_count(dir.path()), 1);

    manager
        .active_writer()
        .append(&WALRecord::put(b"before".to_vec(), b"rotate".to_vec()))
        .unwrap();
    let old_path = manager.rotate().unwrap();
    manager
        .active_writer()
        .append(&WALRecord::put(b"after".to_vec(), b"rotate".to_vec()))
        .unwrap();

    assert_eq!(wal_count(dir.path()), 2);
    assert_eq!(read_all(&old_path)[0].key, b"before");
    assert_eq!(read_all(manager.active_path())[0].key, b"after");

    WALManager::delete_wal(&old_path).unwrap();
    assert!(!old_path.exists());
    assert_eq!(wal_count(dir.path()), 1);
}

#[test]
fn existing_lists_files_in_replay_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = WALManager::new(dir.path(), SyncPolicy::EveryWrite).unwrap();
    let first = manager.rotate().unwrap();
    let second = manager.rotate().unwrap();
    let active = manager.active_path().to_path_buf();
    drop(manager);

    // Stray files without a numeric stem are not WALs.
    std::fs::write(dir.path().join("notes.wal"), b"").unwrap();
    std::fs::write(dir.path().join("000099.tmp"), b"").unwrap();

    assert_eq!(WALManager::existing(dir.path()).unwrap(), vec![first, second, active.clone()]);

    // A new manager numbers its active file after the existing ones.
    let manager = WALManager::new(dir.path(), SyncPolicy::EveryWrite).unwrap();
    assert!(manager.active_path() > active.as_path());
}

#[test]
fn retired_lists_everything_older_than_active() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = WALManager::new(dir.path(), SyncPolicy::EveryWrite).unwrap();
    assert!(manager.retired().unwrap().is_empty());

    let first = manager.rotate().unwrap();
    let second = manager.rotate().unwrap();
    assert_eq!(manager.retired().unwrap(), vec![first.clone(), second]);

    WALManager::delete_wal(&first).unwrap();
    assert_eq!(manager.retired().unwrap().len(), 1);
}
