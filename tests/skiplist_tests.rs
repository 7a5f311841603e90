// Skip list: ordered insert, lookup, tombstones, size tracking, iteration.

use rildb::iterator::StorageIterator;
use rildb::memtable::skiplist::SkipList;
use rildb::types::ValueType;

fn collect_keys(sl: &SkipList) -> Vec<Vec<u8>> {
    let mut iter = sl.iter();
    let mut keys = Vec::new();
    while iter.is_valid() {
        keys.push(iter.key().to_vec());
        iter.next().unwrap();
    }
    keys
}

// =============================================================================
// Insert and lookup
// =============================================================================
#[test]
fn insert_two_keys_out_of_order() {
    let mut sl = SkipList::new();
    sl.insert(b"b".to_vec(), b"2".to_vec());
    sl.insert(b"a".to_vec(), b"1".to_vec());

    assert_eq!(sl.get(b"a"), Some(b"1".as_slice()));
    assert_eq!(sl.get(b"b"), Some(b"2".as_slice()));
    assert_eq!(sl.get(b"z"), None);
}

#[test]
fn insert_duplicate_key_overwrites() {
    let mut sl = SkipList::new();
    sl.insert(b"key".to_vec(), b"old".to_vec());
    sl.insert(b"key".to_vec(), b"new".to_vec());

    assert_eq!(sl.get(b"key"), Some(b"new".as_slice()));
    assert_eq!(sl.len(), 1);
}

#[test]
fn insert_1000_keys_get_all_back() {
    let mut sl = SkipList::new();
    // Insert in a scrambled order so the list has to place every key.
    for i in (0..1000u32).map(|i| (i * 617) % 1000) {
        sl.insert(format!("key_{i:05}").into_bytes(), format!("val_{i}").into_bytes());
    }

    assert_eq!(sl.len(), 1000);
    for i in 0..1000u32 {
        let key = format!("key_{i:05}").into_bytes();
        assert_eq!(sl.get(&key), Some(format!("val_{i}").as_bytes()));
    }
    let keys = collect_keys(&sl);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn empty_skiplist_behavior() {
    let sl = SkipList::new();
    assert_eq!(sl.get(b"anything"), None);
    assert_eq!(sl.len(), 0);
    assert!(sl.is_empty());
    assert!(!sl.iter().is_valid());
}

// =============================================================================
// Tombstones
// =============================================================================
#[test]
fn tombstone_for_unknown_key_is_inserted() {
    let mut sl = SkipList::new();
    sl.insert_tombstone(b"ghost".to_vec());

    assert_eq!(sl.len(), 1);
    assert_eq!(sl.get(b"ghost"), None);
    assert_eq!(sl.get_entry(b"ghost").map(|(t, _)| t), Some(ValueType::Delete));
}

#[test]
fn put_after_tombstone_revives_key() {
    let mut sl = SkipList::new();
    sl.insert(b"k".to_vec(), b"1".to_vec());
    sl.insert_tombstone(b"k".to_vec());
    sl.insert(b"k".to_vec(), b"2".to_vec());

    assert_eq!(sl.get(b"k"), Some(b"2".as_slice()));
    assert_eq!(sl.len(), 1);
}

// =============================================================================
// Size tracking
// =============================================================================
#[test]
fn size_counts_keys_and_values() {
    let mut sl = SkipList::new();
    assert_eq!(sl.size_bytes(), 0);

    sl.insert(b"hello".to_vec(), b"world".to_vec());
    assert_eq!(sl.size_bytes(), 10);
}

#[test]
fn overwrite_replaces_value_size() {
    let mut sl = SkipList::new();
    sl.insert(b"key".to_vec(), b"much larger value".to_vec());
    sl.insert(b"key".to_vec(), b"small".to_vec());
    assert_eq!(sl.size_bytes(), 3 + 5);

    sl.insert_tombstone(b"key".to_vec());
    assert_eq!(sl.size_bytes(), 3);
}

// =============================================================================
// Iteration
// =============================================================================
#[test]
fn iterator_returns_sorted_order_with_tombstones() {
    let mut sl = SkipList::new();
    sl.insert(b"charlie".to_vec(), b"3".to_vec());
    sl.insert(b"alpha".to_vec(), b"1".to_vec());
    sl.insert(b"bravo".to_vec(), b"2".to_vec());
    sl.insert_tombstone(b"bravo".to_vec());

    let mut iter = sl.iter();
    assert_eq!(iter.key(), b"alpha");
    assert_eq!(iter.value_type(), ValueType::Put);
    iter.next().unwrap();
    assert_eq!(iter.key(), b"bravo");
    assert_eq!(iter.value_type(), ValueType::Delete);
    iter.next().unwrap();
    assert_eq!(iter.key(), b"charlie");
    assert_eq!(iter.value(), b"3");
    iter.next().unwrap();
    assert!(!iter.is_valid());

    // Advancing past the end stays invalid.
    iter.next().unwrap();
    assert!(!iter.is_valid());
}

#[test]
fn seek_positions_at_first_key_not_less() {
    let mut sl = SkipList::new();
    for key in ["b", "d", "f"] {
        sl.insert(key.as_bytes().to_vec(), b"v".to_vec());
    }

    let mut iter = sl.iter();
    iter.seek(b"d").unwrap();
    assert_eq!(iter.key(), b"d");

    iter.seek(b"c").unwrap();
    assert_eq!(iter.key(), b"d");

    iter.seek(b"a").unwrap();
    assert_eq!(iter.key(), b"b");

    iter.seek(b"g").unwrap();
    assert!(!iter.is_valid());
}
