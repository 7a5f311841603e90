use rand::Rng;

use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::types::ValueType;

/// Maximum height of the skip list. LevelDB uses 12.
pub const MAX_HEIGHT: usize = 12;

/// One in BRANCHING nodes is promoted to the next level.
const BRANCHING: u32 = 4;

/// Index of the head sentinel in the arena.
const HEAD: usize = 0;

/// A single node in the skip list.
///
/// Each node has `height` forward pointers. Level 0 contains all nodes
/// (a regular linked list). Higher levels skip over nodes, enabling
/// O(log n) average-case search.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
struct SkipNode {
    key: Vec<u8>,
    value: Vec<u8>,
    value_type: ValueType,
    forward: Vec<Option<usize>>, // indices into SkipList.nodes
}

/// A probabilistic sorted map from keys to (value type, value).
///
/// Nodes live in an arena and link to each other by index. Nodes are never
/// unlinked: a delete overwrites the entry with a tombstone, and the owner
/// rebuilds the list when it wants the space back.
pub struct SkipList {
    nodes: Vec<SkipNode>,
    height: usize,
    len: usize,
    size_bytes: usize,
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipList {
    /// Create a new empty skip list.
    pub fn new() -> Self {
        let head = SkipNode {
            key: Vec::new(),
            value: Vec::new(),
            value_type: ValueType::Put,
            forward: vec![None; MAX_HEIGHT],
        };
        SkipList {
            nodes: vec![head],
            height: 1,
            len: 0,
            size_bytes: 0,
        }
    }

    /// Insert a key-value pair. Overwrites if key already exists.
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.upsert(key, ValueType::Put, value);
    }

    /// Overwrite `key` with a tombstone, inserting one if the key is new.
    pub fn insert_tombstone(&mut self, key: Vec<u8>) {
        self.upsert(key, ValueType::Delete, Vec::new());
    }

    fn upsert(&mut self, key: Vec<u8>, value_type: ValueType, value: Vec<u8>) {
        let mut prev = [HEAD; MAX_HEIGHT];
        if let Some(idx) = self.find_greater_or_equal(&key, &mut prev) {
            let node = &mut self.nodes[idx];
            if node.key == key {
                self.size_bytes = self.size_bytes - node.value.len() + value.len();
                node.value = value;
                node.value_type = value_type;
                return;
            }
        }

        let height = self.random_height();
        if height > self.height {
            // prev[] already points at HEAD for the new levels
            self.height = height;
        }

        let idx = self.nodes.len();
        let forward = (0..height).map(|level| self.nodes[prev[level]].forward[level]).collect();

        self.size_bytes += key.len() + value.len();
        self.nodes.push(SkipNode {
            key,
            value,
            value_type,
            forward,
        });
        for (level, &p) in prev.iter().enumerate().take(height) {
            self.nodes[p].forward[level] = Some(idx);
        }
        self.len += 1;
    }

    /// Look up a key. Returns the value only if the key holds a live value.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.get_entry(key) {
            Some((ValueType::Put, value)) => Some(value),
            _ => None,
        }
    }

    /// Look up a key including tombstones.
    pub fn get_entry(&self, key: &[u8]) -> Option<(ValueType, &[u8])> {
        let mut prev = [HEAD; MAX_HEIGHT];
        let idx = self.find_greater_or_equal(key, &mut prev)?;
        let node = &self.nodes[idx];
        (node.key == key).then_some((node.value_type, node.value.as_slice()))
    }

    /// Number of entries in the skip list, tombstones included.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the skip list is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Approximate memory usage in bytes (keys plus values).
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Create an iterator over all entries in sorted order.
    /// Traverses level 0 (the bottom level contains all entries).
    pub fn iter(&self) -> SkipListIterator<'_> {
        SkipListIterator {
            list: self,
            current: self.nodes[HEAD].forward[0],
        }
    }

    /// Walk down from the highest level, recording the last node before
    /// `key` at each level in `prev`. Returns the first node with key >= `key`.
    fn find_greater_or_equal(&self, key: &[u8], prev: &mut [usize; MAX_HEIGHT]) -> Option<usize> {
        let mut x = HEAD;
        let mut level = self.height - 1;
        loop {
            let next = self.nodes[x].forward[level];
            match next {
                Some(n) if self.nodes[n].key.as_slice() < key => x = n,
                _ => {
                    prev[level] = x;
                    if level == 0 {
                        return next;
                    }
                    level -= 1;
                }
            }
        }
    }

    /// Generate a random level for a new node.
    /// Each level has a 1/4 probability (LevelDB uses 1/4, not 1/2).
    fn random_height(&self) -> usize {
        let mut rng = rand::thread_rng();
        let mut height = 1;
        while height < MAX_HEIGHT && rng.gen_ratio(1, BRANCHING) {
            height += 1;
        }
        height
    }
}

/// Iterator over skip list entries in sorted order.
///
/// Follows level 0 forward pointers; level 0 is a sorted linked list
/// containing every entry, tombstones included.
pub struct SkipListIterator<'a> {
    list: &'a SkipList,
    current: Option<usize>,
}

impl SkipListIterator<'_> {
    /// Value type of the current entry. Only valid when is_valid() is true.
    pub fn value_type(&self) -> ValueType {
        self.node().value_type
    }

    fn node(&self) -> &SkipNode {
        let idx = self.current.expect("iterator is not positioned on an entry");
        &self.list.nodes[idx]
    }
}

impl StorageIterator for SkipListIterator<'_> {
    fn key(&self) -> &[u8] {
        &self.node().key
    }

    fn value(&self) -> &[u8] {
        &self.node().value
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) -> Result<()> {
        if let Some(idx) = self.current {
            self.current = self.list.nodes[idx].forward[0];
        }
        Ok(())
    }

    fn seek(&mut self, key: &[u8]) -> Result<()> {
        let mut prev = [HEAD; MAX_HEIGHT];
        self.current = self.list.find_greater_or_equal(key, &mut prev);
        Ok(())
    }
}
