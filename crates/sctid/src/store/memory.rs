use std::{
    collections::{HashMap, hash_map::Entry},
    hash::RandomState,
};

use core::hash::BuildHasher;

use parking_lot::RwLock;

use crate::{
    ComponentCategory, IdentifierRecord, IdentifierStatus, IdentifierStore, Namespace, Result,
};

/// Default number of shards; enough to keep 16 concurrent writers mostly
/// contention-free.
pub const DEFAULT_SHARDS: usize = 16;

type Shard = RwLock<HashMap<String, IdentifierRecord>>;

/// The in-memory reference [`IdentifierStore`].
///
/// Records are spread over independently locked shards selected by hashing
/// the id, so writers touching unrelated ids rarely block each other. Each
/// conditional write holds exactly one shard's write lock for its duration,
/// which is what makes [`IdentifierStore::put_if_absent`] and
/// [`IdentifierStore::compare_and_swap`] atomic.
///
/// With the `cache-padded` feature each shard lock sits on its own cache line.
pub struct MemoryStore {
    #[cfg(feature = "cache-padded")]
    shards: Box<[crossbeam_utils::CachePadded<Shard>]>,
    #[cfg(not(feature = "cache-padded"))]
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates a store with `shards` shards (at least one).
    #[must_use]
    pub fn with_shards(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| {
                #[cfg(feature = "cache-padded")]
                {
                    crossbeam_utils::CachePadded::new(Shard::default())
                }
                #[cfg(not(feature = "cache-padded"))]
                {
                    Shard::default()
                }
            })
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, id: &str) -> &Shard {
        // Truncation is fine: only the low bits select the shard.
        #[allow(clippy::cast_possible_truncation)]
        let index = (self.hasher.hash_one(id) as usize) % self.shards.len();
        &self.shards[index]
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

impl IdentifierStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<IdentifierRecord>> {
        Ok(self.shard(id).read().get(id).cloned())
    }

    fn put(&self, record: IdentifierRecord) -> Result<()> {
        self.shard(&record.id)
            .write()
            .insert(record.id.clone(), record);
        Ok(())
    }

    fn put_if_absent(&self, record: IdentifierRecord) -> Result<bool> {
        match self.shard(&record.id).write().entry(record.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    fn compare_and_swap(
        &self,
        id: &str,
        expected: Option<IdentifierStatus>,
        next: Option<IdentifierRecord>,
    ) -> Result<bool> {
        debug_assert!(next.as_ref().is_none_or(|record| record.id == id));

        let mut shard = self.shard(id).write();
        let current = shard.get(id).map(|record| record.status);
        if current != expected {
            return Ok(false);
        }
        match next {
            Some(record) => {
                shard.insert(id.to_owned(), record);
            }
            None => {
                shard.remove(id);
            }
        }
        Ok(true)
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.shard(id).write().remove(id);
        Ok(())
    }

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.shard(id).read().contains_key(id))
    }

    fn scan(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
    ) -> Result<Vec<IdentifierRecord>> {
        let mut records: Vec<_> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|record| {
                        record.namespace == namespace && record.category() == Some(category)
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        records.sort_unstable_by_key(|record| record.sequence);
        Ok(records)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.shards.iter().map(|shard| shard.read().len()).sum())
    }
}
