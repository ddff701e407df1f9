use std::{collections::HashMap, sync::Arc};

use crate::{ComponentCategory, IdentifierRecord, IdentifierStatus, Namespace, Result};

/// A keyed store of identifier records.
///
/// The store is the single source of truth for identifier state; absence of
/// a record means the identifier is available. Every method is fallible so
/// that remote backings can report I/O failures as
/// [`crate::Error::StoreUnavailable`].
///
/// The two conditional writes, [`IdentifierStore::put_if_absent`] and
/// [`IdentifierStore::compare_and_swap`], must be atomic with respect to every
/// other write to the same id. The allocator relies on them to guarantee that
/// no two callers are handed the same identifier and that concurrent
/// lifecycle transitions cannot both succeed from the same state.
pub trait IdentifierStore: Send + Sync {
    /// Point lookup.
    fn get(&self, id: &str) -> Result<Option<IdentifierRecord>>;

    /// Multi-get. Missing ids are simply absent from the result.
    fn get_many(&self, ids: &[String]) -> Result<HashMap<String, IdentifierRecord>> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(id)? {
                found.insert(id.clone(), record);
            }
        }
        Ok(found)
    }

    /// Unconditional upsert.
    fn put(&self, record: IdentifierRecord) -> Result<()>;

    /// Unconditional upsert of many records.
    fn put_many(&self, records: Vec<IdentifierRecord>) -> Result<()> {
        records.into_iter().try_for_each(|record| self.put(record))
    }

    /// Inserts `record` only if no record exists for its id. Returns `true`
    /// if the record was inserted.
    fn put_if_absent(&self, record: IdentifierRecord) -> Result<bool>;

    /// Atomically replaces the record for `id` if its current status matches
    /// `expected` (`None` meaning "no record"). `next` of `None` removes the
    /// record. Returns `true` if the swap happened.
    fn compare_and_swap(
        &self,
        id: &str,
        expected: Option<IdentifierStatus>,
        next: Option<IdentifierRecord>,
    ) -> Result<bool>;

    /// Removes the record for `id`. Removing an absent id is a no-op.
    fn remove(&self, id: &str) -> Result<()>;

    /// Removes every listed id. Absent ids are ignored.
    fn remove_many(&self, ids: &[String]) -> Result<()> {
        ids.iter().try_for_each(|id| self.remove(id))
    }

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// All records of one partition, ordered by sequence.
    fn scan(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
    ) -> Result<Vec<IdentifierRecord>>;

    /// The highest sequence stored for a partition.
    fn max_sequence(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
    ) -> Result<Option<u64>> {
        Ok(self
            .scan(namespace, category)?
            .last()
            .map(|record| record.sequence))
    }

    /// Number of stored records.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: IdentifierStore + ?Sized> IdentifierStore for Arc<S> {
    fn get(&self, id: &str) -> Result<Option<IdentifierRecord>> {
        (**self).get(id)
    }

    fn get_many(&self, ids: &[String]) -> Result<HashMap<String, IdentifierRecord>> {
        (**self).get_many(ids)
    }

    fn put(&self, record: IdentifierRecord) -> Result<()> {
        (**self).put(record)
    }

    fn put_many(&self, records: Vec<IdentifierRecord>) -> Result<()> {
        (**self).put_many(records)
    }

    fn put_if_absent(&self, record: IdentifierRecord) -> Result<bool> {
        (**self).put_if_absent(record)
    }

    fn compare_and_swap(
        &self,
        id: &str,
        expected: Option<IdentifierStatus>,
        next: Option<IdentifierRecord>,
    ) -> Result<bool> {
        (**self).compare_and_swap(id, expected, next)
    }

    fn remove(&self, id: &str) -> Result<()> {
        (**self).remove(id)
    }

    fn remove_many(&self, ids: &[String]) -> Result<()> {
        (**self).remove_many(ids)
    }

    fn contains(&self, id: &str) -> Result<bool> {
        (**self).contains(id)
    }

    fn scan(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
    ) -> Result<Vec<IdentifierRecord>> {
        (**self).scan(namespace, category)
    }

    fn max_sequence(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
    ) -> Result<Option<u64>> {
        (**self).max_sequence(namespace, category)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}
