use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::{
    AllocatorConfig, ComponentCategory, Error, GenerationStrategy, IdentifierRecord,
    IdentifierStatus, IdentifierStore, Namespace, NoReservations, Operation, Plan,
    ReservationService, Result, Sctid,
};

/// Allocates SNOMED CT identifiers and drives them through their lifecycle.
///
/// The allocator is stateless apart from its three collaborators: an
/// [`IdentifierStore`] that is the single source of truth, a
/// [`GenerationStrategy`] that proposes item ids, and a
/// [`ReservationService`] that vetoes candidates. All methods take `&self`
/// and may be called concurrently from any number of threads.
///
/// Uniqueness never depends on in-process locking: every new identifier is
/// committed with [`IdentifierStore::put_if_absent`] and every lifecycle
/// transition with [`IdentifierStore::compare_and_swap`], so two callers can
/// never both win the same identifier or the same transition.
///
/// ## Features
/// - ✅ Thread-safe, lock-free in the allocator itself
/// - ✅ Pluggable store, generation strategy, and reservations
/// - ✅ Idempotent lifecycle no-ops are logged, not raised
///
/// # Example
/// ```
/// use sctid::{
///     ComponentCategory, IdentifierAllocator, IdentifierStatus, MemoryStore, Namespace,
///     NoReservations, SequentialStrategy,
/// };
///
/// let allocator =
///     IdentifierAllocator::new(MemoryStore::new(), SequentialStrategy::new(), NoReservations);
///
/// let record = allocator
///     .generate(Namespace::INTERNATIONAL, ComponentCategory::Concept)
///     .unwrap();
/// assert_eq!(record.id, "100005");
///
/// let record = allocator.publish(&record.id).unwrap();
/// assert_eq!(record.status, IdentifierStatus::Published);
/// ```
#[derive(Debug)]
pub struct IdentifierAllocator<S, G, R = NoReservations> {
    store: S,
    strategy: G,
    reservations: R,
    config: AllocatorConfig,
}

impl<S, G, R> IdentifierAllocator<S, G, R>
where
    S: IdentifierStore,
    G: GenerationStrategy,
    R: ReservationService,
{
    /// Creates an allocator with the default [`AllocatorConfig`].
    pub fn new(store: S, strategy: G, reservations: R) -> Self {
        Self::with_config(store, strategy, reservations, AllocatorConfig::default())
    }

    pub const fn with_config(
        store: S,
        strategy: G,
        reservations: R,
        config: AllocatorConfig,
    ) -> Self {
        Self {
            store,
            strategy,
            reservations,
            config,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn strategy(&self) -> &G {
        &self.strategy
    }

    pub const fn reservations(&self) -> &R {
        &self.reservations
    }

    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Allocates a fresh identifier and records it as
    /// [`IdentifierStatus::Assigned`].
    ///
    /// # Errors
    ///
    /// - [`Error::GenerationExhausted`] if no free candidate was found within
    ///   the attempt budget.
    /// - [`Error::InvalidItemId`] if the strategy proposes an item id outside
    ///   the namespace's range.
    /// - [`Error::StoreUnavailable`] from the store.
    pub fn generate(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
    ) -> Result<IdentifierRecord> {
        self.allocate(
            namespace,
            category,
            IdentifierStatus::Assigned,
            &mut HashSet::new(),
        )
    }

    /// Allocates a fresh identifier and records it as
    /// [`IdentifierStatus::Reserved`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`].
    pub fn reserve(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
    ) -> Result<IdentifierRecord> {
        self.allocate(
            namespace,
            category,
            IdentifierStatus::Reserved,
            &mut HashSet::new(),
        )
    }

    /// Marks an externally minted or reserved identifier as assigned.
    ///
    /// Registering an identifier that is already assigned or published is a
    /// logged no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedIdentifier`] if `id` does not parse.
    /// - [`Error::InvalidState`] if the identifier is deprecated.
    /// - [`Error::StoreUnavailable`] from the store.
    pub fn register(&self, id: &str) -> Result<IdentifierRecord> {
        self.transition(id, Operation::Register)
    }

    /// Moves an assigned or published identifier to deprecated.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless the identifier is assigned, published or
    /// already deprecated. See also [`Self::register`].
    pub fn deprecate(&self, id: &str) -> Result<IdentifierRecord> {
        self.transition(id, Operation::Deprecate)
    }

    /// Returns an assigned or reserved identifier to the available pool by
    /// removing its record. The returned record has status
    /// [`IdentifierStatus::Available`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] for published or deprecated identifiers.
    pub fn release(&self, id: &str) -> Result<IdentifierRecord> {
        self.transition(id, Operation::Release)
    }

    /// Moves an assigned identifier to published.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless the identifier is assigned or already
    /// published.
    pub fn publish(&self, id: &str) -> Result<IdentifierRecord> {
        self.transition(id, Operation::Publish)
    }

    /// Returns the stored record for `id`, or a synthesized
    /// [`IdentifierStatus::Available`] record if none exists.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentifier`] if `id` does not parse, or
    /// [`Error::StoreUnavailable`] from the store.
    pub fn get_identifier(&self, id: &str) -> Result<IdentifierRecord> {
        let sctid = Sctid::parse(id)?;
        Ok(self
            .store
            .get(sctid.as_str())?
            .unwrap_or_else(|| IdentifierRecord::from(&sctid)))
    }

    /// Multi-get counterpart of [`Self::get_identifier`].
    ///
    /// Records come back in input order with duplicates collapsed to their
    /// first occurrence. The store is read in chunks of
    /// [`AllocatorConfig::request_bulk_limit`] ids.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentifier`] for the first id that does not parse.
    pub fn get_identifiers<T: AsRef<str>>(&self, ids: &[T]) -> Result<Vec<IdentifierRecord>> {
        let parsed = unique(ids)
            .into_iter()
            .map(Sctid::parse)
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(parsed.len());
        for chunk in parsed.chunks(self.config.request_bulk_limit()) {
            let mut found = self.fetch(chunk)?;
            records.extend(chunk.iter().map(|sctid| {
                found
                    .remove(sctid.as_str())
                    .unwrap_or_else(|| IdentifierRecord::from(sctid))
            }));
        }
        Ok(records)
    }

    /// Returns `true` if the store holds a record for `id`, that is, the
    /// identifier is not available.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentifier`] if `id` does not parse.
    pub fn contains(&self, id: &str) -> Result<bool> {
        let sctid = Sctid::parse(id)?;
        self.store.contains(sctid.as_str())
    }

    /// The generation loop: propose, build, reject taken candidates, and
    /// commit the first free one atomically.
    ///
    /// `batch` holds identifiers already produced by the enclosing call and
    /// receives the new one.
    pub(crate) fn allocate(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
        status: IdentifierStatus,
        batch: &mut HashSet<String>,
    ) -> Result<IdentifierRecord> {
        let attempts = self.config.max_generation_attempts();
        for attempt in 1..=attempts {
            let item_id = self.strategy.next_item_id(namespace, category);
            let candidate = Sctid::build(item_id, namespace, category)?;

            if batch.contains(candidate.as_str()) {
                trace!(id = %candidate, attempt, "candidate repeated within batch");
                continue;
            }
            // Checked before the store so that a vetoing reservation
            // service sees every attempt.
            if self.reservations.is_reserved(&candidate) {
                trace!(id = %candidate, attempt, "candidate reserved");
                continue;
            }

            let record = IdentifierRecord::new(&candidate, status);
            if self.store.put_if_absent(record.clone())? {
                debug!(id = %record.id, %status, attempt, "allocated identifier");
                batch.insert(record.id.clone());
                return Ok(record);
            }
            trace!(id = %candidate, attempt, "candidate already stored");
        }

        warn!(%namespace, %category, attempts, "generation exhausted");
        Err(Error::GenerationExhausted {
            namespace,
            category,
            attempts,
        })
    }

    fn transition(&self, id: &str, operation: Operation) -> Result<IdentifierRecord> {
        let sctid = Sctid::parse(id)?;
        let current = self.store.get(sctid.as_str())?;
        self.apply(&sctid, operation, current)
    }

    /// Applies `operation` to `sctid`, starting from `current` (the last
    /// known record) and re-reading after every lost compare-and-swap.
    pub(crate) fn apply(
        &self,
        sctid: &Sctid,
        operation: Operation,
        mut current: Option<IdentifierRecord>,
    ) -> Result<IdentifierRecord> {
        loop {
            let status = current
                .as_ref()
                .map_or(IdentifierStatus::Available, |record| record.status);
            match operation.plan(status) {
                Plan::Noop => {
                    warn!(id = %sctid, %operation, %status, "identifier already in target state");
                    return Ok(current.unwrap_or_else(|| IdentifierRecord::from(sctid)));
                }
                Plan::Reject => {
                    return Err(Error::InvalidState {
                        id: sctid.as_str().to_owned(),
                        status,
                        operation,
                    });
                }
                Plan::Move(to) => {
                    let next = to.is_stored().then(|| match &current {
                        Some(record) => record.with_status(to),
                        None => IdentifierRecord::new(sctid, to),
                    });
                    let expected = current.as_ref().map(|record| record.status);
                    if self
                        .store
                        .compare_and_swap(sctid.as_str(), expected, next.clone())?
                    {
                        debug!(
                            id = %sctid,
                            %operation,
                            from = %status,
                            %to,
                            "transitioned identifier"
                        );
                        return Ok(next.unwrap_or_else(|| IdentifierRecord::from(sctid)));
                    }
                    trace!(id = %sctid, %operation, "lost transition race, re-reading");
                    current = self.store.get(sctid.as_str())?;
                }
            }
        }
    }

    /// One `get_many` round trip for a chunk of parsed identifiers.
    pub(crate) fn fetch(&self, chunk: &[Sctid]) -> Result<HashMap<String, IdentifierRecord>> {
        let ids: Vec<String> = chunk.iter().map(|sctid| sctid.as_str().to_owned()).collect();
        self.store.get_many(&ids)
    }
}

/// Collapses duplicates, keeping the first occurrence of each id.
pub(crate) fn unique<T: AsRef<str>>(ids: &[T]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .map(AsRef::as_ref)
        .filter(|id| seen.insert(*id))
        .collect()
}
