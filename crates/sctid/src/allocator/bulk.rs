use std::collections::HashSet;

use tracing::{debug, error, instrument, warn};

use super::lifecycle::unique;
use crate::{
    Cancellation, ComponentCategory, Error, GenerationStrategy, IdentifierAllocator,
    IdentifierRecord, IdentifierStatus, IdentifierStore, Namespace, Never, Operation, Plan,
    ReservationService, Result, Sctid,
};

/// The result of a best-effort bulk operation.
///
/// Every id ends up in exactly one of `records` (succeeded, including
/// idempotent no-ops) or `failures`, unless the call was cancelled, in which
/// case ids after the cancellation point appear in neither.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub records: Vec<IdentifierRecord>,
    pub failures: Vec<BulkFailure>,
    /// `true` if the cancellation signal stopped the call early.
    pub cancelled: bool,
}

impl BulkOutcome {
    /// `true` if every requested id succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// One id that a best-effort bulk operation could not process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: String,
    pub error: Error,
}

/// A registration written by `register_many`, with what it replaced.
struct Written {
    prior: Option<IdentifierRecord>,
    record: IdentifierRecord,
}

impl<S, G, R> IdentifierAllocator<S, G, R>
where
    S: IdentifierStore,
    G: GenerationStrategy,
    R: ReservationService,
{
    /// Allocates `quantity` distinct identifiers as
    /// [`IdentifierStatus::Assigned`].
    ///
    /// # Errors
    ///
    /// If any single allocation fails (typically
    /// [`Error::GenerationExhausted`]) the identifiers already committed by
    /// this call are removed again and the error is returned. If some of them
    /// cannot be removed, [`Error::StoreUnavailable`] names them instead.
    pub fn generate_many(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
        quantity: usize,
    ) -> Result<BulkOutcome> {
        self.generate_many_with(namespace, category, quantity, &Never)
    }

    /// [`Self::generate_many`] with a cancellation signal. On cancellation
    /// the identifiers allocated so far are kept and returned.
    ///
    /// # Errors
    ///
    /// See [`Self::generate_many`].
    #[instrument(level = "debug", skip(self, cancel), fields(%namespace, %category))]
    pub fn generate_many_with<C: Cancellation + ?Sized>(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
        quantity: usize,
        cancel: &C,
    ) -> Result<BulkOutcome> {
        self.allocate_many(namespace, category, IdentifierStatus::Assigned, quantity, cancel)
    }

    /// Allocates `quantity` distinct identifiers as
    /// [`IdentifierStatus::Reserved`].
    ///
    /// # Errors
    ///
    /// See [`Self::generate_many`].
    pub fn reserve_many(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
        quantity: usize,
    ) -> Result<BulkOutcome> {
        self.reserve_many_with(namespace, category, quantity, &Never)
    }

    /// [`Self::reserve_many`] with a cancellation signal.
    ///
    /// # Errors
    ///
    /// See [`Self::generate_many`].
    #[instrument(level = "debug", skip(self, cancel), fields(%namespace, %category))]
    pub fn reserve_many_with<C: Cancellation + ?Sized>(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
        quantity: usize,
        cancel: &C,
    ) -> Result<BulkOutcome> {
        self.allocate_many(namespace, category, IdentifierStatus::Reserved, quantity, cancel)
    }

    /// Registers every id or none of them.
    ///
    /// Malformed ids fail the call before anything is written. Ids that
    /// cannot be registered (already assigned, published or deprecated) fail
    /// the call with [`Error::PartialBulkFailure`] naming them; registrations
    /// made earlier in the call are undone, restoring reserved identifiers
    /// to reserved and removing the rest. Duplicate ids are registered once.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentifier`], [`Error::PartialBulkFailure`], or
    /// [`Error::StoreUnavailable`] (after rolling back, or naming the ids the
    /// rollback could not restore).
    pub fn register_many<T: AsRef<str>>(&self, ids: &[T]) -> Result<Vec<IdentifierRecord>> {
        self.register_many_with(ids, &Never)
    }

    /// [`Self::register_many`] with a cancellation signal. Cancellation rolls
    /// back every registration made by the call.
    ///
    /// # Errors
    ///
    /// As [`Self::register_many`], plus [`Error::Cancelled`].
    #[instrument(level = "debug", skip_all, fields(count = ids.len()))]
    pub fn register_many_with<T: AsRef<str>, C: Cancellation + ?Sized>(
        &self,
        ids: &[T],
        cancel: &C,
    ) -> Result<Vec<IdentifierRecord>> {
        let parsed = unique(ids)
            .into_iter()
            .map(Sctid::parse)
            .collect::<Result<Vec<_>>>()?;

        // Fail fast, before any write, on everything already known to be
        // unregistrable.
        let mut current = Vec::with_capacity(parsed.len());
        let mut offending = Vec::new();
        for chunk in parsed.chunks(self.config().request_bulk_limit()) {
            let mut found = self.fetch(chunk)?;
            for sctid in chunk {
                let record = found.remove(sctid.as_str());
                let status = record.as_ref().map_or(IdentifierStatus::Available, |r| r.status);
                if !matches!(Operation::Register.plan(status), Plan::Move(_)) {
                    offending.push(sctid.as_str().to_owned());
                }
                current.push(record);
            }
        }
        if !offending.is_empty() {
            warn!(?offending, "bulk registration rejected");
            return Err(Error::PartialBulkFailure {
                offending,
                reverted: true,
            });
        }

        let mut written = Vec::with_capacity(parsed.len());
        for (sctid, prior) in parsed.iter().zip(current) {
            if cancel.is_cancelled() {
                let cause = Error::Cancelled {
                    completed: written.len(),
                };
                return Err(rollback_error(cause, self.revert_registrations(written)));
            }
            match self.register_one(sctid, prior) {
                Ok(Some(entry)) => written.push(entry),
                Ok(None) => {
                    // Lost to a concurrent writer after the precheck.
                    let stranded = self.revert_registrations(written);
                    return Err(Error::PartialBulkFailure {
                        offending: vec![sctid.as_str().to_owned()],
                        reverted: stranded.is_empty(),
                    });
                }
                Err(err) => {
                    return Err(rollback_error(err, self.revert_registrations(written)));
                }
            }
        }

        debug!(count = written.len(), "bulk registration committed");
        Ok(written.into_iter().map(|entry| entry.record).collect())
    }

    /// Best-effort [`Self::deprecate`] over many ids.
    ///
    /// # Errors
    ///
    /// Only [`Error::StoreUnavailable`]; per-id failures are reported in the
    /// outcome.
    pub fn deprecate_many<T: AsRef<str>>(&self, ids: &[T]) -> Result<BulkOutcome> {
        self.deprecate_many_with(ids, &Never)
    }

    /// [`Self::deprecate_many`] with a cancellation signal.
    ///
    /// # Errors
    ///
    /// See [`Self::deprecate_many`].
    #[instrument(level = "debug", skip_all, fields(count = ids.len()))]
    pub fn deprecate_many_with<T: AsRef<str>, C: Cancellation + ?Sized>(
        &self,
        ids: &[T],
        cancel: &C,
    ) -> Result<BulkOutcome> {
        self.transition_many(ids, Operation::Deprecate, cancel)
    }

    /// Best-effort [`Self::release`] over many ids.
    ///
    /// # Errors
    ///
    /// See [`Self::deprecate_many`].
    pub fn release_many<T: AsRef<str>>(&self, ids: &[T]) -> Result<BulkOutcome> {
        self.release_many_with(ids, &Never)
    }

    /// [`Self::release_many`] with a cancellation signal.
    ///
    /// # Errors
    ///
    /// See [`Self::deprecate_many`].
    #[instrument(level = "debug", skip_all, fields(count = ids.len()))]
    pub fn release_many_with<T: AsRef<str>, C: Cancellation + ?Sized>(
        &self,
        ids: &[T],
        cancel: &C,
    ) -> Result<BulkOutcome> {
        self.transition_many(ids, Operation::Release, cancel)
    }

    /// Best-effort [`Self::publish`] over many ids.
    ///
    /// # Errors
    ///
    /// See [`Self::deprecate_many`].
    pub fn publish_many<T: AsRef<str>>(&self, ids: &[T]) -> Result<BulkOutcome> {
        self.publish_many_with(ids, &Never)
    }

    /// [`Self::publish_many`] with a cancellation signal.
    ///
    /// # Errors
    ///
    /// See [`Self::deprecate_many`].
    #[instrument(level = "debug", skip_all, fields(count = ids.len()))]
    pub fn publish_many_with<T: AsRef<str>, C: Cancellation + ?Sized>(
        &self,
        ids: &[T],
        cancel: &C,
    ) -> Result<BulkOutcome> {
        self.transition_many(ids, Operation::Publish, cancel)
    }

    fn allocate_many<C: Cancellation + ?Sized>(
        &self,
        namespace: Namespace,
        category: ComponentCategory,
        status: IdentifierStatus,
        quantity: usize,
        cancel: &C,
    ) -> Result<BulkOutcome> {
        let mut batch = HashSet::with_capacity(quantity);
        let mut records = Vec::with_capacity(quantity);
        for _ in 0..quantity {
            if cancel.is_cancelled() {
                warn!(allocated = records.len(), quantity, "bulk allocation cancelled");
                return Ok(BulkOutcome {
                    records,
                    failures: Vec::new(),
                    cancelled: true,
                });
            }
            match self.allocate(namespace, category, status, &mut batch) {
                Ok(record) => records.push(record),
                Err(err) => {
                    return Err(rollback_error(err, self.revert_allocations(&records)));
                }
            }
        }
        debug!(quantity, "bulk allocation committed");
        Ok(BulkOutcome {
            records,
            ..BulkOutcome::default()
        })
    }

    fn transition_many<T: AsRef<str>, C: Cancellation + ?Sized>(
        &self,
        ids: &[T],
        operation: Operation,
        cancel: &C,
    ) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        let mut parsed = Vec::with_capacity(ids.len());
        for id in unique(ids) {
            match Sctid::parse(id) {
                Ok(sctid) => parsed.push(sctid),
                Err(error) => outcome.failures.push(BulkFailure {
                    id: id.to_owned(),
                    error,
                }),
            }
        }

        for chunk in parsed.chunks(self.config().request_bulk_limit()) {
            let mut found = self.fetch(chunk)?;
            for sctid in chunk {
                if cancel.is_cancelled() {
                    warn!(%operation, done = outcome.records.len(), "bulk transition cancelled");
                    outcome.cancelled = true;
                    return Ok(outcome);
                }
                let current = found.remove(sctid.as_str());
                match self.apply(sctid, operation, current) {
                    Ok(record) => outcome.records.push(record),
                    Err(err @ Error::StoreUnavailable { .. }) => return Err(err),
                    Err(error) => outcome.failures.push(BulkFailure {
                        id: sctid.as_str().to_owned(),
                        error,
                    }),
                }
            }
        }

        debug!(
            %operation,
            succeeded = outcome.records.len(),
            failed = outcome.failures.len(),
            "bulk transition finished"
        );
        Ok(outcome)
    }

    /// Registers one id starting from its prechecked record. `None` means
    /// the id became unregistrable after the precheck.
    fn register_one(
        &self,
        sctid: &Sctid,
        mut prior: Option<IdentifierRecord>,
    ) -> Result<Option<Written>> {
        loop {
            let status = prior.as_ref().map_or(IdentifierStatus::Available, |r| r.status);
            if !matches!(Operation::Register.plan(status), Plan::Move(_)) {
                return Ok(None);
            }
            let record = match &prior {
                Some(existing) => existing.with_status(IdentifierStatus::Assigned),
                None => IdentifierRecord::new(sctid, IdentifierStatus::Assigned),
            };
            let expected = prior.as_ref().map(|r| r.status);
            if self
                .store()
                .compare_and_swap(sctid.as_str(), expected, Some(record.clone()))?
            {
                return Ok(Some(Written { prior, record }));
            }
            prior = self.store().get(sctid.as_str())?;
        }
    }

    /// Undoes registrations in reverse order. Returns the ids that could not
    /// be restored.
    fn revert_registrations(&self, written: Vec<Written>) -> Vec<String> {
        let mut stranded = Vec::new();
        for Written { prior, record } in written.into_iter().rev() {
            let restored =
                self.store()
                    .compare_and_swap(&record.id, Some(IdentifierStatus::Assigned), prior);
            if !matches!(restored, Ok(true)) {
                error!(id = %record.id, ?restored, "failed to roll back registration");
                stranded.push(record.id);
            }
        }
        stranded
    }

    /// Removes identifiers allocated by a failed bulk call. Returns the ids
    /// that are still allocated.
    fn revert_allocations(&self, records: &[IdentifierRecord]) -> Vec<String> {
        let mut stranded = Vec::new();
        for record in records.iter().rev() {
            let removed = self
                .store()
                .compare_and_swap(&record.id, Some(record.status), None);
            if !matches!(removed, Ok(true)) {
                error!(id = %record.id, ?removed, "failed to roll back allocation");
                stranded.push(record.id.clone());
            }
        }
        if !records.is_empty() {
            warn!(
                count = records.len() - stranded.len(),
                stranded = stranded.len(),
                "rolled back bulk allocation"
            );
        }
        stranded
    }
}

/// `cause` if the rollback left nothing behind, otherwise a
/// [`Error::StoreUnavailable`] naming the ids that are still written.
fn rollback_error(cause: Error, stranded: Vec<String>) -> Error {
    if stranded.is_empty() {
        return cause;
    }
    Error::StoreUnavailable {
        reason: format!("rollback after `{cause}` left {stranded:?} in place"),
    }
}
