use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;

use crate::{ReservationService, Sctid};

type SharedReservation = Arc<dyn ReservationService>;

/// A named collection of reservations, itself a [`ReservationService`].
///
/// An identifier is reserved if any registered reservation matches it.
/// Reservations can be added and removed while allocators are running;
/// lookups only ever take the read lock.
#[derive(Default)]
pub struct Reservations {
    entries: RwLock<BTreeMap<String, SharedReservation>>,
}

impl Reservations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reservation` under `name`, returning the reservation it
    /// replaced, if any.
    pub fn create<R>(&self, name: impl Into<String>, reservation: R) -> Option<SharedReservation>
    where
        R: ReservationService + 'static,
    {
        let name = name.into();
        tracing::debug!(%name, "registering reservation");
        self.entries.write().insert(name, Arc::new(reservation))
    }

    /// Removes the reservation registered under `name`.
    pub fn delete(&self, name: &str) -> Option<SharedReservation> {
        tracing::debug!(%name, "removing reservation");
        self.entries.write().remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<SharedReservation> {
        self.entries.read().get(name).cloned()
    }

    /// Registered names, in lexicographic order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ReservationService for Reservations {
    fn is_reserved(&self, id: &Sctid) -> bool {
        self.entries
            .read()
            .values()
            .any(|reservation| reservation.is_reserved(id))
    }
}

impl core::fmt::Debug for Reservations {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reservations")
            .field("names", &self.names())
            .finish()
    }
}
