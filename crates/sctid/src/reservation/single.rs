use crate::{ReservationService, Sctid};

/// Reserves exactly one identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SingleReservation {
    id: Sctid,
}

impl SingleReservation {
    #[must_use]
    pub const fn new(id: Sctid) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(&self) -> &Sctid {
        &self.id
    }
}

impl ReservationService for SingleReservation {
    fn is_reserved(&self, id: &Sctid) -> bool {
        self.id.as_str() == id.as_str()
    }
}
