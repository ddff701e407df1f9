use std::sync::Arc;

use crate::Sctid;

/// Decides whether a candidate identifier is off-limits for allocation.
///
/// Consulted once per generation attempt, so implementations must be cheap
/// and free of side effects.
pub trait ReservationService: Send + Sync {
    /// Returns `true` if `id` must not be allocated.
    fn is_reserved(&self, id: &Sctid) -> bool;
}

impl<R: ReservationService + ?Sized> ReservationService for &R {
    fn is_reserved(&self, id: &Sctid) -> bool {
        (**self).is_reserved(id)
    }
}

impl<R: ReservationService + ?Sized> ReservationService for Box<R> {
    fn is_reserved(&self, id: &Sctid) -> bool {
        (**self).is_reserved(id)
    }
}

impl<R: ReservationService + ?Sized> ReservationService for Arc<R> {
    fn is_reserved(&self, id: &Sctid) -> bool {
        (**self).is_reserved(id)
    }
}

/// Reserves nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReservations;

impl ReservationService for NoReservations {
    fn is_reserved(&self, _id: &Sctid) -> bool {
        false
    }
}

/// Reserves every identifier matching a predicate.
///
/// # Example
/// ```
/// use sctid::{PredicateReservation, ReservationService, Sctid};
///
/// let odd = PredicateReservation::new(|id: &Sctid| id.item_id() % 2 == 1);
/// assert!(odd.is_reserved(&Sctid::parse("101013").unwrap()));
/// assert!(!odd.is_reserved(&Sctid::parse("100005").unwrap()));
/// ```
#[derive(Clone, Debug)]
pub struct PredicateReservation<F>(F);

impl<F> PredicateReservation<F>
where
    F: Fn(&Sctid) -> bool + Send + Sync,
{
    pub const fn new(predicate: F) -> Self {
        Self(predicate)
    }
}

impl<F> ReservationService for PredicateReservation<F>
where
    F: Fn(&Sctid) -> bool + Send + Sync,
{
    fn is_reserved(&self, id: &Sctid) -> bool {
        (self.0)(id)
    }
}
