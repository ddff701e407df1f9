use core::ops::RangeInclusive;

use crate::{ComponentCategory, Namespace, ReservationService, Sctid};

/// Reserves a contiguous block of item ids within one namespace.
///
/// An empty category list applies the range to every category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeReservation {
    namespace: Namespace,
    item_ids: RangeInclusive<u64>,
    categories: Vec<ComponentCategory>,
}

impl RangeReservation {
    #[must_use]
    pub fn new(
        namespace: Namespace,
        item_ids: RangeInclusive<u64>,
        categories: impl IntoIterator<Item = ComponentCategory>,
    ) -> Self {
        let mut categories: Vec<_> = categories.into_iter().collect();
        categories.sort_unstable();
        categories.dedup();
        Self {
            namespace,
            item_ids,
            categories,
        }
    }

    /// A range covering every category.
    #[must_use]
    pub fn all_categories(namespace: Namespace, item_ids: RangeInclusive<u64>) -> Self {
        Self::new(namespace, item_ids, [])
    }

    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    #[must_use]
    pub const fn item_ids(&self) -> &RangeInclusive<u64> {
        &self.item_ids
    }

    #[must_use]
    pub fn categories(&self) -> &[ComponentCategory] {
        &self.categories
    }
}

impl ReservationService for RangeReservation {
    fn is_reserved(&self, id: &Sctid) -> bool {
        id.namespace() == self.namespace
            && self.item_ids.contains(&id.item_id())
            && (self.categories.is_empty() || self.categories.contains(&id.category()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(item_id: u64, namespace: Namespace, category: ComponentCategory) -> Sctid {
        Sctid::build(item_id, namespace, category).unwrap()
    }

    #[test]
    fn matches_namespace_range_and_category() {
        let ns = Namespace::new("1000154").unwrap();
        let reservation = RangeReservation::new(ns, 10..=20, [ComponentCategory::Concept]);

        assert!(reservation.is_reserved(&id(10, ns, ComponentCategory::Concept)));
        assert!(reservation.is_reserved(&id(20, ns, ComponentCategory::Concept)));
        assert!(!reservation.is_reserved(&id(21, ns, ComponentCategory::Concept)));
        assert!(!reservation.is_reserved(&id(15, ns, ComponentCategory::Description)));
        assert!(!reservation.is_reserved(&id(
            150,
            Namespace::INTERNATIONAL,
            ComponentCategory::Concept
        )));
    }

    #[test]
    fn empty_category_list_covers_everything() {
        let reservation = RangeReservation::all_categories(Namespace::INTERNATIONAL, 100..=199);
        for category in ComponentCategory::ALL {
            assert!(reservation.is_reserved(&id(150, Namespace::INTERNATIONAL, category)));
        }
    }
}
