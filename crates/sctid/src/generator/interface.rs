use std::sync::Arc;

use crate::{ComponentCategory, Namespace};

/// Supplies raw item id candidates for a namespace and category.
///
/// A strategy makes no uniqueness promise: the allocator rejects candidates
/// that are already stored, reserved, or repeated within a batch, and asks
/// again. Implementations are shared across threads and must not require
/// external locking.
pub trait GenerationStrategy: Send + Sync {
    /// Returns the next candidate item id.
    ///
    /// Candidates should fall inside [`Namespace::item_ids`]; the allocator
    /// surfaces anything else as [`crate::Error::InvalidItemId`].
    fn next_item_id(&self, namespace: Namespace, category: ComponentCategory) -> u64;
}

impl<G: GenerationStrategy + ?Sized> GenerationStrategy for &G {
    fn next_item_id(&self, namespace: Namespace, category: ComponentCategory) -> u64 {
        (**self).next_item_id(namespace, category)
    }
}

impl<G: GenerationStrategy + ?Sized> GenerationStrategy for Box<G> {
    fn next_item_id(&self, namespace: Namespace, category: ComponentCategory) -> u64 {
        (**self).next_item_id(namespace, category)
    }
}

impl<G: GenerationStrategy + ?Sized> GenerationStrategy for Arc<G> {
    fn next_item_id(&self, namespace: Namespace, category: ComponentCategory) -> u64 {
        (**self).next_item_id(namespace, category)
    }
}

/// Adapts an externally sequenced source (a closure) into a
/// [`GenerationStrategy`].
///
/// # Example
/// ```
/// use sctid::{ComponentCategory, ExternalStrategy, GenerationStrategy, Namespace};
///
/// let strategy = ExternalStrategy::new(|_, _| 4242);
/// assert_eq!(strategy.next_item_id(Namespace::INTERNATIONAL, ComponentCategory::Concept), 4242);
/// ```
#[derive(Clone, Debug)]
pub struct ExternalStrategy<F>(F);

impl<F> ExternalStrategy<F>
where
    F: Fn(Namespace, ComponentCategory) -> u64 + Send + Sync,
{
    pub const fn new(source: F) -> Self {
        Self(source)
    }
}

impl<F> GenerationStrategy for ExternalStrategy<F>
where
    F: Fn(Namespace, ComponentCategory) -> u64 + Send + Sync,
{
    fn next_item_id(&self, namespace: Namespace, category: ComponentCategory) -> u64 {
        (self.0)(namespace, category)
    }
}
