use crate::{ComponentCategory, GenerationStrategy, Namespace, RandSource, ThreadRandom};

/// Draws item ids uniformly from the namespace's item id range.
///
/// Random candidates spread allocations across the whole range, which keeps
/// independent allocators sharing a namespace from colliding often. The
/// allocator's retry loop absorbs the collisions that do happen.
///
/// ## Features
/// - ✅ Thread-safe, no shared state
/// - ✅ Plug in any [`RandSource`] (deterministic in tests)
///
/// ## See Also
/// - [`SequentialStrategy`](crate::SequentialStrategy)
#[derive(Clone, Debug, Default)]
pub struct RandomStrategy<R = ThreadRandom> {
    rng: R,
}

impl RandomStrategy<ThreadRandom> {
    #[must_use]
    pub const fn new() -> Self {
        Self { rng: ThreadRandom }
    }
}

impl<R> RandomStrategy<R>
where
    R: RandSource<u64>,
{
    /// Creates a strategy backed by a custom random source.
    pub const fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R> GenerationStrategy for RandomStrategy<R>
where
    R: RandSource<u64> + Send + Sync,
{
    fn next_item_id(&self, namespace: Namespace, _category: ComponentCategory) -> u64 {
        let range = namespace.item_ids();
        let span = range.end() - range.start() + 1;
        range.start() + self.rng.rand() % span
    }
}
