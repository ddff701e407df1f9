use crate::{
    ComponentCategory, ExternalStrategy, GenerationStrategy, IdentifierRecord, IdentifierStatus,
    IdentifierStore, LONG_ITEM_IDS, MemoryStore, Namespace, RandSource, RandomStrategy,
    SHORT_ITEM_IDS, Sctid, SequentialStrategy,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::scope;

use portable_atomic::{AtomicU64, Ordering};

struct MockRand {
    values: Vec<u64>,
    index: AtomicU64,
}

impl MockRand {
    fn new(values: impl Into<Vec<u64>>) -> Self {
        Self {
            values: values.into(),
            index: AtomicU64::new(0),
        }
    }
}

impl RandSource<u64> for MockRand {
    fn rand(&self) -> u64 {
        let i = self.index.fetch_add(1, Ordering::Relaxed) as usize;
        self.values[i % self.values.len()]
    }
}

fn namespace() -> Namespace {
    Namespace::new("1000154").unwrap()
}

fn run_candidates_stay_in_range<G: GenerationStrategy>(strategy: G) {
    for ns in [Namespace::INTERNATIONAL, namespace()] {
        for category in ComponentCategory::ALL {
            for _ in 0..64 {
                let item_id = strategy.next_item_id(ns, category);
                assert!(ns.item_ids().contains(&item_id), "{item_id} outside {ns}");
                assert!(Sctid::build(item_id, ns, category).is_ok());
            }
        }
    }
}

#[test]
fn sequential_counts_per_partition() {
    let strategy = SequentialStrategy::new();
    let concept = |ns| strategy.next_item_id(ns, ComponentCategory::Concept);

    assert_eq!(concept(Namespace::INTERNATIONAL), 100);
    assert_eq!(concept(Namespace::INTERNATIONAL), 101);
    assert_eq!(
        strategy.next_item_id(Namespace::INTERNATIONAL, ComponentCategory::Description),
        100
    );
    assert_eq!(concept(namespace()), 1);
    assert_eq!(concept(namespace()), 2);
    assert_eq!(concept(Namespace::INTERNATIONAL), 102);
}

#[test]
fn sequential_wraps_at_range_end() {
    let strategy = SequentialStrategy::new();
    strategy.set_next(namespace(), ComponentCategory::Concept, *LONG_ITEM_IDS.end());

    assert_eq!(
        strategy.next_item_id(namespace(), ComponentCategory::Concept),
        99_999_999
    );
    assert_eq!(strategy.next_item_id(namespace(), ComponentCategory::Concept), 1);
}

#[test]
fn sequential_resumes_after_stored_maximum() {
    let store = MemoryStore::new();
    for item_id in [100, 4_000, 250] {
        let sctid =
            Sctid::build(item_id, Namespace::INTERNATIONAL, ComponentCategory::Concept).unwrap();
        store
            .put(IdentifierRecord::new(&sctid, IdentifierStatus::Assigned))
            .unwrap();
    }

    let strategy = SequentialStrategy::new();
    strategy
        .resume_from(&store, Namespace::INTERNATIONAL, ComponentCategory::Concept)
        .unwrap();
    strategy
        .resume_from(&store, Namespace::INTERNATIONAL, ComponentCategory::Relationship)
        .unwrap();

    assert_eq!(
        strategy.next_item_id(Namespace::INTERNATIONAL, ComponentCategory::Concept),
        4_001
    );
    assert_eq!(
        strategy.next_item_id(Namespace::INTERNATIONAL, ComponentCategory::Relationship),
        100
    );
}

#[test]
fn sequential_is_unique_across_threads() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 512;

    let strategy = Arc::new(SequentialStrategy::new());
    let seen = Arc::new(parking_lot::Mutex::new(HashSet::new()));

    scope(|s| {
        for _ in 0..THREADS {
            let strategy = Arc::clone(&strategy);
            let seen = Arc::clone(&seen);
            s.spawn(move || {
                for _ in 0..PER_THREAD {
                    let item_id =
                        strategy.next_item_id(Namespace::INTERNATIONAL, ComponentCategory::Concept);
                    assert!(seen.lock().insert(item_id));
                }
            });
        }
    });

    assert_eq!(seen.lock().len(), THREADS * PER_THREAD);
}

#[test]
fn random_maps_source_into_range() {
    let span = SHORT_ITEM_IDS.end() - SHORT_ITEM_IDS.start() + 1;
    let strategy = RandomStrategy::with_rng(MockRand::new([0, 5, span, u64::MAX]));

    let draw = || strategy.next_item_id(Namespace::INTERNATIONAL, ComponentCategory::Concept);
    assert_eq!(draw(), 100);
    assert_eq!(draw(), 105);
    assert_eq!(draw(), 100);
    assert_eq!(draw(), 100 + u64::MAX % span);

    let long = RandomStrategy::with_rng(MockRand::new([99_999_999]));
    assert_eq!(long.next_item_id(namespace(), ComponentCategory::Concept), 1);
}

#[test]
fn strategies_stay_in_range() {
    run_candidates_stay_in_range(SequentialStrategy::new());
    run_candidates_stay_in_range(RandomStrategy::new());
    run_candidates_stay_in_range(ExternalStrategy::new(|ns: Namespace, _| {
        *ns.item_ids().start()
    }));
}

#[test]
fn smart_pointers_forward() {
    let shared: Arc<dyn GenerationStrategy> = Arc::new(SequentialStrategy::new());
    let boxed: Box<dyn GenerationStrategy> = Box::new(ExternalStrategy::new(|_, _| 777));

    run_candidates_stay_in_range(&shared);
    assert_eq!(
        boxed.next_item_id(Namespace::INTERNATIONAL, ComponentCategory::Concept),
        777
    );
}
