use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

/// A cooperative cancellation signal polled by bulk operations between ids.
///
/// Bulk calls never interrupt a single id mid-transition; they check the
/// signal before starting the next one.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels. Used by the plain bulk methods.
#[derive(Clone, Copy, Debug, Default)]
pub struct Never;

impl Cancellation for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A deadline: cancelled once the instant has passed.
impl Cancellation for Instant {
    fn is_cancelled(&self) -> bool {
        Instant::now() >= *self
    }
}

/// A flag flipped by another thread.
impl Cancellation for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Either signal firing cancels.
impl<A: Cancellation, B: Cancellation> Cancellation for (A, B) {
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled() || self.1.is_cancelled()
    }
}

impl<C: Cancellation + ?Sized> Cancellation for &C {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<C: Cancellation + ?Sized> Cancellation for Arc<C> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn signals() {
        assert!(!Never.is_cancelled());

        let past = Instant::now();
        assert!(past.is_cancelled());
        assert!(!(Instant::now() + Duration::from_secs(60)).is_cancelled());

        let flag = Arc::new(AtomicBool::new(false));
        assert!(!flag.is_cancelled());
        flag.store(true, Ordering::Release);
        assert!(flag.is_cancelled());

        assert!((Never, past).is_cancelled());
        assert!(!(Never, &Never).is_cancelled());
    }
}
