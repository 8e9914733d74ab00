//! Bounded pool of exclusively-held expression engines.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::{debug, warn};

use super::ExpressionEngine;
use super::lock::{condvar_wait_while, mutex_lock};

const SOURCE: &str = "engine::pool";

pub(crate) const METRIC_POOL_FALLBACK: &str = "condeval_engine_pool_fallback_total";
pub(crate) const METRIC_POOL_DISCARD: &str = "condeval_engine_pool_discard_total";

/// Constructor used to fill the pool and to build fallback instances.
pub type EngineFactory<E> = Arc<dyn Fn() -> E + Send + Sync>;

/// Bounded pool of reusable engines.
///
/// The pool is filled to capacity on construction. A borrow waits up to the
/// configured timeout for an idle engine and builds a fresh one when none
/// frees up, so callers are never failed by exhaustion. Returning an engine
/// into a full pool drops it.
pub struct EnginePool<E> {
    idle: Mutex<Vec<E>>,
    available: Condvar,
    capacity: NonZeroUsize,
    borrow_timeout: Duration,
    factory: EngineFactory<E>,
}

impl<E: ExpressionEngine> EnginePool<E> {
    pub fn new<F>(capacity: NonZeroUsize, borrow_timeout: Duration, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        let factory: EngineFactory<E> = Arc::new(factory);
        let idle = (0..capacity.get()).map(|_| factory()).collect();

        Self {
            idle: Mutex::new(idle),
            available: Condvar::new(),
            capacity,
            borrow_timeout,
            factory,
        }
    }

    /// Take exclusive hold of an engine, waiting up to the borrow timeout.
    ///
    /// The engine goes back to the pool when the returned guard is dropped.
    pub fn borrow(&self) -> PooledEngine<'_, E> {
        let engine = self.take_idle().unwrap_or_else(|| {
            counter!(METRIC_POOL_FALLBACK).increment(1);
            debug!(
                capacity = self.capacity.get(),
                timeout_ms = self.borrow_timeout_ms(),
                "No idle engine within borrow timeout; constructing a new one"
            );
            (self.factory)()
        });

        PooledEngine {
            pool: self,
            engine: Some(engine),
        }
    }

    /// Return an engine to the idle set, or drop it when the pool is full.
    ///
    /// Never waits for space.
    pub fn release(&self, engine: E) {
        let mut idle = mutex_lock(&self.idle, SOURCE, "release");
        if idle.len() >= self.capacity.get() {
            drop(idle);
            drop(engine);
            counter!(METRIC_POOL_DISCARD).increment(1);
            warn!(
                capacity = self.capacity.get(),
                "Engine pool is full; discarding engine"
            );
            return;
        }

        idle.push(engine);
        drop(idle);
        self.available.notify_one();
    }

    /// Number of engines currently idle.
    pub fn idle_len(&self) -> usize {
        mutex_lock(&self.idle, SOURCE, "idle_len").len()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    pub fn borrow_timeout(&self) -> Duration {
        self.borrow_timeout
    }

    fn borrow_timeout_ms(&self) -> u64 {
        u64::try_from(self.borrow_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn take_idle(&self) -> Option<E> {
        // Unrepresentable deadlines wait in full-timeout slices.
        let deadline = Instant::now().checked_add(self.borrow_timeout);
        let mut idle = mutex_lock(&self.idle, SOURCE, "borrow");

        loop {
            if let Some(engine) = idle.pop() {
                return Some(engine);
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.borrow_timeout,
            };
            if remaining.is_zero() {
                return None;
            }

            idle = condvar_wait_while(
                &self.available,
                idle,
                remaining,
                |idle| idle.is_empty(),
                SOURCE,
                "borrow.wait",
            );
        }
    }
}

impl<E> fmt::Debug for EnginePool<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnginePool")
            .field("capacity", &self.capacity)
            .field("borrow_timeout", &self.borrow_timeout)
            .finish_non_exhaustive()
    }
}

/// Exclusive hold on one pooled engine; returns it to the pool on drop.
pub struct PooledEngine<'a, E: ExpressionEngine> {
    pool: &'a EnginePool<E>,
    engine: Option<E>,
}

impl<E: ExpressionEngine> PooledEngine<'_, E> {
    /// Keep the engine out of the pool entirely.
    pub fn detach(mut self) -> E {
        match self.engine.take() {
            Some(engine) => engine,
            None => unreachable!("pooled engine is only taken on detach or drop"),
        }
    }
}

impl<E: ExpressionEngine> Deref for PooledEngine<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        match self.engine.as_ref() {
            Some(engine) => engine,
            None => unreachable!("pooled engine is only taken on detach or drop"),
        }
    }
}

impl<E: ExpressionEngine> DerefMut for PooledEngine<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        match self.engine.as_mut() {
            Some(engine) => engine,
            None => unreachable!("pooled engine is only taken on detach or drop"),
        }
    }
}

impl<E: ExpressionEngine> Drop for PooledEngine<'_, E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::{EvaluationContext, Value};
    use crate::engine::EngineError;

    use super::*;

    #[derive(Debug)]
    struct StubEngine {
        id: usize,
    }

    impl ExpressionEngine for StubEngine {
        fn evaluate(
            &mut self,
            _expression: &str,
            _context: &EvaluationContext,
        ) -> Result<Value, EngineError> {
            Ok(Value::Boolean(true))
        }
    }

    fn counting_pool(
        capacity: usize,
        timeout: Duration,
    ) -> (EnginePool<StubEngine>, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let pool = EnginePool::new(
            NonZeroUsize::new(capacity).expect("non-zero capacity"),
            timeout,
            move || StubEngine {
                id: counter.fetch_add(1, Ordering::SeqCst),
            },
        );
        (pool, created)
    }

    #[test]
    fn pool_is_prefilled_to_capacity() {
        let (pool, created) = counting_pool(10, Duration::from_millis(10));
        assert_eq!(pool.idle_len(), 10);
        assert_eq!(created.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn guard_returns_engine_on_drop() {
        let (pool, _) = counting_pool(2, Duration::from_millis(10));
        {
            let _engine = pool.borrow();
            assert_eq!(pool.idle_len(), 1);
        }
        assert_eq!(pool.idle_len(), 2);
    }

    #[test]
    fn exhausted_pool_falls_back_after_timeout() {
        let (pool, created) = counting_pool(1, Duration::from_millis(20));
        let first = pool.borrow();

        let started = Instant::now();
        let second = pool.borrow();
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_ne!(first.id, second.id);
        assert_eq!(created.load(Ordering::SeqCst), 2);

        drop(first);
        drop(second);
        assert_eq!(pool.idle_len(), 1);
    }

    #[test]
    fn release_into_full_pool_discards() {
        let (pool, _) = counting_pool(3, Duration::from_millis(10));
        pool.release(StubEngine { id: 99 });
        pool.release(StubEngine { id: 100 });
        assert_eq!(pool.idle_len(), 3);
    }

    #[test]
    fn waiting_borrower_receives_released_engine() {
        let (pool, created) = counting_pool(1, Duration::from_secs(5));
        let held = pool.borrow();
        let held_id = held.id;

        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| pool.borrow().id);
            std::thread::sleep(Duration::from_millis(30));
            drop(held);
            assert_eq!(waiter.join().expect("waiter thread"), held_id);
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_engine_is_not_returned() {
        let (pool, _) = counting_pool(2, Duration::from_millis(10));
        let engine = pool.borrow().detach();
        assert_eq!(pool.idle_len(), 1);
        pool.release(engine);
        assert_eq!(pool.idle_len(), 2);
    }

    #[test]
    fn oversized_timeout_saturates_instead_of_truncating() {
        let (pool, _) = counting_pool(1, Duration::MAX);
        assert_eq!(pool.borrow_timeout_ms(), u64::MAX);

        let (pool, _) = counting_pool(1, Duration::from_millis(1500));
        assert_eq!(pool.borrow_timeout_ms(), 1500);
    }

    #[test]
    fn oversized_timeout_still_hands_out_idle_engines() {
        let (pool, created) = counting_pool(1, Duration::MAX);
        let held = pool.borrow();
        let held_id = held.id;

        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| pool.borrow().id);
            std::thread::sleep(Duration::from_millis(30));
            drop(held);
            assert_eq!(waiter.join().expect("waiter thread"), held_id);
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pool_recovers_from_poisoned_lock() {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let (pool, _) = counting_pool(2, Duration::from_millis(10));
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = pool.idle.lock().expect("idle lock should be acquired");
            panic!("poison idle lock");
        }));

        let engine = pool.borrow();
        assert_eq!(pool.idle_len(), 1);
        drop(engine);
        assert_eq!(pool.idle_len(), 2);
    }
}
