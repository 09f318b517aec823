use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Source of the current time, swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
struct Slot<T> {
    value: Arc<T>,
    loaded_at: DateTime<Utc>,
}

/// Single-value cache that reloads once its entry is older than the TTL.
#[derive(Debug)]
pub struct TtlCache<T, C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    slot: Mutex<Option<Slot<T>>>,
}

impl<T> TtlCache<T, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<T, C: Clock> TtlCache<T, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Slot<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value, or the result of `load` when the slot is empty or stale.
    /// A failed load leaves the previous slot untouched.
    pub fn get_or_try_load<E, F>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut slot = self.lock();
        let now = self.clock.now();

        if let Some(cached) = slot.as_ref() {
            if now - cached.loaded_at < self.ttl {
                tracing::debug!("report cache hit");
                return Ok(Arc::clone(&cached.value));
            }
        }

        tracing::debug!("report cache miss");
        let value = Arc::new(load()?);
        *slot = Some(Slot {
            value: Arc::clone(&value),
            loaded_at: now,
        });
        Ok(value)
    }

    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock advanced by hand.
    #[derive(Debug, Default)]
    pub(crate) struct ManualClock {
        seconds: AtomicI64,
    }

    impl ManualClock {
        pub(crate) fn advance(&self, seconds: i64) {
            self.seconds.fetch_add(seconds, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(1_700_000_000 + self.seconds.load(Ordering::SeqCst), 0)
                .single()
                .expect("valid timestamp")
        }
    }

    impl Clock for Arc<ManualClock> {
        fn now(&self) -> DateTime<Utc> {
            self.as_ref().now()
        }
    }

    #[test]
    fn reloads_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::with_clock(Duration::seconds(60), Arc::clone(&clock));
        let mut loads = 0;

        let first = cache
            .get_or_try_load(|| -> Result<u32, ()> {
                loads += 1;
                Ok(1)
            })
            .expect("load");
        assert_eq!(*first, 1);

        clock.advance(59);
        let cached = cache
            .get_or_try_load(|| -> Result<u32, ()> {
                loads += 1;
                Ok(2)
            })
            .expect("cached");
        assert_eq!(*cached, 1);

        clock.advance(1);
        let reloaded = cache
            .get_or_try_load(|| -> Result<u32, ()> {
                loads += 1;
                Ok(3)
            })
            .expect("reload");
        assert_eq!(*reloaded, 3);
        assert_eq!(loads, 2);
    }

    #[test]
    fn invalidate_forces_reload_and_errors_are_not_cached() {
        let cache = TtlCache::with_clock(Duration::seconds(300), ManualClock::default());
        let failed: Result<Arc<u32>, &str> = cache.get_or_try_load(|| Err("boom"));
        assert_eq!(failed.err(), Some("boom"));
        assert!(!cache.is_loaded());

        cache
            .get_or_try_load(|| -> Result<u32, ()> { Ok(7) })
            .expect("load");
        assert!(cache.is_loaded());
        cache.invalidate();
        assert!(!cache.is_loaded());

        let value = cache
            .get_or_try_load(|| -> Result<u32, ()> { Ok(8) })
            .expect("reload");
        assert_eq!(*value, 8);
    }
}
