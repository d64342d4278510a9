use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use cms_core::PoolConfig;

use crate::error::PoolError;
use crate::stats::PoolStats;

/// Skip a health check on a connection that returned to idle less than this long ago.
const IDLE_HEALTH_CHECK_THRESHOLD: Duration = Duration::from_secs(30);

/// Opens and health-checks the connections a [`Pool`] manages.
///
/// Implemented once per backend (see `cms_driver_mysql`/`cms_driver_sqlite`); the
/// pool itself is backend-agnostic.
pub trait ConnectionFactory: Send + Sync {
    type Conn: Send;

    fn open(&self) -> Result<Self::Conn, PoolError>;

    /// Cheap liveness probe. Returning `false` causes the pool to discard the
    /// connection and open a replacement.
    fn ping(&self, conn: &mut Self::Conn) -> bool;
}

struct IdleConn<C> {
    conn: C,
    idled_at: Instant,
}

struct Inner<C> {
    idle: Vec<IdleConn<C>>,
    active_count: u32,
    total_count: u32,
    closed: bool,
    stats: PoolStats,
}

/// A bounded set of live database sessions shared by every caller, serving
/// `acquire` under contention with a deadline and retrying transient open
/// failures with backoff. Built on `std::sync::{Mutex, Condvar}`: the pool does
/// not assume a cooperative scheduler.
pub struct Pool<F: ConnectionFactory> {
    factory: F,
    config: PoolConfig,
    inner: Mutex<Inner<F::Conn>>,
    condvar: Condvar,
}

impl<F: ConnectionFactory> Pool<F> {
    pub fn new(factory: F, config: PoolConfig) -> Self {
        let pool = Self {
            factory,
            config,
            inner: Mutex::new(Inner {
                idle: Vec::new(),
                active_count: 0,
                total_count: 0,
                closed: false,
                stats: PoolStats::default(),
            }),
            condvar: Condvar::new(),
        };
        pool.prewarm();
        pool
    }

    fn prewarm(&self) {
        let mut guard = self.inner.lock().expect("pool mutex poisoned");
        for _ in 0..self.config.min_size {
            match self.factory.open() {
                Ok(conn) => {
                    guard.idle.push(IdleConn { conn, idled_at: Instant::now() });
                    guard.total_count += 1;
                    guard.stats.creates += 1;
                }
                Err(e) => {
                    log::warn!("[POOL] pre-warm connection failed, continuing lazily: {e}");
                    break;
                }
            }
        }
    }

    /// Acquires a connection, blocking up to `acquire_timeout_ms` if the pool is
    /// saturated. See module docs for the full acquire policy.
    pub fn acquire(&self) -> Result<PooledConnection<'_, F>, PoolError> {
        let deadline = Instant::now() + Duration::from_millis(self.config.acquire_timeout_ms);
        let mut guard = self.inner.lock().expect("pool mutex poisoned");

        loop {
            if guard.closed {
                return Err(PoolError::PoolClosed);
            }

            while let Some(mut idle) = guard.idle.pop() {
                let needs_check = idle.idled_at.elapsed() >= IDLE_HEALTH_CHECK_THRESHOLD;
                let healthy = !needs_check || self.factory.ping(&mut idle.conn);
                if healthy {
                    guard.active_count += 1;
                    guard.stats.acquires += 1;
                    guard.stats.hits += 1;
                    return Ok(PooledConnection { pool: self, conn: Some(idle.conn) });
                }
                guard.total_count -= 1;
                guard.stats.destroys += 1;
                log::warn!("[POOL] discarding unhealthy idle connection");
            }

            if guard.total_count < self.config.max_size {
                match self.open_with_retry() {
                    Ok(conn) => {
                        guard.total_count += 1;
                        guard.active_count += 1;
                        guard.stats.creates += 1;
                        guard.stats.acquires += 1;
                        return Ok(PooledConnection { pool: self, conn: Some(conn) });
                    }
                    Err(e) => return Err(e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                guard.stats.timeouts += 1;
                return Err(PoolError::AcquireTimeout {
                    waited_ms: self.config.acquire_timeout_ms,
                });
            }
            guard.stats.waits += 1;
            let (g, timed_out) = self
                .condvar
                .wait_timeout(guard, deadline - now)
                .expect("pool mutex poisoned");
            guard = g;
            if timed_out.timed_out() && guard.idle.is_empty() && guard.total_count >= self.config.max_size {
                guard.stats.timeouts += 1;
                return Err(PoolError::AcquireTimeout {
                    waited_ms: self.config.acquire_timeout_ms,
                });
            }
        }
    }

    fn open_with_retry(&self) -> Result<F::Conn, PoolError> {
        let mut attempt = 0;
        loop {
            match self.factory.open() {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt < self.config.max_retry => {
                    let backoff = self.config.retry_backoff_ms.saturating_mul(1 << attempt);
                    log::warn!(
                        "[POOL] connect attempt {} failed, retrying in {}ms: {}",
                        attempt + 1,
                        backoff,
                        e
                    );
                    std::thread::sleep(Duration::from_millis(backoff));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn release(&self, conn: F::Conn, broken: bool) {
        let mut guard = self.inner.lock().expect("pool mutex poisoned");
        guard.active_count -= 1;
        guard.stats.releases += 1;

        if broken || guard.closed || guard.total_count > self.config.max_size {
            guard.total_count -= 1;
            guard.stats.destroys += 1;
        } else {
            guard.idle.push(IdleConn { conn, idled_at: Instant::now() });
        }

        self.reap_idle(&mut guard);
        self.condvar.notify_one();
    }

    fn reap_idle(&self, guard: &mut Inner<F::Conn>) {
        if self.config.idle_timeout_ms == 0 {
            return;
        }
        let timeout = Duration::from_millis(self.config.idle_timeout_ms);
        let before = guard.idle.len();
        guard.idle.retain(|entry| entry.idled_at.elapsed() < timeout);
        let reaped = before - guard.idle.len();
        guard.total_count -= reaped as u32;
        guard.stats.destroys += reaped as u64;
    }

    pub fn stats(&self) -> PoolStats {
        let guard = self.inner.lock().expect("pool mutex poisoned");
        PoolStats {
            active_count: guard.active_count,
            idle_count: guard.idle.len() as u32,
            total_count: guard.total_count,
            ..guard.stats
        }
    }

    /// Stops serving new acquisitions; outstanding connections are still released
    /// normally but destroyed rather than returned to idle.
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("pool mutex poisoned");
        guard.closed = true;
        guard.total_count -= guard.idle.len() as u32;
        guard.stats.destroys += guard.idle.len() as u64;
        guard.idle.clear();
        self.condvar.notify_all();
    }
}

/// An acquired connection. Returns itself to the pool on drop; call
/// [`PooledConnection::invalidate`] instead when the connection is known to be
/// broken (e.g. after a driver-reported fatal error).
pub struct PooledConnection<'p, F: ConnectionFactory> {
    pool: &'p Pool<F>,
    conn: Option<F::Conn>,
}

impl<F: ConnectionFactory> PooledConnection<'_, F> {
    pub fn invalidate(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, true);
        }
    }
}

impl<F: ConnectionFactory> std::ops::Deref for PooledConnection<'_, F> {
    type Target = F::Conn;
    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection taken")
    }
}

impl<F: ConnectionFactory> std::ops::DerefMut for PooledConnection<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection taken")
    }
}

impl<F: ConnectionFactory> Drop for PooledConnection<'_, F> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingFactory {
        opened: AtomicU32,
        fail_first_n: u32,
    }

    impl ConnectionFactory for CountingFactory {
        type Conn = u32;

        fn open(&self) -> Result<Self::Conn, PoolError> {
            let n = self.opened.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first_n {
                return Err(PoolError::ConnectFailed("simulated".into()));
            }
            Ok(n)
        }

        fn ping(&self, _conn: &mut Self::Conn) -> bool {
            true
        }
    }

    fn test_config(max_size: u32) -> PoolConfig {
        PoolConfig {
            max_size,
            min_size: 0,
            acquire_timeout_ms: 100,
            idle_timeout_ms: 0,
            max_retry: 3,
            retry_backoff_ms: 1,
        }
    }

    #[test]
    fn acquire_and_release_preserve_conservation() {
        let pool = Pool::new(CountingFactory { opened: AtomicU32::new(0), fail_first_n: 0 }, test_config(2));
        let c1 = pool.acquire().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.active_count + stats.idle_count, stats.total_count);
        assert_eq!(stats.active_count, 1);
        drop(c1);
        let stats = pool.stats();
        assert_eq!(stats.active_count, 0);
        assert_eq!(stats.idle_count, 1);
    }

    #[test]
    fn saturated_pool_times_out() {
        let pool = Pool::new(CountingFactory { opened: AtomicU32::new(0), fail_first_n: 0 }, test_config(1));
        let _c1 = pool.acquire().unwrap();
        let start = Instant::now();
        let result = pool.acquire();
        assert!(matches!(result, Err(PoolError::AcquireTimeout { .. })));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn release_wakes_a_waiter() {
        let pool = Arc::new(Pool::new(
            CountingFactory { opened: AtomicU32::new(0), fail_first_n: 0 },
            test_config(1),
        ));
        let c1 = pool.acquire().unwrap();
        let pool2 = pool.clone();
        let handle = std::thread::spawn(move || pool2.acquire().is_ok());
        std::thread::sleep(Duration::from_millis(20));
        drop(c1);
        assert!(handle.join().unwrap());
    }

    #[test]
    fn transient_open_failures_are_retried() {
        let pool = Pool::new(
            CountingFactory { opened: AtomicU32::new(0), fail_first_n: 2 },
            test_config(1),
        );
        // first two opens fail, third succeeds, all within max_retry=3
        let conn = pool.acquire().unwrap();
        assert_eq!(*conn, 2);
    }

    #[test]
    fn total_never_exceeds_max_size() {
        let pool = Pool::new(CountingFactory { opened: AtomicU32::new(0), fail_first_n: 0 }, test_config(2));
        let c1 = pool.acquire().unwrap();
        let c2 = pool.acquire().unwrap();
        assert_eq!(pool.stats().total_count, 2);
        drop(c1);
        drop(c2);
        assert!(pool.stats().total_count <= 2);
    }
}
