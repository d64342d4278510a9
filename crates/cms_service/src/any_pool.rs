use cms_core::{DbConnection, DbError, PoolConfig, Value};
use cms_driver_mysql::MysqlFactory;
use cms_driver_sqlite::SqliteFactory;
use cms_pool::{Pool, PoolError, PoolStats, PooledConnection};

/// Type-erases over the two backend-specific pools so the service container
/// can hold one without becoming generic itself. Both factories' `Conn` is
/// `Box<dyn DbConnection>`, so the only thing that differs is which factory
/// opened it.
pub enum AnyPool {
    Sqlite(Pool<SqliteFactory>),
    Mysql(Pool<MysqlFactory>),
}

impl AnyPool {
    pub fn acquire(&self) -> Result<AnyGuard<'_>, PoolError> {
        match self {
            AnyPool::Sqlite(pool) => Ok(AnyGuard::Sqlite(pool.acquire()?)),
            AnyPool::Mysql(pool) => Ok(AnyGuard::Mysql(pool.acquire()?)),
        }
    }

    pub fn stats(&self) -> PoolStats {
        match self {
            AnyPool::Sqlite(pool) => pool.stats(),
            AnyPool::Mysql(pool) => pool.stats(),
        }
    }

    pub fn close(&self) {
        match self {
            AnyPool::Sqlite(pool) => pool.close(),
            AnyPool::Mysql(pool) => pool.close(),
        }
    }
}

pub enum AnyGuard<'p> {
    Sqlite(PooledConnection<'p, SqliteFactory>),
    Mysql(PooledConnection<'p, MysqlFactory>),
}

impl AnyGuard<'_> {
    pub fn dialect(&self) -> &'static dyn cms_core::SqlDialect {
        match self {
            AnyGuard::Sqlite(guard) => guard.dialect(),
            AnyGuard::Mysql(guard) => guard.dialect(),
        }
    }

    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<cms_core::QueryOutcome, DbError> {
        match self {
            AnyGuard::Sqlite(guard) => guard.execute(sql, params),
            AnyGuard::Mysql(guard) => guard.execute(sql, params),
        }
    }

    pub fn begin(&mut self) -> Result<(), DbError> {
        match self {
            AnyGuard::Sqlite(guard) => guard.begin(),
            AnyGuard::Mysql(guard) => guard.begin(),
        }
    }

    pub fn commit(&mut self) -> Result<(), DbError> {
        match self {
            AnyGuard::Sqlite(guard) => guard.commit(),
            AnyGuard::Mysql(guard) => guard.commit(),
        }
    }

    pub fn rollback(&mut self) -> Result<(), DbError> {
        match self {
            AnyGuard::Sqlite(guard) => guard.rollback(),
            AnyGuard::Mysql(guard) => guard.rollback(),
        }
    }

    /// Exposes the underlying connection as a trait object, for passing to
    /// the ORM/CRUD layers which are written against `&mut dyn DbConnection`.
    pub fn as_connection(&mut self) -> &mut dyn DbConnection {
        match self {
            AnyGuard::Sqlite(guard) => guard.as_mut(),
            AnyGuard::Mysql(guard) => guard.as_mut(),
        }
    }

    pub fn invalidate(self) {
        match self {
            AnyGuard::Sqlite(guard) => guard.invalidate(),
            AnyGuard::Mysql(guard) => guard.invalidate(),
        }
    }
}

pub fn build_sqlite_pool(file: &str, config: PoolConfig) -> AnyPool {
    AnyPool::Sqlite(Pool::new(SqliteFactory::new(file), config))
}

pub fn build_mysql_pool(
    host: &str,
    port: u16,
    user: &str,
    password: Option<String>,
    database: &str,
    config: PoolConfig,
) -> AnyPool {
    AnyPool::Mysql(Pool::new(MysqlFactory::new(host, port, user, password, database), config))
}
