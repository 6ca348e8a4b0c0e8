//! Shared helpers for tests against a live PostgreSQL.
//!
//! Set `TEST_DATABASE_URL` (or `DATABASE_URL`) to a disposable database.
//! Without it every test here returns early. Each test works on a fresh
//! random pool, so runs never need cleanup.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;

use seatpool_allocator::Allocator;
use seatpool_core::config::DatabaseConfig;
use seatpool_core::types::{PoolId, RequesterId, ResourceId, TenantId};
use seatpool_database::{AssignmentRepository, DatabasePool, GrantRepository, PgAllocationStore};

/// Connection to the test database with migrations applied.
pub struct TestDb {
    /// Pool for direct queries.
    pub pool: PgPool,
    /// Grant writer.
    pub grants: GrantRepository,
    /// Assignment reader.
    pub assignments: AssignmentRepository,
}

impl TestDb {
    /// Connect and migrate, or `None` when no test database is configured.
    pub async fn connect() -> Option<Self> {
        let Some(url) = std::env::var("TEST_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .ok()
        else {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL test");
            return None;
        };

        let config = DatabaseConfig {
            url,
            max_connections: 16,
            min_connections: 1,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 60,
        };
        let db = DatabasePool::connect(&config)
            .await
            .expect("Failed to connect to test database");
        seatpool_database::migration::run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");

        let pool = db.pool().clone();
        Some(Self {
            grants: GrantRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            pool,
        })
    }

    /// Allocation store with the given lock timeout.
    pub fn store(&self, lock_timeout: Option<Duration>) -> PgAllocationStore {
        PgAllocationStore::new(self.pool.clone(), lock_timeout)
    }

    /// Allocator over a store with unbounded lock waits.
    pub fn allocator(&self) -> Allocator {
        Allocator::with_tracing(Arc::new(self.store(None)))
    }

    /// A fresh pool holding one active grant of `seats`.
    pub async fn pool_with_seats(&self, seats: i32) -> PoolId {
        let pool = new_pool();
        let now = Utc::now();
        self.grants
            .create(
                &pool,
                seats,
                now - ChronoDuration::days(1),
                now + ChronoDuration::days(30),
            )
            .await
            .expect("grant");
        pool
    }

    /// Assignment rows stored for `pool`.
    pub async fn stored(&self, pool: &PoolId) -> u64 {
        self.assignments.count_for_pool(pool).await.expect("count")
    }
}

/// A pool with random identifiers.
pub fn new_pool() -> PoolId {
    PoolId::new(TenantId::new(), ResourceId::new())
}

/// `n` fresh requester IDs.
pub fn requesters(n: usize) -> Vec<RequesterId> {
    (0..n).map(|_| RequesterId::new()).collect()
}
