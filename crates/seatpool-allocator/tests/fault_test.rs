//! Storage failures and sink failures during allocation.

mod helpers;

use std::sync::Arc;

use seatpool_allocator::{
    AllocationError, AllocationEvent, AllocationEventSink, Allocator, AssignRequest,
    MemoryAllocationStore,
};
use seatpool_core::error::{AppError, ErrorKind};
use seatpool_core::result::AppResult;
use seatpool_core::types::AllocationPolicy;
use seatpool_entity::allocation::AssignOutcome;

use helpers::{Fault, FaultPoint, FaultyStore, add_active_grant, new_pool, requesters};

const ALL_POINTS: [FaultPoint; 6] = [
    FaultPoint::Begin,
    FaultPoint::LockPool,
    FaultPoint::LiveHolderIds,
    FaultPoint::ActiveCapacity,
    FaultPoint::InsertAssignments,
    FaultPoint::Commit,
];

#[tokio::test]
async fn test_failure_at_any_step_writes_nothing() {
    for point in ALL_POINTS {
        let store = MemoryAllocationStore::new();
        let pool = new_pool();
        add_active_grant(&store, &pool, 5).await;

        let faulty = Allocator::with_tracing(Arc::new(FaultyStore::new(
            store.clone(),
            Fault::Fail(point),
        )));
        let request = AssignRequest {
            pool,
            requesters: requesters(3),
            policy: AllocationPolicy::AllOrNothing,
        };

        let err = faulty.assign(&request).await.unwrap_err();
        match &err {
            AllocationError::Storage(inner) => assert_eq!(inner.kind, ErrorKind::Database),
            other => panic!("{point:?}: expected storage error, got {other:?}"),
        }
        assert!(!err.is_retryable());
        assert!(
            store.assignments(&pool).await.is_empty(),
            "{point:?}: rows leaked"
        );
        assert_eq!(
            store.lock_table().active_keys(),
            0,
            "{point:?}: lock leaked"
        );

        let healthy = Allocator::with_tracing(Arc::new(store.clone()));
        let result = healthy
            .assign(&request)
            .await
            .unwrap_or_else(|e| panic!("{point:?}: retry failed: {e}"));
        assert_eq!(result.assigned, request.requesters);
    }
}

#[derive(Debug)]
struct BrokenSink;

impl AllocationEventSink for BrokenSink {
    fn emit(&self, event: &AllocationEvent) -> AppResult<()> {
        Err(AppError::internal(format!("sink refused {}", event.name())))
    }
}

#[tokio::test]
async fn test_failing_event_sink_does_not_change_outcome() {
    let store = MemoryAllocationStore::new();
    let pool = new_pool();
    add_active_grant(&store, &pool, 2).await;
    let allocator = Allocator::new(Arc::new(store.clone()), Arc::new(BrokenSink));

    let ids = requesters(3);
    let result = allocator
        .assign(&AssignRequest {
            pool,
            requesters: ids.clone(),
            policy: AllocationPolicy::PartialFill,
        })
        .await
        .expect("assign");

    assert_eq!(result.assigned, ids[..2].to_vec());
    assert_eq!(result.overflow, ids[2..].to_vec());
    assert_eq!(result.outcome, AssignOutcome::Partial);
    assert_eq!(store.assignments(&pool).await.len(), 2);
}
