//! Integration tests for the action repository state machine.

mod common;

use warden::adapters::sqlite::SqliteActionRepository;
use warden::domain::errors::DomainError;
use warden::domain::models::ActionStatus;
use warden::domain::ports::{ActionFilter, ActionRepository};

async fn repo() -> SqliteActionRepository {
    SqliteActionRepository::new(common::migrated_pool().await)
}

#[tokio::test]
async fn create_assigns_monotonic_ids_and_pending_status() {
    let repo = repo().await;
    let first = repo.create("web-1", "restart", None).await.unwrap();
    let second = repo.create("web-2", "scale-up", None).await.unwrap();

    assert!(second.id > first.id);
    assert_eq!(first.status, ActionStatus::Pending);
    assert_eq!(first.attempts, 1);
    assert!(first.last_error.is_none());
}

#[tokio::test]
async fn create_validates_field_lengths() {
    let repo = repo().await;
    assert!(matches!(
        repo.create("", "restart", None).await,
        Err(DomainError::Validation(_))
    ));
    let oversized = "x".repeat(256);
    assert!(matches!(
        repo.create("web-1", &oversized, None).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn claim_wins_exactly_once() {
    let repo = repo().await;
    let record = repo.create("web-1", "restart", None).await.unwrap();

    let claimed = repo.claim(record.id).await.unwrap();
    assert_eq!(claimed.status, ActionStatus::Running);

    // A second claim observes the running record and loses.
    assert!(matches!(
        repo.claim(record.id).await,
        Err(DomainError::Conflict { .. })
    ));
}

#[tokio::test]
async fn claim_of_missing_record_is_not_found() {
    let repo = repo().await;
    assert!(matches!(
        repo.claim(999).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn lifecycle_follows_the_dag() {
    let repo = repo().await;

    // pending -> running -> completed
    let done = repo.create("web-1", "restart", None).await.unwrap();
    repo.claim(done.id).await.unwrap();
    repo.mark_completed(done.id, Some("restarted")).await.unwrap();
    let done = repo.get(done.id).await.unwrap();
    assert_eq!(done.status, ActionStatus::Completed);
    assert_eq!(done.details.as_deref(), Some("restarted"));

    // Terminal states refuse further transitions.
    assert!(matches!(
        repo.claim(done.id).await,
        Err(DomainError::Conflict { .. })
    ));
    assert!(matches!(
        repo.mark_failed(done.id, "late").await,
        Err(DomainError::Conflict { .. })
    ));

    // pending -> running -> pending (retry) increments attempts
    let retried = repo.create("web-2", "restart", None).await.unwrap();
    repo.claim(retried.id).await.unwrap();
    repo.mark_pending_retry(retried.id, "503").await.unwrap();
    let retried = repo.get(retried.id).await.unwrap();
    assert_eq!(retried.status, ActionStatus::Pending);
    assert_eq!(retried.attempts, 2);
    assert_eq!(retried.last_error.as_deref(), Some("503"));

    // pending -> cancelled
    let cancelled = repo.create("web-3", "restart", None).await.unwrap();
    repo.cancel(cancelled.id).await.unwrap();
    assert_eq!(
        repo.get(cancelled.id).await.unwrap().status,
        ActionStatus::Cancelled
    );

    // running records cannot be cancelled
    let running = repo.create("web-4", "restart", None).await.unwrap();
    repo.claim(running.id).await.unwrap();
    assert!(matches!(
        repo.cancel(running.id).await,
        Err(DomainError::Conflict { .. })
    ));
}

#[tokio::test]
async fn list_is_newest_first_and_filtered() {
    let repo = repo().await;
    let a = repo.create("web-1", "restart", None).await.unwrap();
    let b = repo.create("db-1", "drain-pod", None).await.unwrap();
    let c = repo.create("web-1", "scale-up", None).await.unwrap();
    repo.claim(b.id).await.unwrap();
    repo.mark_failed(b.id, "boom").await.unwrap();

    let all = repo.list(ActionFilter::default()).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);

    let web = repo
        .list(ActionFilter {
            target: Some("web-1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(web.len(), 2);

    let failed = repo
        .list(ActionFilter {
            status: Some(ActionStatus::Failed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, b.id);

    let limited = repo
        .list(ActionFilter {
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, c.id);
}

#[tokio::test]
async fn count_by_status_groups_records() {
    let repo = repo().await;
    for _ in 0..3 {
        repo.create("web-1", "restart", None).await.unwrap();
    }
    let running = repo.create("web-2", "restart", None).await.unwrap();
    repo.claim(running.id).await.unwrap();

    let counts = repo.count_by_status().await.unwrap();
    assert_eq!(counts.get(&ActionStatus::Pending), Some(&3));
    assert_eq!(counts.get(&ActionStatus::Running), Some(&1));
    assert_eq!(counts.get(&ActionStatus::Completed), None);
}

#[tokio::test]
async fn concurrent_claims_resolve_to_one_winner() {
    let repo = std::sync::Arc::new(repo().await);
    let record = repo.create("web-1", "restart", None).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let id = record.id;
        handles.push(tokio::spawn(async move { repo.claim(id).await.is_ok() }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
