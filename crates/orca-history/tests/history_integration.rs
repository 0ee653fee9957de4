#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use orca_core::{TaskErrorKind, TaskType};
use orca_history::{ExecutionLogStore, ExecutionOutcome, ExecutionRecord, FileLogStore};
use std::sync::Arc;
use uuid::Uuid;

/// Helper: create a FileLogStore in a temp directory.
async fn temp_store() -> (FileLogStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileLogStore::new(tmp.path().join("history")).await.unwrap();
    (store, tmp)
}

#[tokio::test]
async fn test_append_and_query() {
    let (store, _tmp) = temp_store().await;
    let task_id = Uuid::new_v4();

    store
        .append(ExecutionRecord::success(
            task_id,
            "seo-writer",
            TaskType::ContentGeneration,
            850,
        ))
        .await
        .unwrap();
    store
        .append(ExecutionRecord::failure(
            Uuid::new_v4(),
            "voice-deployer",
            TaskType::VoiceAgentDeployment,
            TaskErrorKind::AgentInvocation,
            "platform rejected script",
            120,
        ))
        .await
        .unwrap();

    let records = store
        .query(Utc::now() - Duration::minutes(5), Utc::now())
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].task_id, task_id);
    assert_eq!(records[0].outcome, ExecutionOutcome::Success);
    assert_eq!(records[1].outcome, ExecutionOutcome::Failure);
    assert_eq!(
        records[1].message.as_deref(),
        Some("platform rejected script")
    );
}

#[tokio::test]
async fn test_window_excludes_old_records() {
    let (store, _tmp) = temp_store().await;
    let now = Utc::now();

    store
        .append(
            ExecutionRecord::success(Uuid::new_v4(), "old", TaskType::CompetitorAnalysis, 5)
                .at(now - Duration::days(3)),
        )
        .await
        .unwrap();
    store
        .append(ExecutionRecord::success(
            Uuid::new_v4(),
            "fresh",
            TaskType::CompetitorAnalysis,
            5,
        ))
        .await
        .unwrap();

    let last_day = store
        .query(now - Duration::hours(24), Utc::now())
        .await
        .unwrap();
    assert_eq!(last_day.len(), 1);
    assert_eq!(last_day[0].agent_name, "fresh");

    let last_week = store
        .query(now - Duration::days(7), Utc::now())
        .await
        .unwrap();
    assert_eq!(last_week.len(), 2);
}

#[tokio::test]
async fn test_persistence_across_store_instances() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_path_buf();

    {
        let store = FileLogStore::new(dir.clone()).await.unwrap();
        store
            .append(ExecutionRecord::success(
                Uuid::new_v4(),
                "persisted",
                TaskType::ContentGeneration,
                42,
            ))
            .await
            .unwrap();
    }

    let store2 = FileLogStore::new(dir).await.unwrap();
    let records = store2
        .query(Utc::now() - Duration::hours(1), Utc::now())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].agent_name, "persisted");
    assert_eq!(records[0].duration_ms, 42);
}

#[tokio::test]
async fn test_concurrent_appends_keep_every_line() {
    let (store, _tmp) = temp_store().await;
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append(ExecutionRecord::success(
                    Uuid::new_v4(),
                    format!("agent-{}", i % 4),
                    TaskType::ContentGeneration,
                    i,
                ))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let records = store
        .query(Utc::now() - Duration::minutes(1), Utc::now())
        .await
        .unwrap();
    assert_eq!(records.len(), 20);
}
