//! File-backed store survives a restart.

use std::path::PathBuf;
use uuid::Uuid;

use capper_tracker::service::cappers::delete_capper;
use capper_tracker::service::{grade_pick_by_id, GradeRequest};
use capper_tracker::storage::{JsonStore, PickFilter, PickRepository};
use capper_tracker::types::{PickResult, PickSource};

use crate::fixtures::{self, PickSeed};

fn temp_path() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("capper_it_store_{}.json", Uuid::new_v4()));
    p
}

#[tokio::test]
async fn test_reopen_restores_grades_and_logs() {
    let path = temp_path();

    let pick_id = {
        let store = JsonStore::open(&path).await.unwrap();
        let capper = fixtures::capper(&store, "disk", "Disk Bound").await;
        let pick = fixtures::pick(&store, capper.id, PickSeed::total("Over", 205.5, 1)).await;
        grade_pick_by_id(&store, pick.id, &GradeRequest::new(110.0, 100.0), PickSource::Manual)
            .await
            .unwrap();
        pick.id
    };

    let reopened = JsonStore::open(&path).await.unwrap();
    let pick = reopened.get_pick(pick_id).await.unwrap().unwrap();
    assert_eq!(pick.result, PickResult::Win);
    assert_eq!(pick.profit, Some(0.91));
    assert_eq!(reopened.grade_logs(pick_id).await.unwrap().len(), 1);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_capper_delete_cascades_on_disk() {
    let path = temp_path();

    let capper_id = {
        let store = JsonStore::open(&path).await.unwrap();
        let capper = fixtures::capper(&store, "gone", "Soon Gone").await;
        let pick = fixtures::pick(&store, capper.id, PickSeed::moneyline("Heat", 140, 2)).await;
        grade_pick_by_id(&store, pick.id, &GradeRequest::new(90.0, 100.0), PickSource::Manual)
            .await
            .unwrap();
        delete_capper(&store, capper.id).await.unwrap();
        capper.id
    };

    let reopened = JsonStore::open(&path).await.unwrap();
    assert!(reopened.get_capper(capper_id).await.unwrap().is_none());
    assert!(reopened.list_picks(&PickFilter::default()).await.unwrap().is_empty());
    assert!(reopened.snapshot().await.grade_logs.is_empty());

    let _ = std::fs::remove_file(&path);
}
