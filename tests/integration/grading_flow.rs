//! Grade a week of picks through the service layer and read the
//! leaderboards back.

use capper_tracker::leaderboard::{LeaderboardOptions, LeaderboardWindow};
use capper_tracker::service::{
    grade_batch, grade_pick_by_id, leaderboard_for, GradeRequest, WebhookGrade,
};
use capper_tracker::storage::{JsonStore, PickFilter, PickRepository};
use capper_tracker::types::{PickResult, PickSource};

use crate::fixtures::{self, PickSeed};

/// Two cappers with a mix of graded, old and pending picks.
/// Sharp Edge: +0.67, -1.00, +1.82 this week and +2.00 sixty days ago.
/// Fade Machine: one push this week and one pending pick.
async fn seeded_store() -> (JsonStore, String, String) {
    let store = JsonStore::in_memory();
    let sharp = fixtures::capper(&store, "sharp", "Sharp Edge").await;
    let fade = fixtures::capper(&store, "fade", "Fade Machine").await;

    let p1 = fixtures::pick(&store, sharp.id, PickSeed::moneyline("Celtics", -150, 1)).await;
    let p2 = fixtures::pick(&store, sharp.id, PickSeed::spread("Heat", 4.5, 2)).await;
    let under = PickSeed::total("Under", 210.5, 3).stake(Some(2.0));
    let p3 = fixtures::pick(&store, sharp.id, under).await;
    let p4 = fixtures::pick(&store, sharp.id, PickSeed::moneyline("Heat", 200, 60)).await;
    let q1 = fixtures::pick(&store, fade.id, PickSeed::spread("Celtics", -10.0, 1)).await;
    fixtures::pick(&store, fade.id, PickSeed::moneyline("Heat", 130, 1)).await;

    let celtics_by_ten = GradeRequest::new(110.0, 100.0);
    for id in [p1.id, p2.id, p3.id] {
        grade_pick_by_id(&store, id, &celtics_by_ten, PickSource::Manual)
            .await
            .unwrap();
    }

    let batch = vec![
        WebhookGrade { pick_id: p4.id, request: GradeRequest::new(100.0, 110.0) },
        WebhookGrade { pick_id: q1.id, request: celtics_by_ten.clone() },
    ];
    tokio_test::assert_ok!(grade_batch(&store, &batch).await);

    (store, sharp.id.to_string(), fade.id.to_string())
}

#[tokio::test]
async fn test_graded_results_persist() {
    let (store, _, _) = seeded_store().await;

    let graded = store
        .list_picks(&PickFilter { result: Some(PickResult::Win), ..Default::default() })
        .await
        .unwrap();
    let mut profits: Vec<f64> = graded.iter().filter_map(|p| p.profit).collect();
    profits.sort_by(f64::total_cmp);
    assert_eq!(profits, vec![0.67, 1.82, 2.0]);

    let pushes = store
        .list_picks(&PickFilter { result: Some(PickResult::Push), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].source, PickSource::Webhook);
    assert_eq!(pushes[0].profit, Some(0.0));

    let pending = store
        .list_picks(&PickFilter { result: Some(PickResult::Pending), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].graded_at.is_none());
}

#[tokio::test]
async fn test_weekly_leaderboard() {
    let (store, sharp, fade) = seeded_store().await;

    let options = LeaderboardOptions::new(LeaderboardWindow::Last7Days).at(fixtures::now());
    let rows = leaderboard_for(&store, &options).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].capper_id, sharp);
    assert_eq!(rows[0].profit, 1.49);
    assert_eq!((rows[0].wins, rows[0].losses, rows[0].pushes), (2, 1, 0));
    assert_eq!(rows[0].picks, 3);
    assert!((rows[0].roi - 1.49 / 4.0).abs() < 1e-9);

    assert_eq!(rows[1].capper_id, fade);
    assert_eq!(rows[1].profit, 0.0);
    assert_eq!(rows[1].pushes, 1);
    assert_eq!(rows[1].picks, 1);
    assert_eq!(rows[1].average_odds, Some(-110.0));
}

#[tokio::test]
async fn test_window_boundaries() {
    let (store, sharp, _) = seeded_store().await;

    let options = LeaderboardOptions::new(LeaderboardWindow::AllTime).at(fixtures::now());
    let all = leaderboard_for(&store, &options).await.unwrap();
    assert_eq!(all[0].capper_id, sharp);
    assert_eq!(all[0].profit, 3.49);
    assert_eq!(all[0].picks, 4);

    let options = LeaderboardOptions::new(LeaderboardWindow::Yesterday).at(fixtures::now());
    let yesterday = leaderboard_for(&store, &options).await.unwrap();
    assert_eq!(yesterday.len(), 2);
    assert_eq!(yesterday[0].capper_id, sharp);
    assert_eq!(yesterday[0].profit, 0.67);
    assert_eq!(yesterday[0].picks, 1);
}

#[tokio::test]
async fn test_regrade_with_override_is_audited() {
    let store = JsonStore::in_memory();
    let capper = fixtures::capper(&store, "liner", "Line Mover").await;
    let pick = fixtures::pick(&store, capper.id, PickSeed::spread("Celtics", -10.5, 1)).await;

    let request = GradeRequest::new(110.0, 100.0);
    let first = grade_pick_by_id(&store, pick.id, &request, PickSource::Manual)
        .await
        .unwrap();
    assert_eq!(first.result, PickResult::Loss);

    // Closing line was actually -10: regrade as a push
    let mut corrected = GradeRequest::new(110.0, 100.0);
    corrected.overrides.listed_spread_or_total = Some(Some(-10.0));
    let second = grade_pick_by_id(&store, pick.id, &corrected, PickSource::Api)
        .await
        .unwrap();
    assert_eq!(second.result, PickResult::Push);
    assert_eq!(second.profit, Some(0.0));
    assert_eq!(second.source, PickSource::Api);

    let logs = store.grade_logs(pick.id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].payload["listed_spread_or_total"], -10.0);
}

#[test]
fn test_unstaked_pick_counts_one_unit() {
    tokio_test::block_on(async {
        let store = JsonStore::in_memory();
        let capper = fixtures::capper(&store, "nostake", "No Stake").await;
        let seed = PickSeed::moneyline("Celtics", 120, 1).stake(None);
        let pick = fixtures::pick(&store, capper.id, seed).await;

        let request = GradeRequest::new(99.0, 98.0);
        let graded = grade_pick_by_id(&store, pick.id, &request, PickSource::Manual)
            .await
            .unwrap();
        assert_eq!(graded.profit, Some(1.2));
        assert_eq!(graded.stake, None);

        let options = LeaderboardOptions::new(LeaderboardWindow::Last7Days).at(fixtures::now());
        let rows = leaderboard_for(&store, &options).await.unwrap();
        assert_eq!(rows[0].average_stake, Some(1.0));
        assert!((rows[0].roi - 1.2).abs() < 1e-9);
    });
}
