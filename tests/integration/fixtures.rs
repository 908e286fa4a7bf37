//! Shared fixtures: a seeded in-memory store with deterministic picks.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use capper_tracker::service::cappers::{create_capper, NewCapper};
use capper_tracker::service::picks::{create_pick, NewPick};
use capper_tracker::storage::JsonStore;
use capper_tracker::types::{Capper, Pick, PickType};

/// Fixed "now" so window filtering is reproducible.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub async fn capper(store: &JsonStore, name: &str, display_name: &str) -> Capper {
    create_capper(
        store,
        NewCapper {
            name: name.into(),
            display_name: display_name.into(),
            bio: None,
            avatar_url: None,
            join_date: None,
            active: None,
        },
    )
    .await
    .unwrap()
}

pub struct PickSeed {
    pub pick_type: PickType,
    pub side: &'static str,
    pub price: i32,
    pub line: Option<f64>,
    pub stake: Option<f64>,
    pub days_ago: i64,
}

impl PickSeed {
    pub fn moneyline(side: &'static str, price: i32, days_ago: i64) -> Self {
        Self {
            pick_type: PickType::Moneyline,
            side,
            price,
            line: None,
            stake: Some(1.0),
            days_ago,
        }
    }

    pub fn spread(side: &'static str, line: f64, days_ago: i64) -> Self {
        Self {
            pick_type: PickType::Spread,
            side,
            price: -110,
            line: Some(line),
            stake: Some(1.0),
            days_ago,
        }
    }

    pub fn total(side: &'static str, line: f64, days_ago: i64) -> Self {
        Self {
            pick_type: PickType::Total,
            side,
            price: -110,
            line: Some(line),
            stake: Some(1.0),
            days_ago,
        }
    }

    pub fn stake(mut self, stake: Option<f64>) -> Self {
        self.stake = stake;
        self
    }
}

/// Celtics (home) vs Heat (away).
pub async fn pick(store: &JsonStore, capper_id: Uuid, seed: PickSeed) -> Pick {
    let posted_at = now() - Duration::days(seed.days_ago);
    create_pick(
        store,
        NewPick {
            capper_id,
            sport: "NBA".into(),
            home_team: "Celtics".into(),
            away_team: "Heat".into(),
            pick_type: seed.pick_type,
            pick_side: seed.side.into(),
            pick_price: seed.price,
            listed_spread_or_total: seed.line,
            stake: seed.stake,
            posted_at,
            event_date: posted_at + Duration::hours(4),
            notes: None,
        },
    )
    .await
    .unwrap()
}
