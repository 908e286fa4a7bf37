//! Persistence layer.
//!
//! Defines the `PickRepository` trait used by the service layer and a
//! JSON-file-backed implementation. The whole store (cappers, picks, grade
//! log) is held in memory behind a lock and flushed to disk after every
//! mutation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{Capper, GradeLogEntry, Pick, PickResult, PickType};

/// Default store file path.
pub const DEFAULT_STORE_FILE: &str = "capper_store.json";

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Criteria for listing picks. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickFilter {
    pub capper_id: Option<Uuid>,
    pub pick_type: Option<PickType>,
    pub result: Option<PickResult>,
    /// Inclusive lower bound on `posted_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `posted_at`
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl PickFilter {
    pub fn matches(&self, pick: &Pick) -> bool {
        self.capper_id.map_or(true, |id| pick.capper_id == id)
            && self.pick_type.map_or(true, |t| pick.pick_type == t)
            && self.result.map_or(true, |r| pick.result == r)
            && self.from.map_or(true, |from| pick.posted_at >= from)
            && self.to.map_or(true, |to| pick.posted_at <= to)
    }
}

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// Storage seam for cappers, picks and the grade audit log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PickRepository: Send + Sync {
    /// All cappers, ordered by display name.
    async fn list_cappers(&self) -> Result<Vec<Capper>>;

    async fn get_capper(&self, id: Uuid) -> Result<Option<Capper>>;

    async fn insert_capper(&self, capper: Capper) -> Result<()>;

    /// Replace a stored capper. Returns false if it doesn't exist.
    async fn update_capper(&self, capper: Capper) -> Result<bool>;

    /// Remove a capper along with their picks and grade log.
    /// Returns false if it doesn't exist.
    async fn delete_capper(&self, id: Uuid) -> Result<bool>;

    /// Picks matching the filter, newest first.
    async fn list_picks(&self, filter: &PickFilter) -> Result<Vec<Pick>>;

    async fn get_pick(&self, id: Uuid) -> Result<Option<Pick>>;

    async fn insert_pick(&self, pick: Pick) -> Result<()>;

    /// Replace a stored pick's terms, keeping its current result, profit,
    /// grading time and source. Returns false if it doesn't exist.
    async fn update_pick(&self, pick: Pick) -> Result<bool>;

    /// Write a graded pick and its audit entry together, but only if the
    /// stored pick still equals `expected` (the copy that was graded).
    /// Returns false, writing nothing, if it changed or is gone.
    async fn record_grade(&self, expected: Pick, graded: Pick, log: GradeLogEntry) -> Result<bool>;

    async fn grade_logs(&self, pick_id: Uuid) -> Result<Vec<GradeLogEntry>>;
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub cappers: Vec<Capper>,
    #[serde(default)]
    pub picks: Vec<Pick>,
    #[serde(default)]
    pub grade_logs: Vec<GradeLogEntry>,
}

/// In-memory store, optionally mirrored to a JSON file.
pub struct JsonStore {
    data: RwLock<StoreData>,
    path: Option<PathBuf>,
}

impl JsonStore {
    /// A store that never touches disk (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            path: None,
        }
    }

    /// Open a file-backed store. A missing file starts empty.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let json = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read store from {}", path.display()))?;
            let data: StoreData = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse store from {}", path.display()))?;
            info!(
                path = %path.display(),
                cappers = data.cappers.len(),
                picks = data.picks.len(),
                "Store loaded from disk"
            );
            data
        } else {
            info!(path = %path.display(), "No saved store found, starting empty");
            StoreData::default()
        };

        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    /// Snapshot of the current contents.
    pub async fn snapshot(&self) -> StoreData {
        self.data.read().await.clone()
    }

    async fn flush(&self, data: &StoreData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(data).context("Failed to serialise store")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write store to {}", path.display()))?;
        debug!(path = %path.display(), picks = data.picks.len(), "Store saved");
        Ok(())
    }

    /// Apply `change` to a copy of the store, persist the copy, then swap it
    /// in. On any error the live data is left as it was.
    async fn commit<T>(&self, change: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let out = change(&mut next)?;
        self.flush(&next).await?;
        *data = next;
        Ok(out)
    }
}

#[async_trait]
impl PickRepository for JsonStore {
    async fn list_cappers(&self) -> Result<Vec<Capper>> {
        let data = self.data.read().await;
        let mut cappers = data.cappers.clone();
        cappers.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(cappers)
    }

    async fn get_capper(&self, id: Uuid) -> Result<Option<Capper>> {
        let data = self.data.read().await;
        Ok(data.cappers.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_capper(&self, capper: Capper) -> Result<()> {
        self.commit(|data| {
            let taken = data
                .cappers
                .iter()
                .any(|c| c.id == capper.id || c.name.eq_ignore_ascii_case(&capper.name));
            if taken {
                anyhow::bail!("Capper already exists: {}", capper.name);
            }
            data.cappers.push(capper);
            Ok(())
        })
        .await
    }

    async fn update_capper(&self, capper: Capper) -> Result<bool> {
        self.commit(|data| {
            let taken = data
                .cappers
                .iter()
                .any(|c| c.id != capper.id && c.name.eq_ignore_ascii_case(&capper.name));
            if taken {
                anyhow::bail!("Capper already exists: {}", capper.name);
            }
            let Some(slot) = data.cappers.iter_mut().find(|c| c.id == capper.id) else {
                return Ok(false);
            };
            *slot = capper;
            Ok(true)
        })
        .await
    }

    async fn delete_capper(&self, id: Uuid) -> Result<bool> {
        self.commit(|data| {
            let before = data.cappers.len();
            data.cappers.retain(|c| c.id != id);
            if data.cappers.len() == before {
                return Ok(false);
            }

            let removed: Vec<Uuid> = data
                .picks
                .iter()
                .filter(|p| p.capper_id == id)
                .map(|p| p.id)
                .collect();
            data.picks.retain(|p| p.capper_id != id);
            data.grade_logs.retain(|l| !removed.contains(&l.pick_id));
            Ok(true)
        })
        .await
    }

    async fn list_picks(&self, filter: &PickFilter) -> Result<Vec<Pick>> {
        let data = self.data.read().await;
        let mut picks: Vec<Pick> = data
            .picks
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        picks.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        if let Some(limit) = filter.limit {
            picks.truncate(limit);
        }
        Ok(picks)
    }

    async fn get_pick(&self, id: Uuid) -> Result<Option<Pick>> {
        let data = self.data.read().await;
        Ok(data.picks.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_pick(&self, pick: Pick) -> Result<()> {
        self.commit(|data| {
            if !data.cappers.iter().any(|c| c.id == pick.capper_id) {
                anyhow::bail!("Unknown capper: {}", pick.capper_id);
            }
            data.picks.push(pick);
            Ok(())
        })
        .await
    }

    async fn update_pick(&self, pick: Pick) -> Result<bool> {
        self.commit(|data| {
            let Some(slot) = data.picks.iter_mut().find(|p| p.id == pick.id) else {
                return Ok(false);
            };
            // Grade fields are owned by `record_grade`.
            *slot = Pick {
                result: slot.result,
                profit: slot.profit,
                graded_at: slot.graded_at,
                source: slot.source,
                ..pick
            };
            Ok(true)
        })
        .await
    }

    async fn record_grade(&self, expected: Pick, graded: Pick, log: GradeLogEntry) -> Result<bool> {
        self.commit(|data| {
            let Some(slot) = data.picks.iter_mut().find(|p| p.id == graded.id) else {
                return Ok(false);
            };
            if *slot != expected {
                debug!(pick_id = %graded.id, "Pick changed since it was read, grade not applied");
                return Ok(false);
            }
            *slot = graded;
            data.grade_logs.push(log);
            Ok(true)
        })
        .await
    }

    async fn grade_logs(&self, pick_id: Uuid) -> Result<Vec<GradeLogEntry>> {
        let data = self.data.read().await;
        Ok(data
            .grade_logs
            .iter()
            .filter(|l| l.pick_id == pick_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PickSource;
    use chrono::Duration;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("capper_test_store_{}.json", Uuid::new_v4()));
        p
    }

    fn capper(name: &str, display: &str) -> Capper {
        Capper {
            id: Uuid::new_v4(),
            name: name.into(),
            display_name: display.into(),
            bio: None,
            avatar_url: None,
            join_date: Utc::now(),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn pick(capper_id: Uuid, hours_ago: i64) -> Pick {
        Pick {
            id: Uuid::new_v4(),
            capper_id,
            sport: "NBA".into(),
            home_team: "Lakers".into(),
            away_team: "Celtics".into(),
            pick_type: PickType::Total,
            pick_side: "Over".into(),
            pick_price: -110,
            listed_spread_or_total: Some(221.5),
            stake: Some(1.0),
            posted_at: Utc::now() - Duration::hours(hours_ago),
            event_date: Utc::now(),
            notes: None,
            result: PickResult::Pending,
            profit: None,
            graded_at: None,
            source: PickSource::Manual,
        }
    }

    #[tokio::test]
    async fn test_cappers_sorted_by_display_name() {
        let store = JsonStore::in_memory();
        store.insert_capper(capper("zed", "Zed")).await.unwrap();
        store.insert_capper(capper("amy", "Amy")).await.unwrap();
        let names: Vec<String> = store
            .list_cappers()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.display_name)
            .collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    #[tokio::test]
    async fn test_duplicate_capper_name_rejected() {
        let store = JsonStore::in_memory();
        store.insert_capper(capper("amy", "Amy")).await.unwrap();
        assert!(store.insert_capper(capper("amy", "Amy Two")).await.is_err());
    }

    #[tokio::test]
    async fn test_pick_requires_known_capper() {
        let store = JsonStore::in_memory();
        assert!(store.insert_pick(pick(Uuid::new_v4(), 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_list_picks_filter_sort_limit() {
        let store = JsonStore::in_memory();
        let a = capper("a", "A");
        let b = capper("b", "B");
        store.insert_capper(a.clone()).await.unwrap();
        store.insert_capper(b.clone()).await.unwrap();

        let oldest = pick(a.id, 30);
        let newest = pick(a.id, 1);
        store.insert_pick(oldest.clone()).await.unwrap();
        store.insert_pick(newest.clone()).await.unwrap();
        store.insert_pick(pick(b.id, 2)).await.unwrap();

        let filter = PickFilter {
            capper_id: Some(a.id),
            ..Default::default()
        };
        let picks = store.list_picks(&filter).await.unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].id, newest.id);
        assert_eq!(picks[1].id, oldest.id);

        let limited = store
            .list_picks(&PickFilter { limit: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, newest.id);

        let recent = store
            .list_picks(&PickFilter {
                from: Some(Utc::now() - Duration::hours(10)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_record_grade_writes_log() {
        let store = JsonStore::in_memory();
        let c = capper("a", "A");
        store.insert_capper(c.clone()).await.unwrap();
        let original = pick(c.id, 1);
        store.insert_pick(original.clone()).await.unwrap();

        let mut p = original.clone();
        p.result = PickResult::Win;
        p.profit = Some(0.91);
        let log = GradeLogEntry::new(
            p.id,
            serde_json::json!({"home_score": 120, "away_score": 110}),
        );
        assert!(store.record_grade(original, p.clone(), log).await.unwrap());

        let stored = store.get_pick(p.id).await.unwrap().unwrap();
        assert_eq!(stored.result, PickResult::Win);
        assert_eq!(store.grade_logs(p.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_grade_unknown_pick() {
        let store = JsonStore::in_memory();
        let p = pick(Uuid::new_v4(), 1);
        let log = GradeLogEntry::new(p.id, serde_json::Value::Null);
        assert!(!store.record_grade(p.clone(), p, log).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_grade_rejects_stale_copy() {
        let store = JsonStore::in_memory();
        let c = capper("a", "A");
        store.insert_capper(c.clone()).await.unwrap();
        let read = pick(c.id, 1);
        store.insert_pick(read.clone()).await.unwrap();

        // Edited after the grader read it
        let mut edited = read.clone();
        edited.notes = Some("edited concurrently".into());
        assert!(store.update_pick(edited).await.unwrap());

        let mut graded = read.clone();
        graded.result = PickResult::Win;
        graded.profit = Some(0.91);
        let log = GradeLogEntry::new(read.id, serde_json::Value::Null);
        assert!(!store.record_grade(read.clone(), graded, log).await.unwrap());

        let stored = store.get_pick(read.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("edited concurrently"));
        assert_eq!(stored.result, PickResult::Pending);
        assert!(store.grade_logs(read.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_pick_keeps_grade() {
        let store = JsonStore::in_memory();
        let c = capper("a", "A");
        store.insert_capper(c.clone()).await.unwrap();
        let original = pick(c.id, 1);
        store.insert_pick(original.clone()).await.unwrap();

        let mut graded = original.clone();
        graded.result = PickResult::Loss;
        graded.profit = Some(-1.0);
        graded.source = PickSource::Webhook;
        let log = GradeLogEntry::new(original.id, serde_json::Value::Null);
        assert!(store.record_grade(original.clone(), graded, log).await.unwrap());

        // A stale copy carrying `pending` must not wipe the grade
        let mut edit = original.clone();
        edit.notes = Some("late note".into());
        assert!(store.update_pick(edit).await.unwrap());

        let stored = store.get_pick(original.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("late note"));
        assert_eq!(stored.result, PickResult::Loss);
        assert_eq!(stored.profit, Some(-1.0));
        assert_eq!(stored.source, PickSource::Webhook);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let mut path = std::env::temp_dir();
        path.push(format!("capper_missing_dir_{}", Uuid::new_v4()));
        path.push("store.json");
        let store = JsonStore::open(&path).await.unwrap();

        assert!(store.insert_capper(capper("amy", "Amy")).await.is_err());
        assert!(store.list_cappers().await.unwrap().is_empty());
        assert!(store.snapshot().await.cappers.is_empty());
    }

    #[tokio::test]
    async fn test_capper_names_unique_ignoring_case() {
        let store = JsonStore::in_memory();
        let amy = capper("Amy", "Amy");
        store.insert_capper(amy.clone()).await.unwrap();
        assert!(store.insert_capper(capper("amy", "Other Amy")).await.is_err());

        let zed = capper("zed", "Zed");
        store.insert_capper(zed.clone()).await.unwrap();
        let renamed = Capper { name: "AMY".into(), ..zed };
        assert!(store.update_capper(renamed).await.is_err());
        assert_eq!(store.list_cappers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_capper_cascades() {
        let store = JsonStore::in_memory();
        let c = capper("a", "A");
        store.insert_capper(c.clone()).await.unwrap();
        let p = pick(c.id, 1);
        store.insert_pick(p.clone()).await.unwrap();
        let log = GradeLogEntry::new(p.id, serde_json::Value::Null);
        assert!(store.record_grade(p.clone(), p.clone(), log).await.unwrap());

        assert!(store.delete_capper(c.id).await.unwrap());
        assert!(store.get_pick(p.id).await.unwrap().is_none());
        assert!(store.grade_logs(p.id).await.unwrap().is_empty());
        assert!(!store.delete_capper(c.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let store = JsonStore::in_memory();
        assert!(!store.update_capper(capper("x", "X")).await.unwrap());
        assert!(!store.update_pick(pick(Uuid::new_v4(), 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let path = temp_path();
        {
            let store = JsonStore::open(&path).await.unwrap();
            let c = capper("a", "A");
            store.insert_capper(c.clone()).await.unwrap();
            store.insert_pick(pick(c.id, 1)).await.unwrap();
        }

        let reopened = JsonStore::open(&path).await.unwrap();
        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.cappers.len(), 1);
        assert_eq!(snapshot.picks.len(), 1);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let store = JsonStore::open(temp_path()).await.unwrap();
        assert!(store.snapshot().await.picks.is_empty());
    }
}
