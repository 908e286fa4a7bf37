//! Capper management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{check_min_len, Result, ServiceError};
use crate::storage::PickRepository;
use crate::types::Capper;

/// Body of a capper creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCapper {
    pub name: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub join_date: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapperPatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "crate::types::supplied")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::types::supplied")]
    pub avatar_url: Option<Option<String>>,
    pub join_date: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

fn check_avatar_url(url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ServiceError::validation("avatar_url must be an http(s) URL"))
    }
}

impl NewCapper {
    pub fn validate(&self) -> Result<()> {
        check_min_len("name", &self.name, 2)?;
        check_min_len("display_name", &self.display_name, 2)?;
        if let Some(url) = &self.avatar_url {
            check_avatar_url(url)?;
        }
        Ok(())
    }
}

impl CapperPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_min_len("name", name, 2)?;
        }
        if let Some(display_name) = &self.display_name {
            check_min_len("display_name", display_name, 2)?;
        }
        if let Some(Some(url)) = &self.avatar_url {
            check_avatar_url(url)?;
        }
        Ok(())
    }

    fn apply(self, capper: &mut Capper) {
        if let Some(name) = self.name {
            capper.name = name.trim().to_string();
        }
        if let Some(display_name) = self.display_name {
            capper.display_name = display_name.trim().to_string();
        }
        if let Some(bio) = self.bio {
            capper.bio = bio;
        }
        if let Some(avatar_url) = self.avatar_url {
            capper.avatar_url = avatar_url;
        }
        if let Some(join_date) = self.join_date {
            capper.join_date = join_date;
        }
        if let Some(active) = self.active {
            capper.active = active;
        }
    }
}

/// Handles are unique across cappers.
async fn check_name_free(
    repo: &dyn PickRepository,
    name: &str,
    except: Option<Uuid>,
) -> Result<()> {
    let taken = repo
        .list_cappers()
        .await?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(name.trim()) && Some(c.id) != except);
    if taken {
        return Err(ServiceError::validation(format!("name already taken: {}", name.trim())));
    }
    Ok(())
}

pub async fn list_cappers(repo: &dyn PickRepository) -> Result<Vec<Capper>> {
    Ok(repo.list_cappers().await?)
}

pub async fn get_capper(repo: &dyn PickRepository, id: Uuid) -> Result<Capper> {
    repo.get_capper(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Capper {id}")))
}

pub async fn create_capper(repo: &dyn PickRepository, input: NewCapper) -> Result<Capper> {
    input.validate()?;
    check_name_free(repo, &input.name, None).await?;
    let now = Utc::now();
    let capper = Capper {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        display_name: input.display_name.trim().to_string(),
        bio: input.bio,
        avatar_url: input.avatar_url,
        join_date: input.join_date.unwrap_or(now),
        active: input.active.unwrap_or(true),
        created_at: now,
    };
    repo.insert_capper(capper.clone()).await?;
    info!(capper_id = %capper.id, name = %capper.name, "Capper created");
    Ok(capper)
}

pub async fn update_capper(
    repo: &dyn PickRepository,
    id: Uuid,
    patch: CapperPatch,
) -> Result<Capper> {
    patch.validate()?;
    let mut capper = get_capper(repo, id).await?;
    if let Some(name) = &patch.name {
        check_name_free(repo, name, Some(id)).await?;
    }
    patch.apply(&mut capper);
    if !repo.update_capper(capper.clone()).await? {
        return Err(ServiceError::NotFound(format!("Capper {id}")));
    }
    info!(capper_id = %id, "Capper updated");
    Ok(capper)
}

pub async fn delete_capper(repo: &dyn PickRepository, id: Uuid) -> Result<()> {
    if !repo.delete_capper(id).await? {
        return Err(ServiceError::NotFound(format!("Capper {id}")));
    }
    info!(capper_id = %id, "Capper deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
