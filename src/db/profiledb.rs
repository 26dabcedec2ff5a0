// db/profiledb.rs
use async_trait::async_trait;

use super::document::{encode, Filter, Query, StoreError};
use super::DBClient;
use crate::models::usermodel::{Profile, ProfileUpdate, UserRole};

pub const PROFILES: &str = "profiles";

#[async_trait]
pub trait ProfileExt {
    /// `Ok(None)` when the user has no profile yet.
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    /// Merge upsert of the supplied fields.
    async fn save_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<(), StoreError>;

    async fn get_profiles_by_role(&self, role: Option<UserRole>) -> Result<Vec<Profile>, StoreError>;
}

#[async_trait]
impl ProfileExt for DBClient {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        self.store
            .get(PROFILES, user_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn save_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        let data = encode(update)?;
        self.store.set_merge(PROFILES, user_id, data).await
    }

    async fn get_profiles_by_role(&self, role: Option<UserRole>) -> Result<Vec<Profile>, StoreError> {
        let mut query = Query::collection(PROFILES);
        if let Some(role) = role {
            query = query.filter(Filter::eq("role", role.to_str()));
        }

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }
}
