// service/profile_service.rs
use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::{profiledb::ProfileExt, DBClient},
    models::usermodel::*,
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct ProfileService {
    db_client: Arc<DBClient>,
}

impl ProfileService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Merge upsert of the supplied fields. The role is fixed by the first
    /// save, which must also carry a name and an email.
    pub async fn save(&self, user_id: &str, update: ProfileUpdate) -> Result<Profile, ServiceError> {
        let mut update = update;

        match self.db_client.get_profile(user_id).await? {
            Some(existing) => {
                if let Some(role) = update.role {
                    if role != existing.role {
                        tracing::warn!(
                            "User {} tried to change role from {} to {}",
                            user_id,
                            existing.role.to_str(),
                            role.to_str()
                        );
                        return Err(ServiceError::RoleImmutable {
                            from: existing.role,
                            to: role,
                        });
                    }
                }
                update.created_at = None;
            }
            None => {
                Self::check_new(&update)?;
                update.created_at = Some(Utc::now().timestamp_millis());
            }
        }

        self.db_client.save_profile(user_id, &update).await?;
        tracing::info!("Saved profile {}", user_id);

        self.db_client
            .get_profile(user_id)
            .await?
            .ok_or_else(|| ServiceError::ProfileNotFound(user_id.to_string()))
    }

    /// Fields a first save must carry.
    pub fn check_new(update: &ProfileUpdate) -> Result<(), ServiceError> {
        if update.role.is_none() {
            return Err(ServiceError::Validation("A new profile needs a role".to_string()));
        }
        let missing_name = update.name.as_deref().map_or(true, |n| n.trim().is_empty());
        let missing_email = update.email.as_deref().map_or(true, |e| e.trim().is_empty());
        if missing_name || missing_email {
            return Err(ServiceError::Validation(
                "A new profile needs a name and an email".to_string(),
            ));
        }
        Ok(())
    }

    /// `Ok(None)` when the user has no profile yet.
    pub async fn get(&self, user_id: &str) -> Result<Option<Profile>, ServiceError> {
        Ok(self.db_client.get_profile(user_id).await?)
    }

    pub async fn require(&self, user_id: &str) -> Result<Profile, ServiceError> {
        self.get(user_id)
            .await?
            .ok_or_else(|| ServiceError::ProfileNotFound(user_id.to_string()))
    }

    /// Profiles of `role` whose name, category, shop name or company name
    /// contains `text`, ignoring case.
    pub async fn search(&self, role: Option<UserRole>, text: &str) -> Result<Vec<Profile>, ServiceError> {
        let needle = text.trim().to_lowercase();
        let profiles = self.db_client.get_profiles_by_role(role).await?;
        tracing::debug!(
            "Profile search role={:?} q={:?} over {} profiles",
            role,
            needle,
            profiles.len()
        );

        Ok(profiles
            .into_iter()
            .filter(|profile| profile.matches_text(&needle))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ProfileService {
        ProfileService::new(Arc::new(DBClient::in_memory()))
    }

    fn registration(role: UserRole, name: &str) -> ProfileUpdate {
        ProfileUpdate {
            role: Some(role),
            name: Some(name.to_string()),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_profile() {
        let service = service();
        assert_eq!(service.get("nobody").await.unwrap(), None);
        assert!(matches!(
            service.require("nobody").await,
            Err(ServiceError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_merges_supplied_fields() {
        let service = service();
        let created = service.save("u1", registration(UserRole::Worker, "Ada")).await.unwrap();
        assert_eq!(created.id, "u1");
        assert!(created.created_at > 0);

        let updated = service
            .save(
                "u1",
                ProfileUpdate {
                    phone: Some("0800".to_string()),
                    created_at: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.phone.as_deref(), Some("0800"));
        assert_eq!(updated.created_at, created.created_at);

        let again = service
            .save(
                "u1",
                ProfileUpdate {
                    phone: Some("0800".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(again, updated);
    }

    #[tokio::test]
    async fn test_role_is_immutable() {
        let service = service();
        service.save("u1", registration(UserRole::Worker, "Ada")).await.unwrap();

        let err = service
            .save(
                "u1",
                ProfileUpdate {
                    role: Some(UserRole::Shop),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::RoleImmutable {
                from: UserRole::Worker,
                to: UserRole::Shop
            }
        ));

        // restating the same role is fine
        service
            .save(
                "u1",
                ProfileUpdate {
                    role: Some(UserRole::Worker),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_save_requires_role() {
        let service = service();
        let err = service
            .save(
                "u1",
                ProfileUpdate {
                    name: Some("Ada".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(service.get("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_by_role_and_text() {
        let service = service();
        service
            .save(
                "w1",
                ProfileUpdate {
                    category: Some("Plumber".to_string()),
                    ..registration(UserRole::Worker, "Ada")
                },
            )
            .await
            .unwrap();
        service.save("w2", registration(UserRole::Worker, "Obi")).await.unwrap();
        service
            .save(
                "s1",
                ProfileUpdate {
                    shop_name: Some("Plumbing Supplies".to_string()),
                    ..registration(UserRole::Shop, "Chi")
                },
            )
            .await
            .unwrap();

        let workers = service.search(Some(UserRole::Worker), "").await.unwrap();
        assert_eq!(workers.len(), 2);

        let plumbers = service.search(Some(UserRole::Worker), "PLUMB").await.unwrap();
        assert_eq!(plumbers.len(), 1);
        assert_eq!(plumbers[0].id, "w1");

        let anyone = service.search(None, "plumb").await.unwrap();
        assert_eq!(anyone.len(), 2);
    }
}
