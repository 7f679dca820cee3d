use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{contains_ci, PageRequest, Paged};
use crate::{
    auth::{
        hash_password,
        user::{self, Entity as UserEntity, UserProfile, UserRole},
        PasswordPolicy,
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    /// One of admin, manager, supervisor, operator, viewer
    pub role: String,
    #[validate(range(min = 1, max = 2, message = "unit must be 1 or 2"))]
    pub unit: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
    /// `null` clears the unit; absent leaves it unchanged
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub unit: Option<Option<i32>>,
    pub active: Option<bool>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPassword {
    pub new_password: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

fn parse_role(role: &str) -> Result<UserRole, ServiceError> {
    role.parse().map_err(ServiceError::ValidationError)
}

fn check_unit(unit: Option<i32>) -> Result<(), ServiceError> {
    match unit {
        Some(u) if !(1..=2).contains(&u) => Err(ServiceError::ValidationError(
            "unit must be 1 or 2".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Account administration
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    policy: PasswordPolicy,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            policy: PasswordPolicy::default(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paged<UserProfile>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(role) = filter.role {
            condition = condition.add(user::Column::Role.eq(role));
        }
        if let Some(active) = filter.active {
            condition = condition.add(user::Column::Active.eq(active));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(contains_ci(user::Column::Name, search))
                    .add(contains_ci(user::Column::Email, search)),
            );
        }

        let query = UserEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_asc(user::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total }.map(UserProfile::from))
    }

    async fn find(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        UserEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }

    pub async fn get(&self, id: Uuid) -> Result<UserProfile, ServiceError> {
        Ok(self.find(id).await?.into())
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = UserEntity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "a user with email {} already exists",
                email
            )));
        }
        Ok(())
    }

    /// Active admins other than `except`, with every active admin row locked
    /// until `conn` commits
    async fn other_active_admins<C: ConnectionTrait>(
        conn: &C,
        except: Uuid,
    ) -> Result<usize, ServiceError> {
        let admins = UserEntity::find()
            .filter(user::Column::Role.eq(UserRole::Admin))
            .filter(user::Column::Active.eq(true))
            .lock_exclusive()
            .all(conn)
            .await?;
        Ok(admins.iter().filter(|admin| admin.id != except).count())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: CreateUser) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let role = parse_role(&input.role)?;
        check_unit(input.unit)?;
        let email = input.email.trim().to_lowercase();
        self.policy.validate(&input.password, Some(&email))?;
        self.ensure_email_free(&email, None).await?;

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(role),
            unit: Set(input.unit),
            active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(user_id = %created.id, role = role.as_str(), "User created");
        Ok(created.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateUser) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let role = input.role.as_deref().map(parse_role).transpose()?;
        if let Some(unit) = input.unit {
            check_unit(unit)?;
        }

        let email = input.email.as_deref().map(|e| e.trim().to_lowercase());
        if let Some(email) = email.as_deref() {
            self.ensure_email_free(email, Some(id)).await?;
        }

        let txn = self.db.begin().await?;
        let current = UserEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))?;
        let loses_admin = current.role == UserRole::Admin
            && current.active
            && (role.is_some_and(|r| r != UserRole::Admin) || input.active == Some(false));
        if loses_admin && Self::other_active_admins(&txn, id).await? == 0 {
            return Err(ServiceError::Conflict(
                "cannot demote or deactivate the last active admin".to_string(),
            ));
        }

        let mut active: user::ActiveModel = current.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(role) = role {
            active.role = Set(role);
        }
        if let Some(unit) = input.unit {
            active.unit = Set(unit);
        }
        if let Some(flag) = input.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        info!(user_id = %id, "User updated");
        Ok(updated.into())
    }

    #[instrument(skip(self, input))]
    pub async fn reset_password(&self, id: Uuid, input: ResetPassword) -> Result<(), ServiceError> {
        let current = self.find(id).await?;
        self.policy.validate(&input.new_password, Some(&current.email))?;

        let mut active: user::ActiveModel = current.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        warn!(user_id = %id, "Password reset by administrator");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, acting_user: Uuid) -> Result<(), ServiceError> {
        if id == acting_user {
            return Err(ServiceError::Conflict(
                "you cannot delete your own account".to_string(),
            ));
        }
        let txn = self.db.begin().await?;
        let current = UserEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))?;
        if current.role == UserRole::Admin
            && current.active
            && Self::other_active_admins(&txn, id).await? == 0
        {
            return Err(ServiceError::Conflict(
                "cannot delete the last active admin".to_string(),
            ));
        }

        UserEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(parse_role("Supervisor").unwrap(), UserRole::Supervisor);
        assert!(matches!(parse_role("owner"), Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn unit_null_and_absent_differ() {
        let absent: UpdateUser = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.unit, None);
        let cleared: UpdateUser = serde_json::from_str(r#"{"unit": null}"#).unwrap();
        assert_eq!(cleared.unit, Some(None));
        let set: UpdateUser = serde_json::from_str(r#"{"unit": 2}"#).unwrap();
        assert_eq!(set.unit, Some(Some(2)));
    }
}
