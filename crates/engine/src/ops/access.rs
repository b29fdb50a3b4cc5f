use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};

use crate::{EngineError, ResultEngine, UserRef, group_members, groups, users};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: i64,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
    }

    pub(super) async fn require_username(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username.trim()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user '{}'", username.trim())))
    }

    pub(super) async fn resolve_user(
        &self,
        db: &DatabaseTransaction,
        user: &UserRef,
    ) -> ResultEngine<users::Model> {
        match user {
            UserRef::Id(id) => self.require_user(db, *id).await,
            UserRef::Username(name) => self.require_username(db, name).await,
        }
    }

    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("group {group_id}")))
    }

    /// Checks the group exists when one is given.
    pub(super) async fn require_optional_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Option<i64>,
    ) -> ResultEngine<Option<groups::Model>> {
        match group_id {
            Some(id) => self.require_group(db, id).await.map(Some),
            None => Ok(None),
        }
    }

    pub(super) async fn member_ids(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
    ) -> ResultEngine<Vec<i64>> {
        let rows = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id))
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }

    /// Usernames for a set of user ids (unknown ids are simply absent).
    pub(super) async fn usernames(
        &self,
        db: &DatabaseTransaction,
        user_ids: impl IntoIterator<Item = i64>,
    ) -> ResultEngine<std::collections::HashMap<i64, String>> {
        let ids: Vec<i64> = user_ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(std::collections::HashMap::new());
        }
        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|u| (u.id, u.username)).collect())
    }
}
