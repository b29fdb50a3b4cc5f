//! Relationship facts: users, friendships and group membership.
//!
//! Friend requests and group invites are handled elsewhere; the ledger only
//! reads these facts to scope queries. The `create_*`/`add_*` methods exist
//! for bootstrapping (admin CLI, tests).

use chrono::Utc;
use sea_orm::{ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    EngineError, ResultEngine, UserInfo, friendships, friendships::ordered_pair, group_members,
    groups, users,
};

use super::{Engine, normalize_required_text};

impl Engine {
    pub async fn user(&self, user_id: i64) -> ResultEngine<UserInfo> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move { engine.require_user(db_tx, user_id).await.map(UserInfo::from) })
        })
        .await
    }

    pub async fn user_by_username(&self, username: &str) -> ResultEngine<UserInfo> {
        let username = username.to_string();
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine
                    .require_username(db_tx, &username)
                    .await
                    .map(UserInfo::from)
            })
        })
        .await
    }

    /// Creates a user. Usernames may contain only letters, digits and spaces.
    pub async fn create_user(&self, username: &str, password: &str) -> ResultEngine<UserInfo> {
        let username = normalize_required_text(username, "username")?;
        if !username.chars().all(|c| c.is_alphanumeric() || c == ' ') {
            return Err(EngineError::InvalidInput(
                "username can only contain letters, numbers and spaces".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        let password = password.to_string();

        self.with_tx(|_, db_tx| {
            Box::pin(async move {
                let taken = users::Entity::find()
                    .filter(users::Column::Username.eq(username.as_str()))
                    .one(db_tx)
                    .await?
                    .is_some();
                if taken {
                    return Err(EngineError::ExistingKey(username));
                }

                let model = users::ActiveModel {
                    id: ActiveValue::NotSet,
                    username: ActiveValue::Set(username),
                    password: ActiveValue::Set(password),
                }
                .insert(db_tx)
                .await?;
                Ok(UserInfo::from(model))
            })
        })
        .await
    }

    /// Creates a group and returns its id.
    pub async fn create_group(&self, name: &str) -> ResultEngine<i64> {
        self.create_group_with_members(name, Vec::new()).await
    }

    /// Creates a group with its initial members as one unit of work: either
    /// the group exists with every member or nothing is written.
    pub async fn create_group_with_members(
        &self,
        name: &str,
        member_ids: Vec<i64>,
    ) -> ResultEngine<i64> {
        let name = normalize_required_text(name, "group name")?;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = groups::ActiveModel {
                    id: ActiveValue::NotSet,
                    name: ActiveValue::Set(name),
                    created_at: ActiveValue::Set(Utc::now()),
                }
                .insert(db_tx)
                .await?;
                for user_id in member_ids {
                    engine.insert_member(db_tx, model.id, user_id).await?;
                }
                tracing::info!(group_id = model.id, "group created");
                Ok(model.id)
            })
        })
        .await
    }

    pub async fn add_group_member(&self, group_id: i64, user_id: i64) -> ResultEngine<()> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group(db_tx, group_id).await?;
                engine.insert_member(db_tx, group_id, user_id).await
            })
        })
        .await
    }

    async fn insert_member(
        &self,
        db: &DatabaseTransaction,
        group_id: i64,
        user_id: i64,
    ) -> ResultEngine<()> {
        self.require_user(db, user_id).await?;

        if group_members::Entity::find_by_id((group_id, user_id))
            .one(db)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(format!(
                "user {user_id} in group {group_id}"
            )));
        }

        group_members::ActiveModel {
            group_id: ActiveValue::Set(group_id),
            user_id: ActiveValue::Set(user_id),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    pub async fn add_friendship(&self, user_a: i64, user_b: i64) -> ResultEngine<()> {
        if user_a == user_b {
            return Err(EngineError::InvalidInput(
                "cannot befriend yourself".to_string(),
            ));
        }
        let (low, high) = ordered_pair(user_a, user_b);

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, low).await?;
                engine.require_user(db_tx, high).await?;

                if friendships::Entity::find_by_id((low, high))
                    .one(db_tx)
                    .await?
                    .is_some()
                {
                    return Err(EngineError::ExistingKey(format!(
                        "friendship {low}-{high}"
                    )));
                }

                friendships::ActiveModel {
                    user_low: ActiveValue::Set(low),
                    user_high: ActiveValue::Set(high),
                    created_at: ActiveValue::Set(Utc::now()),
                }
                .insert(db_tx)
                .await?;
                Ok(())
            })
        })
        .await
    }

    pub async fn is_friend(&self, user_a: i64, user_b: i64) -> ResultEngine<bool> {
        let key = ordered_pair(user_a, user_b);
        self.with_tx(|_, db_tx| {
            Box::pin(async move {
                Ok(friendships::Entity::find_by_id(key)
                    .one(db_tx)
                    .await?
                    .is_some())
            })
        })
        .await
    }

    /// Friends of `user_id`, ordered by id.
    pub async fn friends_of(&self, user_id: i64) -> ResultEngine<Vec<UserInfo>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let rows = friendships::Entity::find()
                    .filter(
                        Condition::any()
                            .add(friendships::Column::UserLow.eq(user_id))
                            .add(friendships::Column::UserHigh.eq(user_id)),
                    )
                    .all(db_tx)
                    .await?;
                let friend_ids = rows.into_iter().map(|f| {
                    if f.user_low == user_id {
                        f.user_high
                    } else {
                        f.user_low
                    }
                });
                engine.user_infos(db_tx, friend_ids).await
            })
        })
        .await
    }

    pub async fn is_group_member(&self, group_id: i64, user_id: i64) -> ResultEngine<bool> {
        self.with_tx(|_, db_tx| {
            Box::pin(async move {
                Ok(group_members::Entity::find_by_id((group_id, user_id))
                    .one(db_tx)
                    .await?
                    .is_some())
            })
        })
        .await
    }

    /// Members of a group, ordered by id.
    pub async fn group_members(&self, group_id: i64) -> ResultEngine<Vec<UserInfo>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group(db_tx, group_id).await?;
                let ids = engine.member_ids(db_tx, group_id).await?;
                engine.user_infos(db_tx, ids).await
            })
        })
        .await
    }

    async fn user_infos(
        &self,
        db: &DatabaseTransaction,
        user_ids: impl IntoIterator<Item = i64>,
    ) -> ResultEngine<Vec<UserInfo>> {
        let ids: Vec<i64> = user_ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .order_by_asc(users::Column::Id)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(UserInfo::from).collect())
    }
}
