//! Session user entity and friend listing.

use api_types::user::FriendsResponse;
use axum::{Extension, Json, extract::State};
use sea_orm::entity::prelude::*;

use crate::{ServerError, server::ServerState, views};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Lists the session user's friends
pub async fn friends(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
) -> Result<Json<FriendsResponse>, ServerError> {
    let friends = state.engine.friends_of(user.id).await?;
    Ok(Json(FriendsResponse {
        friends: friends.into_iter().map(views::user).collect(),
    }))
}
