use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Polarity of a vote.
///
/// Stored as a string so rows read unambiguously in the database. The
/// numeric +1/-1 convention seen in some clients maps to `upvote` and
/// `downvote` respectively; the numeric form never reaches the store.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    #[sea_orm(string_value = "upvote")]
    Upvote,
    #[sea_orm(string_value = "downvote")]
    Downvote,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Upvote => "upvote",
            VoteKind::Downvote => "downvote",
        }
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(VoteKind::Upvote),
            "downvote" => Ok(VoteKind::Downvote),
            other => Err(format!(
                "Vote kind must be 'upvote' or 'downvote', got '{other}'"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub location_id: i32,
    pub kind: VoteKind,
    /// Set on first insert, never touched by overwrites.
    pub created_at: DateTime,
    pub updated_at: DateTime,
    /// Soft-delete marker; a set value excludes the row from aggregation
    /// but keeps it for audit.
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
