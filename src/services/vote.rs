use crate::{
    error::{AppError, AppResult},
    models::{location, user, vote, Location, User, UserModel, Vote, VoteKind},
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Statement,
};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Vote ledger: at most one live vote per (user, location) pair, with
/// aggregate counts derived from the same rows on every read.
pub struct VoteService {
    db: DatabaseConnection,
}

/// Aggregate view of a target's votes, plus the requesting user's own
/// vote taken from the same snapshot.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct VoteStats {
    pub upvotes: u64,
    pub downvotes: u64,
    pub user_vote: Option<VoteKind>,
}

/// One resolved entry in a voter listing.
#[derive(Debug, Clone)]
pub struct Voter {
    pub user: UserModel,
    pub voted_at: chrono::NaiveDateTime,
}

impl VoteService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record or overwrite the caller's vote on a location.
    ///
    /// The write is a single conditional insert keyed by the unique
    /// (user_id, location_id) index. Two concurrent first-time voters
    /// cannot both insert; the store serializes them and the loser's
    /// statement becomes the overwrite. `created_at` survives overwrites,
    /// and a previously soft-deleted row is revived in place.
    pub async fn cast_vote(
        &self,
        user_id: i32,
        location_id: i32,
        kind: VoteKind,
    ) -> AppResult<()> {
        if user_id <= 0 || location_id <= 0 {
            return Err(AppError::Validation(
                "User and target identifiers must be positive".to_string(),
            ));
        }

        // Target must resolve before anything is written.
        Location::find_by_id(location_id)
            .filter(location::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        self.db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "INSERT INTO votes (user_id, location_id, kind, created_at, updated_at)
                 VALUES ($1, $2, $3, NOW(), NOW())
                 ON CONFLICT (user_id, location_id)
                 DO UPDATE SET kind = EXCLUDED.kind, updated_at = NOW(), deleted_at = NULL",
                vec![user_id.into(), location_id.into(), kind.as_str().into()],
            ))
            .await?;

        Ok(())
    }

    /// Soft-delete the caller's vote on a location.
    ///
    /// Failing when there is nothing to remove is deliberate: callers can
    /// tell "no vote existed" apart from a successful removal.
    pub async fn remove_vote(&self, user_id: i32, location_id: i32) -> AppResult<()> {
        if user_id <= 0 || location_id <= 0 {
            return Err(AppError::Validation(
                "User and target identifiers must be positive".to_string(),
            ));
        }

        let result = Vote::update_many()
            .col_expr(vote::Column::DeletedAt, Expr::current_timestamp().into())
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::LocationId.eq(location_id))
            .filter(vote::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::VoteNotFound);
        }

        Ok(())
    }

    /// Aggregate counts for a location, and the requesting user's own
    /// vote if one exists.
    ///
    /// Counts and `user_vote` come from one read, so the caller never
    /// sees a `user_vote` that disagrees with the counts.
    pub async fn get_stats(
        &self,
        location_id: i32,
        requesting_user_id: Option<i32>,
    ) -> AppResult<VoteStats> {
        let votes = Vote::find()
            .filter(vote::Column::LocationId.eq(location_id))
            .filter(vote::Column::DeletedAt.is_null())
            .all(&self.db)
            .await?;

        Ok(tally(&votes, requesting_user_id))
    }

    /// Voters on a location, split by polarity, most recent vote first.
    ///
    /// A vote whose user no longer resolves (missing or soft-deleted)
    /// is dropped from the listing.
    pub async fn list_voters(&self, location_id: i32) -> AppResult<(Vec<Voter>, Vec<Voter>)> {
        let votes = Vote::find()
            .filter(vote::Column::LocationId.eq(location_id))
            .filter(vote::Column::DeletedAt.is_null())
            .order_by_desc(vote::Column::CreatedAt)
            .all(&self.db)
            .await?;

        if votes.is_empty() {
            return Ok((vec![], vec![]));
        }

        let user_ids: Vec<i32> = votes.iter().map(|v| v.user_id).collect();
        let users = User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .filter(user::Column::DeletedAt.is_null())
            .all(&self.db)
            .await?;
        let user_map: HashMap<i32, UserModel> = users.into_iter().map(|u| (u.id, u)).collect();

        let mut upvoters = Vec::new();
        let mut downvoters = Vec::new();
        for v in votes {
            let Some(user) = user_map.get(&v.user_id) else {
                continue;
            };
            let entry = Voter {
                user: user.clone(),
                voted_at: v.created_at,
            };
            match v.kind {
                VoteKind::Upvote => upvoters.push(entry),
                VoteKind::Downvote => downvoters.push(entry),
            }
        }

        Ok((upvoters, downvoters))
    }
}

/// Partition a snapshot of votes into counts and pick out the requesting
/// user's own vote from the same rows.
fn tally(votes: &[vote::Model], requesting_user_id: Option<i32>) -> VoteStats {
    let mut upvotes = 0;
    let mut downvotes = 0;
    let mut user_vote = None;

    for v in votes {
        match v.kind {
            VoteKind::Upvote => upvotes += 1,
            VoteKind::Downvote => downvotes += 1,
        }
        if requesting_user_id == Some(v.user_id) {
            user_vote = Some(v.kind);
        }
    }

    VoteStats {
        upvotes,
        downvotes,
        user_vote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote_row(id: i32, user_id: i32, kind: VoteKind) -> vote::Model {
        let now = chrono::Utc::now().naive_utc();
        vote::Model {
            id,
            user_id,
            location_id: 1,
            kind,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn tally_partitions_by_kind() {
        let votes = vec![
            vote_row(1, 10, VoteKind::Upvote),
            vote_row(2, 11, VoteKind::Upvote),
            vote_row(3, 12, VoteKind::Upvote),
            vote_row(4, 13, VoteKind::Downvote),
            vote_row(5, 14, VoteKind::Downvote),
        ];
        let stats = tally(&votes, None);
        assert_eq!(stats.upvotes, 3);
        assert_eq!(stats.downvotes, 2);
        assert_eq!(stats.user_vote, None);
    }

    #[test]
    fn tally_empty_snapshot() {
        let stats = tally(&[], Some(10));
        assert_eq!(stats.upvotes, 0);
        assert_eq!(stats.downvotes, 0);
        assert_eq!(stats.user_vote, None);
    }

    #[test]
    fn tally_reports_requesting_users_vote() {
        let votes = vec![
            vote_row(1, 10, VoteKind::Upvote),
            vote_row(2, 11, VoteKind::Downvote),
        ];
        let stats = tally(&votes, Some(11));
        assert_eq!(stats.user_vote, Some(VoteKind::Downvote));
    }

    #[test]
    fn tally_user_vote_consistent_with_counts() {
        // The user's vote is drawn from the counted rows themselves, so
        // a reported upvote implies at least one counted upvote.
        let votes = vec![vote_row(1, 10, VoteKind::Upvote)];
        let stats = tally(&votes, Some(10));
        assert_eq!(stats.user_vote, Some(VoteKind::Upvote));
        assert_eq!(stats.upvotes, 1);
        assert_eq!(stats.downvotes, 0);
    }

    #[test]
    fn tally_ignores_other_users_for_user_vote() {
        let votes = vec![vote_row(1, 10, VoteKind::Upvote)];
        let stats = tally(&votes, Some(99));
        assert_eq!(stats.user_vote, None);
        assert_eq!(stats.upvotes, 1);
    }
}
