use crate::database::models::VoteTarget;
use crate::database::repositories::{CommentRepository, PostRepository, VoteRepository};
use crate::database::Database;
use crate::error::ForumError;
use crate::utils::now_utc_iso;

#[derive(Clone)]
pub struct VoteService {
    database: Database,
}

impl VoteService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Toggles the caller's vote on a post or comment and returns the signed
    /// delta applied: +1 when the vote was cast, -1 when it was withdrawn.
    /// The vote row and the cached score move inside one transaction so the
    /// pair can never be observed half-applied.
    pub fn toggle(&self, user_id: i64, target: VoteTarget) -> Result<i64, ForumError> {
        let target_exists = self.database.with_repositories(|repos| match target {
            VoteTarget::Post(id) => repos.posts().exists(id),
            VoteTarget::Comment(id) => repos.comments().exists(id),
        })?;
        if !target_exists {
            let what = match target {
                VoteTarget::Post(_) => "post not found",
                VoteTarget::Comment(_) => "comment not found",
            };
            return Err(ForumError::not_found(what));
        }

        let created_at = now_utc_iso();
        let delta = self.database.with_transaction(|repos| {
            let votes = repos.votes();
            let delta = match votes.find(user_id, target)? {
                Some(existing) => {
                    votes.delete(existing.id)?;
                    -1
                }
                None => {
                    votes.insert(user_id, target, &created_at)?;
                    1
                }
            };
            match target {
                VoteTarget::Post(id) => repos.posts().adjust_score(id, delta)?,
                VoteTarget::Comment(id) => repos.comments().adjust_score(id, delta)?,
            }
            Ok(delta)
        })?;
        Ok(delta)
    }
}
