//! The follow edge. `A.following` and `B.followers` are mirrored sets;
//! both sides are written by the one routine below so no code path can
//! update one without the other. The store has no compare-and-swap, so
//! two concurrent toggles on the same documents are last-write-wins.

use crate::auth::authenticate;
use crate::core::db::Documents;
use crate::core::errors::ApiError;
use crate::core::helpers::{json, validate_uuid};
use spin_sdk::http::{Request, Response};

pub struct FollowOutcome {
    pub following: bool,
    pub follower_count: usize,
    pub following_count: usize,
}

/// Toggle the actor→target edge, keeping both mirrored sets in step.
pub fn toggle_follow(
    db: &Documents,
    actor_id: &str,
    target_id: &str,
) -> anyhow::Result<Result<FollowOutcome, ApiError>> {
    if actor_id == target_id {
        return Ok(Err(ApiError::BadRequest(
            "You cannot follow yourself".to_string(),
        )));
    }

    let mut target = match db.user(target_id)? {
        Some(user) => user,
        None => return Ok(Err(ApiError::NotFound("User not found".to_string()))),
    };
    let mut actor = match db.user(actor_id)? {
        Some(user) => user,
        None => return Ok(Err(ApiError::NotFound("User not found".to_string()))),
    };

    let was_following = actor.following.iter().any(|id| id == target_id);
    if was_following {
        actor.following.retain(|id| id != target_id);
        target.followers.retain(|id| id != actor_id);
    } else {
        actor.following.push(target_id.to_string());
        target.followers.push(actor_id.to_string());
    }

    db.put_user(&actor)?;
    db.put_user(&target)?;

    Ok(Ok(FollowOutcome {
        following: !was_following,
        follower_count: target.followers.len(),
        following_count: actor.following.len(),
    }))
}

pub fn handle_follow(req: &Request, db: &Documents, target_id: &str) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if target_id.is_empty() || !validate_uuid(target_id) {
        return Ok(ApiError::BadRequest("Invalid target user".to_string()).into());
    }

    match toggle_follow(db, &user_id, target_id)? {
        Ok(outcome) => json(
            200,
            &serde_json::json!({
                "following": outcome.following,
                "followerCount": outcome.follower_count,
                "followingCount": outcome.following_count,
            }),
        ),
        Err(err) => Ok(err.into()),
    }
}
