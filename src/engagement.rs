//! Follow, like and comment operations and the engagement-rate cache.
//!
//! Set mutations are delegated to the store as single atomic steps; the
//! counters are always the length of their set after that step, never a
//! separately incremented value.

use chrono::Utc;
use tracing::{debug, warn};

use crate::models::{Comment, FollowResponse, Id, LikeResponse, Post};
use crate::repo::{Repo, RepoError, RepoResult};

/// Longest comment accepted, in characters.
pub const MAX_COMMENT_LEN: usize = 1000;

/// Flips `actor` in `set`. Returns whether the actor is a member afterwards.
/// Every copy of `actor` is removed on the way out, so the set never holds
/// it twice.
pub fn toggle_membership(set: &mut Vec<Id>, actor: Id) -> bool {
    let before = set.len();
    set.retain(|a| *a != actor);
    if set.len() == before {
        set.push(actor);
        true
    } else {
        false
    }
}

/// Interactions per follower as a percentage; zero when nobody follows.
pub fn engagement_rate(posts: &[Post], followers: i64) -> f64 {
    if followers <= 0 {
        return 0.0;
    }
    let total: i64 = posts.iter().map(Post::engagement).sum();
    total as f64 / followers as f64 * 100.0
}

#[derive(thiserror::Error, Debug)]
pub enum EngagementError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Full recompute from the business's current posts and follower count.
pub async fn recompute_engagement(repo: &dyn Repo, business_id: Id) -> RepoResult<f64> {
    let business = repo.get_business(business_id).await?;
    let posts = repo.list_posts(business_id).await?;
    let rate = engagement_rate(&posts, business.followers);
    repo.set_engagement_rate(business_id, rate).await?;
    debug!(business_id, rate, posts = posts.len(), "engagement recomputed");
    Ok(rate)
}

/// Runs a follow-up write after a committed toggle. The toggle stands either
/// way; a failure only leaves a cache stale until the next interaction.
fn settle<T>(result: RepoResult<T>, step: &'static str, target: Id) {
    if let Err(e) = result {
        warn!(target, step, error = %e, "post-toggle update failed");
        metrics::increment_counter!("storefront_stale_cache_total", "step" => step);
    }
}

pub async fn toggle_follow(repo: &dyn Repo, business_id: Id, client_id: Id) -> RepoResult<FollowResponse> {
    repo.get_client(client_id).await?;
    let toggle = repo.toggle_follower(business_id, client_id).await?;
    settle(repo.set_following(client_id, business_id, toggle.active).await, "following", client_id);
    settle(recompute_engagement(repo, business_id).await, "engagement", business_id);
    metrics::increment_counter!("storefront_follow_toggles_total", "state" => if toggle.active { "follow" } else { "unfollow" });
    Ok(FollowResponse { is_following: toggle.active, followers: toggle.count })
}

pub async fn toggle_like(repo: &dyn Repo, post_id: Id, client_id: Id) -> RepoResult<LikeResponse> {
    repo.get_client(client_id).await?;
    let post = repo.get_post(post_id).await?;
    let toggle = repo.toggle_like(post_id, client_id).await?;
    settle(recompute_engagement(repo, post.business_id).await, "engagement", post.business_id);
    metrics::increment_counter!("storefront_like_toggles_total", "state" => if toggle.active { "like" } else { "unlike" });
    Ok(LikeResponse { is_liked: toggle.active, likes_count: toggle.count })
}

/// Pure membership test.
pub async fn like_status(repo: &dyn Repo, post_id: Id, client_id: Id) -> RepoResult<bool> {
    let post = repo.get_post(post_id).await?;
    Ok(post.likes_list.contains(&client_id))
}

/// Appends a comment. Empty or whitespace-only text is rejected before the
/// store is touched.
pub async fn add_comment(repo: &dyn Repo, post_id: Id, client_id: Id, text: &str) -> Result<(Comment, i64), EngagementError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(EngagementError::Invalid("comment text is required".into()));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(EngagementError::Invalid(format!("comment exceeds {MAX_COMMENT_LEN} characters")));
    }
    repo.get_client(client_id).await?;
    let post = repo.get_post(post_id).await?;
    let comment = Comment { user_id: client_id, text: text.to_string(), created_at: Utc::now() };
    let count = repo.append_comment(post_id, comment.clone()).await?;
    settle(recompute_engagement(repo, post.business_id).await, "engagement", post.business_id);
    metrics::increment_counter!("storefront_comments_total");
    Ok((comment, count))
}
