//! Read-side aggregation for the owner dashboard and analytics snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::models::*;
use crate::repo::{Repo, RepoError, RepoResult};

pub const RECENT_POSTS: usize = 5;
pub const RECENT_PRODUCTS: usize = 5;
/// Size of the merged activity feed.
pub const ACTIVITY_WINDOW: usize = 10;

const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: i64,
    pub total_products: i64,
    pub active_promotions: i64,
    pub total_engagement: i64,
    pub total_revenue: f64,
    pub followers: i64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Post,
    Product,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub id: Id,
    pub description: String,
    /// Likes + comments + shares, for posts.
    pub engagement: Option<i64>,
    /// Units sold, for products.
    pub sales: Option<i64>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPerformance {
    pub platform: String,
    pub posts: i64,
    pub engagement: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_activity: Vec<ActivityItem>,
    pub business: BusinessSummary,
    pub platform_performance: Vec<PlatformPerformance>,
}

#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    #[error("business not found")]
    NotFound,
    #[error("failed to fetch dashboard")]
    Failed(#[source] RepoError),
}

pub fn total_engagement(posts: &[Post]) -> i64 {
    posts.iter().map(Post::engagement).sum()
}

/// `Σ totalSold × price`.
pub fn total_revenue(products: &[Product]) -> f64 {
    products.iter().map(|p| p.sales.total_sold as f64 * p.price).sum()
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

fn post_activity(p: &Post) -> ActivityItem {
    ActivityItem {
        kind: ActivityKind::Post,
        id: p.id,
        description: format!("New post: {}", preview(&p.content)),
        engagement: Some(p.engagement()),
        sales: None,
        time: p.created_at,
    }
}

fn product_activity(p: &Product) -> ActivityItem {
    ActivityItem {
        kind: ActivityKind::Product,
        id: p.id,
        description: format!("New product: {}", p.name),
        engagement: None,
        sales: Some(p.sales.total_sold),
        time: p.created_at,
    }
}

fn newest<'a, T>(items: &'a [T], n: usize, at: impl Fn(&T) -> DateTime<Utc>) -> Vec<&'a T> {
    let mut v: Vec<&T> = items.iter().collect();
    v.sort_by(|a, b| at(*b).cmp(&at(*a)));
    v.truncate(n);
    v
}

/// Merges two newest-first lists into one, stopping at `limit`.
fn merge_desc(a: Vec<ActivityItem>, b: Vec<ActivityItem>, limit: usize) -> Vec<ActivityItem> {
    let mut out = Vec::with_capacity(limit.min(a.len() + b.len()));
    let (mut a, mut b) = (a.into_iter().peekable(), b.into_iter().peekable());
    while out.len() < limit {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => x.time >= y.time,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        out.extend(if take_a { a.next() } else { b.next() });
    }
    out
}

pub fn recent_activity(posts: &[Post], products: &[Product]) -> Vec<ActivityItem> {
    let posts = newest(posts, RECENT_POSTS, |p| p.created_at).into_iter().map(post_activity).collect();
    let products = newest(products, RECENT_PRODUCTS, |p| p.created_at).into_iter().map(product_activity).collect();
    merge_desc(posts, products, ACTIVITY_WINDOW)
}

/// One group per platform tag; a post on several platforms counts in each.
pub fn platform_performance(posts: &[Post]) -> Vec<PlatformPerformance> {
    let mut groups: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for post in posts {
        for platform in &post.platforms {
            let entry = groups.entry(platform.as_str()).or_default();
            entry.0 += 1;
            entry.1 += post.engagement();
        }
    }
    groups
        .into_iter()
        .map(|(platform, (posts, engagement))| PlatformPerformance { platform: platform.to_string(), posts, engagement })
        .collect()
}

pub fn build_dashboard(
    business: &Business,
    posts: &[Post],
    products: &[Product],
    promotions: &[Promotion],
    now: DateTime<Utc>,
) -> Dashboard {
    let stats = DashboardStats {
        total_posts: posts.len() as i64,
        total_products: products.len() as i64,
        active_promotions: promotions.iter().filter(|p| crate::promotion::is_active(p, now)).count() as i64,
        total_engagement: total_engagement(posts),
        total_revenue: total_revenue(products),
        followers: business.followers,
        engagement_rate: business.engagement_rate,
    };
    Dashboard {
        stats,
        recent_activity: recent_activity(posts, products),
        business: BusinessSummary::from(business),
        platform_performance: platform_performance(posts),
    }
}

/// All-or-nothing: any store failure after the existence check is reported
/// as a single `Failed`.
pub async fn get_dashboard(repo: &dyn Repo, business_id: Id) -> Result<Dashboard, DashboardError> {
    let business = repo.get_business(business_id).await.map_err(|e| match e {
        RepoError::NotFound => DashboardError::NotFound,
        other => DashboardError::Failed(other),
    })?;
    let (posts, products, promotions) = futures_util::try_join!(
        repo.list_posts(business_id),
        repo.list_products(business_id),
        repo.list_promotions(business_id),
    )
    .map_err(|e| {
        error!(business_id, error = %e, "dashboard query failed");
        DashboardError::Failed(e)
    })?;
    Ok(build_dashboard(&business, &posts, &products, &promotions, Utc::now()))
}

pub fn build_snapshot(
    business: &Business,
    posts: &[Post],
    products: &[Product],
    period: AnalyticsPeriod,
    now: DateTime<Utc>,
) -> NewAnalytics {
    NewAnalytics {
        business_id: business.id,
        period,
        date: now,
        followers: FollowerStats { total: business.followers, growth: 0 },
        engagement: EngagementStats {
            rate: crate::engagement::engagement_rate(posts, business.followers),
            likes: posts.iter().map(|p| p.likes_list.len() as i64).sum(),
            comments: posts.iter().map(|p| p.comments_list.len() as i64).sum(),
            shares: posts.iter().map(|p| p.shares).sum(),
        },
        reach: ReachStats {
            impressions: posts.iter().map(|p| p.views).sum(),
            clicks: posts.iter().map(|p| p.clicks).sum(),
        },
        sales: SalesStats {
            total_sold: products.iter().map(|p| p.sales.total_sold).sum(),
            revenue: total_revenue(products),
        },
    }
}

/// Most recent snapshot for `period`, creating the first one on demand.
pub async fn latest_or_create_analytics(repo: &dyn Repo, business_id: Id, period: AnalyticsPeriod) -> RepoResult<Analytics> {
    let business = repo.get_business(business_id).await?;
    if let Some(existing) = repo.latest_analytics(business_id, period).await? {
        return Ok(existing);
    }
    let posts = repo.list_posts(business_id).await?;
    let products = repo.list_products(business_id).await?;
    let created = repo
        .create_analytics(build_snapshot(&business, &posts, &products, period, Utc::now()))
        .await?;
    info!(business_id, period = %period, "created initial analytics snapshot");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc) + Duration::minutes(minutes)
    }

    fn activity(minutes: i64) -> ActivityItem {
        ActivityItem { kind: ActivityKind::Post, id: minutes, description: String::new(), engagement: None, sales: None, time: at(minutes) }
    }

    #[test]
    fn merge_interleaves_and_truncates() {
        let a = vec![activity(9), activity(5), activity(1)];
        let b = vec![activity(8), activity(7), activity(2)];
        let merged = merge_desc(a, b, 4);
        let ids: Vec<_> = merged.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![9, 8, 7, 5]);
    }

    #[test]
    fn long_content_is_shortened() {
        let text = "x".repeat(80);
        let p = preview(&text);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }
}
