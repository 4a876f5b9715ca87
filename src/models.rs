use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Store-assigned identifier shared by every entity.
pub type Id = i64;

/// Declares a string-backed enum with matching serde, `as_str` and `FromStr`
/// so the same spelling is used on the wire and in the database.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $( #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self { $( $name::$variant => $text ),+ }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(UserRole { User => "user", Admin => "admin", BusinessOwner => "business_owner" });
string_enum!(BusinessStatus { Pending => "pending", Active => "active", Inactive => "inactive", Suspended => "suspended" });
string_enum!(PostStatus { Draft => "draft", Scheduled => "scheduled", Published => "published", Failed => "failed" });
string_enum!(DisplayType { Banner => "banner", Popup => "popup" });
string_enum!(DiscountType { Percentage => "percentage", Fixed => "fixed", None => "none" });
string_enum!(
    /// Lifecycle state of a promotion; derived from its dates on every write.
    PromotionStatus { Active => "active", Scheduled => "scheduled", Paused => "paused", Expired => "expired", Draft => "draft" }
);
string_enum!(AnalyticsPeriod { Daily => "daily", Weekly => "weekly", Monthly => "monthly" });
string_enum!(TrackKind { Impression => "impression", Click => "click", Conversion => "conversion" });

// ---------------------------------------------------------------- accounts

/// Business owner or administrator account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// End user: follower, liker and commenter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub interests: Vec<String>,
    pub following: Vec<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ---------------------------------------------------------------- business

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: Id,
    pub owner_id: Id,
    pub name: String,
    pub category: String,
    pub description: String,
    pub website: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo: Option<String>,
    pub status: BusinessStatus,
    pub verified: bool,
    pub rejection_reason: Option<String>,
    pub suspension_reason: Option<String>,
    /// Always `followers_list.len()`.
    pub followers: i64,
    pub followers_list: Vec<Id>,
    pub total_posts: i64,
    pub total_products: i64,
    pub engagement_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBusiness {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub website: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusiness {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo: Option<String>,
}

/// Status write issued by an admin action.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: BusinessStatus,
    pub verified: bool,
    pub rejection_reason: Option<String>,
    pub suspension_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessFilter {
    pub status: Option<BusinessStatus>,
    pub category: Option<String>,
}

/// Owner/business fields joined into other responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub id: Id,
    pub name: String,
    pub category: String,
    pub logo: Option<String>,
    pub status: BusinessStatus,
    pub followers: i64,
    pub engagement_rate: f64,
}

impl From<&Business> for BusinessSummary {
    fn from(b: &Business) -> Self {
        Self {
            id: b.id,
            name: b.name.clone(),
            category: b.category.clone(),
            logo: b.logo.clone(),
            status: b.status,
            followers: b.followers,
            engagement_rate: b.engagement_rate,
        }
    }
}

// ------------------------------------------------------------------- posts

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Media {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: Id,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id,
    pub business_id: Id,
    pub author_id: Id,
    pub content: String,
    pub media: Option<Media>,
    pub platforms: Vec<String>,
    pub status: PostStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub likes_list: Vec<Id>,
    /// Always `likes_list.len()`.
    pub likes_count: i64,
    pub comments_list: Vec<Comment>,
    /// Always `comments_list.len()`.
    pub comments_count: i64,
    pub shares: i64,
    pub views: i64,
    pub clicks: i64,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Likes, comments and shares attributed to this post.
    pub fn engagement(&self) -> i64 {
        self.likes_list.len() as i64 + self.comments_list.len() as i64 + self.shares
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub business_id: Id,
    pub content: String,
    pub media: Option<Media>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub status: Option<PostStatus>,
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub user_id: Id,
    pub user_name: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Post joined with its business and resolved comment authors.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub business: BusinessSummary,
    pub comments: Vec<CommentView>,
}

// ---------------------------------------------------------------- products

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub total_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Id,
    pub business_id: Id,
    pub name: String,
    pub link: Option<String>,
    pub price: f64,
    pub sku: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub sales: ProductSales,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub business_id: Id,
    pub name: String,
    pub link: Option<String>,
    pub price: f64,
    pub sku: Option<String>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub quantity: i64,
}

// -------------------------------------------------------------- promotions

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPerformance {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Id,
    pub business_id: Id,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub promo_type: String,
    pub display_type: DisplayType,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub coupon_code: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: PromotionStatus,
    pub platforms: Vec<String>,
    pub image: Option<String>,
    pub performance: PromotionPerformance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-supplied promotion fields for create and update. Any `status`
/// sent by a client is ignored; the server derives it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionInput {
    pub business_id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_promo_type")]
    pub promo_type: String,
    #[serde(default = "default_display_type")]
    pub display_type: DisplayType,
    #[serde(default = "default_discount_type")]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: f64,
    pub coupon_code: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub image: Option<String>,
}

fn default_promo_type() -> String { "discount".into() }
fn default_display_type() -> DisplayType { DisplayType::Banner }
fn default_discount_type() -> DiscountType { DiscountType::None }

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackRequest {
    #[serde(rename = "type")]
    pub kind: TrackKind,
}

// --------------------------------------------------------------- analytics

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowerStats {
    pub total: i64,
    pub growth: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStats {
    pub rate: f64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReachStats {
    pub impressions: i64,
    pub clicks: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub id: Id,
    pub business_id: Id,
    pub period: AnalyticsPeriod,
    pub date: DateTime<Utc>,
    pub followers: FollowerStats,
    pub engagement: EngagementStats,
    pub reach: ReachStats,
    pub sales: SalesStats,
    pub created_at: DateTime<Utc>,
}

/// Analytics snapshot before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewAnalytics {
    pub business_id: Id,
    pub period: AnalyticsPeriod,
    pub date: DateTime<Utc>,
    pub followers: FollowerStats,
    pub engagement: EngagementStats,
    pub reach: ReachStats,
    pub sales: SalesStats,
}

// -------------------------------------------------------------- engagement

/// Result of flipping an actor's membership in a target's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    pub active: bool,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorRequest {
    pub user_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub user_id: Id,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub is_following: bool,
    pub followers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub is_liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatusResponse {
    pub is_liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub comments_count: i64,
    pub comment: Comment,
}
