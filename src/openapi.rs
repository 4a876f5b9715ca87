use crate::dashboard::{ActivityItem, ActivityKind, Dashboard, DashboardStats, PlatformPerformance};
use crate::models::*;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::register_user,
        crate::routes::login_user,
        crate::routes::register_client,
        crate::routes::login_client,
        crate::routes::create_business,
        crate::routes::my_business,
        crate::routes::get_business,
        crate::routes::list_businesses,
        crate::routes::update_business,
        crate::routes::delete_business,
        crate::routes::admin_business_action,
        crate::routes::create_post,
        crate::routes::list_business_posts,
        crate::routes::delete_post,
        crate::routes::follow_business,
        crate::routes::like_post,
        crate::routes::like_status,
        crate::routes::comment_post,
        crate::routes::create_product,
        crate::routes::list_business_products,
        crate::routes::delete_product,
        crate::routes::record_sale,
        crate::routes::create_promotion,
        crate::routes::update_promotion,
        crate::routes::list_business_promotions,
        crate::routes::pause_promotion,
        crate::routes::resume_promotion,
        crate::routes::delete_promotion,
        crate::routes::track_promotion,
        crate::routes::get_dashboard,
        crate::routes::get_analytics,
    ),
    components(schemas(
        UserRole, BusinessStatus, PostStatus, DisplayType, DiscountType, PromotionStatus, AnalyticsPeriod, TrackKind,
        User, NewUser, Client, NewClient, LoginRequest,
        Business, NewBusiness, UpdateBusiness, BusinessSummary,
        Media, Comment, Post, NewPost, CommentView, PostView,
        Product, ProductSales, NewProduct, SaleRequest,
        Promotion, PromotionPerformance, PromotionInput, TrackRequest,
        Analytics, FollowerStats, EngagementStats, ReachStats, SalesStats,
        ActorRequest, CommentRequest, FollowResponse, LikeResponse, LikeStatusResponse, CommentResponse,
        Dashboard, DashboardStats, ActivityItem, ActivityKind, PlatformPerformance,
        crate::business::AdminAction,
        crate::routes::UserAuthResponse, crate::routes::ClientAuthResponse, crate::routes::ReasonRequest,
        crate::routes::PromotionView, crate::routes::DashboardResponse,
    )),
    tags(
        (name = "businesses", description = "Business registration and moderation"),
        (name = "engagement", description = "Follows, likes and comments"),
        (name = "promotions", description = "Promotion lifecycle and tracking"),
    )
)]
pub struct ApiDoc;
