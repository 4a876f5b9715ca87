use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{create_client_jwt, create_user_jwt, hash_password, verify_password, Auth, Role};
use crate::business::{self, AdminAction};
use crate::dashboard;
use crate::engagement;
use crate::error::ApiError;
use crate::models::*;
use crate::promotion;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::{NewAccount, Repo, RepoError};
use crate::require_role;

const MAX_POST_LEN: usize = 2000;
const MIN_PASSWORD_LEN: usize = 6;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // accounts
            .service(web::resource("/auth/register").route(web::post().to(register_user)))
            .service(web::resource("/auth/login").route(web::post().to(login_user)))
            .service(web::resource("/clients/register").route(web::post().to(register_client)))
            .service(web::resource("/clients/login").route(web::post().to(login_client)))
            // businesses
            .service(web::resource("/business").route(web::post().to(create_business)))
            .service(web::resource("/business/mine").route(web::get().to(my_business)))
            .service(
                web::resource("/business/{id}")
                    .route(web::get().to(get_business))
                    .route(web::put().to(update_business))
                    .route(web::delete().to(delete_business)),
            )
            .service(web::resource("/businesses").route(web::get().to(list_businesses)))
            .service(web::resource("/business/{id}/posts").route(web::get().to(list_business_posts)))
            .service(web::resource("/business/{id}/products").route(web::get().to(list_business_products)))
            .service(web::resource("/business/{id}/promotions").route(web::get().to(list_business_promotions)))
            .service(web::resource("/admin/business/{id}/{action}").route(web::post().to(admin_business_action)))
            // engagement
            .service(web::resource("/follow/{id}").route(web::post().to(follow_business)))
            .service(web::resource("/post/{id}/like").route(web::post().to(like_post)))
            .service(web::resource("/post/{id}/like-status/{user_id}").route(web::get().to(like_status)))
            .service(web::resource("/post/{id}/comment").route(web::post().to(comment_post)))
            // posts & products
            .service(web::resource("/posts").route(web::post().to(create_post)))
            .service(web::resource("/post/{id}").route(web::delete().to(delete_post)))
            .service(web::resource("/products").route(web::post().to(create_product)))
            .service(web::resource("/product/{id}").route(web::delete().to(delete_product)))
            .service(web::resource("/product/{id}/sale").route(web::post().to(record_sale)))
            // promotions
            .service(web::resource("/promotions").route(web::post().to(create_promotion)))
            .service(
                web::resource("/promotions/{id}")
                    .route(web::put().to(update_promotion))
                    .route(web::delete().to(delete_promotion)),
            )
            .service(web::resource("/promotions/{id}/pause").route(web::post().to(pause_promotion)))
            .service(web::resource("/promotions/{id}/resume").route(web::post().to(resume_promotion)))
            .service(web::resource("/promotion/{id}/track").route(web::post().to(track_promotion)))
            // read-side aggregation
            .service(web::resource("/dashboard/{id}").route(web::get().to(get_dashboard)))
            .service(web::resource("/analytics/{id}").route(web::get().to(get_analytics))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub rate_limiter: Option<RateLimiterFacade>,
    pub bootstrap_admins: Vec<String>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo, rate_limiter: None, bootstrap_admins: Vec::new() }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiterFacade) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_bootstrap_admins(mut self, emails: Vec<String>) -> Self {
        self.bootstrap_admins = emails;
        self
    }
}

// ------------------------------------------------------------ guards

/// Business `id` when the caller owns it or is an admin.
async fn owned_business(data: &AppState, auth: &Auth, id: Id) -> Result<Business, ApiError> {
    let business = data.repo.get_business(id).await?;
    if auth.0.is_admin() || auth.0.user_id() == Some(business.owner_id) {
        Ok(business)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// The token must belong to the client named in the request body.
fn ensure_actor(auth: &Auth, user_id: Id) -> Result<(), ApiError> {
    if auth.0.client_id() == Some(user_id) { Ok(()) } else { Err(ApiError::Forbidden) }
}

fn reject_if_any(errors: Vec<String>) -> Result<(), ApiError> {
    if errors.is_empty() { Ok(()) } else { Err(ApiError::Validation(errors)) }
}

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    ApiError::Internal(format!("token creation failed: {e}"))
}

fn check_account(name: &str, email: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() { errors.push("name is required".to_string()); }
    if !email.contains('@') { errors.push("a valid email is required".to_string()); }
    if password.len() < MIN_PASSWORD_LEN {
        errors.push(format!("password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    reject_if_any(errors)
}

fn roles_for(role: UserRole) -> Vec<Role> {
    match role {
        UserRole::Admin => vec![Role::Admin],
        UserRole::BusinessOwner => vec![Role::BusinessOwner],
        UserRole::User => vec![Role::User],
    }
}

fn credentials_error(e: RepoError) -> ApiError {
    match e {
        RepoError::NotFound => ApiError::Unauthorized,
        other => other.into(),
    }
}

// ---------------------------------------------------------- accounts

#[derive(Debug, Serialize, ToSchema)]
pub struct UserAuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientAuthResponse {
    pub token: String,
    pub client: Client,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = NewUser,
    responses(
        (status = 201, description = "Owner account created", body = UserAuthResponse),
        (status = 400, description = "Invalid input or email taken")
    )
)]
pub async fn register_user(data: web::Data<AppState>, payload: web::Json<NewUser>) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    check_account(&new.name, &new.email, &new.password)?;
    let role = if data.bootstrap_admins.iter().any(|e| e.eq_ignore_ascii_case(new.email.trim())) {
        UserRole::Admin
    } else {
        UserRole::BusinessOwner
    };
    let account = NewAccount { name: new.name.trim().to_string(), email: new.email, password_hash: hash_password(&new.password) };
    let user = data.repo.create_user(account, role).await?;
    let token = create_user_jwt(user.id, roles_for(user.role)).map_err(token_error)?;
    tracing::info!(user_id = user.id, role = %user.role, "user registered");
    Ok(HttpResponse::Created().json(UserAuthResponse { token, user }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserAuthResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login_user(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let (user, hash) = data.repo.user_credentials(&payload.email).await.map_err(credentials_error)?;
    if !verify_password(&payload.password, &hash) {
        return Err(ApiError::Unauthorized);
    }
    let token = create_user_jwt(user.id, roles_for(user.role)).map_err(token_error)?;
    Ok(HttpResponse::Ok().json(UserAuthResponse { token, user }))
}

#[utoipa::path(
    post,
    path = "/api/clients/register",
    request_body = NewClient,
    responses(
        (status = 201, description = "Client account created", body = ClientAuthResponse),
        (status = 400, description = "Invalid input or email taken")
    )
)]
pub async fn register_client(data: web::Data<AppState>, payload: web::Json<NewClient>) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    check_account(&new.name, &new.email, &new.password)?;
    let account = NewAccount { name: new.name.trim().to_string(), email: new.email, password_hash: hash_password(&new.password) };
    let client = data.repo.create_client(account, new.profile_image, new.interests).await?;
    let token = create_client_jwt(client.id).map_err(token_error)?;
    Ok(HttpResponse::Created().json(ClientAuthResponse { token, client }))
}

#[utoipa::path(
    post,
    path = "/api/clients/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ClientAuthResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login_client(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let (client, hash) = data.repo.client_credentials(&payload.email).await.map_err(credentials_error)?;
    if !verify_password(&payload.password, &hash) {
        return Err(ApiError::Unauthorized);
    }
    let token = create_client_jwt(client.id).map_err(token_error)?;
    Ok(HttpResponse::Ok().json(ClientAuthResponse { token, client }))
}

// -------------------------------------------------------- businesses

#[utoipa::path(
    post,
    path = "/api/business",
    request_body = NewBusiness,
    responses(
        (status = 201, description = "Business registered (pending approval)", body = Business),
        (status = 400, description = "Invalid input, duplicate name/website, or owner already registered"),
        (status = 403, description = "Business owners only")
    )
)]
pub async fn create_business(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewBusiness>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::BusinessOwner | Role::Admin);
    let owner_id = auth.0.user_id().ok_or(ApiError::Forbidden)?;
    let new = payload.into_inner();
    reject_if_any(business::validate_new(&new))?;
    let created = data.repo.create_business(owner_id, new).await?;
    tracing::info!(business_id = created.id, owner_id, "business registered");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/business/mine",
    responses(
        (status = 200, description = "The caller's business", body = Business),
        (status = 403, description = "Not a user token"),
        (status = 404, description = "No business registered")
    )
)]
pub async fn my_business(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let owner_id = auth.0.user_id().ok_or(ApiError::Forbidden)?;
    let business = data.repo.business_by_owner(owner_id).await?;
    Ok(HttpResponse::Ok().json(business))
}

#[utoipa::path(
    get,
    path = "/api/business/{id}",
    params(("id" = i64, Path, description = "Business id")),
    responses(
        (status = 200, description = "Business", body = Business),
        (status = 404, description = "Business not found")
    )
)]
pub async fn get_business(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let business = data.repo.get_business(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(business))
}

#[utoipa::path(
    get,
    path = "/api/businesses",
    params(
        ("status" = Option<String>, Query, description = "Admin only: filter by status (defaults to active)"),
        ("category" = Option<String>, Query, description = "Filter by category")
    ),
    responses((status = 200, description = "List businesses", body = [Business]))
)]
pub async fn list_businesses(auth: Option<Auth>, data: web::Data<AppState>, query: web::Query<BusinessFilter>) -> Result<HttpResponse, ApiError> {
    let mut filter = query.into_inner();
    let is_admin = auth.as_ref().map(|a| a.0.is_admin()).unwrap_or(false);
    if !is_admin {
        filter.status = Some(BusinessStatus::Active);
    }
    let businesses = data.repo.list_businesses(&filter).await?;
    Ok(HttpResponse::Ok().json(businesses))
}

#[utoipa::path(
    put,
    path = "/api/business/{id}",
    request_body = UpdateBusiness,
    params(("id" = i64, Path, description = "Business id")),
    responses(
        (status = 200, description = "Business updated", body = Business),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Business not found")
    )
)]
pub async fn update_business(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateBusiness>,
) -> Result<HttpResponse, ApiError> {
    let business = owned_business(&data, &auth, path.into_inner()).await?;
    let upd = payload.into_inner();
    reject_if_any(business::validate_update(&upd))?;
    let updated = data.repo.update_business(business.id, upd).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/business/{id}",
    params(("id" = i64, Path, description = "Business id")),
    responses(
        (status = 204, description = "Business deleted with its posts, products, promotions and analytics"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Business not found")
    )
)]
pub async fn delete_business(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let business = owned_business(&data, &auth, path.into_inner()).await?;
    data.repo.delete_business(business.id).await?;
    tracing::info!(business_id = business.id, "business deleted with its content");
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/admin/business/{id}/{action}",
    request_body = ReasonRequest,
    params(
        ("id" = i64, Path, description = "Business id"),
        ("action" = AdminAction, Path, description = "approve | reject | suspend | reactivate")
    ),
    responses(
        (status = 200, description = "Status changed", body = Business),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn admin_business_action(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(Id, AdminAction)>,
    payload: Option<web::Json<ReasonRequest>>,
) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let (id, action) = path.into_inner();
    let reason = payload.and_then(|p| p.into_inner().reason);
    let current = data.repo.get_business(id).await?;
    let change = business::transition(&current, action, reason).map_err(ApiError::invalid)?;
    let updated = data.repo.set_business_status(id, change).await?;
    tracing::info!(business_id = id, status = %updated.status, "business status changed by admin");
    Ok(HttpResponse::Ok().json(updated))
}

// -------------------------------------------------------------- posts

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn create_post(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewPost>) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    let business = owned_business(&data, &auth, new.business_id).await?;
    let content_len = new.content.trim().chars().count();
    if content_len == 0 {
        return Err(ApiError::invalid("content is required"));
    }
    if content_len > MAX_POST_LEN {
        return Err(ApiError::invalid(format!("content cannot exceed {MAX_POST_LEN} characters")));
    }
    let author_id = auth.0.user_id().ok_or(ApiError::Forbidden)?;
    let post = data.repo.create_post(author_id, new).await?;
    tracing::debug!(post_id = post.id, business_id = business.id, "post created");
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/business/{id}/posts",
    params(("id" = i64, Path, description = "Business id")),
    responses(
        (status = 200, description = "Posts with business summary and comment authors", body = [PostView]),
        (status = 404, description = "Business not found")
    )
)]
pub async fn list_business_posts(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let business = data.repo.get_business(path.into_inner()).await?;
    let posts = data.repo.list_posts(business.id).await?;

    // one batch lookup for every commenter on the page
    let ids: Vec<Id> = posts
        .iter()
        .flat_map(|p| p.comments_list.iter().map(|c| c.user_id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let names: HashMap<Id, String> = data.repo.get_clients(&ids).await?.into_iter().map(|c| (c.id, c.name)).collect();

    let summary = BusinessSummary::from(&business);
    let views: Vec<PostView> = posts
        .into_iter()
        .map(|post| {
            let comments = post
                .comments_list
                .iter()
                .map(|c| CommentView {
                    user_id: c.user_id,
                    user_name: names.get(&c.user_id).cloned(),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
                .collect();
            PostView { post, business: summary.clone(), comments }
        })
        .collect();
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    delete,
    path = "/api/post/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted; engagement rate recomputed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    owned_business(&data, &auth, post.business_id).await?;
    data.repo.delete_post(post.id).await?;
    engagement::recompute_engagement(data.repo.as_ref(), post.business_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// --------------------------------------------------------- engagement

#[utoipa::path(
    post,
    path = "/api/follow/{id}",
    request_body = ActorRequest,
    params(("id" = i64, Path, description = "Business id")),
    responses(
        (status = 200, description = "Follow toggled", body = FollowResponse),
        (status = 403, description = "Token does not belong to userId"),
        (status = 404, description = "Business or client not found"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn follow_business(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ActorRequest>,
) -> Result<HttpResponse, ApiError> {
    ensure_actor(&auth, payload.user_id)?;
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_follow(payload.user_id) { return Err(ApiError::TooManyRequests); }
    }
    let resp = engagement::toggle_follow(data.repo.as_ref(), path.into_inner(), payload.user_id).await?;
    Ok(HttpResponse::Ok().json(resp))
}

#[utoipa::path(
    post,
    path = "/api/post/{id}/like",
    request_body = ActorRequest,
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 403, description = "Token does not belong to userId"),
        (status = 404, description = "Post or client not found"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn like_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ActorRequest>,
) -> Result<HttpResponse, ApiError> {
    ensure_actor(&auth, payload.user_id)?;
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_like(payload.user_id) { return Err(ApiError::TooManyRequests); }
    }
    let resp = engagement::toggle_like(data.repo.as_ref(), path.into_inner(), payload.user_id).await?;
    Ok(HttpResponse::Ok().json(resp))
}

#[utoipa::path(
    get,
    path = "/api/post/{id}/like-status/{user_id}",
    params(
        ("id" = i64, Path, description = "Post id"),
        ("user_id" = i64, Path, description = "Client id")
    ),
    responses(
        (status = 200, description = "Membership test", body = LikeStatusResponse),
        (status = 404, description = "Post not found")
    )
)]
pub async fn like_status(data: web::Data<AppState>, path: web::Path<(Id, Id)>) -> Result<HttpResponse, ApiError> {
    let (post_id, user_id) = path.into_inner();
    let is_liked = engagement::like_status(data.repo.as_ref(), post_id, user_id).await?;
    Ok(HttpResponse::Ok().json(LikeStatusResponse { is_liked }))
}

#[utoipa::path(
    post,
    path = "/api/post/{id}/comment",
    request_body = CommentRequest,
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 201, description = "Comment appended", body = CommentResponse),
        (status = 400, description = "Empty comment"),
        (status = 403, description = "Token does not belong to userId"),
        (status = 404, description = "Post or client not found")
    )
)]
pub async fn comment_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    ensure_actor(&auth, req.user_id)?;
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_comment(req.user_id) { return Err(ApiError::TooManyRequests); }
    }
    let (comment, comments_count) = engagement::add_comment(data.repo.as_ref(), path.into_inner(), req.user_id, &req.text).await?;
    Ok(HttpResponse::Created().json(CommentResponse { comments_count, comment }))
}

// ----------------------------------------------------------- products

fn generate_sku() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("SKU-{}", raw[..8].to_uppercase())
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid input or duplicate sku"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn create_product(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewProduct>) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    owned_business(&data, &auth, new.business_id).await?;
    let mut errors = Vec::new();
    if new.name.trim().is_empty() { errors.push("name is required".to_string()); }
    if new.price.is_nan() || new.price < 0.0 { errors.push("price must be 0 or more".to_string()); }
    reject_if_any(errors)?;
    let sku = new.sku.clone().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).unwrap_or_else(generate_sku);
    let product = data.repo.create_product(new, sku).await?;
    Ok(HttpResponse::Created().json(product))
}

#[utoipa::path(
    get,
    path = "/api/business/{id}/products",
    params(("id" = i64, Path, description = "Business id")),
    responses((status = 200, description = "Products, newest first", body = [Product]))
)]
pub async fn list_business_products(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let business = data.repo.get_business(path.into_inner()).await?;
    let products = data.repo.list_products(business.id).await?;
    Ok(HttpResponse::Ok().json(products))
}

#[utoipa::path(
    delete,
    path = "/api/product/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn delete_product(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let product = data.repo.get_product(path.into_inner()).await?;
    owned_business(&data, &auth, product.business_id).await?;
    data.repo.delete_product(product.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/product/{id}/sale",
    request_body = SaleRequest,
    params(("id" = i64, Path, description = "Product id")),
    responses((status = 200, description = "Sale recorded", body = Product))
)]
pub async fn record_sale(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<SaleRequest>,
) -> Result<HttpResponse, ApiError> {
    if payload.quantity <= 0 {
        return Err(ApiError::invalid("quantity must be positive"));
    }
    let product = data.repo.get_product(path.into_inner()).await?;
    owned_business(&data, &auth, product.business_id).await?;
    let updated = data.repo.record_sale(product.id, payload.quantity).await?;
    Ok(HttpResponse::Ok().json(updated))
}

// --------------------------------------------------------- promotions

/// Promotion plus its derived `isActive` view.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionView {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub is_active: bool,
}

impl PromotionView {
    fn at(promotion: Promotion, now: chrono::DateTime<Utc>) -> Self {
        let is_active = promotion::is_active(&promotion, now);
        Self { promotion, is_active }
    }
}

#[utoipa::path(
    post,
    path = "/api/promotions",
    request_body = PromotionInput,
    responses(
        (status = 201, description = "Promotion created; status derived from its dates", body = PromotionView),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn create_promotion(auth: Auth, data: web::Data<AppState>, payload: web::Json<PromotionInput>) -> Result<HttpResponse, ApiError> {
    let mut input = payload.into_inner();
    owned_business(&data, &auth, input.business_id).await?;
    let now = Utc::now();
    input.start_date.get_or_insert(now);
    reject_if_any(promotion::validate(&input))?;
    let created = data.repo.create_promotion(promotion::new_promotion(input, now)).await?;
    Ok(HttpResponse::Created().json(PromotionView::at(created, now)))
}

#[utoipa::path(
    put,
    path = "/api/promotions/{id}",
    request_body = PromotionInput,
    params(("id" = i64, Path, description = "Promotion id")),
    responses(
        (status = 200, description = "Promotion updated; status re-derived", body = PromotionView),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn update_promotion(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<PromotionInput>,
) -> Result<HttpResponse, ApiError> {
    let existing = data.repo.get_promotion(path.into_inner()).await?;
    owned_business(&data, &auth, existing.business_id).await?;
    let mut input = payload.into_inner();
    input.start_date = input.start_date.or(Some(existing.start_date));
    reject_if_any(promotion::validate(&input))?;
    let now = Utc::now();
    let updated = data.repo.update_promotion(promotion::apply_update(&existing, input, now)).await?;
    Ok(HttpResponse::Ok().json(PromotionView::at(updated, now)))
}

#[utoipa::path(
    get,
    path = "/api/business/{id}/promotions",
    params(("id" = i64, Path, description = "Business id")),
    responses((status = 200, description = "Promotions, newest first", body = [PromotionView]))
)]
pub async fn list_business_promotions(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let business = data.repo.get_business(path.into_inner()).await?;
    let now = Utc::now();
    let promotions: Vec<PromotionView> = data.repo
        .list_promotions(business.id)
        .await?
        .into_iter()
        .map(|p| PromotionView::at(p, now))
        .collect();
    Ok(HttpResponse::Ok().json(promotions))
}

async fn set_promotion_status(
    auth: &Auth,
    data: &AppState,
    id: Id,
    next: impl Fn(&Promotion, chrono::DateTime<Utc>) -> Result<PromotionStatus, promotion::TransitionError>,
) -> Result<HttpResponse, ApiError> {
    let mut promo = data.repo.get_promotion(id).await?;
    owned_business(data, auth, promo.business_id).await?;
    let now = Utc::now();
    promo.status = next(&promo, now).map_err(|e| ApiError::invalid(e.to_string()))?;
    let updated = data.repo.update_promotion(promo).await?;
    Ok(HttpResponse::Ok().json(PromotionView::at(updated, now)))
}

#[utoipa::path(
    post,
    path = "/api/promotions/{id}/pause",
    params(("id" = i64, Path, description = "Promotion id")),
    responses(
        (status = 200, description = "Promotion paused", body = PromotionView),
        (status = 400, description = "Only active promotions can be paused"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn pause_promotion(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    set_promotion_status(&auth, &data, path.into_inner(), promotion::pause).await
}

#[utoipa::path(
    post,
    path = "/api/promotions/{id}/resume",
    params(("id" = i64, Path, description = "Promotion id")),
    responses(
        (status = 200, description = "Promotion resumed; status re-derived from its dates", body = PromotionView),
        (status = 400, description = "Promotion is not paused"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn resume_promotion(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    set_promotion_status(&auth, &data, path.into_inner(), promotion::resume).await
}

#[utoipa::path(
    delete,
    path = "/api/promotions/{id}",
    params(("id" = i64, Path, description = "Promotion id")),
    responses(
        (status = 204, description = "Promotion deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn delete_promotion(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let promo = data.repo.get_promotion(path.into_inner()).await?;
    owned_business(&data, &auth, promo.business_id).await?;
    data.repo.delete_promotion(promo.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/promotion/{id}/track",
    request_body = TrackRequest,
    params(("id" = i64, Path, description = "Promotion id")),
    responses(
        (status = 200, description = "Counter incremented"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn track_promotion(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<TrackRequest>) -> Result<HttpResponse, ApiError> {
    let kind = payload.kind;
    data.repo.track_promotion(path.into_inner(), kind).await?;
    metrics::increment_counter!("storefront_promotion_events_total", "type" => kind.as_str());
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

// ------------------------------------------------------- aggregation

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub success: bool,
    pub dashboard: dashboard::Dashboard,
}

#[utoipa::path(
    get,
    path = "/api/dashboard/{id}",
    params(("id" = i64, Path, description = "Business id")),
    responses(
        (status = 200, description = "Owner dashboard", body = DashboardResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Business not found"),
        (status = 500, description = "Failed to fetch dashboard")
    )
)]
pub async fn get_dashboard(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let business = owned_business(&data, &auth, path.into_inner()).await?;
    let dashboard = dashboard::get_dashboard(data.repo.as_ref(), business.id).await?;
    Ok(HttpResponse::Ok().json(DashboardResponse { success: true, dashboard }))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub period: Option<AnalyticsPeriod>,
}

#[utoipa::path(
    get,
    path = "/api/analytics/{id}",
    params(
        ("id" = i64, Path, description = "Business id"),
        ("period" = Option<String>, Query, description = "daily | weekly | monthly (default daily)")
    ),
    responses(
        (status = 200, description = "Latest snapshot, created on first read", body = Analytics),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn get_analytics(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, ApiError> {
    let business = owned_business(&data, &auth, path.into_inner()).await?;
    let period = query.period.unwrap_or(AnalyticsPeriod::Daily);
    let snapshot = dashboard::latest_or_create_analytics(data.repo.as_ref(), business.id, period).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}
