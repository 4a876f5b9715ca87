#![cfg(feature = "inmem-store")]

use storefront::engagement::{self, EngagementError, MAX_COMMENT_LEN};
use storefront::models::*;
use async_trait::async_trait;
use storefront::repo::{
    inmem::InMemRepo, AnalyticsRepo, BusinessRepo, ClientRepo, NewAccount, PostRepo, ProductRepo, PromotionRepo, Repo,
    RepoError, RepoResult, UserRepo,
};

async fn client(repo: &dyn Repo, email: &str) -> Client {
    repo.create_client(
        NewAccount { name: email.split('@').next().unwrap_or("c").into(), email: email.into(), password_hash: "s$h".into() },
        None,
        vec![],
    )
    .await
    .unwrap()
}

async fn business_with_post(repo: &dyn Repo) -> (Business, Post) {
    let b = repo
        .create_business(
            1,
            NewBusiness {
                name: "Corner Cafe".into(),
                category: "food".into(),
                description: String::new(),
                website: None,
                address: None,
                phone: None,
                logo: None,
            },
        )
        .await
        .unwrap();
    let p = repo
        .create_post(
            1,
            NewPost {
                business_id: b.id,
                content: "Fresh bread today".into(),
                media: None,
                platforms: vec![],
                status: None,
                scheduled_for: None,
                tags: vec![],
                category: None,
            },
        )
        .await
        .unwrap();
    (b, p)
}

#[tokio::test]
async fn follow_toggle_is_an_involution() {
    let repo = InMemRepo::new();
    let repo: &dyn Repo = &repo;
    let (b, _) = business_with_post(repo).await;
    let c = client(repo, "cy@example.com").await;

    let on = engagement::toggle_follow(repo, b.id, c.id).await.unwrap();
    assert!(on.is_following);
    assert_eq!(on.followers, 1);
    assert_eq!(repo.get_client(c.id).await.unwrap().following, vec![b.id]);

    let off = engagement::toggle_follow(repo, b.id, c.id).await.unwrap();
    assert!(!off.is_following);
    assert_eq!(off.followers, 0);
    assert!(repo.get_client(c.id).await.unwrap().following.is_empty());

    let b = repo.get_business(b.id).await.unwrap();
    assert!(b.followers_list.is_empty());
    assert_eq!(b.engagement_rate, 0.0);
}

#[tokio::test]
async fn unknown_client_or_target_is_not_found() {
    let repo = InMemRepo::new();
    let repo: &dyn Repo = &repo;
    let (b, p) = business_with_post(repo).await;
    let c = client(repo, "cy@example.com").await;

    assert!(matches!(engagement::toggle_follow(repo, b.id, 9999).await, Err(RepoError::NotFound)));
    assert!(matches!(engagement::toggle_follow(repo, 9999, c.id).await, Err(RepoError::NotFound)));
    assert!(matches!(engagement::toggle_like(repo, 9999, c.id).await, Err(RepoError::NotFound)));
    assert!(matches!(engagement::like_status(repo, 9999, c.id).await, Err(RepoError::NotFound)));
    assert!(!engagement::like_status(repo, p.id, c.id).await.unwrap());
}

#[tokio::test]
async fn like_and_status_agree() {
    let repo = InMemRepo::new();
    let repo: &dyn Repo = &repo;
    let (_, p) = business_with_post(repo).await;
    let a = client(repo, "a@example.com").await;
    let z = client(repo, "z@example.com").await;

    assert_eq!(engagement::toggle_like(repo, p.id, a.id).await.unwrap().likes_count, 1);
    assert_eq!(engagement::toggle_like(repo, p.id, z.id).await.unwrap().likes_count, 2);
    assert!(engagement::like_status(repo, p.id, a.id).await.unwrap());

    let r = engagement::toggle_like(repo, p.id, a.id).await.unwrap();
    assert!(!r.is_liked);
    assert_eq!(r.likes_count, 1);
    assert!(!engagement::like_status(repo, p.id, a.id).await.unwrap());

    let post = repo.get_post(p.id).await.unwrap();
    assert_eq!(post.likes_list, vec![z.id]);
}

#[tokio::test]
async fn blank_comment_is_rejected_without_side_effects() {
    let repo = InMemRepo::new();
    let repo: &dyn Repo = &repo;
    let (_, p) = business_with_post(repo).await;
    let c = client(repo, "cy@example.com").await;

    let err = engagement::add_comment(repo, p.id, c.id, "   ").await.unwrap_err();
    assert!(matches!(err, EngagementError::Invalid(_)));
    let too_long = "x".repeat(MAX_COMMENT_LEN + 1);
    assert!(matches!(engagement::add_comment(repo, p.id, c.id, &too_long).await, Err(EngagementError::Invalid(_))));

    let post = repo.get_post(p.id).await.unwrap();
    assert_eq!(post.comments_count, 0);
    assert!(post.comments_list.is_empty());
}

#[tokio::test]
async fn comments_append_in_order() {
    let repo = InMemRepo::new();
    let repo: &dyn Repo = &repo;
    let (_, p) = business_with_post(repo).await;
    let c = client(repo, "cy@example.com").await;

    let (first, n) = engagement::add_comment(repo, p.id, c.id, "  Nice!  ").await.unwrap();
    assert_eq!(first.text, "Nice!");
    assert_eq!(n, 1);
    let (_, n) = engagement::add_comment(repo, p.id, c.id, "Again").await.unwrap();
    assert_eq!(n, 2);

    let post = repo.get_post(p.id).await.unwrap();
    let texts: Vec<_> = post.comments_list.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Nice!", "Again"]);
    assert_eq!(post.comments_count, 2);
}

#[tokio::test]
async fn engagement_rate_tracks_interactions_per_follower() {
    let repo = InMemRepo::new();
    let repo: &dyn Repo = &repo;
    let (b, p) = business_with_post(repo).await;
    let c = client(repo, "cy@example.com").await;

    engagement::toggle_follow(repo, b.id, c.id).await.unwrap();
    engagement::toggle_like(repo, p.id, c.id).await.unwrap();
    assert_eq!(repo.get_business(b.id).await.unwrap().engagement_rate, 100.0);

    engagement::add_comment(repo, p.id, c.id, "Great").await.unwrap();
    assert_eq!(repo.get_business(b.id).await.unwrap().engagement_rate, 200.0);

    let other = client(repo, "dee@example.com").await;
    engagement::toggle_follow(repo, b.id, other.id).await.unwrap();
    assert_eq!(repo.get_business(b.id).await.unwrap().engagement_rate, 100.0);
}

/// In-memory store whose follow-up cache writes always fail.
struct CacheWritesFail(InMemRepo);

#[async_trait]
impl UserRepo for CacheWritesFail {
    async fn create_user(&self, account: NewAccount, role: UserRole) -> RepoResult<User> { self.0.create_user(account, role).await }
    async fn get_user(&self, id: Id) -> RepoResult<User> { self.0.get_user(id).await }
    async fn user_credentials(&self, email: &str) -> RepoResult<(User, String)> { self.0.user_credentials(email).await }
}

#[async_trait]
impl ClientRepo for CacheWritesFail {
    async fn create_client(&self, account: NewAccount, profile_image: Option<String>, interests: Vec<String>) -> RepoResult<Client> {
        self.0.create_client(account, profile_image, interests).await
    }
    async fn get_client(&self, id: Id) -> RepoResult<Client> { self.0.get_client(id).await }
    async fn get_clients(&self, ids: &[Id]) -> RepoResult<Vec<Client>> { self.0.get_clients(ids).await }
    async fn client_credentials(&self, email: &str) -> RepoResult<(Client, String)> { self.0.client_credentials(email).await }
    async fn set_following(&self, _: Id, _: Id, _: bool) -> RepoResult<()> { Err(RepoError::Internal("down".into())) }
}

#[async_trait]
impl BusinessRepo for CacheWritesFail {
    async fn create_business(&self, owner_id: Id, new: NewBusiness) -> RepoResult<Business> { self.0.create_business(owner_id, new).await }
    async fn get_business(&self, id: Id) -> RepoResult<Business> { self.0.get_business(id).await }
    async fn business_by_owner(&self, owner_id: Id) -> RepoResult<Business> { self.0.business_by_owner(owner_id).await }
    async fn list_businesses(&self, filter: &BusinessFilter) -> RepoResult<Vec<Business>> { self.0.list_businesses(filter).await }
    async fn update_business(&self, id: Id, upd: UpdateBusiness) -> RepoResult<Business> { self.0.update_business(id, upd).await }
    async fn set_business_status(&self, id: Id, change: StatusChange) -> RepoResult<Business> { self.0.set_business_status(id, change).await }
    async fn delete_business(&self, id: Id) -> RepoResult<()> { self.0.delete_business(id).await }
    async fn toggle_follower(&self, business_id: Id, client_id: Id) -> RepoResult<Toggle> { self.0.toggle_follower(business_id, client_id).await }
    async fn set_engagement_rate(&self, _: Id, _: f64) -> RepoResult<()> { Err(RepoError::Internal("down".into())) }
}

#[async_trait]
impl PostRepo for CacheWritesFail {
    async fn create_post(&self, author_id: Id, new: NewPost) -> RepoResult<Post> { self.0.create_post(author_id, new).await }
    async fn get_post(&self, id: Id) -> RepoResult<Post> { self.0.get_post(id).await }
    async fn list_posts(&self, business_id: Id) -> RepoResult<Vec<Post>> { self.0.list_posts(business_id).await }
    async fn delete_post(&self, id: Id) -> RepoResult<()> { self.0.delete_post(id).await }
    async fn toggle_like(&self, post_id: Id, client_id: Id) -> RepoResult<Toggle> { self.0.toggle_like(post_id, client_id).await }
    async fn append_comment(&self, post_id: Id, comment: Comment) -> RepoResult<i64> { self.0.append_comment(post_id, comment).await }
}

#[async_trait]
impl ProductRepo for CacheWritesFail {
    async fn create_product(&self, new: NewProduct, sku: String) -> RepoResult<Product> { self.0.create_product(new, sku).await }
    async fn get_product(&self, id: Id) -> RepoResult<Product> { self.0.get_product(id).await }
    async fn list_products(&self, business_id: Id) -> RepoResult<Vec<Product>> { self.0.list_products(business_id).await }
    async fn delete_product(&self, id: Id) -> RepoResult<()> { self.0.delete_product(id).await }
    async fn record_sale(&self, id: Id, quantity: i64) -> RepoResult<Product> { self.0.record_sale(id, quantity).await }
}

#[async_trait]
impl PromotionRepo for CacheWritesFail {
    async fn create_promotion(&self, promo: Promotion) -> RepoResult<Promotion> { self.0.create_promotion(promo).await }
    async fn get_promotion(&self, id: Id) -> RepoResult<Promotion> { self.0.get_promotion(id).await }
    async fn list_promotions(&self, business_id: Id) -> RepoResult<Vec<Promotion>> { self.0.list_promotions(business_id).await }
    async fn update_promotion(&self, promo: Promotion) -> RepoResult<Promotion> { self.0.update_promotion(promo).await }
    async fn delete_promotion(&self, id: Id) -> RepoResult<()> { self.0.delete_promotion(id).await }
    async fn track_promotion(&self, id: Id, kind: TrackKind) -> RepoResult<()> { self.0.track_promotion(id, kind).await }
}

#[async_trait]
impl AnalyticsRepo for CacheWritesFail {
    async fn latest_analytics(&self, business_id: Id, period: AnalyticsPeriod) -> RepoResult<Option<Analytics>> {
        self.0.latest_analytics(business_id, period).await
    }
    async fn create_analytics(&self, new: NewAnalytics) -> RepoResult<Analytics> { self.0.create_analytics(new).await }
}

#[tokio::test]
async fn committed_toggles_survive_cache_failures() {
    let repo = CacheWritesFail(InMemRepo::new());
    let repo: &dyn Repo = &repo;
    let (b, p) = business_with_post(repo).await;
    let c = client(repo, "cy@example.com").await;

    let follow = engagement::toggle_follow(repo, b.id, c.id).await.unwrap();
    assert!(follow.is_following);
    assert_eq!(follow.followers, 1);

    let like = engagement::toggle_like(repo, p.id, c.id).await.unwrap();
    assert!(like.is_liked);
    assert_eq!(like.likes_count, 1);

    let (_, count) = engagement::add_comment(repo, p.id, c.id, "still counts").await.unwrap();
    assert_eq!(count, 1);

    // the cached rate is stale but the sets moved
    let stored = repo.get_business(b.id).await.unwrap();
    assert_eq!(stored.followers_list, vec![c.id]);
    assert_eq!(stored.engagement_rate, 0.0);
}
