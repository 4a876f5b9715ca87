use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("{0}")] Conflict(String),
    #[error("store error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Account fields shared by users and clients; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

use async_trait::async_trait;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, account: NewAccount, role: UserRole) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    /// User plus stored password hash, looked up by email.
    async fn user_credentials(&self, email: &str) -> RepoResult<(User, String)>;
}

#[async_trait]
pub trait ClientRepo: Send + Sync {
    async fn create_client(&self, account: NewAccount, profile_image: Option<String>, interests: Vec<String>) -> RepoResult<Client>;
    async fn get_client(&self, id: Id) -> RepoResult<Client>;
    /// Batch lookup; unknown ids are skipped.
    async fn get_clients(&self, ids: &[Id]) -> RepoResult<Vec<Client>>;
    async fn client_credentials(&self, email: &str) -> RepoResult<(Client, String)>;
    async fn set_following(&self, client_id: Id, business_id: Id, following: bool) -> RepoResult<()>;
}

#[async_trait]
pub trait BusinessRepo: Send + Sync {
    async fn create_business(&self, owner_id: Id, new: NewBusiness) -> RepoResult<Business>;
    async fn get_business(&self, id: Id) -> RepoResult<Business>;
    async fn business_by_owner(&self, owner_id: Id) -> RepoResult<Business>;
    async fn list_businesses(&self, filter: &BusinessFilter) -> RepoResult<Vec<Business>>;
    async fn update_business(&self, id: Id, upd: UpdateBusiness) -> RepoResult<Business>;
    async fn set_business_status(&self, id: Id, change: StatusChange) -> RepoResult<Business>;
    /// Removes the business with its posts, products, promotions and analytics.
    async fn delete_business(&self, id: Id) -> RepoResult<()>;
    /// Atomically flips `client_id` in `followers_list` and reassigns `followers`.
    async fn toggle_follower(&self, business_id: Id, client_id: Id) -> RepoResult<Toggle>;
    async fn set_engagement_rate(&self, id: Id, rate: f64) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, author_id: Id, new: NewPost) -> RepoResult<Post>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    /// Newest first.
    async fn list_posts(&self, business_id: Id) -> RepoResult<Vec<Post>>;
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
    /// Atomically flips `client_id` in `likes_list` and reassigns `likes_count`.
    async fn toggle_like(&self, post_id: Id, client_id: Id) -> RepoResult<Toggle>;
    /// Appends and returns the new `comments_count`.
    async fn append_comment(&self, post_id: Id, comment: Comment) -> RepoResult<i64>;
}

#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn create_product(&self, new: NewProduct, sku: String) -> RepoResult<Product>;
    async fn get_product(&self, id: Id) -> RepoResult<Product>;
    /// Newest first.
    async fn list_products(&self, business_id: Id) -> RepoResult<Vec<Product>>;
    async fn delete_product(&self, id: Id) -> RepoResult<()>;
    async fn record_sale(&self, id: Id, quantity: i64) -> RepoResult<Product>;
}

#[async_trait]
pub trait PromotionRepo: Send + Sync {
    /// Inserts `promo`; the id and timestamps it carries are replaced.
    async fn create_promotion(&self, promo: Promotion) -> RepoResult<Promotion>;
    async fn get_promotion(&self, id: Id) -> RepoResult<Promotion>;
    async fn list_promotions(&self, business_id: Id) -> RepoResult<Vec<Promotion>>;
    /// Replaces the editable fields and status of `promo.id`; performance is kept.
    async fn update_promotion(&self, promo: Promotion) -> RepoResult<Promotion>;
    async fn delete_promotion(&self, id: Id) -> RepoResult<()>;
    async fn track_promotion(&self, id: Id, kind: TrackKind) -> RepoResult<()>;
}

#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn latest_analytics(&self, business_id: Id, period: AnalyticsPeriod) -> RepoResult<Option<Analytics>>;
    async fn create_analytics(&self, new: NewAnalytics) -> RepoResult<Analytics>;
}

pub trait Repo: UserRepo + ClientRepo + BusinessRepo + PostRepo + ProductRepo + PromotionRepo + AnalyticsRepo {}

impl<T> Repo for T where T: UserRepo + ClientRepo + BusinessRepo + PostRepo + ProductRepo + PromotionRepo + AnalyticsRepo {}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use crate::engagement::toggle_membership;
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};
    use std::sync::{RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    #[derive(Clone, Serialize, Deserialize)]
    struct Account<T> {
        profile: T,
        password_hash: String,
    }

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<Id, Account<User>>,
        clients: HashMap<Id, Account<Client>>,
        businesses: HashMap<Id, Business>,
        posts: HashMap<Id, Post>,
        products: HashMap<Id, Product>,
        promotions: HashMap<Id, Promotion>,
        analytics: HashMap<Id, Analytics>,
        next_id: Id,
        last_stamp: Option<DateTime<Utc>>,
    }

    impl State {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }

        /// Strictly increasing write timestamp so creation order is never tied.
        fn stamp(&mut self) -> DateTime<Utc> {
            let mut now = Utc::now();
            if let Some(last) = self.last_stamp {
                if now <= last {
                    now = last + chrono::Duration::microseconds(1);
                }
            }
            self.last_stamp = Some(now);
            now
        }

        fn refresh_totals(&mut self, business_id: Id, now: DateTime<Utc>) {
            let posts = self.posts.values().filter(|p| p.business_id == business_id).count() as i64;
            let products = self.products.values().filter(|p| p.business_id == business_id).count() as i64;
            if let Some(b) = self.businesses.get_mut(&business_id) {
                b.total_posts = posts;
                b.total_products = products;
                b.updated_at = now;
            }
        }
    }

    /// Process-local store. Every mutation runs under one write lock, which
    /// makes set toggles and their counters a single atomic step.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
        }

        /// Loads `dir/state.json` when present and rewrites it after each mutation.
        pub fn with_snapshot(dir: impl AsRef<Path>) -> Self {
            let path = dir.as_ref().join("state.json");
            let state = Self::load_state_from(&path);
            Self { state: Arc::new(RwLock::new(state)), snapshot_path: Some(Arc::new(path)) }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!(path = %path.display(), "loaded store snapshot");
                        s
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "unreadable store snapshot, starting empty");
                        State::default()
                    }
                },
                Err(_) => {
                    info!(path = %path.display(), "no store snapshot, starting empty");
                    State::default()
                }
            }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn persist(&self) {
            let Some(path) = self.snapshot_path.as_ref() else { return };
            let bytes = match self.state.read() {
                Ok(s) => serde_json::to_vec_pretty(&*s),
                Err(_) => return,
            };
            match bytes {
                Ok(bytes) => {
                    if let Some(dir) = path.parent() {
                        let _ = std::fs::create_dir_all(dir);
                    }
                    if let Err(e) = std::fs::write(path.as_ref(), bytes) {
                        warn!(path = %path.display(), error = %e, "failed to write store snapshot");
                    }
                }
                Err(e) => warn!(error = %e, "failed to serialize store snapshot"),
            }
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn create_user(&self, account: NewAccount, role: UserRole) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.users.values().any(|u| same_text(&u.profile.email, &account.email)) {
                return Err(RepoError::Conflict("email already registered".into()));
            }
            let id = s.next_id();
            let now = s.stamp();
            let user = User {
                id,
                name: account.name,
                email: account.email.trim().to_lowercase(),
                role,
                created_at: now,
                updated_at: now,
            };
            s.users.insert(id, Account { profile: user.clone(), password_hash: account.password_hash });
            drop(s);
            self.persist();
            Ok(user)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            let s = self.read()?;
            s.users.get(&id).map(|a| a.profile.clone()).ok_or(RepoError::NotFound)
        }
        async fn user_credentials(&self, email: &str) -> RepoResult<(User, String)> {
            let s = self.read()?;
            s.users
                .values()
                .find(|a| same_text(&a.profile.email, email))
                .map(|a| (a.profile.clone(), a.password_hash.clone()))
                .ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl ClientRepo for InMemRepo {
        async fn create_client(&self, account: NewAccount, profile_image: Option<String>, interests: Vec<String>) -> RepoResult<Client> {
            let mut s = self.write()?;
            if s.clients.values().any(|c| same_text(&c.profile.email, &account.email)) {
                return Err(RepoError::Conflict("email already registered".into()));
            }
            let id = s.next_id();
            let now = s.stamp();
            let client = Client {
                id,
                name: account.name,
                email: account.email.trim().to_lowercase(),
                profile_image,
                interests,
                following: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            s.clients.insert(id, Account { profile: client.clone(), password_hash: account.password_hash });
            drop(s);
            self.persist();
            Ok(client)
        }
        async fn get_client(&self, id: Id) -> RepoResult<Client> {
            let s = self.read()?;
            s.clients.get(&id).map(|a| a.profile.clone()).ok_or(RepoError::NotFound)
        }
        async fn get_clients(&self, ids: &[Id]) -> RepoResult<Vec<Client>> {
            let s = self.read()?;
            Ok(ids.iter().filter_map(|id| s.clients.get(id)).map(|a| a.profile.clone()).collect())
        }
        async fn client_credentials(&self, email: &str) -> RepoResult<(Client, String)> {
            let s = self.read()?;
            s.clients
                .values()
                .find(|a| same_text(&a.profile.email, email))
                .map(|a| (a.profile.clone(), a.password_hash.clone()))
                .ok_or(RepoError::NotFound)
        }
        async fn set_following(&self, client_id: Id, business_id: Id, following: bool) -> RepoResult<()> {
            let mut s = self.write()?;
            let now = s.stamp();
            let client = &mut s.clients.get_mut(&client_id).ok_or(RepoError::NotFound)?.profile;
            client.following.retain(|b| *b != business_id);
            if following {
                client.following.push(business_id);
            }
            client.updated_at = now;
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl BusinessRepo for InMemRepo {
        async fn create_business(&self, owner_id: Id, new: NewBusiness) -> RepoResult<Business> {
            let mut s = self.write()?;
            // checked under the same lock as the insert
            if s.businesses.values().any(|b| b.owner_id == owner_id) {
                return Err(RepoError::Conflict("owner already has a business".into()));
            }
            if s.businesses.values().any(|b| same_text(&b.name, &new.name)) {
                return Err(RepoError::Conflict("business name already taken".into()));
            }
            if let Some(site) = new.website.as_deref() {
                if s.businesses.values().any(|b| b.website.as_deref().is_some_and(|w| same_text(w, site))) {
                    return Err(RepoError::Conflict("website already registered".into()));
                }
            }
            let id = s.next_id();
            let now = s.stamp();
            let business = Business {
                id,
                owner_id,
                name: new.name.trim().to_string(),
                category: new.category,
                description: new.description,
                website: new.website,
                address: new.address,
                phone: new.phone,
                logo: new.logo,
                status: BusinessStatus::Pending,
                verified: false,
                rejection_reason: None,
                suspension_reason: None,
                followers: 0,
                followers_list: Vec::new(),
                total_posts: 0,
                total_products: 0,
                engagement_rate: 0.0,
                created_at: now,
                updated_at: now,
            };
            s.businesses.insert(id, business.clone());
            drop(s);
            self.persist();
            Ok(business)
        }
        async fn get_business(&self, id: Id) -> RepoResult<Business> {
            let s = self.read()?;
            s.businesses.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn business_by_owner(&self, owner_id: Id) -> RepoResult<Business> {
            let s = self.read()?;
            s.businesses.values().find(|b| b.owner_id == owner_id).cloned().ok_or(RepoError::NotFound)
        }
        async fn list_businesses(&self, filter: &BusinessFilter) -> RepoResult<Vec<Business>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.businesses
                .values()
                .filter(|b| filter.status.map_or(true, |st| b.status == st))
                .filter(|b| filter.category.as_deref().map_or(true, |c| same_text(&b.category, c)))
                .cloned()
                .collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }
        async fn update_business(&self, id: Id, upd: UpdateBusiness) -> RepoResult<Business> {
            let mut s = self.write()?;

            // uniqueness check before the mutable borrow
            if let Some(ref name) = upd.name {
                if s.businesses.values().any(|b| b.id != id && same_text(&b.name, name)) {
                    return Err(RepoError::Conflict("business name already taken".into()));
                }
            }
            if let Some(ref site) = upd.website {
                if s.businesses.values().any(|b| b.id != id && b.website.as_deref().is_some_and(|w| same_text(w, site))) {
                    return Err(RepoError::Conflict("website already registered".into()));
                }
            }
            let now = s.stamp();
            let b = s.businesses.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(name) = upd.name { b.name = name.trim().to_string(); }
            if let Some(category) = upd.category { b.category = category; }
            if let Some(description) = upd.description { b.description = description; }
            if let Some(website) = upd.website { b.website = Some(website); }
            if let Some(address) = upd.address { b.address = Some(address); }
            if let Some(phone) = upd.phone { b.phone = Some(phone); }
            if let Some(logo) = upd.logo { b.logo = Some(logo); }
            b.updated_at = now;
            let updated = b.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
        async fn set_business_status(&self, id: Id, change: StatusChange) -> RepoResult<Business> {
            let mut s = self.write()?;
            let now = s.stamp();
            let b = s.businesses.get_mut(&id).ok_or(RepoError::NotFound)?;
            b.status = change.status;
            b.verified = change.verified;
            b.rejection_reason = change.rejection_reason;
            b.suspension_reason = change.suspension_reason;
            b.updated_at = now;
            let updated = b.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
        async fn delete_business(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if s.businesses.remove(&id).is_none() {
                return Err(RepoError::NotFound);
            }
            s.posts.retain(|_, p| p.business_id != id);
            s.products.retain(|_, p| p.business_id != id);
            s.promotions.retain(|_, p| p.business_id != id);
            s.analytics.retain(|_, a| a.business_id != id);
            for account in s.clients.values_mut() {
                account.profile.following.retain(|b| *b != id);
            }
            drop(s);
            self.persist();
            Ok(())
        }
        async fn toggle_follower(&self, business_id: Id, client_id: Id) -> RepoResult<Toggle> {
            let mut s = self.write()?;
            let now = s.stamp();
            let b = s.businesses.get_mut(&business_id).ok_or(RepoError::NotFound)?;
            let active = toggle_membership(&mut b.followers_list, client_id);
            b.followers = b.followers_list.len() as i64;
            b.updated_at = now;
            let toggle = Toggle { active, count: b.followers };
            drop(s);
            self.persist();
            Ok(toggle)
        }
        async fn set_engagement_rate(&self, id: Id, rate: f64) -> RepoResult<()> {
            let mut s = self.write()?;
            let b = s.businesses.get_mut(&id).ok_or(RepoError::NotFound)?;
            b.engagement_rate = rate;
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn create_post(&self, author_id: Id, new: NewPost) -> RepoResult<Post> {
            let mut s = self.write()?;
            if !s.businesses.contains_key(&new.business_id) { return Err(RepoError::NotFound); }
            let id = s.next_id();
            let now = s.stamp();
            let post = Post {
                id,
                business_id: new.business_id,
                author_id,
                content: new.content,
                media: new.media,
                platforms: new.platforms,
                status: new.status.unwrap_or(PostStatus::Published),
                scheduled_for: new.scheduled_for,
                likes_list: Vec::new(),
                likes_count: 0,
                comments_list: Vec::new(),
                comments_count: 0,
                shares: 0,
                views: 0,
                clicks: 0,
                tags: new.tags,
                category: new.category,
                created_at: now,
                updated_at: now,
            };
            s.posts.insert(id, post.clone());
            s.refresh_totals(post.business_id, now);
            drop(s);
            self.persist();
            Ok(post)
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            let s = self.read()?;
            s.posts.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn list_posts(&self, business_id: Id) -> RepoResult<Vec<Post>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.posts.values().filter(|p| p.business_id == business_id).cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            let post = s.posts.remove(&id).ok_or(RepoError::NotFound)?;
            let now = s.stamp();
            s.refresh_totals(post.business_id, now);
            drop(s);
            self.persist();
            Ok(())
        }
        async fn toggle_like(&self, post_id: Id, client_id: Id) -> RepoResult<Toggle> {
            let mut s = self.write()?;
            let now = s.stamp();
            let p = s.posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
            let active = toggle_membership(&mut p.likes_list, client_id);
            p.likes_count = p.likes_list.len() as i64;
            p.updated_at = now;
            let toggle = Toggle { active, count: p.likes_count };
            drop(s);
            self.persist();
            Ok(toggle)
        }
        async fn append_comment(&self, post_id: Id, comment: Comment) -> RepoResult<i64> {
            let mut s = self.write()?;
            let now = s.stamp();
            let p = s.posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
            p.comments_list.push(comment);
            p.comments_count = p.comments_list.len() as i64;
            p.updated_at = now;
            let count = p.comments_count;
            drop(s);
            self.persist();
            Ok(count)
        }
    }

    #[async_trait]
    impl ProductRepo for InMemRepo {
        async fn create_product(&self, new: NewProduct, sku: String) -> RepoResult<Product> {
            let mut s = self.write()?;
            if !s.businesses.contains_key(&new.business_id) { return Err(RepoError::NotFound); }
            if s.products.values().any(|p| p.sku == sku) {
                return Err(RepoError::Conflict("sku already in use".into()));
            }
            let id = s.next_id();
            let now = s.stamp();
            let product = Product {
                id,
                business_id: new.business_id,
                name: new.name,
                link: new.link,
                price: new.price,
                sku,
                image: new.image,
                is_active: new.is_active.unwrap_or(true),
                sales: ProductSales::default(),
                created_at: now,
                updated_at: now,
            };
            s.products.insert(id, product.clone());
            s.refresh_totals(product.business_id, now);
            drop(s);
            self.persist();
            Ok(product)
        }
        async fn get_product(&self, id: Id) -> RepoResult<Product> {
            let s = self.read()?;
            s.products.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn list_products(&self, business_id: Id) -> RepoResult<Vec<Product>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.products.values().filter(|p| p.business_id == business_id).cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }
        async fn delete_product(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            let product = s.products.remove(&id).ok_or(RepoError::NotFound)?;
            let now = s.stamp();
            s.refresh_totals(product.business_id, now);
            drop(s);
            self.persist();
            Ok(())
        }
        async fn record_sale(&self, id: Id, quantity: i64) -> RepoResult<Product> {
            let mut s = self.write()?;
            let now = s.stamp();
            let p = s.products.get_mut(&id).ok_or(RepoError::NotFound)?;
            p.sales.total_sold += quantity;
            p.sales.revenue += quantity as f64 * p.price;
            p.updated_at = now;
            let updated = p.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
    }

    #[async_trait]
    impl PromotionRepo for InMemRepo {
        async fn create_promotion(&self, mut promo: Promotion) -> RepoResult<Promotion> {
            let mut s = self.write()?;
            if !s.businesses.contains_key(&promo.business_id) { return Err(RepoError::NotFound); }
            promo.id = s.next_id();
            let now = s.stamp();
            promo.created_at = now;
            promo.updated_at = now;
            s.promotions.insert(promo.id, promo.clone());
            drop(s);
            self.persist();
            Ok(promo)
        }
        async fn get_promotion(&self, id: Id) -> RepoResult<Promotion> {
            let s = self.read()?;
            s.promotions.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn list_promotions(&self, business_id: Id) -> RepoResult<Vec<Promotion>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.promotions.values().filter(|p| p.business_id == business_id).cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(v)
        }
        async fn update_promotion(&self, promo: Promotion) -> RepoResult<Promotion> {
            let mut s = self.write()?;
            let now = s.stamp();
            let existing = s.promotions.get_mut(&promo.id).ok_or(RepoError::NotFound)?;
            let performance = std::mem::take(&mut existing.performance);
            let created_at = existing.created_at;
            *existing = Promotion { performance, created_at, updated_at: now, ..promo };
            let updated = existing.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
        async fn delete_promotion(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.promotions.remove(&id).ok_or(RepoError::NotFound)?;
            drop(s);
            self.persist();
            Ok(())
        }
        async fn track_promotion(&self, id: Id, kind: TrackKind) -> RepoResult<()> {
            let mut s = self.write()?;
            let p = s.promotions.get_mut(&id).ok_or(RepoError::NotFound)?;
            match kind {
                TrackKind::Impression => p.performance.impressions += 1,
                TrackKind::Click => p.performance.clicks += 1,
                TrackKind::Conversion => p.performance.conversions += 1,
            }
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl AnalyticsRepo for InMemRepo {
        async fn latest_analytics(&self, business_id: Id, period: AnalyticsPeriod) -> RepoResult<Option<Analytics>> {
            let s = self.read()?;
            Ok(s.analytics
                .values()
                .filter(|a| a.business_id == business_id && a.period == period)
                .max_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)))
                .cloned())
        }
        async fn create_analytics(&self, new: NewAnalytics) -> RepoResult<Analytics> {
            let mut s = self.write()?;
            if !s.businesses.contains_key(&new.business_id) { return Err(RepoError::NotFound); }
            let id = s.next_id();
            let now = s.stamp();
            let snapshot = Analytics {
                id,
                business_id: new.business_id,
                period: new.period,
                date: new.date,
                followers: new.followers,
                engagement: new.engagement,
                reach: new.reach,
                sales: new.sales,
                created_at: now,
            };
            s.analytics.insert(id, snapshot.clone());
            drop(s);
            self.persist();
            Ok(snapshot)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{FromRow, Pool, Postgres};
    use std::str::FromStr;

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> anyhow::Result<()> {
            sqlx::migrate!("./migrations").run(&self.pool).await?;
            Ok(())
        }
    }

    fn db_err(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                let msg = match db.constraint() {
                    Some("users_email_key") | Some("clients_email_key") => "email already registered",
                    Some("businesses_owner_key") => "owner already has a business",
                    Some("businesses_name_key") => "business name already taken",
                    Some("businesses_website_key") => "website already registered",
                    Some("products_sku_key") => "sku already in use",
                    _ => "duplicate value",
                };
                RepoError::Conflict(msg.into())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => RepoError::NotFound,
            other => RepoError::Internal(other.to_string()),
        }
    }

    fn parse<T: FromStr<Err = String>>(s: &str) -> RepoResult<T> {
        s.parse().map_err(RepoError::Internal)
    }

    #[derive(FromRow)]
    struct UserRow { id: i64, name: String, email: String, password_hash: String, role: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

    impl UserRow {
        fn split(self) -> RepoResult<(User, String)> {
            let user = User { id: self.id, name: self.name, email: self.email, role: parse(&self.role)?, created_at: self.created_at, updated_at: self.updated_at };
            Ok((user, self.password_hash))
        }
    }

    #[derive(FromRow)]
    struct ClientRow {
        id: i64, name: String, email: String, password_hash: String, profile_image: Option<String>,
        interests: Vec<String>, following: Vec<i64>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    }

    impl ClientRow {
        fn split(self) -> (Client, String) {
            let client = Client {
                id: self.id, name: self.name, email: self.email, profile_image: self.profile_image,
                interests: self.interests, following: self.following, created_at: self.created_at, updated_at: self.updated_at,
            };
            (client, self.password_hash)
        }
    }

    #[derive(FromRow)]
    struct BusinessRow {
        id: i64, owner_id: i64, name: String, category: String, description: String,
        website: Option<String>, address: Option<String>, phone: Option<String>, logo: Option<String>,
        status: String, verified: bool, rejection_reason: Option<String>, suspension_reason: Option<String>,
        followers: i64, followers_list: Vec<i64>, total_posts: i64, total_products: i64, engagement_rate: f64,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    }

    impl TryFrom<BusinessRow> for Business {
        type Error = RepoError;
        fn try_from(r: BusinessRow) -> RepoResult<Self> {
            Ok(Business {
                id: r.id, owner_id: r.owner_id, name: r.name, category: r.category, description: r.description,
                website: r.website, address: r.address, phone: r.phone, logo: r.logo, status: parse(&r.status)?,
                verified: r.verified, rejection_reason: r.rejection_reason, suspension_reason: r.suspension_reason,
                followers: r.followers, followers_list: r.followers_list, total_posts: r.total_posts,
                total_products: r.total_products, engagement_rate: r.engagement_rate,
                created_at: r.created_at, updated_at: r.updated_at,
            })
        }
    }

    #[derive(FromRow)]
    struct PostRow {
        id: i64, business_id: i64, author_id: i64, content: String, media_url: Option<String>, media_type: Option<String>,
        platforms: Vec<String>, status: String, scheduled_for: Option<DateTime<Utc>>, likes_list: Vec<i64>,
        likes_count: i64, comments_count: i64, shares: i64, views: i64, clicks: i64, tags: Vec<String>,
        category: Option<String>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    }

    impl PostRow {
        fn into_post(self, comments_list: Vec<Comment>) -> RepoResult<Post> {
            let media = match (self.media_url, self.media_type) {
                (Some(url), Some(kind)) => Some(Media { url, kind }),
                _ => None,
            };
            Ok(Post {
                id: self.id, business_id: self.business_id, author_id: self.author_id, content: self.content, media,
                platforms: self.platforms, status: parse(&self.status)?, scheduled_for: self.scheduled_for,
                likes_list: self.likes_list, likes_count: self.likes_count, comments_list,
                comments_count: self.comments_count, shares: self.shares, views: self.views, clicks: self.clicks,
                tags: self.tags, category: self.category, created_at: self.created_at, updated_at: self.updated_at,
            })
        }
    }

    #[derive(FromRow)]
    struct CommentRow { post_id: i64, client_id: i64, text: String, created_at: DateTime<Utc> }

    #[derive(FromRow)]
    struct ProductRow {
        id: i64, business_id: i64, name: String, link: Option<String>, price: f64, sku: String, image: Option<String>,
        is_active: bool, total_sold: i64, revenue: f64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    }

    impl From<ProductRow> for Product {
        fn from(r: ProductRow) -> Self {
            Product {
                id: r.id, business_id: r.business_id, name: r.name, link: r.link, price: r.price, sku: r.sku,
                image: r.image, is_active: r.is_active, sales: ProductSales { total_sold: r.total_sold, revenue: r.revenue },
                created_at: r.created_at, updated_at: r.updated_at,
            }
        }
    }

    #[derive(FromRow)]
    struct PromotionRow {
        id: i64, business_id: i64, name: String, description: String, promo_type: String, display_type: String,
        discount_type: String, discount_value: f64, coupon_code: Option<String>, start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>, status: String, platforms: Vec<String>, image: Option<String>,
        impressions: i64, clicks: i64, conversions: i64, revenue: f64,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    }

    impl TryFrom<PromotionRow> for Promotion {
        type Error = RepoError;
        fn try_from(r: PromotionRow) -> RepoResult<Self> {
            Ok(Promotion {
                id: r.id, business_id: r.business_id, name: r.name, description: r.description, promo_type: r.promo_type,
                display_type: parse(&r.display_type)?, discount_type: parse(&r.discount_type)?,
                discount_value: r.discount_value, coupon_code: r.coupon_code, start_date: r.start_date,
                end_date: r.end_date, status: parse(&r.status)?, platforms: r.platforms, image: r.image,
                performance: PromotionPerformance { impressions: r.impressions, clicks: r.clicks, conversions: r.conversions, revenue: r.revenue },
                created_at: r.created_at, updated_at: r.updated_at,
            })
        }
    }

    #[derive(FromRow)]
    struct AnalyticsRow {
        id: i64, business_id: i64, period: String, date: DateTime<Utc>, followers_total: i64, followers_growth: i64,
        engagement_rate: f64, likes: i64, comments: i64, shares: i64, impressions: i64, clicks: i64,
        total_sold: i64, revenue: f64, created_at: DateTime<Utc>,
    }

    impl TryFrom<AnalyticsRow> for Analytics {
        type Error = RepoError;
        fn try_from(r: AnalyticsRow) -> RepoResult<Self> {
            Ok(Analytics {
                id: r.id, business_id: r.business_id, period: parse(&r.period)?, date: r.date,
                followers: FollowerStats { total: r.followers_total, growth: r.followers_growth },
                engagement: EngagementStats { rate: r.engagement_rate, likes: r.likes, comments: r.comments, shares: r.shares },
                reach: ReachStats { impressions: r.impressions, clicks: r.clicks },
                sales: SalesStats { total_sold: r.total_sold, revenue: r.revenue },
                created_at: r.created_at,
            })
        }
    }

    const BUSINESS_COLS: &str = "id, owner_id, name, category, description, website, address, phone, logo, status, verified, \
        rejection_reason, suspension_reason, followers, followers_list, total_posts, total_products, engagement_rate, created_at, updated_at";
    const POST_COLS: &str = "id, business_id, author_id, content, media_url, media_type, platforms, status, scheduled_for, \
        likes_list, likes_count, comments_count, shares, views, clicks, tags, category, created_at, updated_at";
    const PRODUCT_COLS: &str = "id, business_id, name, link, price, sku, image, is_active, total_sold, revenue, created_at, updated_at";
    const PROMOTION_COLS: &str = "id, business_id, name, description, promo_type, display_type, discount_type, discount_value, \
        coupon_code, start_date, end_date, status, platforms, image, impressions, clicks, conversions, revenue, created_at, updated_at";
    const ANALYTICS_COLS: &str = "id, business_id, period, date, followers_total, followers_growth, engagement_rate, likes, comments, \
        shares, impressions, clicks, total_sold, revenue, created_at";

    impl PgRepo {
        /// One batch query for all comments of `rows`, joined in memory.
        async fn hydrate_posts(&self, rows: Vec<PostRow>) -> RepoResult<Vec<Post>> {
            let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
            let comments = sqlx::query_as::<_, CommentRow>(
                "SELECT post_id, client_id, text, created_at FROM post_comments WHERE post_id = ANY($1) ORDER BY id ASC",
            )
            .bind(&ids)
            .fetch_all(&self.pool).await.map_err(db_err)?;
            let mut by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
            for c in comments {
                by_post.entry(c.post_id).or_default().push(Comment { user_id: c.client_id, text: c.text, created_at: c.created_at });
            }
            rows.into_iter()
                .map(|r| {
                    let list = by_post.remove(&r.id).unwrap_or_default();
                    r.into_post(list)
                })
                .collect()
        }

        async fn refresh_totals<'c, E>(executor: E, business_id: Id) -> RepoResult<()>
        where
            E: sqlx::Executor<'c, Database = Postgres>,
        {
            sqlx::query(
                "UPDATE businesses SET \
                   total_posts = (SELECT count(*) FROM posts WHERE business_id = $1), \
                   total_products = (SELECT count(*) FROM products WHERE business_id = $1), \
                   updated_at = now() \
                 WHERE id = $1",
            )
            .bind(business_id)
            .execute(executor).await.map_err(db_err)?;
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn create_user(&self, account: NewAccount, role: UserRole) -> RepoResult<User> {
            let row = sqlx::query_as::<_, UserRow>(
                "INSERT INTO users (name, email, password_hash, role) VALUES ($1, lower(trim($2)), $3, $4) \
                 RETURNING id, name, email, password_hash, role, created_at, updated_at",
            )
            .bind(&account.name).bind(&account.email).bind(&account.password_hash).bind(role.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(row.split()?.0)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            let row = sqlx::query_as::<_, UserRow>(
                "SELECT id, name, email, password_hash, role, created_at, updated_at FROM users WHERE id = $1",
            )
            .bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(row.split()?.0)
        }
        async fn user_credentials(&self, email: &str) -> RepoResult<(User, String)> {
            let row = sqlx::query_as::<_, UserRow>(
                "SELECT id, name, email, password_hash, role, created_at, updated_at FROM users WHERE email = lower(trim($1))",
            )
            .bind(email).fetch_one(&self.pool).await.map_err(db_err)?;
            row.split()
        }
    }

    const CLIENT_COLS: &str = "id, name, email, password_hash, profile_image, interests, following, created_at, updated_at";

    #[async_trait]
    impl ClientRepo for PgRepo {
        async fn create_client(&self, account: NewAccount, profile_image: Option<String>, interests: Vec<String>) -> RepoResult<Client> {
            let sql = format!(
                "INSERT INTO clients (name, email, password_hash, profile_image, interests) \
                 VALUES ($1, lower(trim($2)), $3, $4, $5) RETURNING {CLIENT_COLS}"
            );
            let row = sqlx::query_as::<_, ClientRow>(&sql)
                .bind(&account.name).bind(&account.email).bind(&account.password_hash).bind(&profile_image).bind(&interests)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(row.split().0)
        }
        async fn get_client(&self, id: Id) -> RepoResult<Client> {
            let sql = format!("SELECT {CLIENT_COLS} FROM clients WHERE id = $1");
            let row = sqlx::query_as::<_, ClientRow>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(row.split().0)
        }
        async fn get_clients(&self, ids: &[Id]) -> RepoResult<Vec<Client>> {
            let sql = format!("SELECT {CLIENT_COLS} FROM clients WHERE id = ANY($1)");
            let rows = sqlx::query_as::<_, ClientRow>(&sql).bind(ids).fetch_all(&self.pool).await.map_err(db_err)?;
            Ok(rows.into_iter().map(|r| r.split().0).collect())
        }
        async fn client_credentials(&self, email: &str) -> RepoResult<(Client, String)> {
            let sql = format!("SELECT {CLIENT_COLS} FROM clients WHERE email = lower(trim($1))");
            let row = sqlx::query_as::<_, ClientRow>(&sql).bind(email).fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(row.split())
        }
        async fn set_following(&self, client_id: Id, business_id: Id, following: bool) -> RepoResult<()> {
            let res = sqlx::query(
                "UPDATE clients SET following = CASE \
                   WHEN $3 THEN array_append(array_remove(following, $2), $2) \
                   ELSE array_remove(following, $2) END, updated_at = now() \
                 WHERE id = $1",
            )
            .bind(client_id).bind(business_id).bind(following)
            .execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl BusinessRepo for PgRepo {
        async fn create_business(&self, owner_id: Id, new: NewBusiness) -> RepoResult<Business> {
            // unique indexes on owner_id, lower(name) and website reject the race
            let sql = format!(
                "INSERT INTO businesses (owner_id, name, category, description, website, address, phone, logo) \
                 VALUES ($1, trim($2), $3, $4, $5, $6, $7, $8) RETURNING {BUSINESS_COLS}"
            );
            let row = sqlx::query_as::<_, BusinessRow>(&sql)
                .bind(owner_id).bind(&new.name).bind(&new.category).bind(&new.description)
                .bind(&new.website).bind(&new.address).bind(&new.phone).bind(&new.logo)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn get_business(&self, id: Id) -> RepoResult<Business> {
            let sql = format!("SELECT {BUSINESS_COLS} FROM businesses WHERE id = $1");
            let row = sqlx::query_as::<_, BusinessRow>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn business_by_owner(&self, owner_id: Id) -> RepoResult<Business> {
            let sql = format!("SELECT {BUSINESS_COLS} FROM businesses WHERE owner_id = $1");
            let row = sqlx::query_as::<_, BusinessRow>(&sql).bind(owner_id).fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn list_businesses(&self, filter: &BusinessFilter) -> RepoResult<Vec<Business>> {
            let sql = format!(
                "SELECT {BUSINESS_COLS} FROM businesses \
                 WHERE ($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR lower(category) = lower($2)) \
                 ORDER BY created_at DESC"
            );
            let rows = sqlx::query_as::<_, BusinessRow>(&sql)
                .bind(filter.status.map(|s| s.as_str()))
                .bind(filter.category.as_deref())
                .fetch_all(&self.pool).await.map_err(db_err)?;
            rows.into_iter().map(Business::try_from).collect()
        }
        async fn update_business(&self, id: Id, upd: UpdateBusiness) -> RepoResult<Business> {
            let sql = format!(
                "UPDATE businesses SET name = COALESCE(trim($2), name), category = COALESCE($3, category), \
                   description = COALESCE($4, description), website = COALESCE($5, website), \
                   address = COALESCE($6, address), phone = COALESCE($7, phone), logo = COALESCE($8, logo), \
                   updated_at = now() \
                 WHERE id = $1 RETURNING {BUSINESS_COLS}"
            );
            let row = sqlx::query_as::<_, BusinessRow>(&sql)
                .bind(id).bind(&upd.name).bind(&upd.category).bind(&upd.description).bind(&upd.website)
                .bind(&upd.address).bind(&upd.phone).bind(&upd.logo)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn set_business_status(&self, id: Id, change: StatusChange) -> RepoResult<Business> {
            let sql = format!(
                "UPDATE businesses SET status = $2, verified = $3, rejection_reason = $4, suspension_reason = $5, \
                   updated_at = now() WHERE id = $1 RETURNING {BUSINESS_COLS}"
            );
            let row = sqlx::query_as::<_, BusinessRow>(&sql)
                .bind(id).bind(change.status.as_str()).bind(change.verified)
                .bind(&change.rejection_reason).bind(&change.suspension_reason)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn delete_business(&self, id: Id) -> RepoResult<()> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            // posts, comments, products, promotions and analytics cascade via foreign keys
            let res = sqlx::query("DELETE FROM businesses WHERE id = $1")
                .bind(id).execute(&mut *tx).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            sqlx::query("UPDATE clients SET following = array_remove(following, $1) WHERE $1 = ANY(following)")
                .bind(id).execute(&mut *tx).await.map_err(db_err)?;
            tx.commit().await.map_err(db_err)?;
            Ok(())
        }
        async fn toggle_follower(&self, business_id: Id, client_id: Id) -> RepoResult<Toggle> {
            // both assignments read the same (locked) row version
            let (active, count) = sqlx::query_as::<_, (bool, i64)>(
                "UPDATE businesses SET \
                   followers_list = CASE WHEN $2 = ANY(followers_list) THEN array_remove(followers_list, $2) \
                                         ELSE array_append(followers_list, $2) END, \
                   followers = CASE WHEN $2 = ANY(followers_list) THEN cardinality(array_remove(followers_list, $2)) \
                                    ELSE cardinality(followers_list) + 1 END, \
                   updated_at = now() \
                 WHERE id = $1 \
                 RETURNING ($2 = ANY(followers_list)) AS active, followers",
            )
            .bind(business_id).bind(client_id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(Toggle { active, count })
        }
        async fn set_engagement_rate(&self, id: Id, rate: f64) -> RepoResult<()> {
            let res = sqlx::query("UPDATE businesses SET engagement_rate = $2 WHERE id = $1")
                .bind(id).bind(rate).execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn create_post(&self, author_id: Id, new: NewPost) -> RepoResult<Post> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let sql = format!(
                "INSERT INTO posts (business_id, author_id, content, media_url, media_type, platforms, status, scheduled_for, tags, category) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {POST_COLS}"
            );
            let row = sqlx::query_as::<_, PostRow>(&sql)
                .bind(new.business_id).bind(author_id).bind(&new.content)
                .bind(new.media.as_ref().map(|m| m.url.clone())).bind(new.media.as_ref().map(|m| m.kind.clone()))
                .bind(&new.platforms).bind(new.status.unwrap_or(PostStatus::Published).as_str())
                .bind(new.scheduled_for).bind(&new.tags).bind(&new.category)
                .fetch_one(&mut *tx).await.map_err(db_err)?;
            Self::refresh_totals(&mut *tx, new.business_id).await?;
            tx.commit().await.map_err(db_err)?;
            row.into_post(Vec::new())
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            let sql = format!("SELECT {POST_COLS} FROM posts WHERE id = $1");
            let row = sqlx::query_as::<_, PostRow>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            self.hydrate_posts(vec![row]).await?.pop().ok_or(RepoError::NotFound)
        }
        async fn list_posts(&self, business_id: Id) -> RepoResult<Vec<Post>> {
            let sql = format!("SELECT {POST_COLS} FROM posts WHERE business_id = $1 ORDER BY created_at DESC, id DESC");
            let rows = sqlx::query_as::<_, PostRow>(&sql).bind(business_id).fetch_all(&self.pool).await.map_err(db_err)?;
            self.hydrate_posts(rows).await
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let (business_id,) = sqlx::query_as::<_, (i64,)>("DELETE FROM posts WHERE id = $1 RETURNING business_id")
                .bind(id).fetch_one(&mut *tx).await.map_err(db_err)?;
            Self::refresh_totals(&mut *tx, business_id).await?;
            tx.commit().await.map_err(db_err)?;
            Ok(())
        }
        async fn toggle_like(&self, post_id: Id, client_id: Id) -> RepoResult<Toggle> {
            let (active, count) = sqlx::query_as::<_, (bool, i64)>(
                "UPDATE posts SET \
                   likes_list = CASE WHEN $2 = ANY(likes_list) THEN array_remove(likes_list, $2) \
                                     ELSE array_append(likes_list, $2) END, \
                   likes_count = CASE WHEN $2 = ANY(likes_list) THEN cardinality(array_remove(likes_list, $2)) \
                                      ELSE cardinality(likes_list) + 1 END, \
                   updated_at = now() \
                 WHERE id = $1 \
                 RETURNING ($2 = ANY(likes_list)) AS active, likes_count",
            )
            .bind(post_id).bind(client_id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(Toggle { active, count })
        }
        async fn append_comment(&self, post_id: Id, comment: Comment) -> RepoResult<i64> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            // row lock first so the count below sees every committed comment
            sqlx::query("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id).fetch_one(&mut *tx).await.map_err(db_err)?;
            sqlx::query("INSERT INTO post_comments (post_id, client_id, text, created_at) VALUES ($1, $2, $3, $4)")
                .bind(post_id).bind(comment.user_id).bind(&comment.text).bind(comment.created_at)
                .execute(&mut *tx).await.map_err(db_err)?;
            let (count,) = sqlx::query_as::<_, (i64,)>(
                "UPDATE posts SET comments_count = (SELECT count(*) FROM post_comments WHERE post_id = $1), updated_at = now() \
                 WHERE id = $1 RETURNING comments_count",
            )
            .bind(post_id).fetch_one(&mut *tx).await.map_err(db_err)?;
            tx.commit().await.map_err(db_err)?;
            Ok(count)
        }
    }

    #[async_trait]
    impl ProductRepo for PgRepo {
        async fn create_product(&self, new: NewProduct, sku: String) -> RepoResult<Product> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let sql = format!(
                "INSERT INTO products (business_id, name, link, price, sku, image, is_active) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLS}"
            );
            let row = sqlx::query_as::<_, ProductRow>(&sql)
                .bind(new.business_id).bind(&new.name).bind(&new.link).bind(new.price).bind(&sku)
                .bind(&new.image).bind(new.is_active.unwrap_or(true))
                .fetch_one(&mut *tx).await.map_err(db_err)?;
            Self::refresh_totals(&mut *tx, new.business_id).await?;
            tx.commit().await.map_err(db_err)?;
            Ok(row.into())
        }
        async fn get_product(&self, id: Id) -> RepoResult<Product> {
            let sql = format!("SELECT {PRODUCT_COLS} FROM products WHERE id = $1");
            let row = sqlx::query_as::<_, ProductRow>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(row.into())
        }
        async fn list_products(&self, business_id: Id) -> RepoResult<Vec<Product>> {
            let sql = format!("SELECT {PRODUCT_COLS} FROM products WHERE business_id = $1 ORDER BY created_at DESC, id DESC");
            let rows = sqlx::query_as::<_, ProductRow>(&sql).bind(business_id).fetch_all(&self.pool).await.map_err(db_err)?;
            Ok(rows.into_iter().map(Product::from).collect())
        }
        async fn delete_product(&self, id: Id) -> RepoResult<()> {
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let (business_id,) = sqlx::query_as::<_, (i64,)>("DELETE FROM products WHERE id = $1 RETURNING business_id")
                .bind(id).fetch_one(&mut *tx).await.map_err(db_err)?;
            Self::refresh_totals(&mut *tx, business_id).await?;
            tx.commit().await.map_err(db_err)?;
            Ok(())
        }
        async fn record_sale(&self, id: Id, quantity: i64) -> RepoResult<Product> {
            let sql = format!(
                "UPDATE products SET total_sold = total_sold + $2, revenue = revenue + $2 * price, updated_at = now() \
                 WHERE id = $1 RETURNING {PRODUCT_COLS}"
            );
            let row = sqlx::query_as::<_, ProductRow>(&sql).bind(id).bind(quantity).fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(row.into())
        }
    }

    #[async_trait]
    impl PromotionRepo for PgRepo {
        async fn create_promotion(&self, promo: Promotion) -> RepoResult<Promotion> {
            let sql = format!(
                "INSERT INTO promotions (business_id, name, description, promo_type, display_type, discount_type, discount_value, \
                   coupon_code, start_date, end_date, status, platforms, image) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {PROMOTION_COLS}"
            );
            let row = sqlx::query_as::<_, PromotionRow>(&sql)
                .bind(promo.business_id).bind(&promo.name).bind(&promo.description).bind(&promo.promo_type)
                .bind(promo.display_type.as_str()).bind(promo.discount_type.as_str()).bind(promo.discount_value)
                .bind(&promo.coupon_code).bind(promo.start_date).bind(promo.end_date).bind(promo.status.as_str())
                .bind(&promo.platforms).bind(&promo.image)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn get_promotion(&self, id: Id) -> RepoResult<Promotion> {
            let sql = format!("SELECT {PROMOTION_COLS} FROM promotions WHERE id = $1");
            let row = sqlx::query_as::<_, PromotionRow>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn list_promotions(&self, business_id: Id) -> RepoResult<Vec<Promotion>> {
            let sql = format!("SELECT {PROMOTION_COLS} FROM promotions WHERE business_id = $1 ORDER BY created_at DESC, id DESC");
            let rows = sqlx::query_as::<_, PromotionRow>(&sql).bind(business_id).fetch_all(&self.pool).await.map_err(db_err)?;
            rows.into_iter().map(Promotion::try_from).collect()
        }
        async fn update_promotion(&self, promo: Promotion) -> RepoResult<Promotion> {
            let sql = format!(
                "UPDATE promotions SET name = $2, description = $3, promo_type = $4, display_type = $5, discount_type = $6, \
                   discount_value = $7, coupon_code = $8, start_date = $9, end_date = $10, status = $11, platforms = $12, \
                   image = $13, updated_at = now() \
                 WHERE id = $1 RETURNING {PROMOTION_COLS}"
            );
            let row = sqlx::query_as::<_, PromotionRow>(&sql)
                .bind(promo.id).bind(&promo.name).bind(&promo.description).bind(&promo.promo_type)
                .bind(promo.display_type.as_str()).bind(promo.discount_type.as_str()).bind(promo.discount_value)
                .bind(&promo.coupon_code).bind(promo.start_date).bind(promo.end_date).bind(promo.status.as_str())
                .bind(&promo.platforms).bind(&promo.image)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
        async fn delete_promotion(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM promotions WHERE id = $1").bind(id).execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
        async fn track_promotion(&self, id: Id, kind: TrackKind) -> RepoResult<()> {
            let sql = match kind {
                TrackKind::Impression => "UPDATE promotions SET impressions = impressions + 1 WHERE id = $1",
                TrackKind::Click => "UPDATE promotions SET clicks = clicks + 1 WHERE id = $1",
                TrackKind::Conversion => "UPDATE promotions SET conversions = conversions + 1 WHERE id = $1",
            };
            let res = sqlx::query(sql).bind(id).execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl AnalyticsRepo for PgRepo {
        async fn latest_analytics(&self, business_id: Id, period: AnalyticsPeriod) -> RepoResult<Option<Analytics>> {
            let sql = format!(
                "SELECT {ANALYTICS_COLS} FROM analytics WHERE business_id = $1 AND period = $2 ORDER BY date DESC, id DESC LIMIT 1"
            );
            let row = sqlx::query_as::<_, AnalyticsRow>(&sql)
                .bind(business_id).bind(period.as_str())
                .fetch_optional(&self.pool).await.map_err(db_err)?;
            row.map(Analytics::try_from).transpose()
        }
        async fn create_analytics(&self, new: NewAnalytics) -> RepoResult<Analytics> {
            let sql = format!(
                "INSERT INTO analytics (business_id, period, date, followers_total, followers_growth, engagement_rate, likes, \
                   comments, shares, impressions, clicks, total_sold, revenue) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {ANALYTICS_COLS}"
            );
            let row = sqlx::query_as::<_, AnalyticsRow>(&sql)
                .bind(new.business_id).bind(new.period.as_str()).bind(new.date)
                .bind(new.followers.total).bind(new.followers.growth)
                .bind(new.engagement.rate).bind(new.engagement.likes).bind(new.engagement.comments).bind(new.engagement.shares)
                .bind(new.reach.impressions).bind(new.reach.clicks)
                .bind(new.sales.total_sold).bind(new.sales.revenue)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
    }
}
