#![cfg(feature = "inmem-store")]

use storefront::models::*;
use storefront::repo::{inmem::InMemRepo, NewAccount, RepoError};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use storefront::repo::{AnalyticsRepo, BusinessRepo, ClientRepo, PostRepo, ProductRepo, UserRepo};

fn account(name: &str, email: &str) -> NewAccount {
    NewAccount { name: name.into(), email: email.into(), password_hash: "salt$hash".into() }
}

fn new_business(name: &str, website: Option<&str>) -> NewBusiness {
    NewBusiness {
        name: name.into(),
        category: "food".into(),
        description: String::new(),
        website: website.map(String::from),
        address: None,
        phone: None,
        logo: None,
    }
}

fn new_post(business_id: Id, content: &str) -> NewPost {
    NewPost {
        business_id,
        content: content.into(),
        media: None,
        platforms: vec!["instagram".into()],
        status: None,
        scheduled_for: None,
        tags: vec![],
        category: None,
    }
}

fn new_product(business_id: Id, price: f64) -> NewProduct {
    NewProduct { business_id, name: "Mug".into(), link: None, price, sku: None, image: None, is_active: None }
}

#[tokio::test]
async fn emails_are_unique_case_insensitively() {
    let r = InMemRepo::new();
    r.create_user(account("Ann", "ann@example.com"), UserRole::BusinessOwner).await.unwrap();
    let err = r.create_user(account("Ann 2", " ANN@example.com"), UserRole::BusinessOwner).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ref m) if m == "email already registered"));

    let (user, hash) = r.user_credentials("Ann@Example.com").await.unwrap();
    assert_eq!(user.email, "ann@example.com");
    assert_eq!(hash, "salt$hash");

    // clients live in their own namespace
    r.create_client(account("Ann", "ann@example.com"), None, vec![]).await.unwrap();
}

#[tokio::test]
async fn business_uniqueness_rules() {
    let r = InMemRepo::new();
    let b = r.create_business(1, new_business("Cafe", Some("https://cafe.example"))).await.unwrap();
    assert_eq!(b.status, BusinessStatus::Pending);
    assert!(!b.verified);

    let err = r.create_business(1, new_business("Other", None)).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ref m) if m == "owner already has a business"));

    let err = r.create_business(2, new_business(" cafe ", None)).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ref m) if m == "business name already taken"));

    let err = r.create_business(3, new_business("Bakery", Some("https://CAFE.example"))).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ref m) if m == "website already registered"));

    // renaming to its own name is not a conflict
    let upd = UpdateBusiness { name: Some("Cafe".into()), ..Default::default() };
    assert!(r.update_business(b.id, upd).await.is_ok());
}

#[tokio::test]
async fn follower_toggle_keeps_count_equal_to_set() {
    let r = InMemRepo::new();
    let b = r.create_business(1, new_business("Cafe", None)).await.unwrap();

    let t = r.toggle_follower(b.id, 10).await.unwrap();
    assert_eq!(t, Toggle { active: true, count: 1 });
    let t = r.toggle_follower(b.id, 11).await.unwrap();
    assert_eq!(t, Toggle { active: true, count: 2 });
    let t = r.toggle_follower(b.id, 10).await.unwrap();
    assert_eq!(t, Toggle { active: false, count: 1 });

    let b = r.get_business(b.id).await.unwrap();
    assert_eq!(b.followers_list, vec![11]);
    assert_eq!(b.followers, 1);

    assert!(matches!(r.toggle_follower(999, 10).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn concurrent_likes_never_lose_updates() {
    let r = InMemRepo::new();
    let b = r.create_business(1, new_business("Cafe", None)).await.unwrap();
    let p = r.create_post(1, new_post(b.id, "hello")).await.unwrap();

    let handles: Vec<_> = (0..50)
        .map(|client| {
            let r = r.clone();
            tokio::spawn(async move { r.toggle_like(p.id, client).await.unwrap() })
        })
        .collect();
    for h in handles {
        assert!(h.await.unwrap().active);
    }

    let post = r.get_post(p.id).await.unwrap();
    assert_eq!(post.likes_list.len(), 50);
    assert_eq!(post.likes_count, 50);
}

#[tokio::test]
async fn totals_follow_posts_and_products() {
    let r = InMemRepo::new();
    let b = r.create_business(1, new_business("Cafe", None)).await.unwrap();
    let p1 = r.create_post(1, new_post(b.id, "one")).await.unwrap();
    r.create_post(1, new_post(b.id, "two")).await.unwrap();
    r.create_product(new_product(b.id, 5.0), "SKU-1".into()).await.unwrap();

    let b2 = r.get_business(b.id).await.unwrap();
    assert_eq!((b2.total_posts, b2.total_products), (2, 1));

    r.delete_post(p1.id).await.unwrap();
    assert_eq!(r.get_business(b.id).await.unwrap().total_posts, 1);

    // newest first
    let posts = r.list_posts(b.id).await.unwrap();
    assert_eq!(posts[0].content, "two");

    let err = r.create_product(new_product(b.id, 1.0), "SKU-1".into()).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ref m) if m == "sku already in use"));
}

#[tokio::test]
async fn sales_accumulate_revenue() {
    let r = InMemRepo::new();
    let b = r.create_business(1, new_business("Cafe", None)).await.unwrap();
    let p = r.create_product(new_product(b.id, 2.5), "SKU-9".into()).await.unwrap();
    r.record_sale(p.id, 2).await.unwrap();
    let p = r.record_sale(p.id, 2).await.unwrap();
    assert_eq!(p.sales.total_sold, 4);
    assert!((p.sales.revenue - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn deleting_business_cascades() {
    let r = InMemRepo::new();
    let client = r.create_client(account("Cy", "cy@example.com"), None, vec![]).await.unwrap();
    let b = r.create_business(1, new_business("Cafe", None)).await.unwrap();
    let p = r.create_post(1, new_post(b.id, "hello")).await.unwrap();
    let prod = r.create_product(new_product(b.id, 1.0), "SKU-2".into()).await.unwrap();
    r.toggle_follower(b.id, client.id).await.unwrap();
    r.set_following(client.id, b.id, true).await.unwrap();

    r.delete_business(b.id).await.unwrap();

    assert!(matches!(r.get_post(p.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.get_product(prod.id).await, Err(RepoError::NotFound)));
    assert!(r.get_client(client.id).await.unwrap().following.is_empty());
    assert!(r.latest_analytics(b.id, AnalyticsPeriod::Daily).await.unwrap().is_none());
    assert!(matches!(r.delete_business(b.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let (business_id, post_id) = {
        let r = InMemRepo::with_snapshot(dir.path());
        let b = r.create_business(1, new_business("Cafe", None)).await.unwrap();
        let p = r.create_post(1, new_post(b.id, "persisted")).await.unwrap();
        r.toggle_like(p.id, 5).await.unwrap();
        (b.id, p.id)
    };

    let r = InMemRepo::with_snapshot(dir.path());
    let post = r.get_post(post_id).await.unwrap();
    assert_eq!(post.likes_list, vec![5]);
    assert_eq!(r.get_business(business_id).await.unwrap().total_posts, 1);

    // ids keep increasing after reload
    let again = r.create_post(1, new_post(business_id, "next")).await.unwrap();
    assert!(again.id > post_id);
}
