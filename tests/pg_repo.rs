#![cfg(feature = "postgres-store")]

use sqlx::postgres::PgPoolOptions;
use storefront::engagement;
use storefront::models::*;
use storefront::repo::pg::PgRepo;
use storefront::repo::{NewAccount, Repo, RepoError};

async fn pg_repo() -> Option<PgRepo> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .ok()?;
    let repo = PgRepo::new(pool);
    repo.migrate().await.ok()?;
    Some(repo)
}

fn unique(tag: &str) -> String {
    format!("{tag}-{}", uuid::Uuid::new_v4().simple())
}

async fn seed(repo: &dyn Repo) -> (Business, Post, Client) {
    let owner = repo
        .create_user(
            NewAccount { name: "Owner".into(), email: format!("{}@example.com", unique("owner")), password_hash: "s$h".into() },
            UserRole::BusinessOwner,
        )
        .await
        .unwrap();
    let b = repo
        .create_business(owner.id, NewBusiness {
            name: unique("Cafe"), category: "food".into(), description: String::new(),
            website: None, address: None, phone: None, logo: None,
        })
        .await
        .unwrap();
    let p = repo
        .create_post(owner.id, NewPost {
            business_id: b.id, content: "hello".into(), media: None, platforms: vec!["instagram".into()],
            status: None, scheduled_for: None, tags: vec![], category: None,
        })
        .await
        .unwrap();
    let c = repo
        .create_client(
            NewAccount { name: "Cy".into(), email: format!("{}@example.com", unique("client")), password_hash: "s$h".into() },
            None,
            vec![],
        )
        .await
        .unwrap();
    (b, p, c)
}

#[tokio::test]
#[serial_test::serial]
async fn pg_toggle_and_comment_keep_counts() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return; };
    let repo: &dyn Repo = &repo;
    let (b, p, c) = seed(repo).await;

    let r = engagement::toggle_follow(repo, b.id, c.id).await.unwrap();
    assert!(r.is_following);
    assert_eq!(r.followers, 1);
    let r = engagement::toggle_follow(repo, b.id, c.id).await.unwrap();
    assert!(!r.is_following);
    assert_eq!(r.followers, 0);

    let r = engagement::toggle_like(repo, p.id, c.id).await.unwrap();
    assert_eq!(r.likes_count, 1);
    assert!(engagement::like_status(repo, p.id, c.id).await.unwrap());

    let (_, n) = engagement::add_comment(repo, p.id, c.id, "nice").await.unwrap();
    assert_eq!(n, 1);
    let post = repo.get_post(p.id).await.unwrap();
    assert_eq!(post.comments_list.len(), 1);
    assert_eq!(post.comments_count, 1);
}

#[tokio::test]
#[serial_test::serial]
async fn pg_duplicate_business_name_is_conflict() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return; };
    let repo: &dyn Repo = &repo;
    let (b, _, _) = seed(repo).await;
    let other = repo
        .create_user(
            NewAccount { name: "Other".into(), email: format!("{}@example.com", unique("other")), password_hash: "s$h".into() },
            UserRole::BusinessOwner,
        )
        .await
        .unwrap();
    let err = repo
        .create_business(other.id, NewBusiness {
            name: b.name.to_uppercase(), category: "food".into(), description: String::new(),
            website: None, address: None, phone: None, logo: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(ref m) if m == "business name already taken"));

    repo.delete_business(b.id).await.unwrap();
    assert!(matches!(repo.get_business(b.id).await, Err(RepoError::NotFound)));
}
