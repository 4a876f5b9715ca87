#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use storefront::models::{Business, NewBusiness, NewPost};
use storefront::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use storefront::repo::{inmem::InMemRepo, BusinessRepo, PostRepo, NewAccount, ClientRepo};
use storefront::auth::create_client_jwt;
use storefront::{config, AppState};

fn ensure_secret() {
    std::env::set_var("JWT_SECRET", "testsecret-abcdefghijklmnopqrstuvwxyz012345");
}

async fn seeded() -> (InMemRepo, Business, i64, i64) {
    let repo = InMemRepo::new();
    let b = repo
        .create_business(1, NewBusiness {
            name: "Corner Cafe".into(), category: "food".into(), description: String::new(),
            website: None, address: None, phone: None, logo: None,
        })
        .await
        .unwrap();
    let post = repo
        .create_post(1, NewPost {
            business_id: b.id, content: "hello".into(), media: None, platforms: vec![],
            status: None, scheduled_for: None, tags: vec![], category: None,
        })
        .await
        .unwrap();
    let client = repo
        .create_client(NewAccount { name: "Cy".into(), email: "cy@example.com".into(), password_hash: "s$h".into() }, None, vec![])
        .await
        .unwrap();
    (repo, b, post.id, client.id)
}

#[actix_web::test]
#[serial_test::serial]
async fn rate_limit_engagement_writes() {
    ensure_secret();
    let (repo, business, post_id, client_id) = seeded().await;

    // one follow and one comment per large window; likes stay generous
    let window = Duration::from_secs(300);
    let cfg = RateLimitConfig {
        follow_limit: 1, follow_window: window,
        like_limit: 100, like_window: window,
        comment_limit: 1, comment_window: window,
    };
    let limiter = RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg);
    let state = AppState::new(Arc::new(repo)).with_rate_limiter(limiter);
    let app = test::init_service(App::new().app_data(actix_web::web::Data::new(state)).configure(config)).await;

    let token = create_client_jwt(client_id).unwrap();
    let auth = ("Authorization", format!("Bearer {token}"));

    // first follow -> 200, second -> 429
    let req = test::TestRequest::post().uri(&format!("/api/follow/{}", business.id)).insert_header(auth.clone())
        .set_json(json!({"userId": client_id})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200, "first follow allowed");
    let req = test::TestRequest::post().uri(&format!("/api/follow/{}", business.id)).insert_header(auth.clone())
        .set_json(json!({"userId": client_id})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 429, "second follow should be rate limited");

    // the follow budget does not consume the like budget
    for _ in 0..3 {
        let req = test::TestRequest::post().uri(&format!("/api/post/{post_id}/like")).insert_header(auth.clone())
            .set_json(json!({"userId": client_id})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    let req = test::TestRequest::post().uri(&format!("/api/post/{post_id}/comment")).insert_header(auth.clone())
        .set_json(json!({"userId": client_id, "text": "first"})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
    let req = test::TestRequest::post().uri(&format!("/api/post/{post_id}/comment")).insert_header(auth.clone())
        .set_json(json!({"userId": client_id, "text": "second"})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 429);
}

#[actix_web::test]
#[serial_test::serial]
async fn disabled_limiter_never_blocks() {
    ensure_secret();
    let (repo, business, _, client_id) = seeded().await;
    let cfg = RateLimitConfig {
        follow_limit: 1, follow_window: Duration::from_secs(300),
        like_limit: 1, like_window: Duration::from_secs(300),
        comment_limit: 1, comment_window: Duration::from_secs(300),
    };
    let limiter = RateLimiterFacade::new(InMemoryRateLimiter::new(false), cfg);
    let state = AppState::new(Arc::new(repo)).with_rate_limiter(limiter);
    let app = test::init_service(App::new().app_data(actix_web::web::Data::new(state)).configure(config)).await;

    let token = create_client_jwt(client_id).unwrap();
    for _ in 0..4 {
        let req = test::TestRequest::post().uri(&format!("/api/follow/{}", business.id))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({"userId": client_id})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }
}
