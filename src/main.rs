use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpResponse, HttpServer};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use storefront::config::AppConfig;
use storefront::openapi::ApiDoc;
use storefront::rate_limit::{InMemoryRateLimiter, RateLimiterFacade};
use storefront::repo::Repo;
use storefront::routes::{config, AppState};

async fn render_metrics(handle: web::Data<PrometheusHandle>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(handle.render())
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    use storefront::repo::inmem::InMemRepo;
    let repo = match &cfg.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using in-memory repository with snapshot");
            InMemRepo::with_snapshot(dir)
        }
        None => {
            info!("using in-memory repository backend");
            InMemRepo::new()
        }
    };
    Ok(Arc::new(repo))
}

#[cfg(feature = "postgres-store")]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    use storefront::repo::pg::PgRepo;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(cfg.require_database_url()?)?;
    let repo = PgRepo::new(pool);
    repo.migrate().await?;
    info!("using Postgres repository backend");
    Ok(Arc::new(repo))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping storefront server");
    info!(origins = ?cfg.frontend_origins, rate_limits = cfg.rate_limits_enabled, "configuration loaded");

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    let repo = build_repo(&cfg).await?;

    let mut state = AppState::new(repo).with_bootstrap_admins(cfg.bootstrap_admin_emails.clone());
    if cfg.rate_limits_enabled {
        let limiter = InMemoryRateLimiter::new(true);
        state = state.with_rate_limiter(RateLimiterFacade::new(limiter, cfg.rate_limits.clone()));
    }

    let openapi = ApiDoc::openapi();
    let origins = cfg.frontend_origins.clone();

    let server = HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |c, origin| c.allowed_origin(origin))
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(metrics_handle.clone()))
            .configure(config)
            .route("/metrics", web::get().to(render_metrics))
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(cfg.bind_address)?;

    info!("Listening on http://{}", cfg.bind_address);

    server.run().await?;
    Ok(())
}
