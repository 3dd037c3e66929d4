use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use donation_gateway::config::AppConfig;
use donation_gateway::gateways::GatewayRegistry;
use donation_gateway::repo::donations_repo::DonationsRepo;
use donation_gateway::repo::receipt_outbox_repo::ReceiptOutboxRepo;
use donation_gateway::repo::site_settings_repo::SiteSettingsRepo;
use donation_gateway::service::callback_service::CallbackService;
use donation_gateway::service::checkout_service::CheckoutService;
use donation_gateway::service::receipt_relay::ReceiptRelay;
use donation_gateway::service::settings_cache::SettingsCache;
use donation_gateway::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;

    let donations_repo = DonationsRepo { pool: pool.clone() };
    let settings_repo = SiteSettingsRepo { pool: pool.clone() };
    let outbox_repo = ReceiptOutboxRepo { pool: pool.clone() };

    let registry = GatewayRegistry::new(&cfg)?;
    let settings_cache = SettingsCache::new(settings_repo, std::time::Duration::from_secs(60));

    let checkout_service = CheckoutService {
        donations_repo: donations_repo.clone(),
        registry: registry.clone(),
        settings_cache: settings_cache.clone(),
        public_base_url: cfg.public_base_url.clone(),
    };
    let callback_service = CallbackService {
        donations_repo: donations_repo.clone(),
        registry: registry.clone(),
        reject_unverified: cfg.reject_unverified_callbacks,
    };

    let relay = ReceiptRelay {
        outbox_repo,
        redis_client,
        stream_key: cfg.receipt_stream_key.clone(),
    };
    tokio::spawn(relay.run());

    let state = AppState {
        donations_repo,
        checkout_service,
        callback_service,
        settings_cache,
        registry,
    };

    let admin_key = cfg.internal_api_key.clone();
    let admin_routes = Router::new()
        .route(
            "/admin/donations/:id/mark_paid",
            post(donation_gateway::http::handlers::donations::mark_paid),
        )
        .route(
            "/admin/donations/:id/cancel",
            post(donation_gateway::http::handlers::donations::cancel),
        )
        .route(
            "/admin/settings/gateway",
            get(donation_gateway::http::handlers::settings::get_gateway)
                .put(donation_gateway::http::handlers::settings::put_gateway),
        )
        .layer(from_fn_with_state(
            admin_key,
            donation_gateway::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/health", get(donation_gateway::http::handlers::payments::health))
        .route("/donations", post(donation_gateway::http::handlers::donations::create_donation))
        .route(
            "/donations/:id",
            get(donation_gateway::http::handlers::donations::get_donation),
        )
        .route(
            "/payments/:donation_id/checkout",
            get(donation_gateway::http::handlers::payments::checkout),
        )
        .route("/payments/notify", post(donation_gateway::http::handlers::payments::notify))
        .route(
            "/payments/payment_info",
            post(donation_gateway::http::handlers::payments::payment_info),
        )
        .route("/payments/result", post(donation_gateway::http::handlers::payments::result))
        .merge(admin_routes)
        .layer(from_fn_with_state(
            donation_gateway::http::middleware::rate_limit::RateLimitState {
                redis_client: redis::Client::open(cfg.redis_url.clone())?,
                max_per_minute: 300,
            },
            donation_gateway::http::middleware::rate_limit::enforce,
        ))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
