//! EnrollPay server entry point.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use enrollpay::adapters::http::checkout::{api_router, CheckoutAppState};
use enrollpay::adapters::notification::LoggingNotificationDispatcher;
use enrollpay::adapters::postgres::{
    PostgresClassRepSlots, PostgresDonationRepository, PostgresOfferingCatalog,
    PostgresPurchaseReader, PostgresPurchaseRepository, PostgresTransactionLedger,
};
use enrollpay::adapters::stripe::{StripeClient, StripeClientConfig};
use enrollpay::config::AppConfig;
use enrollpay::ports::PromoCodeValidator;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Promo-code validation is an external collaborator; until the promo
/// service is wired in, every code is rejected rather than silently
/// discounted.
struct RejectAllPromoCodes;

#[async_trait::async_trait]
impl PromoCodeValidator for RejectAllPromoCodes {
    async fn validate(
        &self,
        _code: &str,
        _offering: &enrollpay::domain::foundation::OfferingId,
    ) -> Result<enrollpay::ports::PromoCodeValidation, enrollpay::domain::foundation::DomainError>
    {
        Ok(enrollpay::ports::PromoCodeValidation::Rejected {
            reason: "promo codes are not enabled".to_string(),
        })
    }
}

#[tokio::main]
async fn main() {
    // 1. Configuration
    let config = AppConfig::load().expect("failed to load configuration");
    config.validate().expect("invalid configuration");

    // 2. Tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.payment.is_test_mode() && config.is_production() {
        tracing::warn!("running production with a Stripe test key");
    }

    // 3. Database pool
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await
        .expect("failed to connect to database");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations");
        tracing::info!("database migrations applied");
    }

    // 4. Adapters and shared state
    let stripe = StripeClient::new(StripeClientConfig::from_payment_config(&config.payment));
    let purchases = Arc::new(PostgresPurchaseRepository::new(pool.clone()));

    let state = CheckoutAppState {
        catalog: Arc::new(PostgresOfferingCatalog::new(pool.clone())),
        purchases,
        purchase_reader: Arc::new(PostgresPurchaseReader::new(pool.clone())),
        slots: Arc::new(PostgresClassRepSlots::new(pool.clone())),
        promo_codes: Arc::new(RejectAllPromoCodes),
        payment_provider: Arc::new(stripe),
        donations: Arc::new(PostgresDonationRepository::new(pool.clone())),
        ledger: Arc::new(PostgresTransactionLedger::new(pool)),
        notifications: Arc::new(LoggingNotificationDispatcher::new()),
        checkout_config: config.checkout.clone(),
        webhook_secret: config.payment.stripe_webhook_secret.clone(),
        require_livemode: config.payment.require_livemode,
    };

    // 5. Router with cross-cutting layers
    let cors = match config.server.cors_origins_list().as_slice() {
        [] => CorsLayer::new(),
        origins => CorsLayer::new().allow_origin(AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| origin.parse().ok()),
        )),
    };

    let app = api_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(cors),
    );

    // 6. Serve
    let addr = config.server.socket_addr();
    tracing::info!(%addr, "starting EnrollPay server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}
