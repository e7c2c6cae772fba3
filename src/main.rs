//! Process entry point: configuration, tracing and service wiring.

use std::process::ExitCode;
use std::sync::Arc;

use mockable::DefaultClock;
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use channel_pass::adapters::http::{app_router, PaymentsAppState};
use channel_pass::adapters::postgres::{PostgresSubscriptionStore, RetryPolicy};
use channel_pass::adapters::telegram::{
    BotApiError, BotDispatcher, BotRouter, BotServices, TelegramChannel, TelegramClient,
    TelegramNotifier,
};
use channel_pass::adapters::yookassa::{YooKassaConfig, YooKassaGateway};
use channel_pass::application::{
    CheckAccessHandler, CheckPaymentHandler, ConfirmPaymentHandler, ExpirySweeper,
    ListActiveUsersHandler, MembershipChangeHandler, MessageCatalog, OperationalAlerts,
    PurchaseSettings, RegisterUserHandler, RejoinHandler, SharedClock, StartPurchaseHandler,
    SweeperConfig,
};
use channel_pass::config::{AppConfig, ConfigError, ServerConfig, ValidationError};
use channel_pass::ports::{ChannelManager, Notifier, PaymentGateway, SubscriptionStore};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("payment gateway setup failed: {0}")]
    Gateway(#[from] channel_pass::ports::PaymentError),

    #[error("bot setup failed: {0}")]
    Bot(#[from] BotApiError),

    #[error("server failed: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Refusing to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.server);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service stopped with an error");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<AppConfig, StartupError> {
    let config = AppConfig::load()?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    let clock: SharedClock = Arc::new(DefaultClock);
    let terms = config.subscription.terms();
    let price = config.payment.price()?;
    let operators = config.telegram.admin_ids()?;

    // Persistence
    let db = &config.database;
    tracing::info!(url = %db.redacted_url(), "Connecting to database");
    let pool = db.pool_options().connect(&db.url).await?;
    if db.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Migrations applied");
    }
    let store: Arc<dyn SubscriptionStore> = Arc::new(
        PostgresSubscriptionStore::new(pool)
            .with_retry_policy(RetryPolicy::new(db.retry_attempts, db.retry_base_delay())),
    );

    // External services
    let gateway: Arc<dyn PaymentGateway> = Arc::new(YooKassaGateway::new(
        YooKassaConfig::new(&config.payment.shop_id, config.payment.secret_key.clone())
            .with_base_url(&config.payment.api_base_url)
            .with_timeout(config.payment.request_timeout()),
    )?);
    let bot = Arc::new(TelegramClient::new(
        &config.telegram.api_base_url,
        &config.telegram.bot_token,
        config.telegram.request_timeout(),
    )?);
    let channel: Arc<dyn ChannelManager> = Arc::new(TelegramChannel::new(
        bot.clone(),
        config.telegram.channel_id(),
        config.subscription.invite_ttl_hours,
        clock.clone(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));

    // Application services
    let messages = Arc::new(MessageCatalog::new(
        price.clone(),
        &config.telegram.community_chat_link,
        &config.telegram.channel_public_link,
    ));
    let alerts = Arc::new(OperationalAlerts::new(notifier.clone(), operators));
    let purchases = Arc::new(StartPurchaseHandler::new(
        store.clone(),
        gateway.clone(),
        clock.clone(),
        PurchaseSettings {
            price,
            description: config.payment.description.clone(),
            bot_username: config.telegram.bot_username.clone(),
        },
    ));
    let access = Arc::new(CheckAccessHandler::new(
        store.clone(),
        channel.clone(),
        purchases.clone(),
        clock.clone(),
        terms,
    ));
    let confirm = Arc::new(ConfirmPaymentHandler::new(
        store.clone(),
        gateway.clone(),
        channel.clone(),
        notifier.clone(),
        alerts.clone(),
        messages.clone(),
        clock.clone(),
        terms,
    ));

    let router = Arc::new(BotRouter::new(
        BotServices {
            register: Arc::new(RegisterUserHandler::new(
                store.clone(),
                channel.clone(),
                purchases.clone(),
                clock.clone(),
                terms,
            )),
            access: access.clone(),
            rejoin: Arc::new(RejoinHandler::new(access.clone(), channel.clone())),
            check_payment: Arc::new(CheckPaymentHandler::new(store.clone(), confirm.clone())),
            membership: Arc::new(MembershipChangeHandler::new(
                store.clone(),
                channel.clone(),
                notifier.clone(),
                alerts.clone(),
                messages.clone(),
                clock.clone(),
                terms,
                config.telegram.channel_id(),
            )),
            list_active: Arc::new(ListActiveUsersHandler::new(store.clone(), alerts.clone())),
            alerts: alerts.clone(),
            messages: messages.clone(),
        },
        notifier.clone(),
    ));

    let sweeper = Arc::new(ExpirySweeper::new(
        store.clone(),
        channel.clone(),
        notifier.clone(),
        purchases.clone(),
        alerts.clone(),
        messages.clone(),
        clock.clone(),
        SweeperConfig::default()
            .with_interval(config.subscription.sweep_interval())
            .with_reminder_days(config.subscription.reminder_days()?)
            .with_terms(terms),
    ));
    let dispatcher = BotDispatcher::new(bot, router, config.telegram.poll_timeout());

    // Tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_task = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { sweeper.run(shutdown).await })
    };

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()?).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");
    let app = app_router(
        PaymentsAppState { confirm },
        std::time::Duration::from_secs(config.server.request_timeout_secs),
    );
    let server_task = {
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.wait_for(|stop| *stop).await;
                })
                .await
        })
    };

    let mut bot_task = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { dispatcher.run(shutdown).await })
    };

    tracing::info!("Channel pass started");

    let (bot_done, bot_failure) = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            (false, None)
        }
        result = &mut bot_task => match result {
            Ok(Ok(())) => (true, None),
            Ok(Err(e)) => (true, Some(e)),
            Err(e) => {
                tracing::error!(error = %e, "Bot task panicked");
                (true, None)
            }
        },
    };

    if let Some(e) = &bot_failure {
        alerts
            .alert(messages.alert_failure("bot polling", None, &e.to_string()))
            .await;
    }

    let _ = shutdown_tx.send(true);
    if !bot_done {
        let _ = bot_task.await;
    }
    let _ = sweeper_task.await;
    match server_task.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }

    tracing::info!("Channel pass stopped");
    match bot_failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
