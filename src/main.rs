use course_backend::{
    config::{get_config, init_config, Config, StoreBackend},
    database::pool::{create_pool, run_migrations},
    middleware::auth::AuthConfig,
    repositories::{memory::Catalog, InMemoryStore, PgStore},
    router,
    services::{
        notification_service::NotificationService,
        progression_service::{ProgressionService, ProgressionSettings},
    },
    utils::time::{Clock, SystemClock},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = ProgressionSettings::from(config);
    let auth = AuthConfig::new(&config.jwt_secret);

    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres store"))?;
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;

            let notifications = config.notification_webhook_url.clone().map(|target| {
                NotificationService::new(pool.clone(), target, config.webhook_secret.clone())
            });
            let store = Arc::new(PgStore::new(pool));
            let progression = ProgressionService::new(store, clock, settings);
            Ok(AppState::new(progression, notifications, auth))
        }
        StoreBackend::Memory => {
            let catalog = match &config.catalog_path {
                Some(path) => {
                    info!(path = %path, "Loading course catalogue");
                    Catalog::from_json_file(path)?
                }
                None => Catalog::default(),
            };
            if config.notification_webhook_url.is_some() {
                tracing::warn!("Notification webhooks need the postgres store; disabled");
            }
            let store = Arc::new(InMemoryStore::from_catalog(catalog));
            let progression = ProgressionService::new(store, clock, settings);
            Ok(AppState::new(progression, None, auth))
        }
    }
}

async fn start_timer_sweep(state: AppState, every: Duration) -> anyhow::Result<JobScheduler> {
    let sched = JobScheduler::new()
        .await
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    let job = Job::new_repeated_async(every, move |_uuid, _l| {
        let state = state.clone();
        Box::pin(async move {
            match state.progression.sweep_expired_timers().await {
                Ok(report) => {
                    state.announce(&report.completions).await;
                }
                Err(e) => tracing::error!(error = ?e, "Timer sweep failed"),
            }
        })
    })
    .map_err(|e| anyhow::anyhow!("{:?}", e))?;

    sched
        .add(job)
        .await
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    sched
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    Ok(sched)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.json_logs);

    let app_state = build_state(config).await?;

    let _sweeper = start_timer_sweep(
        app_state.clone(),
        Duration::from_secs(config.timer_sweep_interval_seconds.max(1)),
    )
    .await?;
    info!(
        interval_seconds = config.timer_sweep_interval_seconds,
        "Expired timer sweep scheduled"
    );

    if let Some(notif) = app_state.notifications.clone() {
        tokio::spawn(async move {
            loop {
                match notif.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Notification worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    let app = router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
