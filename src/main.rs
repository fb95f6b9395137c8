use anyhow::{Context, Result};
use car_rest::{
    config::{AppConfig, StartupTask},
    db,
    models::user::NewUser,
    services::account_service::AccountService,
    state::AppState,
};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + startup task ---
    let (cfg, task) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting car-rest with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db = db::connect(&cfg.database_url).await?;

    match task {
        StartupTask::Migrate => {
            db::run_migrations(&db).await?;
            tracing::info!("Database migration complete.");
            return Ok(());
        }
        StartupTask::CreateAdmin {
            username,
            email,
            password,
        } => {
            db::run_migrations(&db).await?;
            let admin = AccountService::new(db.clone())
                .create_admin(&NewUser {
                    username,
                    email,
                    password,
                })
                .await
                .context("creating staff account")?;
            tracing::info!("Created staff account {} (id {})", admin.username, admin.id);
            return Ok(());
        }
        StartupTask::Serve => {}
    }

    // --- Build router ---
    let app = car_rest::app(AppState::new(db, &cfg));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
