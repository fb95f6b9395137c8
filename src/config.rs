use crate::{
    pagination::{PaginationConfig, PaginationStyle},
    serializers::review::ReviewConfig,
    throttle::{Rate, ThrottleConfig},
};
use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub pagination: PaginationConfig,
    pub throttle: ThrottleConfig,
    pub reviews: ReviewConfig,
}

/// What the process should do after configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupTask {
    Serve,
    /// Run migrations and exit.
    Migrate,
    /// Create a staff account and exit.
    CreateAdmin {
        username: String,
        email: String,
        password: String,
    },
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Car listings, showrooms and reviews over HTTP")]
pub struct Args {
    /// Host to bind to (overrides CAR_REST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CAR_REST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides CAR_REST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Pagination style: page, limit or cursor (overrides CAR_REST_PAGINATION)
    #[arg(long)]
    pub pagination: Option<String>,

    /// Default page size (overrides CAR_REST_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Create a staff account with this username and exit
    #[arg(long, value_name = "USERNAME")]
    pub create_admin: Option<String>,

    /// Email for --create-admin
    #[arg(long, requires = "create_admin")]
    pub admin_email: Option<String>,

    /// Password for --create-admin (overrides CAR_REST_ADMIN_PASSWORD)
    #[arg(long, requires = "create_admin")]
    pub admin_password: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the startup task.
    pub fn from_env_and_args() -> Result<(Self, StartupTask)> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge `args` over the variables returned by `lookup`.
    pub fn resolve(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, StartupTask)> {
        // --- Environment fallback ---
        let env_host = lookup("CAR_REST_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "CAR_REST_PORT")?.unwrap_or(8000);
        let env_db = lookup("CAR_REST_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/car_rest.db".into());

        let mut pagination = PaginationConfig::default();
        if let Some(style) = args.pagination.or_else(|| lookup("CAR_REST_PAGINATION")) {
            pagination.style = PaginationStyle::from_str(&style).map_err(|e| anyhow!(e))?;
        }
        if let Some(size) = args.page_size.or(parse_var(&lookup, "CAR_REST_PAGE_SIZE")?) {
            pagination.page_size = size;
        }
        if let Some(max) = parse_var(&lookup, "CAR_REST_MAX_PAGE_SIZE")? {
            pagination.max_page_size = max;
        }
        if let Some(limit) = parse_var(&lookup, "CAR_REST_DEFAULT_LIMIT")? {
            pagination.default_limit = limit;
        }
        if let Some(max) = parse_var(&lookup, "CAR_REST_MAX_LIMIT")? {
            pagination.max_limit = max;
        }
        if pagination.page_size < 1 || pagination.max_page_size < 1 || pagination.max_limit < 1 {
            bail!("page sizes and limits must be at least 1");
        }

        let mut throttle = ThrottleConfig::default();
        if let Some(rate) = lookup("CAR_REST_THROTTLE_LIST") {
            throttle.review_list = parse_rate(&rate).context("parsing CAR_REST_THROTTLE_LIST")?;
        }
        if let Some(rate) = lookup("CAR_REST_THROTTLE_DETAIL") {
            throttle.review_detail =
                parse_rate(&rate).context("parsing CAR_REST_THROTTLE_DETAIL")?;
        }

        let mut reviews = ReviewConfig::default();
        if let Some(min) = parse_var(&lookup, "CAR_REST_RATING_MIN")? {
            reviews.rating_min = min;
        }
        if let Some(max) = parse_var(&lookup, "CAR_REST_RATING_MAX")? {
            reviews.rating_max = max;
        }
        if reviews.rating_min > reviews.rating_max {
            bail!(
                "rating range {}..={} is empty",
                reviews.rating_min,
                reviews.rating_max
            );
        }

        // --- Startup task ---
        let task = if let Some(username) = args.create_admin {
            let password = args
                .admin_password
                .or_else(|| lookup("CAR_REST_ADMIN_PASSWORD"))
                .context("--create-admin needs --admin-password or CAR_REST_ADMIN_PASSWORD")?;
            StartupTask::CreateAdmin {
                email: args
                    .admin_email
                    .unwrap_or_else(|| format!("{username}@localhost.localdomain")),
                username,
                password,
            }
        } else if args.migrate {
            StartupTask::Migrate
        } else {
            StartupTask::Serve
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            pagination,
            throttle,
            reviews,
        };

        Ok((cfg, task))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, value))
        })
        .transpose()
}

/// `none` / `off` disable a throttle scope.
fn parse_rate(value: &str) -> Result<Option<Rate>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" | "off" | "" => Ok(None),
        other => Rate::from_str(other).map(Some).map_err(|e| anyhow!(e)),
    }
}
