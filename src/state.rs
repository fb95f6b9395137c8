//! Shared handler state.

use crate::{
    config::AppConfig,
    pagination::PaginationConfig,
    serializers::review::ReviewConfig,
    services::{
        account_service::AccountService, catalog_service::CatalogService,
        review_service::ReviewService,
    },
    throttle::Throttle,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Everything a handler can reach. Cheap to clone: services share the pool,
/// the throttle shares its history.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub catalog: CatalogService,
    pub reviews: ReviewService,
    pub accounts: AccountService,
    pub pagination: PaginationConfig,
    pub review_rules: ReviewConfig,
    pub throttle: Throttle,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, cfg: &AppConfig) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            reviews: ReviewService::new(db.clone()),
            accounts: AccountService::new(db.clone()),
            pagination: cfg.pagination.clone(),
            review_rules: cfg.reviews,
            throttle: Throttle::new(cfg.throttle.clone()),
            db,
        }
    }
}
