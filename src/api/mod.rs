pub mod handlers;
pub mod models;
pub mod routes;

use crate::repositories::{DashboardRepository, RateRepository};

#[derive(Clone)]
pub struct ApiState {
    pub dashboard: DashboardRepository,
    pub rates: RateRepository,
}
