use crate::db::DbPool;
use crate::error::Result;
use crate::models::BillingRate;

#[derive(Clone)]
pub struct RateRepository {
    pool: DbPool,
}

impl RateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn active_rates(&self) -> Result<Vec<BillingRate>> {
        let rates = sqlx::query_as::<_, BillingRate>(
            r#"
            SELECT id, rate_name, rate_type, season, start_time, end_time,
                   rate_per_kwh, effective_date, is_active
            FROM billing_rates
            WHERE is_active = TRUE
            ORDER BY rate_type, start_time
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }
}
