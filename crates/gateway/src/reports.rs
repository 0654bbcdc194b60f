//! Sales reports, computed on request.

use chrono::NaiveDate;
use chrono_tz::Tz;
use common::Actor;
use domain::CatalogReader;
use event_store::EventStore;
use projections::{ProductSales, ReportPeriod, SalesSummary};

use crate::error::Result;
use crate::gateway::{CafeGateway, require_elevated};

impl<S, C> CafeGateway<S, C>
where
    S: EventStore + Clone,
    C: CatalogReader,
{
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn daily_report(
        &self,
        actor: &Actor,
        date: NaiveDate,
        tz: Option<Tz>,
    ) -> Result<SalesSummary> {
        self.observe("daily_report", async {
            require_elevated(actor, "view reports")?;
            self.refresh_reports().await;
            Ok(self.sales.daily_report(date, tz).await)
        })
        .await
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn range_report(
        &self,
        actor: &Actor,
        start: NaiveDate,
        end: NaiveDate,
        tz: Option<Tz>,
    ) -> Result<SalesSummary> {
        self.observe("range_report", async {
            require_elevated(actor, "view reports")?;
            let period = ReportPeriod::new(start, end)?;
            self.refresh_reports().await;
            Ok(self.sales.range_report(period, tz).await)
        })
        .await
    }

    /// Best sellers by revenue. A `limit` of zero returns the default ten.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn top_products(
        &self,
        actor: &Actor,
        start: NaiveDate,
        end: NaiveDate,
        limit: usize,
        tz: Option<Tz>,
    ) -> Result<Vec<ProductSales>> {
        self.observe("top_products", async {
            require_elevated(actor, "view reports")?;
            let period = ReportPeriod::new(start, end)?;
            self.refresh_reports().await;
            Ok(self.sales.top_products(period, limit, tz).await)
        })
        .await
    }

    /// Catches the sales view up with the log. On failure the view answers
    /// from what it has already folded.
    async fn refresh_reports(&self) {
        if let Err(err) = self.processor.run_catch_up().await {
            tracing::warn!(error = %err, "report catch-up failed; serving last known sales");
        }
    }
}
