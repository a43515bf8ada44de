use async_graphql::{Context, Object, Result};

use crate::{
    api::current_session,
    chart::{self, IntentBreakdown, SegmentDistribution},
};

/// Distributions over the whole working set. Table filters and paging do
/// not apply.
#[derive(Default)]
pub(super) struct ChartQuery;

#[Object]
impl ChartQuery {
    /// Record counts per segment, for a pie chart.
    async fn segment_distribution(&self, ctx: &Context<'_>) -> Result<SegmentDistribution> {
        let session = current_session(ctx).await?;
        let session = session.lock().await;
        Ok(chart::segment_distribution(&session.dataset()?.records))
    }

    /// Record counts per question intent, stacked by sub intent.
    async fn intent_breakdown(&self, ctx: &Context<'_>) -> Result<IntentBreakdown> {
        let session = current_session(ctx).await?;
        let session = session.lock().await;
        Ok(chart::intent_breakdown(&session.dataset()?.records))
    }
}
