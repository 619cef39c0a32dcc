use std::sync::Arc;

use async_trait::async_trait;
use modlog_core::scheduler::ScheduledJob;
use modlog_core::store::ActionStore;
use tracing::info;

use crate::aggregations::{build_summary, Report};
use crate::reports::render_html;

/// Builds reports from the current contents of an [`ActionStore`].
#[derive(Clone)]
pub struct ReportService {
    store: Arc<ActionStore>,
}

impl ReportService {
    pub fn new(store: Arc<ActionStore>) -> Self {
        Self { store }
    }

    pub async fn summary(&self) -> Report {
        build_summary(&self.store.list().await)
    }

    pub async fn render(&self) -> String {
        render_html(&self.summary().await)
    }
}

/// Destination for a rendered report.
pub type ReportSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Scheduled job that renders the current log and hands it to a sink,
/// the operational log unless another sink is given.
pub struct ReportJob {
    reports: ReportService,
    sink: ReportSink,
}

impl ReportJob {
    pub fn new(reports: ReportService) -> Self {
        Self::with_sink(reports, Arc::new(log_report))
    }

    pub fn with_sink(reports: ReportService, sink: ReportSink) -> Self {
        Self { reports, sink }
    }
}

fn log_report(report: &str) {
    info!(target: "modlog::report", "Monthly moderation report:\n{}", report);
}

#[async_trait]
impl ScheduledJob for ReportJob {
    async fn run(&self) -> anyhow::Result<()> {
        let report = self.reports.render().await;
        (self.sink)(&report);
        Ok(())
    }
}
