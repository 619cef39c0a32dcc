//! Report aggregation and rendering for the modlog action log.
//!
//! Groups recorded actions by messenger and then by action type, renders the
//! result as HTML markup, and provides the job that logs it on a schedule.

pub mod aggregations;
pub mod job;
pub mod reports;

pub use aggregations::{build_summary, Entry, MessengerSummary, Report};
pub use job::{ReportJob, ReportService, ReportSink};
pub use reports::render_html;
