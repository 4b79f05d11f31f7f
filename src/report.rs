#[path = "report/table.rs"]
mod table;

#[path = "report/summary.rs"]
mod summary;

#[path = "report/sink.rs"]
mod sink;

pub use sink::{JsonFileSink, QueryFailure, ReportSink, RunReport, RESULTS_FILE_NAME};
pub use summary::{grade, Grade, MetricSummary, Summary, SystemSummary};
pub use table::{Cell, Column, ResultTable};
