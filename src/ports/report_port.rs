//! Report output port trait.

use crate::domain::error::RankfolioError;
use crate::domain::research::ResearchReport;
use std::path::Path;

/// Port for writing research reports.
pub trait ReportPort {
    fn write(&self, report: &ResearchReport, output_path: &Path) -> Result<(), RankfolioError>;
}
