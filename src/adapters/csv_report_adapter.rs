//! CSV report adapter implementing ReportPort.
//!
//! One row per instrument: the selected strategy with its metrics and
//! portfolio weight, or the failure that excluded the instrument.

use crate::domain::error::RankfolioError;
use crate::domain::research::ResearchReport;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

const HEADER: [&str; 12] = [
    "instrument",
    "status",
    "strategy",
    "rank_score",
    "total_return",
    "sharpe_ratio",
    "max_drawdown",
    "win_rate",
    "trade_count",
    "open_position",
    "weight",
    "error",
];

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, report: &ResearchReport) -> Result<String, RankfolioError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(HEADER).map_err(csv_error)?;

        for (code, outcome) in &report.selections {
            let row: Vec<String> = match outcome {
                Ok(best) => {
                    let m = &best.result.metrics;
                    vec![
                        code.clone(),
                        "selected".to_string(),
                        best.strategy_id.clone(),
                        format!("{:.6}", best.rank_score),
                        format!("{:.6}", m.total_return),
                        format!("{:.6}", m.sharpe_ratio),
                        format!("{:.6}", m.max_drawdown),
                        format!("{:.6}", m.win_rate),
                        m.trade_count.to_string(),
                        best.result.ledger.open.is_some().to_string(),
                        report
                            .weight(code)
                            .map(|w| format!("{w:.6}"))
                            .unwrap_or_default(),
                        String::new(),
                    ]
                }
                Err(e) => {
                    let mut row = vec![String::new(); HEADER.len()];
                    row[0] = code.clone();
                    row[1] = "failed".to_string();
                    row[11] = e.to_string();
                    row
                }
            };
            wtr.write_record(&row).map_err(csv_error)?;
        }

        let bytes = wtr.into_inner().map_err(|e| RankfolioError::Io {
            reason: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| RankfolioError::Io {
            reason: e.to_string(),
        })
    }
}

fn csv_error(e: csv::Error) -> RankfolioError {
    RankfolioError::Io {
        reason: format!("CSV write error: {e}"),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &ResearchReport, output_path: &Path) -> Result<(), RankfolioError> {
        let content = self.render(report)?;
        fs::write(output_path, content).map_err(|e| RankfolioError::Io {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })
    }
}
