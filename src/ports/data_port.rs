//! Market data access port trait.

use crate::domain::error::RankfolioError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `code` within the optional inclusive date range, oldest first.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RankfolioError>;

    fn list_symbols(&self) -> Result<Vec<String>, RankfolioError>;
}
