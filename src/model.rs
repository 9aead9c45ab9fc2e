use std::{env::VarError, error::Error, fmt::Display, io};

use chrono::NaiveDate;
use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use thiserror::Error as ThisError;

use crate::http::client;

/// A trade date as the provider reports it (compact `YYYYMMDD`), stored in
/// SQLite as an ISO `YYYY-MM-DD` text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeDate(pub NaiveDate);

impl TradeDate {
    pub fn parse_compact(s: &str) -> std::result::Result<TradeDate, chrono::ParseError> {
        NaiveDate::parse_from_str(s, "%Y%m%d").map(TradeDate)
    }
}

impl Display for TradeDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl ToSql for TradeDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(rusqlite::types::Value::Text(
            self.0.format("%Y-%m-%d").to_string(),
        )))
    }
}

impl FromSql for TradeDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(s) => {
                let s = std::str::from_utf8(s).map_err(|_| FromSqlError::InvalidType)?;
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(TradeDate)
                    .map_err(|_| FromSqlError::InvalidType)
            }
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// One discrete remote-fetch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchUnit {
    /// A whole-market pass for one trading day (compact date).
    TradeDate(String),
    /// A per-entity pass for one stock or index code.
    Code(String),
    /// One entity on one trading day.
    CodeDate { code: String, date: String },
}

impl Display for FetchUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchUnit::TradeDate(date) => write!(f, "{}", date),
            FetchUnit::Code(code) => write!(f, "{}", code),
            FetchUnit::CodeDate { code, date } => write!(f, "{}@{}", code, date),
        }
    }
}

/// What a single provider call produced. `Empty` is a valid query with zero
/// rows and must not be confused with a failure.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Rows(Vec<T>),
    Empty,
}

/// Why a single provider call did not produce rows.
#[derive(Debug, ThisError)]
pub enum FetchError {
    /// Worth retrying: timeouts, malformed responses, per-minute quota hits.
    #[error("transient provider error: {0}")]
    Transient(String),
    /// Not worth retrying: permission or credit-level rejections.
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl From<client::RequestError> for FetchError {
    fn from(value: client::RequestError) -> Self {
        match value {
            client::RequestError::TokenNotSet => FetchError::Rejected(value.to_string()),
            other => FetchError::Transient(other.to_string()),
        }
    }
}

/// An OHLCV bar as the provider reports it. Shared by the daily, index daily,
/// index weekly and ETF daily tables, which carry identical columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub ts_code: String,
    pub trade_date: TradeDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub pre_close: Option<f64>,
    pub change: Option<f64>,
    pub pct_chg: Option<f64>,
    pub vol: Option<f64>,
    pub amount: Option<f64>,
}

/// A concept/industry index definition.
#[derive(Debug, Clone)]
pub struct ThsIndex {
    pub ts_code: String,
    pub name: String,
    pub count: Option<i64>,
    pub exchange: Option<String>,
    pub list_date: Option<TradeDate>,
    pub index_type: Option<String>,
}

/// One member stock of a concept index.
#[derive(Debug, Clone)]
pub struct ThsMember {
    pub ts_code: String,
    pub con_code: String,
    pub con_name: Option<String>,
    pub weight: Option<f64>,
    pub in_date: Option<TradeDate>,
    pub out_date: Option<TradeDate>,
    pub is_new: Option<String>,
}

/// Stock master data.
#[derive(Debug, Clone)]
pub struct StockBasic {
    pub ts_code: String,
    pub symbol: Option<String>,
    pub name: String,
    pub area: Option<String>,
    pub industry: Option<String>,
    pub market: Option<String>,
    pub list_date: Option<TradeDate>,
    pub list_status: Option<String>,
}

/// Per-period financial indicators, keyed on code + report period +
/// announcement date.
#[derive(Debug, Clone)]
pub struct FinIndicator {
    pub ts_code: String,
    pub ann_date: Option<TradeDate>,
    pub end_date: TradeDate,
    pub eps: Option<f64>,
    pub bps: Option<f64>,
    pub roe: Option<f64>,
    pub netprofit_yoy: Option<f64>,
    pub or_yoy: Option<f64>,
    pub grossprofit_margin: Option<f64>,
    pub netprofit_margin: Option<f64>,
    pub debt_to_assets: Option<f64>,
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    FileNotFound(String),
    CouldNotOpenFile(io::Error),
    CouldNotReadLine,
    EmptyCodesFile(String),
    EmptyCodeList,
    EmptyUnitList,
    InvalidBatchThreshold,
    NoTradingDays(String, String),
    NoConceptIndexes,
    DatabaseError(rusqlite::Error),
    HttpError(client::RequestError),
    Fetch(FetchError),
    EnvVarNotSet(VarError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
    fn from(value: io::Error) -> Self {
        Self::CouldNotOpenFile(value)
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(value: rusqlite::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl From<client::RequestError> for SyncError {
    fn from(value: client::RequestError) -> Self {
        Self::HttpError(value)
    }
}

impl From<FetchError> for SyncError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

impl From<VarError> for SyncError {
    fn from(value: VarError) -> Self {
        Self::EnvVarNotSet(value)
    }
}
