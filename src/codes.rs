use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::model::{self, FetchOutcome, SyncError};
use crate::tushare::api_caller;

/// Reads one code per line, skipping blank lines. The file doubles as the
/// caller-managed cache of a previously fetched code list.
pub fn read_codes_from_file(codes_file_path: &str) -> model::Result<Vec<String>> {
    let path = Path::new(codes_file_path);
    if !path.exists() {
        return Err(SyncError::FileNotFound(codes_file_path.into()));
    }

    let file = OpenOptions::new().read(true).open(path)?;

    let mut codes = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|_e| SyncError::CouldNotReadLine)?;
        let code = line.trim();
        if !code.is_empty() {
            codes.push(code.to_string());
        }
    }

    if codes.is_empty() {
        return Err(SyncError::EmptyCodesFile(codes_file_path.into()));
    }
    Ok(codes)
}

/// Fetches the listed-stock universe and keeps main-board codes only.
pub async fn main_board_codes() -> model::Result<Vec<String>> {
    match api_caller::stock_basic().await? {
        FetchOutcome::Rows(stocks) => {
            let codes: Vec<String> = stocks
                .into_iter()
                .map(|stock| stock.ts_code)
                .filter(|code| is_main_board(code))
                .collect();
            if codes.is_empty() {
                return Err(SyncError::EmptyCodeList);
            }
            log::info!("fetched {} main-board codes from stock_basic", codes.len());
            Ok(codes)
        }
        FetchOutcome::Empty => Err(SyncError::EmptyCodeList),
    }
}

// Excludes ChiNext (300), STAR (688), Beijing exchange (830/430) and B-shares
// (200/900).
pub fn is_main_board(ts_code: &str) -> bool {
    const EXCLUDED_PREFIXES: &[&str] = &["300", "688", "830", "430", "200", "900"];
    !EXCLUDED_PREFIXES.iter().any(|p| ts_code.starts_with(p))
}
