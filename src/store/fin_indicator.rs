use rusqlite::{Connection, Result, params};

use crate::model::FinIndicator;

/// Initializes the financial-indicator table, keyed on code + report period +
/// announcement date so restatements of the same period coexist.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS fina_indicator (
            ts_code TEXT NOT NULL,
            ann_date TEXT,
            end_date TEXT NOT NULL,
            eps REAL,
            bps REAL,
            roe REAL,
            netprofit_yoy REAL,
            or_yoy REAL,
            grossprofit_margin REAL,
            netprofit_margin REAL,
            debt_to_assets REAL
        );",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_fina_indicator_code_period
         ON fina_indicator (ts_code, end_date, ann_date);",
        [],
    )?;
    Ok(())
}

pub fn upsert(conn: &mut Connection, indicators: &[FinIndicator]) -> Result<usize> {
    let transaction = conn.transaction()?;
    {
        let mut stmt = transaction.prepare(
            "REPLACE INTO fina_indicator (ts_code, ann_date, end_date, eps, bps, roe,
                netprofit_yoy, or_yoy, grossprofit_margin, netprofit_margin, debt_to_assets)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for indicator in indicators {
            stmt.execute(params![
                indicator.ts_code,
                indicator.ann_date,
                indicator.end_date,
                indicator.eps,
                indicator.bps,
                indicator.roe,
                indicator.netprofit_yoy,
                indicator.or_yoy,
                indicator.grossprofit_margin,
                indicator.netprofit_margin,
                indicator.debt_to_assets,
            ])?;
        }
    }
    transaction.commit()?;
    Ok(indicators.len())
}
