use rusqlite::{Connection, Result, params};

use crate::model::Bar;

/// The four bar tables share one schema; only the target differs per sync
/// kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarTable {
    Daily,
    IndexDaily,
    IndexWeekly,
    EtfDaily,
}

impl BarTable {
    pub fn name(&self) -> &'static str {
        match self {
            BarTable::Daily => "daily_data",
            BarTable::IndexDaily => "index_daily",
            BarTable::IndexWeekly => "index_weekly",
            BarTable::EtfDaily => "etf_daily",
        }
    }
}

/// Initializes a bar table keyed on (ts_code, trade_date).
pub fn create_table(conn: &Connection, table: BarTable) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                ts_code TEXT NOT NULL,
                trade_date TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                pre_close REAL,
                change_amount REAL,
                change_pct REAL,
                vol REAL,
                amount REAL
            );",
            table.name()
        ),
        [],
    )?;
    conn.execute(
        &format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_{0}_code_date ON {0} (ts_code, trade_date);",
            table.name()
        ),
        [],
    )?;
    Ok(())
}

/// Writes a merged batch of bars in one transaction. REPLACE keyed on the
/// unique index keeps re-runs idempotent; any row error rolls the whole batch
/// back so the caller can treat it as not durable.
pub fn upsert(conn: &mut Connection, table: BarTable, bars: &[Bar]) -> Result<usize> {
    let transaction = conn.transaction()?;
    {
        let mut stmt = transaction.prepare(&format!(
            "REPLACE INTO {} (ts_code, trade_date, open, high, low, close, pre_close,
                change_amount, change_pct, vol, amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            table.name()
        ))?;
        for bar in bars {
            stmt.execute(params![
                bar.ts_code,
                bar.trade_date,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.pre_close,
                bar.change,
                bar.pct_chg,
                bar.vol,
                bar.amount,
            ])?;
        }
    }
    transaction.commit()?;
    Ok(bars.len())
}

/// Retrieves all bars for one code, oldest first.
pub fn get_bars(conn: &Connection, table: BarTable, ts_code: &str) -> Result<Vec<Bar>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT ts_code, trade_date, open, high, low, close, pre_close,
            change_amount, change_pct, vol, amount
         FROM {} WHERE ts_code = ?1 ORDER BY trade_date",
        table.name()
    ))?;
    let mut rows = stmt.query(params![ts_code])?;
    let mut bars = Vec::new();
    while let Some(row) = rows.next()? {
        bars.push(Bar {
            ts_code: row.get(0)?,
            trade_date: row.get(1)?,
            open: row.get(2)?,
            high: row.get(3)?,
            low: row.get(4)?,
            close: row.get(5)?,
            pre_close: row.get(6)?,
            change: row.get(7)?,
            pct_chg: row.get(8)?,
            vol: row.get(9)?,
            amount: row.get(10)?,
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TradeDate;

    fn bar(ts_code: &str, date: &str, close: f64) -> Bar {
        Bar {
            ts_code: ts_code.into(),
            trade_date: TradeDate::parse_compact(date).unwrap(),
            open: Some(close - 0.1),
            high: Some(close + 0.2),
            low: Some(close - 0.3),
            close: Some(close),
            pre_close: Some(close - 0.05),
            change: Some(0.05),
            pct_chg: Some(0.5),
            vol: Some(10_000.0),
            amount: None,
        }
    }

    #[test]
    fn upsert_is_idempotent_on_rerun() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn, BarTable::Daily).unwrap();

        let bars = vec![bar("000001.SZ", "20240102", 9.31), bar("000001.SZ", "20240103", 9.40)];
        assert_eq!(upsert(&mut conn, BarTable::Daily, &bars).unwrap(), 2);
        assert_eq!(upsert(&mut conn, BarTable::Daily, &bars).unwrap(), 2);

        let stored = get_bars(&conn, BarTable::Daily, "000001.SZ").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored, bars);
    }

    #[test]
    fn upsert_replaces_value_columns_for_existing_key() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn, BarTable::Daily).unwrap();

        upsert(&mut conn, BarTable::Daily, &[bar("000001.SZ", "20240102", 9.31)]).unwrap();
        upsert(&mut conn, BarTable::Daily, &[bar("000001.SZ", "20240102", 9.55)]).unwrap();

        let stored = get_bars(&conn, BarTable::Daily, "000001.SZ").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].close, Some(9.55));
    }

    #[test]
    fn dates_are_stored_in_iso_form() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn, BarTable::Daily).unwrap();
        upsert(&mut conn, BarTable::Daily, &[bar("000001.SZ", "20240102", 9.31)]).unwrap();

        let raw: String = conn
            .query_row("SELECT trade_date FROM daily_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, "2024-01-02");
    }

    #[test]
    fn tables_are_independent() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn, BarTable::Daily).unwrap();
        create_table(&conn, BarTable::IndexDaily).unwrap();

        upsert(&mut conn, BarTable::IndexDaily, &[bar("000300.SH", "20240102", 3400.0)]).unwrap();

        assert!(get_bars(&conn, BarTable::Daily, "000300.SH").unwrap().is_empty());
        assert_eq!(get_bars(&conn, BarTable::IndexDaily, "000300.SH").unwrap().len(), 1);
    }
}
