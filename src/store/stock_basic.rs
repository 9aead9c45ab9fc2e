use rusqlite::{Connection, Result, params};

use crate::model::StockBasic;

/// Initializes the stock master table, keyed on the stock code.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stock_basic (
            ts_code TEXT NOT NULL,
            symbol TEXT,
            name TEXT NOT NULL,
            area TEXT,
            industry TEXT,
            market TEXT,
            list_date TEXT,
            list_status TEXT
        );",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_stock_basic_code ON stock_basic (ts_code);",
        [],
    )?;
    Ok(())
}

pub fn upsert(conn: &mut Connection, stocks: &[StockBasic]) -> Result<usize> {
    let transaction = conn.transaction()?;
    {
        let mut stmt = transaction.prepare(
            "REPLACE INTO stock_basic (ts_code, symbol, name, area, industry, market, list_date, list_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for stock in stocks {
            stmt.execute(params![
                stock.ts_code,
                stock.symbol,
                stock.name,
                stock.area,
                stock.industry,
                stock.market,
                stock.list_date,
                stock.list_status,
            ])?;
        }
    }
    transaction.commit()?;
    Ok(stocks.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_overwrites_renamed_stock() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();

        let mut stock = StockBasic {
            ts_code: "000001.SZ".into(),
            symbol: Some("000001".into()),
            name: "平安银行".into(),
            area: Some("深圳".into()),
            industry: Some("银行".into()),
            market: Some("主板".into()),
            list_date: None,
            list_status: Some("L".into()),
        };
        upsert(&mut conn, std::slice::from_ref(&stock)).unwrap();

        stock.name = "平安银行A".into();
        upsert(&mut conn, std::slice::from_ref(&stock)).unwrap();

        let (count, name): (i64, String) = conn
            .query_row("SELECT count(*), max(name) FROM stock_basic", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(name, "平安银行A");
    }
}
