use rusqlite::{Connection, Result, params};

use crate::model::ThsIndex;

/// Initializes the concept/industry index table, keyed on the index code.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ths_index (
            ts_code TEXT NOT NULL,
            name TEXT NOT NULL,
            count INTEGER,
            exchange TEXT,
            list_date TEXT,
            type TEXT
        );",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_ths_index_code ON ths_index (ts_code);",
        [],
    )?;
    Ok(())
}

pub fn upsert(conn: &mut Connection, indexes: &[ThsIndex]) -> Result<usize> {
    let transaction = conn.transaction()?;
    {
        let mut stmt = transaction.prepare(
            "REPLACE INTO ths_index (ts_code, name, count, exchange, list_date, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for index in indexes {
            stmt.execute(params![
                index.ts_code,
                index.name,
                index.count,
                index.exchange,
                index.list_date,
                index.index_type,
            ])?;
        }
    }
    transaction.commit()?;
    Ok(indexes.len())
}

/// Codes of all concept (type N) indexes, the member pipeline's unit list.
pub fn concept_codes(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT ts_code FROM ths_index WHERE type = 'N' ORDER BY ts_code")?;
    let mut rows = stmt.query([])?;
    let mut codes = Vec::new();
    while let Some(row) = rows.next()? {
        codes.push(row.get(0)?);
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(ts_code: &str, name: &str, index_type: &str) -> ThsIndex {
        ThsIndex {
            ts_code: ts_code.into(),
            name: name.into(),
            count: Some(30),
            exchange: Some("A".into()),
            list_date: None,
            index_type: Some(index_type.into()),
        }
    }

    #[test]
    fn upsert_keyed_on_code() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();

        upsert(&mut conn, &[index("885001.TI", "AI", "N")]).unwrap();
        upsert(&mut conn, &[index("885001.TI", "人工智能", "N")]).unwrap();

        let count: i64 = conn
            .query_row("SELECT count(*) FROM ths_index", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let name: String = conn
            .query_row("SELECT name FROM ths_index", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "人工智能");
    }

    #[test]
    fn concept_codes_filters_by_type() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        upsert(
            &mut conn,
            &[
                index("885001.TI", "AI", "N"),
                index("881101.TI", "Banking", "I"),
                index("885002.TI", "Robotics", "N"),
            ],
        )
        .unwrap();

        assert_eq!(concept_codes(&conn).unwrap(), vec!["885001.TI", "885002.TI"]);
    }
}
