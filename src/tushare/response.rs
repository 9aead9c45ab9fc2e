use serde::Deserialize;
use serde_json::Value;

/// Envelope every Tushare endpoint answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    pub msg: Option<String>,
    pub data: Option<ResultSet>,
}

/// Column-oriented payload: field names once, then one value array per row.
#[derive(Debug, Deserialize)]
pub struct ResultSet {
    pub fields: Vec<String>,
    pub items: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

pub fn str_value(row: &[Value], idx: usize) -> Option<&str> {
    row.get(idx).and_then(Value::as_str)
}

pub fn f64_value(row: &[Value], idx: usize) -> Option<f64> {
    row.get(idx).and_then(Value::as_f64)
}

pub fn i64_value(row: &[Value], idx: usize) -> Option<i64> {
    row.get(idx).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_daily_payload() {
        let raw = r#"{
            "code": 0,
            "msg": null,
            "data": {
                "fields": ["ts_code", "trade_date", "close", "vol"],
                "items": [
                    ["000001.SZ", "20240102", 9.31, 1234567.0],
                    ["600000.SH", "20240102", 7.02, null]
                ]
            }
        }"#;
        let resp: ApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.code, 0);

        let data = resp.data.unwrap();
        assert_eq!(data.field_index("close"), Some(2));
        assert_eq!(data.field_index("open"), None);
        assert_eq!(data.items.len(), 2);

        let row = &data.items[0];
        assert_eq!(str_value(row, 0), Some("000001.SZ"));
        assert_eq!(f64_value(row, 2), Some(9.31));
        assert_eq!(f64_value(&data.items[1], 3), None);
    }

    #[test]
    fn parses_error_payload_without_data() {
        let raw = r#"{"code": 2002, "msg": "permission denied", "data": null}"#;
        let resp: ApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.code, 2002);
        assert_eq!(resp.msg.as_deref(), Some("permission denied"));
        assert!(resp.data.is_none());
    }
}
