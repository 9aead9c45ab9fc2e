use std::env;

use serde_json::{Value, json};

use super::response::{self, ApiResponse, ResultSet};
use crate::http::client::{self, RequestError};
use crate::model::{
    Bar, FetchError, FetchOutcome, FinIndicator, StockBasic, ThsIndex, ThsMember, TradeDate,
};

// Base URL for the Tushare data API.
const BASE_URL: &str = "http://api.tushare.pro";

const BAR_FIELDS: &str = "ts_code,trade_date,open,high,low,close,pre_close,change,pct_chg,vol,amount";

// Provider code for insufficient credits/permission. Anything else is judged
// by message keywords as a last resort.
const CODE_PERMISSION_DENIED: i64 = 2002;

/// Maps a non-zero provider status to the retry taxonomy. Permission and
/// credit rejections are terminal; per-minute quota hits resolve themselves
/// and stay retryable.
fn classify_provider_error(code: i64, msg: &str) -> FetchError {
    if code == CODE_PERMISSION_DENIED {
        return FetchError::Rejected(format!("code {}: {}", code, msg));
    }
    let lowered = msg.to_lowercase();
    if msg.contains("权限") || msg.contains("积分") || lowered.contains("permission") {
        FetchError::Rejected(format!("code {}: {}", code, msg))
    } else {
        FetchError::Transient(format!("code {}: {}", code, msg))
    }
}

// One POST to the provider. Returns the result set, or None when the provider
// answered without a data section.
async fn call(api_name: &str, params: Value, fields: &str) -> Result<Option<ResultSet>, FetchError> {
    let token = env::var("tushare_token").map_err(|_| RequestError::TokenNotSet)?;

    let body = json!({
        "api_name": api_name,
        "token": token,
        "params": params,
        "fields": fields,
    });

    let resp: ApiResponse = client::post_json(BASE_URL, &body).await?;
    if resp.code != 0 {
        return Err(classify_provider_error(
            resp.code,
            resp.msg.as_deref().unwrap_or("unknown provider error"),
        ));
    }
    Ok(resp.data)
}

fn field(data: &ResultSet, name: &str) -> Result<usize, FetchError> {
    data.field_index(name)
        .ok_or_else(|| FetchError::Transient(format!("response missing field '{}'", name)))
}

fn required_str<'a>(row: &'a [Value], idx: usize, name: &str) -> Result<&'a str, FetchError> {
    response::str_value(row, idx)
        .ok_or_else(|| FetchError::Transient(format!("row missing value for '{}'", name)))
}

fn parse_trade_date(s: &str) -> Result<TradeDate, FetchError> {
    TradeDate::parse_compact(s)
        .map_err(|e| FetchError::Transient(format!("bad trade date '{}': {}", s, e)))
}

fn optional_trade_date(row: &[Value], idx: usize) -> Option<TradeDate> {
    response::str_value(row, idx).and_then(|s| TradeDate::parse_compact(s).ok())
}

fn parse_bars(data: Option<ResultSet>) -> Result<FetchOutcome<Bar>, FetchError> {
    let Some(data) = data else {
        return Ok(FetchOutcome::Empty);
    };
    if data.items.is_empty() {
        return Ok(FetchOutcome::Empty);
    }

    let i_code = field(&data, "ts_code")?;
    let i_date = field(&data, "trade_date")?;
    let i_open = field(&data, "open")?;
    let i_high = field(&data, "high")?;
    let i_low = field(&data, "low")?;
    let i_close = field(&data, "close")?;
    let i_pre_close = field(&data, "pre_close")?;
    let i_change = field(&data, "change")?;
    let i_pct_chg = field(&data, "pct_chg")?;
    let i_vol = field(&data, "vol")?;
    let i_amount = field(&data, "amount")?;

    let mut bars = Vec::with_capacity(data.items.len());
    for row in &data.items {
        let ts_code = required_str(row, i_code, "ts_code")?.to_string();
        let trade_date = parse_trade_date(required_str(row, i_date, "trade_date")?)?;
        bars.push(Bar {
            ts_code,
            trade_date,
            open: response::f64_value(row, i_open),
            high: response::f64_value(row, i_high),
            low: response::f64_value(row, i_low),
            close: response::f64_value(row, i_close),
            pre_close: response::f64_value(row, i_pre_close),
            change: response::f64_value(row, i_change),
            pct_chg: response::f64_value(row, i_pct_chg),
            vol: response::f64_value(row, i_vol),
            amount: response::f64_value(row, i_amount),
        });
    }
    Ok(FetchOutcome::Rows(bars))
}

/// Fetches the whole market's daily bars for one trading day.
pub async fn daily_by_date(trade_date: &str) -> Result<FetchOutcome<Bar>, FetchError> {
    let data = call("daily", json!({ "trade_date": trade_date }), BAR_FIELDS).await?;
    parse_bars(data)
}

/// Fetches one stock's daily bar for one trading day.
pub async fn daily_for_code(ts_code: &str, trade_date: &str) -> Result<FetchOutcome<Bar>, FetchError> {
    let data = call(
        "daily",
        json!({ "ts_code": ts_code, "trade_date": trade_date }),
        BAR_FIELDS,
    )
    .await?;
    parse_bars(data)
}

/// Fetches one stock's daily bars over a date range.
pub async fn daily_by_code(
    ts_code: &str,
    start_date: &str,
    end_date: &str,
) -> Result<FetchOutcome<Bar>, FetchError> {
    let data = call(
        "daily",
        json!({ "ts_code": ts_code, "start_date": start_date, "end_date": end_date }),
        BAR_FIELDS,
    )
    .await?;
    parse_bars(data)
}

/// Fetches one index's daily bars over a date range.
pub async fn index_daily(
    ts_code: &str,
    start_date: &str,
    end_date: &str,
) -> Result<FetchOutcome<Bar>, FetchError> {
    let data = call(
        "index_daily",
        json!({ "ts_code": ts_code, "start_date": start_date, "end_date": end_date }),
        BAR_FIELDS,
    )
    .await?;
    parse_bars(data)
}

/// Fetches one index's weekly bars over a date range.
pub async fn index_weekly(
    ts_code: &str,
    start_date: &str,
    end_date: &str,
) -> Result<FetchOutcome<Bar>, FetchError> {
    let data = call(
        "index_weekly",
        json!({ "ts_code": ts_code, "start_date": start_date, "end_date": end_date }),
        BAR_FIELDS,
    )
    .await?;
    parse_bars(data)
}

/// Fetches every ETF's daily bars for one trading day.
pub async fn fund_daily_by_date(trade_date: &str) -> Result<FetchOutcome<Bar>, FetchError> {
    let data = call("fund_daily", json!({ "trade_date": trade_date }), BAR_FIELDS).await?;
    parse_bars(data)
}

/// Fetches concept/industry index definitions, optionally for one index type
/// (N concept, I industry, R region, S/ST/TH/BB special families).
pub async fn ths_index(index_type: Option<&str>) -> Result<FetchOutcome<ThsIndex>, FetchError> {
    let params = match index_type {
        Some(t) => json!({ "exchange": "A", "type": t }),
        None => json!({ "exchange": "A" }),
    };
    let data = call("ths_index", params, "ts_code,name,count,exchange,list_date,type").await?;

    let Some(data) = data else {
        return Ok(FetchOutcome::Empty);
    };
    if data.items.is_empty() {
        return Ok(FetchOutcome::Empty);
    }

    let i_code = field(&data, "ts_code")?;
    let i_name = field(&data, "name")?;
    let i_count = field(&data, "count")?;
    let i_exchange = field(&data, "exchange")?;
    let i_list_date = field(&data, "list_date")?;
    let i_type = field(&data, "type")?;

    let mut indexes = Vec::with_capacity(data.items.len());
    for row in &data.items {
        indexes.push(ThsIndex {
            ts_code: required_str(row, i_code, "ts_code")?.to_string(),
            name: required_str(row, i_name, "name")?.to_string(),
            count: response::i64_value(row, i_count),
            exchange: response::str_value(row, i_exchange).map(str::to_string),
            list_date: optional_trade_date(row, i_list_date),
            index_type: response::str_value(row, i_type).map(str::to_string),
        });
    }
    Ok(FetchOutcome::Rows(indexes))
}

/// Fetches the member stocks of one concept index.
pub async fn ths_member(ts_code: &str) -> Result<FetchOutcome<ThsMember>, FetchError> {
    let data = call(
        "ths_member",
        json!({ "ts_code": ts_code }),
        "ts_code,con_code,con_name,weight,in_date,out_date,is_new",
    )
    .await?;

    let Some(data) = data else {
        return Ok(FetchOutcome::Empty);
    };
    if data.items.is_empty() {
        return Ok(FetchOutcome::Empty);
    }

    let i_code = field(&data, "ts_code")?;
    let i_con_code = field(&data, "con_code")?;
    let i_con_name = field(&data, "con_name")?;
    let i_weight = field(&data, "weight")?;
    let i_in_date = field(&data, "in_date")?;
    let i_out_date = field(&data, "out_date")?;
    let i_is_new = field(&data, "is_new")?;

    let mut members = Vec::with_capacity(data.items.len());
    for row in &data.items {
        members.push(ThsMember {
            ts_code: required_str(row, i_code, "ts_code")?.to_string(),
            con_code: required_str(row, i_con_code, "con_code")?.to_string(),
            con_name: response::str_value(row, i_con_name).map(str::to_string),
            weight: response::f64_value(row, i_weight),
            in_date: optional_trade_date(row, i_in_date),
            out_date: optional_trade_date(row, i_out_date),
            is_new: response::str_value(row, i_is_new).map(str::to_string),
        });
    }
    Ok(FetchOutcome::Rows(members))
}

/// Fetches one stock's financial indicators over an announcement date range.
pub async fn fina_indicator(
    ts_code: &str,
    start_date: &str,
    end_date: &str,
) -> Result<FetchOutcome<FinIndicator>, FetchError> {
    let data = call(
        "fina_indicator",
        json!({ "ts_code": ts_code, "start_date": start_date, "end_date": end_date }),
        "ts_code,ann_date,end_date,eps,bps,roe,netprofit_yoy,or_yoy,grossprofit_margin,netprofit_margin,debt_to_assets",
    )
    .await?;

    let Some(data) = data else {
        return Ok(FetchOutcome::Empty);
    };
    if data.items.is_empty() {
        return Ok(FetchOutcome::Empty);
    }

    let i_code = field(&data, "ts_code")?;
    let i_ann_date = field(&data, "ann_date")?;
    let i_end_date = field(&data, "end_date")?;
    let i_eps = field(&data, "eps")?;
    let i_bps = field(&data, "bps")?;
    let i_roe = field(&data, "roe")?;
    let i_netprofit_yoy = field(&data, "netprofit_yoy")?;
    let i_or_yoy = field(&data, "or_yoy")?;
    let i_grossprofit_margin = field(&data, "grossprofit_margin")?;
    let i_netprofit_margin = field(&data, "netprofit_margin")?;
    let i_debt_to_assets = field(&data, "debt_to_assets")?;

    let mut indicators = Vec::with_capacity(data.items.len());
    for row in &data.items {
        let end_date = parse_trade_date(required_str(row, i_end_date, "end_date")?)?;
        indicators.push(FinIndicator {
            ts_code: required_str(row, i_code, "ts_code")?.to_string(),
            ann_date: optional_trade_date(row, i_ann_date),
            end_date,
            eps: response::f64_value(row, i_eps),
            bps: response::f64_value(row, i_bps),
            roe: response::f64_value(row, i_roe),
            netprofit_yoy: response::f64_value(row, i_netprofit_yoy),
            or_yoy: response::f64_value(row, i_or_yoy),
            grossprofit_margin: response::f64_value(row, i_grossprofit_margin),
            netprofit_margin: response::f64_value(row, i_netprofit_margin),
            debt_to_assets: response::f64_value(row, i_debt_to_assets),
        });
    }
    Ok(FetchOutcome::Rows(indicators))
}

/// Fetches listed-stock master data.
pub async fn stock_basic() -> Result<FetchOutcome<StockBasic>, FetchError> {
    let data = call(
        "stock_basic",
        json!({ "list_status": "L" }),
        "ts_code,symbol,name,area,industry,market,list_date,list_status",
    )
    .await?;

    let Some(data) = data else {
        return Ok(FetchOutcome::Empty);
    };
    if data.items.is_empty() {
        return Ok(FetchOutcome::Empty);
    }

    let i_code = field(&data, "ts_code")?;
    let i_symbol = field(&data, "symbol")?;
    let i_name = field(&data, "name")?;
    let i_area = field(&data, "area")?;
    let i_industry = field(&data, "industry")?;
    let i_market = field(&data, "market")?;
    let i_list_date = field(&data, "list_date")?;
    let i_list_status = field(&data, "list_status")?;

    let mut stocks = Vec::with_capacity(data.items.len());
    for row in &data.items {
        stocks.push(StockBasic {
            ts_code: required_str(row, i_code, "ts_code")?.to_string(),
            symbol: response::str_value(row, i_symbol).map(str::to_string),
            name: required_str(row, i_name, "name")?.to_string(),
            area: response::str_value(row, i_area).map(str::to_string),
            industry: response::str_value(row, i_industry).map(str::to_string),
            market: response::str_value(row, i_market).map(str::to_string),
            list_date: optional_trade_date(row, i_list_date),
            list_status: response::str_value(row, i_list_status).map(str::to_string),
        });
    }
    Ok(FetchOutcome::Rows(stocks))
}

/// Fetches the open trading days between two dates, ascending.
pub async fn trade_cal(start_date: &str, end_date: &str) -> Result<Vec<String>, FetchError> {
    let data = call(
        "trade_cal",
        json!({
            "exchange": "SSE",
            "is_open": "1",
            "start_date": start_date,
            "end_date": end_date,
        }),
        "cal_date",
    )
    .await?;

    let Some(data) = data else {
        return Ok(Vec::new());
    };

    let i_date = field(&data, "cal_date")?;
    let mut days = Vec::with_capacity(data.items.len());
    for row in &data.items {
        days.push(required_str(row, i_date, "cal_date")?.to_string());
    }
    // The provider does not guarantee ordering across pagination; batching by
    // contiguous days relies on it.
    days.sort();
    Ok(days)
}
