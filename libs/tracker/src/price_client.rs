use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;

/// Upper bound for every upstream request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Spot price provider keyed by a concatenated symbol such as `BTCUSDT`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, symbol: &str) -> Result<f64, FetchError>;
}

/// Network fee provider returning three tiers from one call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_tiers(&self) -> Result<GasTiers, FetchError>;
}

/// Gas price tiers in Gwei.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasTiers {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

fn http_client() -> Result<Client, FetchError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

async fn get_body(request: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let res = request.send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(res.text().await?)
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, FetchError> {
    raw.trim().parse().map_err(|_| FetchError::NotANumber {
        field,
        raw: raw.to_string(),
    })
}

#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_api: String,
}

impl BinanceClient {
    pub fn new(base_api: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client()?,
            base_api: base_api.into(),
        })
    }

    fn ticker_url(&self) -> String {
        format!(
            "{}/api/v3/ticker/price",
            self.base_api.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn price(&self, symbol: &str) -> Result<f64, FetchError> {
        debug!(symbol, "requesting ticker price");
        let body = get_body(
            self.client
                .get(self.ticker_url())
                .query(&[("symbol", symbol.to_uppercase())]),
        )
        .await?;
        parse_ticker(&body)
    }
}

//
// Match Binance ticker JSON
// https://developers.binance.com/docs/binance-spot-api-docs/rest-api/market-data-endpoints
//
#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: Option<String>,
}

/// Extract the price from a ticker payload. A missing `price` field is an
/// error, never a zero price.
pub fn parse_ticker(body: &str) -> Result<f64, FetchError> {
    let ticker: TickerPrice = serde_json::from_str(body)?;
    let raw = ticker.price.ok_or(FetchError::MissingField("price"))?;
    parse_number("price", &raw)
}

#[derive(Clone)]
pub struct EtherscanClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl EtherscanClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client()?,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl GasOracle for EtherscanClient {
    async fn gas_tiers(&self) -> Result<GasTiers, FetchError> {
        debug!("requesting gas oracle");
        let body = get_body(self.client.get(&self.api_url).query(&[
            ("chainid", "1"),
            ("module", "gastracker"),
            ("action", "gasoracle"),
            ("apikey", self.api_key.as_str()),
        ]))
        .await?;
        parse_gas_oracle(&body)
    }
}

//
// Match Etherscan gas oracle JSON
// https://docs.etherscan.io/api-endpoints/gas-tracker
//
#[derive(Debug, Deserialize)]
struct GasOracleResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GasOracleResult {
    #[serde(rename = "SafeGasPrice")]
    safe: Option<String>,

    #[serde(rename = "ProposeGasPrice")]
    propose: Option<String>,

    #[serde(rename = "FastGasPrice")]
    fast: Option<String>,
}

pub fn parse_gas_oracle(body: &str) -> Result<GasTiers, FetchError> {
    let res: GasOracleResponse = serde_json::from_str(body)?;
    if res.status != "1" {
        let detail = match res.result {
            serde_json::Value::String(s) => s,
            _ => res.message.unwrap_or_else(|| format!("status {}", res.status)),
        };
        return Err(FetchError::Upstream(detail));
    }

    let result: GasOracleResult = serde_json::from_value(res.result)?;
    let tier = |field: &'static str, raw: Option<String>| -> Result<f64, FetchError> {
        let raw = raw.ok_or(FetchError::MissingField(field))?;
        parse_number(field, &raw)
    };

    Ok(GasTiers {
        low: tier("SafeGasPrice", result.safe)?,
        medium: tier("ProposeGasPrice", result.propose)?,
        high: tier("FastGasPrice", result.fast)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_price_is_parsed() {
        let price = parse_ticker(r#"{"symbol":"BTCUSDT","price":"65000.01000000"}"#).unwrap();
        assert_eq!(price, 65_000.01);
    }

    #[test]
    fn ticker_without_price_is_an_error() {
        let err = parse_ticker(r#"{"code":-1121,"msg":"Invalid symbol."}"#).unwrap_err();
        assert!(matches!(err, FetchError::MissingField("price")));
    }

    #[test]
    fn ticker_garbage_is_malformed() {
        assert!(matches!(
            parse_ticker("<html>busy</html>"),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse_ticker(r#"{"price":"abc"}"#),
            Err(FetchError::NotANumber { field: "price", .. })
        ));
    }

    #[test]
    fn gas_oracle_tiers_are_parsed() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": {
                "LastBlock": "21000000",
                "SafeGasPrice": "8.5",
                "ProposeGasPrice": "9",
                "FastGasPrice": "11.25",
                "suggestBaseFee": "8.1"
            }
        }"#;
        let tiers = parse_gas_oracle(body).unwrap();
        assert_eq!(
            tiers,
            GasTiers {
                low: 8.5,
                medium: 9.0,
                high: 11.25
            }
        );
    }

    #[test]
    fn gas_oracle_error_status_is_reported() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        match parse_gas_oracle(body) {
            Err(FetchError::Upstream(detail)) => assert_eq!(detail, "Invalid API Key"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn gas_oracle_missing_tier_is_an_error() {
        let body = r#"{"status":"1","result":{"SafeGasPrice":"1","FastGasPrice":"3"}}"#;
        assert!(matches!(
            parse_gas_oracle(body),
            Err(FetchError::MissingField("ProposeGasPrice"))
        ));
    }
}
