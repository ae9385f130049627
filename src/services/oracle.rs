use crate::config::OracleConfig;
use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ViewRequest {
    function: String,
    type_arguments: Vec<String>,
    arguments: Vec<String>,
}

/// Supra 价格预言机客户端，通过 RPC view 接口读取喂价
#[derive(Clone)]
pub struct SupraOracleClient {
    client: reqwest::Client,
    config: OracleConfig,
}

impl SupraOracleClient {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, config })
    }

    /// 基础币的美元价格
    pub async fn base_price_usd(&self) -> Result<Decimal> {
        self.get_price(self.config.pair_id).await
    }

    pub async fn get_price(&self, pair_id: u64) -> Result<Decimal> {
        let response = self
            .call_view(
                "get_price",
                Vec::new(),
                vec![pair_id.to_string()],
            )
            .await?;

        let price = parse_price_result(&response)?;
        debug!("预言机价格 pair {}: {}", pair_id, price);
        Ok(price)
    }

    async fn call_view(
        &self,
        function_name: &str,
        type_arguments: Vec<String>,
        arguments: Vec<String>,
    ) -> Result<Value> {
        let request = ViewRequest {
            function: format!(
                "{}::{}::{}",
                self.config.module_address, self.config.module_name, function_name
            ),
            type_arguments,
            arguments,
        };

        let url = format!("{}/view", self.config.rpc_url.trim_end_matches('/'));
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("预言机请求失败 {}: {}", status, body);
            return Err(anyhow!("预言机请求失败: {}", status));
        }

        Ok(response.json().await?)
    }
}

/// 解析 `{"result": [raw_price, decimals, ...]}`，价格 = raw / 10^decimals
pub fn parse_price_result(response: &Value) -> Result<Decimal> {
    let result = response
        .get("result")
        .and_then(Value::as_array)
        .filter(|items| items.len() >= 2)
        .ok_or_else(|| anyhow!("预言机返回结构异常: {}", response))?;

    let raw: i128 = value_as_string(&result[0])
        .parse()
        .map_err(|e| anyhow!("原始价格解析失败: {}", e))?;
    let decimals: u32 = value_as_string(&result[1])
        .parse()
        .map_err(|e| anyhow!("价格精度解析失败: {}", e))?;

    if decimals > 28 {
        return Err(anyhow!("价格精度超出范围: {}", decimals));
    }

    Decimal::try_from_i128_with_scale(raw, decimals).map_err(|e| anyhow!("价格超出范围: {}", e))
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_string_result() {
        let response = json!({ "result": ["123456789", "8", "1700000000", "42"] });
        assert_eq!(parse_price_result(&response).unwrap(), dec!(1.23456789));
    }

    #[test]
    fn test_parse_numeric_result() {
        let response = json!({ "result": [4250, 3] });
        assert_eq!(parse_price_result(&response).unwrap(), dec!(4.25));
    }

    #[test]
    fn test_parse_rejects_short_result() {
        assert!(parse_price_result(&json!({ "result": ["1"] })).is_err());
        assert!(parse_price_result(&json!({ "error": "not found" })).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(parse_price_result(&json!({ "result": ["abc", "8"] })).is_err());
        assert!(parse_price_result(&json!({ "result": ["1", "40"] })).is_err());
    }
}
