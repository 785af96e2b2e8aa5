use crate::config::ScanConfig;
use crate::models::ScannedEntry;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bigdecimal::{BigDecimal, Zero};
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("receipt scanning is not configured")]
    NotConfigured,

    #[error("no JSON array found in the scan response; try again or enter the items manually")]
    NoJsonArray,

    #[error("scan response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("scan item {index}: {reason}")]
    Schema { index: usize, reason: String },

    #[error("no items recognised on the receipt")]
    NoItems,

    #[error("scan service returned no completion")]
    EmptyCompletion,

    #[error("scan request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scan service responded with {status}: {body}")]
    Upstream { status: u16, body: String },
}

/// 取第一个 '[' 到最后一个 ']' 之间的片段
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// 解析 AI 返回文本, 任一条目结构不符即整批拒绝
pub fn parse_scan_response(text: &str) -> Result<Vec<ScannedEntry>, ScanError> {
    let raw = extract_json_array(text).ok_or(ScanError::NoJsonArray)?;
    let value: Value = serde_json::from_str(raw).map_err(|e| ScanError::InvalidJson(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(ScanError::NoJsonArray);
    };
    if items.is_empty() {
        return Err(ScanError::NoItems);
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_item(index, item))
        .collect()
}

fn parse_item(index: usize, item: &Value) -> Result<ScannedEntry, ScanError> {
    let schema = |reason: &str| ScanError::Schema {
        index,
        reason: reason.to_string(),
    };

    let Value::Object(fields) = item else {
        return Err(schema("expected an object"));
    };

    let raw_name = match fields.get("product_name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Value::String(_)) => return Err(schema("product_name is empty")),
        _ => return Err(schema("product_name must be a string")),
    };

    let quantity = number_field(fields.get("quantity")).ok_or_else(|| schema("quantity must be a number"))?;
    if quantity <= BigDecimal::zero() {
        return Err(schema("quantity must be positive"));
    }

    let unit_price = number_field(fields.get("price")).ok_or_else(|| schema("price must be a number"))?;
    if unit_price < BigDecimal::zero() {
        return Err(schema("price must not be negative"));
    }

    Ok(ScannedEntry {
        raw_name,
        quantity,
        unit_price,
    })
}

fn number_field(value: Option<&Value>) -> Option<BigDecimal> {
    match value {
        Some(Value::Number(n)) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// AI 小票识别客户端 (OpenAI 兼容 chat-completions 接口)
#[derive(Debug, Clone)]
pub struct AiReceiptScanner {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl AiReceiptScanner {
    /// 未配置 api_key 时返回 None
    pub fn from_config(config: &ScanConfig) -> Result<Option<Self>, ScanError> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Some(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        }))
    }

    /// 识别一张进货单图片, 附带已知商品名作为提示
    pub async fn scan(
        &self,
        image: &[u8],
        mime_type: &str,
        known_names: &[String],
    ) -> Result<Vec<ScannedEntry>, ScanError> {
        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(image));
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt(known_names) },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        });

        tracing::info!("开始识别进货单: {} 字节, {} 个已知商品", image.len(), known_names.len());
        let started = std::time::Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("✗ 识别服务返回 {}, 耗时: {:?}", status, started.elapsed());
            return Err(ScanError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or(ScanError::EmptyCompletion)?;

        let entries = parse_scan_response(content)?;
        tracing::info!("✓ 识别完成: {} 条, 耗时: {:?}", entries.len(), started.elapsed());
        Ok(entries)
    }
}

fn prompt(known_names: &[String]) -> String {
    let mut text = String::from(
        "Read this delivery note or receipt. Return a JSON array where every element is \
         {\"product_name\": string, \"quantity\": number, \"price\": number}. \
         price is the price per unit excluding tax. Return only the JSON array.",
    );
    if !known_names.is_empty() {
        text.push_str("\nUse these product names when an item clearly matches one: ");
        text.push_str(&known_names.join(", "));
    }
    text
}
