use rand::seq::SliceRandom;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::bundle::SignedBundle;
use crate::config::TransactionEncoding;

use super::LanderReceipt;
use super::error::LanderError;

const JSONRPC_VERSION: &str = "2.0";
pub(crate) const MAX_BUNDLE_TRANSACTIONS: usize = 5;

/// 通过 block engine 的 `sendBundle` 提交，端点随机排序，首个成功即返回。
#[derive(Clone)]
pub struct JitoLander {
    endpoints: Vec<Url>,
    client: Client,
}

impl JitoLander {
    pub fn new(endpoints: &[String], client: Client) -> Self {
        let endpoints = endpoints
            .iter()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .filter_map(|raw| match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(
                        target: "lander::jito",
                        endpoint = raw,
                        error = %err,
                        "忽略无效的 jito endpoint"
                    );
                    None
                }
            })
            .collect();
        Self { endpoints, client }
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub async fn submit(&self, bundle: &SignedBundle) -> Result<LanderReceipt, LanderError> {
        if bundle.is_empty() {
            return Err(LanderError::fatal("bundle 中没有交易"));
        }
        if bundle.transactions.len() > MAX_BUNDLE_TRANSACTIONS {
            return Err(LanderError::fatal(format!(
                "bundle 含 {} 笔交易，超过上限 {MAX_BUNDLE_TRANSACTIONS}",
                bundle.transactions.len()
            )));
        }
        if self.endpoints.is_empty() {
            return Err(LanderError::fatal("未配置可用的 jito endpoint"));
        }

        let payload = build_jsonrpc_payload(&bundle.transactions, bundle.encoding);
        let mut order: Vec<&Url> = self.endpoints.iter().collect();
        order.shuffle(&mut rand::rng());

        let mut last_error = None;
        for endpoint in order {
            match self.send_once(endpoint, &payload).await {
                Ok(bundle_id) => {
                    debug!(
                        target: "lander::jito",
                        endpoint = %endpoint,
                        bundle_id = %bundle_id,
                        "sendBundle 成功"
                    );
                    return Ok(LanderReceipt {
                        lander: "jito",
                        endpoint: endpoint.to_string(),
                        ids: vec![bundle_id],
                    });
                }
                Err(err) => {
                    warn!(
                        target: "lander::jito",
                        endpoint = %endpoint,
                        error = %err,
                        "sendBundle 失败，尝试下一个 endpoint"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| LanderError::fatal("all jito endpoints failed submission")))
    }

    async fn send_once(&self, endpoint: &Url, payload: &Value) -> Result<String, LanderError> {
        let response = self
            .client
            .post(endpoint.clone())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LanderError::fatal(format!("HTTP {status}")));
        }

        let value: Value = response.json().await?;
        parse_bundle_id(&value)
    }
}

pub(crate) fn build_jsonrpc_payload(txs: &[String], encoding: TransactionEncoding) -> Value {
    let bundle = Value::Array(txs.iter().cloned().map(Value::String).collect());
    let mut params = vec![bundle];
    if encoding == TransactionEncoding::Base64 {
        params.push(json!({ "encoding": "base64" }));
    }
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": 1,
        "method": "sendBundle",
        "params": params,
    })
}

fn parse_bundle_id(value: &Value) -> Result<String, LanderError> {
    if let Some(error) = value.get("error") {
        return Err(LanderError::fatal(format!("block engine 拒绝: {error}")));
    }
    value
        .get("result")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LanderError::fatal("sendBundle 响应缺少 result"))
}
