use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::UnsignedBundle;
use super::error::BundleError;
use crate::config::{BuilderConfig, TransactionEncoding};

const API_KEY_HEADER: &str = "x-api-key";

/// 未签名交易的来源，生产环境为远程 builder 服务。
#[async_trait]
pub trait BundleSource: Send + Sync {
    async fn build(&self, route: &str, request: &Value) -> Result<Vec<UnsignedBundle>, BundleError>;
}

#[derive(Clone)]
pub struct HttpBundleBuilder {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    encoding: TransactionEncoding,
}

impl HttpBundleBuilder {
    pub fn new(config: &BuilderConfig, encoding: TransactionEncoding) -> Result<Self, BundleError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|err| BundleError::fatal(format!("builder.base_url 无效: {err}")))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: config
                .api_key
                .as_ref()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            encoding,
        })
    }

    pub fn endpoint(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl BundleSource for HttpBundleBuilder {
    async fn build(
        &self,
        route: &str,
        request: &Value,
    ) -> Result<Vec<UnsignedBundle>, BundleError> {
        let endpoint = self.endpoint(route);
        let mut call = self.client.post(&endpoint).json(request);
        if let Some(key) = &self.api_key {
            call = call.header(API_KEY_HEADER, key);
        }

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                target: "bundle::builder",
                endpoint = %endpoint,
                status = %status,
                "builder 返回非成功状态"
            );
            return Err(BundleError::Rejected(format!("HTTP {status}: {}", body.trim())));
        }

        let value: Value = response.json().await?;
        let bundles = parse_response(value, self.encoding)?;
        debug!(
            target: "bundle::builder",
            endpoint = %endpoint,
            bundles = bundles.len(),
            "builder 返回未签名 bundle"
        );
        Ok(bundles)
    }
}

#[derive(Debug, Deserialize)]
struct BuilderResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    transactions: Option<Vec<String>>,
    #[serde(default)]
    bundles: Option<Vec<BundleEntry>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BundleEntry {
    Flat(Vec<String>),
    Wrapped { transactions: Vec<String> },
}

impl BundleEntry {
    fn into_transactions(self) -> Vec<String> {
        match self {
            BundleEntry::Flat(txs) => txs,
            BundleEntry::Wrapped { transactions } => transactions,
        }
    }
}

/// 兼容 `transactions`（单个 bundle）与 `bundles`（多个）两种返回格式。
pub(crate) fn parse_response(
    value: Value,
    encoding: TransactionEncoding,
) -> Result<Vec<UnsignedBundle>, BundleError> {
    let response: BuilderResponse = serde_json::from_value(value)
        .map_err(|err| BundleError::Rejected(format!("无法解析 builder 响应: {err}")))?;

    if let Some(error) = response.error.filter(|e| !e.trim().is_empty()) {
        return Err(BundleError::Rejected(error));
    }
    if response.success == Some(false) {
        return Err(BundleError::Rejected("builder 返回 success=false".to_string()));
    }

    let bundles: Vec<UnsignedBundle> = match (response.bundles, response.transactions) {
        (Some(entries), _) => entries
            .into_iter()
            .map(|entry| UnsignedBundle::new(entry.into_transactions(), encoding))
            .collect(),
        (None, Some(transactions)) => vec![UnsignedBundle::new(transactions, encoding)],
        (None, None) => Vec::new(),
    };

    let bundles: Vec<UnsignedBundle> = bundles.into_iter().filter(|b| !b.is_empty()).collect();
    if bundles.is_empty() {
        return Err(BundleError::Rejected("builder 未返回任何交易".to_string()));
    }
    Ok(bundles)
}
