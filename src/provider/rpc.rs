//! JSON-RPC钱包提供者适配器
//!
//! 面向开发节点（Anvil等）的`WalletProvider`实现，把提供者请求
//! 直接转发到HTTP JSON-RPC端点。开发节点不会推送账户/链变更事件，
//! 事件流保持静默

use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;

use super::{ProviderEvent, ProviderRpcError, WalletProvider};

const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct RpcWalletProvider {
    rpc_url: String,
    http_client: reqwest::Client,
    events: broadcast::Sender<ProviderEvent>,
}

impl RpcWalletProvider {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            rpc_url: rpc_url.into(),
            http_client: client,
            events,
        }
    }

    /// 测试/工具入口：向订阅者注入一条提供者事件
    pub fn emit(&self, event: ProviderEvent) {
        // 没有订阅者时send返回Err，忽略即可
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                ProviderRpcError::new(-32003, format!("failed to send rpc request: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderRpcError::new(-32003, format!("failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(ProviderRpcError::new(
                -32003,
                format!("rpc request failed with status {}: {}", status, body),
            ));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| {
            ProviderRpcError::new(-32700, format!("failed to parse json response: {}", e))
        })?;

        // 检查 JSON-RPC 错误对象
        if let Some(error) = json.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown RPC error");
            return Err(ProviderRpcError::new(code, message));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| ProviderRpcError::new(-32700, "missing result field in rpc response"))
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let provider = RpcWalletProvider::new("http://localhost:8545");
        let mut rx = provider.events();

        provider.emit(ProviderEvent::ChainChanged("0x1e".into()));

        match rx.recv().await.unwrap() {
            ProviderEvent::ChainChanged(hex) => assert_eq!(hex, "0x1e"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_rejects_unreachable_endpoint() {
        // 不可达端点：请求应返回传输层错误码
        let provider = RpcWalletProvider::new("http://127.0.0.1:1");
        let err = provider
            .request("eth_chainId", serde_json::json!([]))
            .await
            .unwrap_err();
        assert_eq!(err.code, -32003);
    }
}
