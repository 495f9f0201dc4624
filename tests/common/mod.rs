//! 测试辅助模块
//!
//! 可编程的钱包提供者测试替身和价格源桩

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::types::U256;
use serde_json::Value;
use tokio::sync::broadcast;

use goldcore::error::{Result, WalletError};
use goldcore::provider::{ProviderEvent, ProviderRpcError, WalletProvider};
use goldcore::service::price_feed::{OracleSource, ReaderSource};

/// 可编程钱包提供者替身
///
/// 按方法名排队响应（最后一条响应粘滞，重复请求时反复返回），
/// 并记录全部请求供断言
pub struct MockWalletProvider {
    responses: Mutex<HashMap<String, VecDeque<std::result::Result<Value, ProviderRpcError>>>>,
    calls: Mutex<Vec<(String, Value)>>,
    events_tx: broadcast::Sender<ProviderEvent>,
}

impl MockWalletProvider {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(16);
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            events_tx,
        }
    }

    pub fn stub_ok(&self, method: &str, value: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    pub fn stub_err(&self, method: &str, code: i64, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Err(ProviderRpcError::new(code, message)));
    }

    /// 向订阅者注入一条提供者事件
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events_tx.send(event);
    }

    /// 某方法的全部调用参数
    pub fn calls_for(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls_for(method).len()
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request(
        &self,
        method: &str,
        params: Value,
    ) -> std::result::Result<Value, ProviderRpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(method)
            .ok_or_else(|| ProviderRpcError::new(-32601, format!("no stub for {}", method)))?;

        let response = queue
            .pop_front()
            .ok_or_else(|| ProviderRpcError::new(-32601, format!("no stub for {}", method)))?;
        if queue.is_empty() {
            // 最后一条响应粘滞
            queue.push_back(response.clone());
        }
        response
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events_tx.subscribe()
    }
}

/// 读取器价格源桩
pub struct StubReader {
    pub last_updated: u64,
    pub stale: bool,
    pub price: U256,
    pub fail_timestamp_reads: bool,
    pub fail_price_read: bool,
    pub price_calls: AtomicUsize,
}

impl StubReader {
    pub fn healthy(last_updated: u64, stale: bool, price: u64) -> Self {
        Self {
            last_updated,
            stale,
            price: U256::from(price),
            fail_timestamp_reads: false,
            fail_price_read: false,
            price_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let mut reader = Self::healthy(1, false, 0);
        reader.fail_timestamp_reads = true;
        reader
    }
}

#[async_trait]
impl ReaderSource for StubReader {
    async fn last_updated(&self) -> Result<u64> {
        if self.fail_timestamp_reads {
            return Err(WalletError::rpc("reader unavailable"));
        }
        Ok(self.last_updated)
    }

    async fn is_price_stale(&self) -> Result<bool> {
        if self.fail_timestamp_reads {
            return Err(WalletError::rpc("reader unavailable"));
        }
        Ok(self.stale)
    }

    async fn price_per_gram(&self) -> Result<U256> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_price_read {
            return Err(WalletError::rpc("reader price read failed"));
        }
        Ok(self.price)
    }
}

/// 预言机价格源桩；`price = None`表示调用失败
pub struct StubOracle {
    pub price: Option<U256>,
    pub calls: AtomicUsize,
}

impl StubOracle {
    pub fn healthy(price: u64) -> Self {
        Self {
            price: Some(U256::from(price)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            price: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleSource for StubOracle {
    async fn price_per_gram(&self) -> Result<U256> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.price
            .ok_or_else(|| WalletError::rpc("oracle unavailable"))
    }
}
