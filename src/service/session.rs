//! 会话管理服务
//!
//! 会话是显式状态机：`Disconnected → Connecting → Connected`，所有
//! 变更（包括提供者事件触发的变更）都经过唯一的`apply`入口，事件
//! 回调不得散落地修改字段。链变更按"作废并重建"处理：整体丢弃
//! 会话派生状态并递增epoch，由持有方决定何时重建

use std::fmt;
use std::sync::{Arc, Weak};

use ethers::types::Address;
use serde_json::json;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::domain::chain::{parse_chain_id_hex, ChainRegistry};
use crate::error::{Result, WalletError};
use crate::provider::{ProviderEvent, WalletProvider};
use crate::service::network::NetworkReconciler;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// 提供者事件流意外关闭等不可恢复故障
    Error,
}

/// 签名句柄：经由钱包提供者授权状态变更调用的能力
#[derive(Clone)]
pub struct SignerHandle {
    provider: Arc<dyn WalletProvider>,
    account: Address,
}

impl SignerHandle {
    pub fn account(&self) -> Address {
        self.account
    }

    /// 通过钱包发送一笔由当前账户签名的交易，返回交易哈希
    pub async fn send_transaction(&self, to: Address, data: Vec<u8>) -> Result<String> {
        let params = json!([{
            "from": format!("{:?}", self.account),
            "to": format!("{:?}", to),
            "data": format!("0x{}", hex::encode(&data)),
        }]);

        let result = self.provider.request("eth_sendTransaction", params).await?;
        serde_json::from_value(result)
            .map_err(|e| WalletError::rpc(format!("malformed transaction hash: {}", e)))
    }
}

impl fmt::Debug for SignerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerHandle")
            .field("account", &self.account)
            .finish()
    }
}

/// 会话快照
///
/// 不变式：status为Connected时account/chain_id/provider/signer全部非空；
/// 该不变式由`apply`这个唯一变更入口保证
#[derive(Clone, Default)]
pub struct Session {
    pub status: SessionStatus,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub provider: Option<Arc<dyn WalletProvider>>,
    pub signer: Option<SignerHandle>,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// 会话状态机的全部迁移
enum Transition {
    ConnectStarted,
    Connected {
        account: Address,
        chain_id: u64,
        provider: Arc<dyn WalletProvider>,
    },
    /// 账户切换原地更新，不做整体重置
    AccountSwitched(Address),
    /// 显式断开或账户列表清空
    Cleared,
    /// 链变更：整体作废会话派生状态
    ChainInvalidated(Option<u64>),
    /// 提供者事件流关闭
    Faulted,
}

/// 事件订阅守卫：随会话建立一次，析构时注销监听任务
struct EventSubscription {
    handle: JoinHandle<()>,
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 会话共享状态；事件任务只持有弱引用，不会把会话钉在内存里
struct SessionInner {
    state: RwLock<Session>,
    epoch_tx: watch::Sender<u64>,
    subscription: Mutex<Option<EventSubscription>>,
}

impl SessionInner {
    /// 唯一的状态变更入口
    async fn apply(&self, transition: Transition) {
        let mut state = self.state.write().await;
        match transition {
            Transition::ConnectStarted => {
                state.status = SessionStatus::Connecting;
            }
            Transition::Connected {
                account,
                chain_id,
                provider,
            } => {
                state.account = Some(account);
                state.chain_id = Some(chain_id);
                state.signer = Some(SignerHandle {
                    provider: provider.clone(),
                    account,
                });
                state.provider = Some(provider);
                state.status = SessionStatus::Connected;
                tracing::info!(account = ?account, chain_id, "Wallet connected");
            }
            Transition::AccountSwitched(account) => {
                if let Some(provider) = state.provider.clone() {
                    state.signer = Some(SignerHandle { provider, account });
                }
                state.account = Some(account);
                tracing::info!(account = ?account, "Active account switched");
            }
            Transition::Cleared => {
                *state = Session::default();
            }
            Transition::ChainInvalidated(chain_id) => {
                *state = Session::default();
                drop(state);
                self.epoch_tx.send_modify(|e| *e += 1);
                tracing::info!(?chain_id, "Chain changed, session state invalidated");
            }
            Transition::Faulted => {
                state.status = SessionStatus::Error;
                tracing::error!("Provider event stream closed, session faulted");
            }
        }
    }

    async fn event_loop(weak: Weak<Self>, mut rx: broadcast::Receiver<ProviderEvent>) {
        loop {
            let event = match rx.recv().await {
                Ok(ev) => ev,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Provider event stream lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.apply(Transition::Faulted).await;
                    }
                    return;
                }
            };

            let Some(inner) = weak.upgrade() else { return };

            match event {
                ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                    None => {
                        tracing::info!("Account list emptied, clearing session");
                        inner.apply(Transition::Cleared).await;
                    }
                    Some(first) => match first.parse::<Address>() {
                        Ok(account) => inner.apply(Transition::AccountSwitched(account)).await,
                        Err(_) => {
                            tracing::warn!(account = %first, "Ignoring malformed account in event")
                        }
                    },
                },
                ProviderEvent::ChainChanged(hex) => {
                    let chain_id = parse_chain_id_hex(&hex);
                    inner.apply(Transition::ChainInvalidated(chain_id)).await;
                    // 旧链的订阅随会话一起作废，重连时重新建立
                    return;
                }
            }
        }
    }
}

pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    registry: Arc<ChainRegistry>,
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, registry: Arc<ChainRegistry>) -> Self {
        let (epoch_tx, _) = watch::channel(0);
        Self {
            provider,
            registry,
            inner: Arc::new(SessionInner {
                state: RwLock::new(Session::default()),
                epoch_tx,
                subscription: Mutex::new(None),
            }),
        }
    }

    /// 当前会话快照
    pub async fn session(&self) -> Session {
        self.inner.state.read().await.clone()
    }

    /// 会话epoch订阅：链变更作废会话时epoch递增，持有方据此重建
    pub fn epoch(&self) -> watch::Receiver<u64> {
        self.inner.epoch_tx.subscribe()
    }

    /// 连接钱包
    ///
    /// 请求账户授权并捕获provider/signer/chainId；活动链不在允许
    /// 集合内时委托网络协调器，协调失败不致命，会话带着"错误"链
    /// 保持Connected直到协调完成
    pub async fn connect(&self) -> Result<Session> {
        let provider = self.provider.clone().ok_or(WalletError::NoProvider)?;

        self.inner.apply(Transition::ConnectStarted).await;

        match self.request_session(&provider).await {
            Ok((account, chain_id)) => {
                self.inner
                    .apply(Transition::Connected {
                        account,
                        chain_id,
                        provider: provider.clone(),
                    })
                    .await;
                self.attach_events(&provider).await;

                if !self.registry.is_allowed(chain_id) {
                    tracing::warn!(
                        chain_id,
                        "Active chain is not in the allowed set, attempting reconciliation"
                    );
                    if let Some(target) = self.registry.preferred_target() {
                        let reconciler = NetworkReconciler::new(provider.clone());
                        if let Err(e) = reconciler.ensure_chain(target).await {
                            tracing::warn!(error = %e, "Chain reconciliation failed");
                        }
                    }
                }

                Ok(self.session().await)
            }
            Err(e) => {
                self.inner.apply(Transition::Cleared).await;
                Err(e)
            }
        }
    }

    async fn request_session(
        &self,
        provider: &Arc<dyn WalletProvider>,
    ) -> Result<(Address, u64)> {
        let accounts: Vec<String> =
            serde_json::from_value(provider.request("eth_requestAccounts", json!([])).await?)
                .map_err(|e| WalletError::rpc(format!("malformed accounts payload: {}", e)))?;

        // 授权返回空账户列表等同于拒绝
        let first = accounts.first().ok_or(WalletError::UserRejected)?;
        let account: Address = first
            .parse()
            .map_err(|_| WalletError::rpc(format!("invalid account address: {}", first)))?;

        let chain_hex: String =
            serde_json::from_value(provider.request("eth_chainId", json!([])).await?)
                .map_err(|e| WalletError::rpc(format!("malformed chain id payload: {}", e)))?;
        let chain_id = parse_chain_id_hex(&chain_hex)
            .ok_or_else(|| WalletError::rpc(format!("invalid chain id: {}", chain_hex)))?;

        Ok((account, chain_id))
    }

    /// 断开会话，幂等，任何先前状态下都重置为Disconnected，绝不报错
    pub async fn disconnect(&self) {
        // 先注销事件订阅再清状态，避免残留监听跨越重连
        self.inner.subscription.lock().await.take();
        self.inner.apply(Transition::Cleared).await;
        tracing::info!("Wallet disconnected");
    }

    /// 查询已授权账户但绝不自动建立Connected会话
    ///
    /// 只上报可用性信息；是否连接由调用方显式决定（需要用户动作），
    /// 静默自动连接是被禁止的设计契约
    pub async fn restore_if_authorized(&self) -> Result<Vec<String>> {
        let Some(provider) = self.provider.clone() else {
            return Ok(Vec::new());
        };

        let accounts: Vec<String> =
            serde_json::from_value(provider.request("eth_accounts", json!([])).await?)
                .map_err(|e| WalletError::rpc(format!("malformed accounts payload: {}", e)))?;

        if !accounts.is_empty() {
            tracing::info!(
                count = accounts.len(),
                "Previously authorized accounts found, not auto-connecting"
            );
        }

        Ok(accounts)
    }

    /// 注册提供者事件监听，每个存活会话恰好一对
    ///
    /// 无条件换入新订阅：旧订阅（包括链变更后尚未退出的监听任务）
    /// 随守卫析构注销。链变更作废会话和持有方重连之间存在竞争，
    /// 依据"旧任务是否已退出"来跳过注册会让重建后的会话失去监听
    async fn attach_events(&self, provider: &Arc<dyn WalletProvider>) {
        let rx = provider.events();
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(SessionInner::event_loop(weak, rx));
        *self.inner.subscription.lock().await = Some(EventSubscription { handle });
    }
}

/// 地址短格式：前6位 + "..." + 后4位；空输入返回空串
///
/// 合法地址都是ASCII；落在字符边界之外的畸形输入原样返回而不截断
pub fn short_address(address: Option<&str>) -> String {
    let Some(addr) = address else {
        return String::new();
    };
    if addr.len() <= 10 {
        return addr.to_string();
    }
    match (addr.get(..6), addr.get(addr.len() - 4..)) {
        (Some(head), Some(tail)) => format!("{}...{}", head, tail),
        _ => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address() {
        assert_eq!(short_address(Some("0xABCDEF0123456789")), "0xABCD...6789");
        assert_eq!(short_address(None), "");
        // 过短的输入原样返回
        assert_eq!(short_address(Some("0xABCD")), "0xABCD");
    }

    #[test]
    fn test_short_address_tolerates_non_ascii_input() {
        // 截断点落在多字节字符中间时不截断也不恐慌
        assert_eq!(
            short_address(Some("0x金金金金金金金金")),
            "0x金金金金金金金金"
        );
    }

    #[test]
    fn test_default_session_is_disconnected() {
        let session = Session::default();
        assert_eq!(session.status, SessionStatus::Disconnected);
        assert!(session.account.is_none());
        assert!(session.chain_id.is_none());
        assert!(session.signer.is_none());
        assert!(!session.is_connected());
    }
}
