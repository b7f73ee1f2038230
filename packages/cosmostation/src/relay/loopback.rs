use std::future::Future;

use parking_lot::Mutex;
use serde_json::Value;

use super::{
    namespace::{
        allows_method, cosmos_chain_id, session_accounts, NamespaceAccount, RequiredNamespaces,
        SessionNamespace, SessionNamespaces,
    },
    ConnectNotifier, JsonRpcRequest, RelayProtocol, RelayTransport, Session, SessionProposal,
    SESSION_REQUEST,
};
use crate::{
    error::{JsonRpcError, RelayError},
    Address,
};

/// The wallet side of a [LoopbackRelay].
pub trait WalletApp: Send + Sync {
    /// Addresses to announce when approving a session for `chain_id`.
    fn session_addresses(
        &self,
        chain_id: &str,
    ) -> impl Future<Output = Result<Vec<Address>, JsonRpcError>> + Send;

    /// Run one request and produce its JSON-RPC result.
    ///
    /// `chain_id` is taken from the session request envelope and is only set
    /// for namespaced requests. Legacy methods carry the chain in `params`.
    fn handle_request(
        &self,
        chain_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, JsonRpcError>> + Send;

    /// Self description sent along with the approval.
    fn metadata(&self) -> Option<super::AppMetadata> {
        None
    }
}

/// How a [LoopbackRelay] answers session proposals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Approval {
    /// Approve immediately.
    #[default]
    Approve,
    /// Reject with the given reason.
    Reject(String),
    /// Never answer, the wallet walked away.
    Ignore,
}

/// An in-process relay that delivers requests straight to a [WalletApp].
///
/// Useful for tests and for driving the mobile code path without a bridge.
pub struct LoopbackRelay<W> {
    wallet: W,
    approval: Approval,
    session: Mutex<Option<Session>>,
}

impl<W> LoopbackRelay<W> {
    /// A relay that approves every proposal.
    pub fn new(wallet: W) -> Self {
        Self::with_approval(wallet, Approval::Approve)
    }

    #[allow(missing_docs)]
    pub fn with_approval(wallet: W, approval: Approval) -> Self {
        LoopbackRelay {
            wallet,
            approval,
            session: Mutex::new(None),
        }
    }

    /// The wallet behind this relay.
    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// The current session, if one is active.
    pub fn session(&self) -> Option<Session> {
        self.session.lock().clone()
    }
}

impl<W: WalletApp> LoopbackRelay<W> {
    async fn approve(&self, proposal: &SessionProposal) -> Result<Session, RelayError> {
        let chain_id = proposal
            .chain_ids
            .first()
            .cloned()
            .ok_or_else(|| RelayError::SessionRejected {
                reason: "No chains requested".to_owned(),
            })?;
        let namespaces = match &proposal.required_namespaces {
            Some(required) => self.grant(required).await?,
            None => SessionNamespaces::new(),
        };
        Ok(Session {
            topic: proposal.topic.clone(),
            chain_id,
            pairing_uri: proposal.pairing_uri()?,
            accounts: session_accounts(&namespaces),
            namespaces,
            protocol: proposal.protocol,
            peer: self.wallet.metadata(),
        })
    }

    /// Grant every requested method and announce the wallet's addresses per chain.
    async fn grant(&self, required: &RequiredNamespaces) -> Result<SessionNamespaces, RelayError> {
        let mut namespaces = SessionNamespaces::new();
        for (name, requested) in required {
            let mut accounts = vec![];
            for caip in &requested.chains {
                let chain_id =
                    cosmos_chain_id(caip).ok_or_else(|| RelayError::SessionRejected {
                        reason: format!("Unsupported chain {caip}"),
                    })?;
                let addresses = self
                    .wallet
                    .session_addresses(chain_id)
                    .await
                    .map_err(|e| RelayError::SessionRejected { reason: e.message })?;
                accounts.extend(
                    addresses
                        .into_iter()
                        .map(|address| NamespaceAccount::cosmos(chain_id, address).to_string()),
                );
            }
            namespaces.insert(
                name.clone(),
                SessionNamespace {
                    accounts,
                    methods: requested.methods.clone(),
                    events: requested.events.clone(),
                },
            );
        }
        Ok(namespaces)
    }
}

impl<W: WalletApp> RelayTransport for LoopbackRelay<W> {
    async fn kill_session(&self) -> Result<(), RelayError> {
        if let Some(session) = self.session.lock().take() {
            tracing::debug!("Killed relay session {}", session.topic);
        }
        Ok(())
    }

    async fn create_session(
        &self,
        proposal: SessionProposal,
        notifier: ConnectNotifier,
    ) -> Result<(), RelayError> {
        match &self.approval {
            Approval::Approve => {
                let result = self.approve(&proposal).await;
                if let Ok(session) = &result {
                    *self.session.lock() = Some(session.clone());
                }
                notifier.notify(result);
            }
            Approval::Reject(reason) => notifier.notify(Err(RelayError::SessionRejected {
                reason: reason.clone(),
            })),
            Approval::Ignore => drop(notifier),
        }
        Ok(())
    }

    async fn send_custom_request(&self, request: JsonRpcRequest) -> Result<Value, RelayError> {
        let (protocol, namespaces) = match &*self.session.lock() {
            Some(session) => (session.protocol, session.namespaces.clone()),
            None => return Err(RelayError::NoSession),
        };
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        let (chain_id, method, params) = match (protocol, method == SESSION_REQUEST) {
            (RelayProtocol::Namespaced, true) => {
                let mut params = params;
                let chain_id = params["chainId"]
                    .as_str()
                    .and_then(cosmos_chain_id)
                    .map(str::to_owned);
                let inner_method = params["request"]["method"]
                    .as_str()
                    .unwrap_or_default()
                    .to_owned();
                if !allows_method(&namespaces, &inner_method) {
                    return Err(RelayError::Peer {
                        id,
                        source: JsonRpcError::new(JsonRpcError::METHOD_NOT_FOUND, &inner_method),
                        method: inner_method,
                    });
                }
                (chain_id, inner_method, params["request"]["params"].take())
            }
            (RelayProtocol::Legacy, false) => (None, method, params),
            (protocol, _) => return Err(RelayError::UnsupportedMethod { method, protocol }),
        };
        tracing::debug!("Loopback relay delivering {method} (id {id})");
        self.wallet
            .handle_request(chain_id.as_deref(), &method, params)
            .await
            .map_err(|source| RelayError::Peer { id, method, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{RelayConfig, ACCOUNTS_V1, COSMOS_SIGN_AMINO, COSMOS_SIGN_DIRECT};

    struct EchoWallet;

    impl WalletApp for EchoWallet {
        async fn session_addresses(&self, _chain_id: &str) -> Result<Vec<Address>, JsonRpcError> {
            Ok(vec![
                "juno1vaeuky9hqacenay9nmuualugvv54tdhyt2wsvhnjasx9s946hhmqaq3kh7"
                    .parse()
                    .unwrap(),
            ])
        }

        async fn handle_request(
            &self,
            _chain_id: Option<&str>,
            method: &str,
            params: Value,
        ) -> Result<Value, JsonRpcError> {
            match method {
                ACCOUNTS_V1 => Ok(params),
                _ => Err(JsonRpcError::new(JsonRpcError::METHOD_NOT_FOUND, method)),
            }
        }
    }

    async fn connect(relay: &LoopbackRelay<EchoWallet>, protocol: RelayProtocol) -> Session {
        let config = RelayConfig {
            protocol,
            ..RelayConfig::default()
        };
        let (notifier, rx) = ConnectNotifier::channel();
        relay
            .create_session(SessionProposal::new(&config, &["juno-1".to_owned()]), notifier)
            .await
            .unwrap();
        rx.await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn requests_need_a_session() {
        let relay = LoopbackRelay::new(EchoWallet);
        let err = relay
            .send_custom_request(JsonRpcRequest::new(ACCOUNTS_V1, serde_json::json!([])))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NoSession));

        connect(&relay, RelayProtocol::Legacy).await;
        let reply = relay
            .send_custom_request(JsonRpcRequest::new(ACCOUNTS_V1, serde_json::json!(["juno-1"])))
            .await
            .unwrap();
        assert_eq!(reply, serde_json::json!(["juno-1"]));

        relay.kill_session().await.unwrap();
        assert!(relay.session().is_none());
    }

    #[tokio::test]
    async fn namespaced_accounts_are_caip() {
        let relay = LoopbackRelay::new(EchoWallet);
        let session = connect(&relay, RelayProtocol::Namespaced).await;
        assert_eq!(
            session.accounts,
            vec!["cosmos:juno-1:juno1vaeuky9hqacenay9nmuualugvv54tdhyt2wsvhnjasx9s946hhmqaq3kh7"]
        );
        assert_eq!(
            session.namespaces["cosmos"].methods,
            vec![COSMOS_SIGN_DIRECT, COSMOS_SIGN_AMINO]
        );
        let err = relay
            .send_custom_request(JsonRpcRequest::new(ACCOUNTS_V1, serde_json::json!([])))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::UnsupportedMethod { .. }));
    }

    #[tokio::test]
    async fn legacy_session_announces_nothing() {
        let relay = LoopbackRelay::new(EchoWallet);
        let session = connect(&relay, RelayProtocol::Legacy).await;
        assert!(session.accounts.is_empty());
        assert!(session.namespaces.is_empty());
    }

    #[tokio::test]
    async fn ungranted_methods_never_reach_the_wallet() {
        let relay = LoopbackRelay::new(EchoWallet);
        connect(&relay, RelayProtocol::Namespaced).await;
        let request =
            JsonRpcRequest::session_request("juno-1", "cosmos_getAccounts", serde_json::json!({}));
        match relay.send_custom_request(request).await {
            Err(RelayError::Peer { method, source, .. }) => {
                assert_eq!(method, "cosmos_getAccounts");
                assert_eq!(source.code, JsonRpcError::METHOD_NOT_FOUND);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn peer_errors_carry_id() {
        let relay = LoopbackRelay::new(EchoWallet);
        connect(&relay, RelayProtocol::Legacy).await;
        let request = JsonRpcRequest::new("unknown_method", Value::Null);
        let id = request.id;
        match relay.send_custom_request(request).await {
            Err(RelayError::Peer { id: got, source, .. }) => {
                assert_eq!(got, id);
                assert_eq!(source.code, JsonRpcError::METHOD_NOT_FOUND);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejection_is_reported() {
        let relay = LoopbackRelay::with_approval(EchoWallet, Approval::Reject("nope".to_owned()));
        let (notifier, rx) = ConnectNotifier::channel();
        relay
            .create_session(
                SessionProposal::new(&RelayConfig::default(), &["juno-1".to_owned()]),
                notifier,
            )
            .await
            .unwrap();
        assert!(matches!(
            rx.await.unwrap(),
            Err(RelayError::SessionRejected { .. })
        ));
        assert!(relay.session().is_none());
    }
}
