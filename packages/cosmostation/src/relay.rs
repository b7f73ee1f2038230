//! WalletConnect-style relay sessions with the Cosmostation mobile wallet.
//!
//! The relay wire protocol itself (bridge websocket, payload encryption) lives
//! behind [RelayTransport]. This module defines the JSON-RPC shapes exchanged
//! over it, the session proposal and pairing URI, and the bootstrap sequence.

mod bootstrap;
mod loopback;
mod modal;
pub mod namespace;

use std::{fmt::Display, future::Future, str::FromStr};

use rand::Rng;
use serde_json::Value;

pub use self::bootstrap::{connect_session, BootstrapOptions};
pub use self::loopback::{Approval, LoopbackRelay, WalletApp};
pub use self::modal::{NoopModal, QrModal};
use self::namespace::{cosmos_required_namespaces, RequiredNamespaces, SessionNamespaces};
use crate::error::RelayError;

/// Legacy account listing method.
pub const ACCOUNTS_V1: &str = "cosmostation_wc_accounts_v1";
/// Legacy Amino signing method.
pub const SIGN_TX_V1: &str = "cosmostation_wc_sign_tx_v1";
/// Namespaced Amino signing method.
pub const COSMOS_SIGN_AMINO: &str = "cosmos_signAmino";
/// Namespaced direct signing method.
pub const COSMOS_SIGN_DIRECT: &str = "cosmos_signDirect";
/// Envelope for namespaced requests.
pub const SESSION_REQUEST: &str = "wc_sessionRequest";

/// Public bridge used by the legacy protocol.
pub const DEFAULT_BRIDGE: &str = "https://bridge.walletconnect.org";

/// Which generation of the relay protocol a session speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RelayProtocol {
    /// Bridge based protocol with Cosmostation custom methods.
    #[default]
    Legacy,
    /// Namespace based protocol with the `cosmos_*` methods.
    Namespaced,
}

impl RelayProtocol {
    fn as_str(self) -> &'static str {
        match self {
            RelayProtocol::Legacy => "v1",
            RelayProtocol::Namespaced => "v2",
        }
    }
}

impl Display for RelayProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" | "legacy" => Ok(RelayProtocol::Legacy),
            "v2" | "namespaced" => Ok(RelayProtocol::Namespaced),
            _ => Err(format!("Unknown relay protocol {s:?}, expected v1 or v2")),
        }
    }
}

/// Generate a payload ID: current time in microsecond-ish resolution plus three random digits.
pub fn payload_id() -> u64 {
    let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    millis * 1000 + rand::thread_rng().gen_range(0..1000)
}

/// A JSON-RPC 2.0 request sent to the wallet.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JsonRpcRequest {
    #[allow(missing_docs)]
    pub id: u64,
    /// Always `"2.0"`.
    pub jsonrpc: String,
    #[allow(missing_docs)]
    pub method: String,
    #[allow(missing_docs)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Build a request with a fresh [payload_id].
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        JsonRpcRequest {
            id: payload_id(),
            jsonrpc: "2.0".to_owned(),
            method: method.into(),
            params,
        }
    }

    /// Wrap a namespaced method in the session request envelope for `chain_id`.
    pub fn session_request(chain_id: &str, method: &str, params: Value) -> Self {
        Self::new(
            SESSION_REQUEST,
            serde_json::json!({
                "request": {
                    "method": method,
                    "params": params,
                },
                "chainId": namespace::caip_chain_id(chain_id),
            }),
        )
    }

    /// The method the wallet will actually run, looking inside session request envelopes.
    pub fn inner_method(&self) -> &str {
        if self.method == SESSION_REQUEST {
            self.params["request"]["method"]
                .as_str()
                .unwrap_or(&self.method)
        } else {
            &self.method
        }
    }
}

/// Description of the dApp shown to the wallet user.
#[derive(Debug, serde::Serialize, PartialEq, Eq, serde::Deserialize, Clone)]
pub struct AppMetadata {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub description: String,
    #[allow(missing_docs)]
    pub url: String,
    #[allow(missing_docs)]
    pub icons: Vec<String>,
}

impl Default for AppMetadata {
    fn default() -> Self {
        AppMetadata {
            name: "Cosmostation dApp".to_owned(),
            description: "Cosmostation wallet example dApp".to_owned(),
            url: "https://www.cosmostation.io".to_owned(),
            icons: vec!["https://www.cosmostation.io/favicon.ico".to_owned()],
        }
    }
}

/// Settings for establishing relay sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// Bridge server for the legacy protocol.
    pub bridge: String,
    /// Methods announced to the wallet for the legacy protocol.
    pub signing_methods: Vec<String>,
    #[allow(missing_docs)]
    pub metadata: AppMetadata,
    /// Project identifier required by namespaced relays.
    pub project_id: Option<String>,
    #[allow(missing_docs)]
    pub protocol: RelayProtocol,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            bridge: DEFAULT_BRIDGE.to_owned(),
            signing_methods: vec![ACCOUNTS_V1.to_owned(), SIGN_TX_V1.to_owned()],
            metadata: AppMetadata::default(),
            project_id: None,
            protocol: RelayProtocol::Legacy,
        }
    }
}

/// A request to open a session, handed to [RelayTransport::create_session].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionProposal {
    /// Random topic identifying the session.
    pub topic: String,
    /// Hex encoded symmetric key shared through the pairing URI.
    pub key: String,
    #[allow(missing_docs)]
    pub protocol: RelayProtocol,
    #[allow(missing_docs)]
    pub bridge: String,
    #[allow(missing_docs)]
    pub signing_methods: Vec<String>,
    #[allow(missing_docs)]
    pub metadata: AppMetadata,
    /// Chains the dApp wants to use.
    pub chain_ids: Vec<String>,
    /// Namespaces requested from the wallet, only for [RelayProtocol::Namespaced].
    pub required_namespaces: Option<RequiredNamespaces>,
}

impl SessionProposal {
    /// Fresh proposal with random topic and key.
    pub fn new(config: &RelayConfig, chain_ids: &[String]) -> Self {
        let mut rng = rand::thread_rng();
        let topic: [u8; 16] = rng.gen();
        let key: [u8; 32] = rng.gen();
        SessionProposal {
            topic: hex::encode(topic),
            key: hex::encode(key),
            protocol: config.protocol,
            bridge: config.bridge.clone(),
            signing_methods: config.signing_methods.clone(),
            metadata: config.metadata.clone(),
            chain_ids: chain_ids.to_vec(),
            required_namespaces: match config.protocol {
                RelayProtocol::Legacy => None,
                RelayProtocol::Namespaced => Some(cosmos_required_namespaces(chain_ids)),
            },
        }
    }

    /// URI the wallet scans to join the session.
    pub fn pairing_uri(&self) -> Result<String, RelayError> {
        let key = self.key.as_str();
        let (version, params) = match self.protocol {
            RelayProtocol::Legacy => (1, [("bridge", self.bridge.as_str()), ("key", key)]),
            RelayProtocol::Namespaced => (2, [("relay-protocol", "irn"), ("symKey", key)]),
        };
        reqwest::Url::parse_with_params(&format!("wc:{}@{version}", self.topic), params)
            .map(String::from)
            .map_err(|e| RelayError::InvalidPairingUri {
                topic: self.topic.clone(),
                reason: e.to_string(),
            })
    }
}

/// An established relay session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    #[allow(missing_docs)]
    pub topic: String,
    /// Chain the session was approved for.
    pub chain_id: String,
    #[allow(missing_docs)]
    pub pairing_uri: String,
    /// Accounts announced on connect. CAIP-10 strings for namespaced sessions,
    /// empty for legacy sessions until the wallet is asked.
    pub accounts: Vec<String>,
    /// What the wallet granted. Empty for legacy sessions.
    pub namespaces: SessionNamespaces,
    #[allow(missing_docs)]
    pub protocol: RelayProtocol,
    /// The wallet's self description, if sent.
    pub peer: Option<AppMetadata>,
}

/// One-shot handle the transport uses to report the outcome of a session proposal.
///
/// Dropping it without calling [ConnectNotifier::notify] means the wallet never connected.
#[derive(Debug)]
pub struct ConnectNotifier(tokio::sync::oneshot::Sender<Result<Session, RelayError>>);

impl ConnectNotifier {
    pub(crate) fn channel() -> (
        Self,
        tokio::sync::oneshot::Receiver<Result<Session, RelayError>>,
    ) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        (ConnectNotifier(tx), rx)
    }

    /// Deliver the single connect event.
    pub fn notify(self, result: Result<Session, RelayError>) {
        if self.0.send(result).is_err() {
            tracing::debug!("Connect notification arrived after the bootstrap gave up");
        }
    }
}

/// Transport to a relay service.
pub trait RelayTransport: Send + Sync {
    /// Terminate the current session, if any. Succeeds when there is none.
    fn kill_session(&self) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Publish a session proposal. The connect event is reported through `notifier`.
    fn create_session(
        &self,
        proposal: SessionProposal,
        notifier: ConnectNotifier,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Send a request over the active session and wait for the wallet's result.
    fn send_custom_request(
        &self,
        request: JsonRpcRequest,
    ) -> impl Future<Output = Result<Value, RelayError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_pairing_uri() {
        let config = RelayConfig::default();
        let proposal = SessionProposal::new(&config, &["cosmoshub-4".to_owned()]);
        let uri = proposal.pairing_uri().unwrap();
        assert_eq!(proposal.topic.len(), 32);
        assert_eq!(proposal.key.len(), 64);
        assert_eq!(
            uri,
            format!(
                "wc:{}@1?bridge=https%3A%2F%2Fbridge.walletconnect.org&key={}",
                proposal.topic, proposal.key
            )
        );
        assert!(proposal.required_namespaces.is_none());
    }

    #[test]
    fn namespaced_proposal() {
        let config = RelayConfig {
            protocol: RelayProtocol::Namespaced,
            ..RelayConfig::default()
        };
        let proposal = SessionProposal::new(&config, &["cosmoshub-4".to_owned()]);
        assert_eq!(
            proposal.pairing_uri().unwrap(),
            format!("wc:{}@2?relay-protocol=irn&symKey={}", proposal.topic, proposal.key)
        );
        let namespaces = proposal.required_namespaces.unwrap();
        assert_eq!(namespaces["cosmos"].chains, vec!["cosmos:cosmoshub-4"]);
    }

    #[test]
    fn request_shape() {
        let req = JsonRpcRequest::new(ACCOUNTS_V1, serde_json::json!(["juno-1"]));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], ACCOUNTS_V1);
        assert_eq!(json["params"][0], "juno-1");
        assert!(json["id"].as_u64().unwrap() > 1_000_000_000_000_000);
    }

    #[test]
    fn session_request_envelope() {
        let req = JsonRpcRequest::session_request(
            "cosmoshub-4",
            COSMOS_SIGN_AMINO,
            serde_json::json!({"signerAddress": "cosmos1abc"}),
        );
        assert_eq!(req.method, SESSION_REQUEST);
        assert_eq!(req.inner_method(), COSMOS_SIGN_AMINO);
        assert_eq!(req.params["chainId"], "cosmos:cosmoshub-4");
    }

    #[test]
    fn protocol_names() {
        assert_eq!("v2".parse::<RelayProtocol>().unwrap(), RelayProtocol::Namespaced);
        assert_eq!(RelayProtocol::Legacy.to_string(), "v1");
        "v3".parse::<RelayProtocol>().unwrap_err();
    }
}
