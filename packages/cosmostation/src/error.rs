#![allow(missing_docs)]
//! Error types exposed by this package.

use std::{fmt::Display, path::PathBuf, sync::Arc, time::Duration};

use bitcoin::bip32::DerivationPath;

use crate::{Address, TxBuilder};

/// Underlying cause carried by a [SignerError].
///
/// Kept behind an [Arc] so that [SignerError] stays [Clone].
pub type SignerCause = Arc<dyn std::error::Error + Send + Sync>;

/// The four failure kinds surfaced by an [crate::OfflineSigner].
///
/// Each failure is raised at the first point of failure and is never retried.
#[derive(thiserror::Error, Debug, Clone)]
pub enum SignerError {
    #[error("Cosmostation extension is not installed or refused the request{}", DisplayCause(.cause))]
    ExtensionInstall {
        #[source]
        cause: Option<SignerCause>,
    },
    #[error("Unable to get accounts from the wallet{}", DisplayCause(.cause))]
    GetAccount {
        #[source]
        cause: Option<SignerCause>,
    },
    #[error("Wallet failed to sign the transaction{}", DisplayCause(.cause))]
    Sign {
        #[source]
        cause: Option<SignerCause>,
    },
    #[error("Unable to connect to the mobile wallet{}", DisplayCause(.cause))]
    MobileConnect {
        #[source]
        cause: Option<SignerCause>,
    },
}

impl SignerError {
    pub fn extension_install(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        SignerError::ExtensionInstall {
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn get_account(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        SignerError::GetAccount {
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn sign(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        SignerError::Sign {
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn mobile_connect(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        SignerError::MobileConnect {
            cause: Some(Arc::new(cause)),
        }
    }

    /// Which of the four kinds this error is.
    pub fn kind(&self) -> SignerErrorKind {
        match self {
            SignerError::ExtensionInstall { .. } => SignerErrorKind::ExtensionInstall,
            SignerError::GetAccount { .. } => SignerErrorKind::GetAccount,
            SignerError::Sign { .. } => SignerErrorKind::Sign,
            SignerError::MobileConnect { .. } => SignerErrorKind::MobileConnect,
        }
    }

    /// The underlying cause, if one was captured.
    pub fn cause(&self) -> Option<&SignerCause> {
        match self {
            SignerError::ExtensionInstall { cause }
            | SignerError::GetAccount { cause }
            | SignerError::Sign { cause }
            | SignerError::MobileConnect { cause } => cause.as_ref(),
        }
    }
}

/// Fieldless mirror of [SignerError], handy for matching and logging.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SignerErrorKind {
    ExtensionInstall,
    GetAccount,
    Sign,
    MobileConnect,
}

impl Display for SignerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            SignerErrorKind::ExtensionInstall => "ExtensionInstallError",
            SignerErrorKind::GetAccount => "GetAccountError",
            SignerErrorKind::Sign => "SignError",
            SignerErrorKind::MobileConnect => "MobileConnectError",
        })
    }
}

struct DisplayCause<'a>(&'a Option<SignerCause>);

impl Display for DisplayCause<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.0 {
            Some(cause) => write!(f, ": {cause}"),
            None => Ok(()),
        }
    }
}

/// Failures reported by an [crate::ExtensionProvider].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ExtensionError {
    #[error("No Cosmostation extension provider is available")]
    NotInstalled,
    #[error("Request rejected by the user: {message}")]
    Rejected { message: String },
    #[error("Chain {chain_id:?} is not supported by this provider")]
    UnknownChain { chain_id: String },
    #[error("Provider returned an invalid account address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        source: AddressError,
    },
    #[error("Unable to sign document: {message}")]
    SigningFailed { message: String },
}

/// A JSON-RPC error object as returned by a relay peer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[error("JSON-RPC error {code}: {message}")]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcError {
    /// Code used when the wallet user declines a request.
    pub const USER_REJECTED: i64 = 4001;
    /// Code used for methods the peer does not implement.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Code used for malformed parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Code used when the peer fails while handling a valid request.
    pub const INTERNAL_ERROR: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        JsonRpcError {
            code,
            message: message.into(),
        }
    }
}

/// Errors from the relay transport or a relay peer.
#[derive(thiserror::Error, Debug, Clone)]
pub enum RelayError {
    #[error("No relay session is active")]
    NoSession,
    #[error("Relay request {method} (id {id}) failed: {source}")]
    Peer {
        id: u64,
        method: String,
        source: JsonRpcError,
    },
    #[error("Unable to parse reply to {method}: {source}")]
    InvalidReply {
        method: String,
        source: Arc<serde_json::Error>,
    },
    #[error("Empty reply to {method}")]
    EmptyReply { method: String },
    #[error("Wallet rejected the session: {reason}")]
    SessionRejected { reason: String },
    #[error("Relay session ended before the wallet connected")]
    NeverConnected,
    #[error("Timed out after {timeout:?} waiting for the wallet to connect")]
    ConnectTimeout { timeout: Duration },
    #[error("Method {method} is not available over the {protocol} relay protocol")]
    UnsupportedMethod {
        method: String,
        protocol: crate::relay::RelayProtocol,
    },
    #[error("Unable to build pairing URI for session {topic}: {reason}")]
    InvalidPairingUri { topic: String, reason: String },
    #[error("Invalid CAIP account {account:?}: {reason}")]
    InvalidCaipAccount { account: String, reason: String },
}

/// Errors that can occur while working with [crate::Address].
#[derive(thiserror::Error, Debug, Clone)]
pub enum AddressError {
    #[error("Invalid bech32 encoding in {address:?}: {source}")]
    InvalidBech32 {
        address: String,
        source: bech32::DecodeError,
    },
    #[error("Invalid byte count within {address:?}, expected 20 or 32 bytes, received {actual}")]
    InvalidByteCount { address: String, actual: usize },
    #[error("Invalid HRP provided: {hrp:?}")]
    InvalidHrp { hrp: String },
}

/// Errors that can occur while working with [crate::Wallet].
#[derive(thiserror::Error, Debug)]
pub enum WalletError {
    #[error("Could not get root private key from mnemonic: {source}")]
    CouldNotGetRootPrivateKey { source: bitcoin::bip32::Error },
    #[error("Could not derive private key using derivation path {derivation_path}: {source}")]
    CouldNotDerivePrivateKey {
        derivation_path: DerivationPath,
        source: bitcoin::bip32::Error,
    },
    #[error("Invalid derivation path {path:?}: {source}")]
    InvalidDerivationPath {
        path: String,
        source: bitcoin::bip32::Error,
    },
    #[error("Invalid seed phrase: {source}")]
    InvalidPhrase { source: bip39::Error },
    #[error("Unable to serialize sign document: {source}")]
    SignDocSerialize { source: serde_json::Error },
}

/// Errors that can occur while building a client.
#[derive(thiserror::Error, Debug)]
pub enum BuilderError {
    #[error("Unknown network value {network:?}")]
    UnknownNetwork { network: String },
    #[error("Invalid referer header {value:?}: {source}")]
    InvalidRefererHeader {
        value: String,
        source: reqwest::header::InvalidHeaderValue,
    },
    #[error("Unable to build HTTP client for {url}: {source}")]
    HttpClient { url: String, source: reqwest::Error },
    #[error("Invalid LCD URL {url:?}: {reason}")]
    InvalidLcdUrl { url: String, reason: String },
}

/// Errors while parsing a gas price like `0.025uatom`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GasPriceError {
    #[error("Gas price is empty")]
    Empty,
    #[error("Gas price {input:?} is missing a denom")]
    MissingDenom { input: String },
    #[error("Gas price {input:?} is missing an amount")]
    MissingAmount { input: String },
    #[error("Gas price {input:?} has an invalid amount")]
    InvalidAmount { input: String },
    #[error("Gas price {input:?} has more than {max} fractional digits")]
    TooPrecise { input: String, max: u32 },
}

/// Errors while parsing a coin like `100ujuno`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsedCoinError {
    #[error("Could not parse coin value {input:?}: input is empty")]
    Empty { input: String },
    #[error("Could not parse coin value {input:?}: denom is missing")]
    MissingDenom { input: String },
    #[error("Could not parse coin value {input:?}: amount is missing")]
    MissingAmount { input: String },
    #[error("Could not parse coin value {input:?}: invalid character in denom")]
    InvalidDenom { input: String },
    #[error("Could not parse coin value {input:?}: {source}")]
    InvalidAmount {
        input: String,
        source: std::num::ParseIntError,
    },
}

/// General errors while interacting with the chain
///
/// The other error types here represent "preparation" errors, this one
/// represents errors during normal interaction with an LCD endpoint and the
/// wallet.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to serialize value to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
    #[error(
        "Unable to deserialize value from JSON while performing: {action}. Parse error: {source}"
    )]
    JsonDeserialize {
        source: serde_json::Error,
        action: Action,
    },
    #[error("Network error talking to {lcd_url} while performing: {action}. {source}")]
    Http {
        source: reqwest::Error,
        lcd_url: Arc<String>,
        action: Action,
    },
    #[error("Received HTTP status {status} from {lcd_url} while performing: {action}. Body: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
        lcd_url: Arc<String>,
        action: Action,
    },
    #[error("Not found returned from chain while performing: {action}. {message}")]
    NotFound { message: String, action: Action },
    #[error("Invalid response from chain: {message}. While performing: {action}")]
    InvalidChainResponse { message: String, action: Action },
    #[error("Timed out waiting for transaction {txhash}")]
    WaitForTransactionTimedOut { txhash: String },
    #[error("Transaction {txhash} failed (on {lcd_url}) during {stage} with {code} and log: {raw_log}. Action: {action}.")]
    TransactionFailed {
        code: CosmosSdkError,
        txhash: String,
        raw_log: String,
        action: Arc<Action>,
        lcd_url: Arc<String>,
        stage: TransactionStage,
    },
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("Wallet did not report account {address}")]
    SignerAccountNotFound { address: Address },
    #[error("Wallet returned an invalid signature: {source}")]
    InvalidSignature { source: base64::DecodeError },
    #[error("Message {type_url} has no Amino JSON form, use direct signing instead")]
    AminoUnsupported { type_url: String },
    #[error("No gas price configured, unable to calculate a fee")]
    NoGasPrice,
    #[error("Wallet returned an invalid signed document: {message}")]
    InvalidSignedDoc { message: String },
}

#[derive(Debug, Clone, Copy)]
pub enum TransactionStage {
    Broadcast,
    Wait,
}

impl Display for TransactionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            TransactionStage::Broadcast => "broadcast",
            TransactionStage::Wait => "wait",
        })
    }
}

/// The action being performed when an error occurred.
#[derive(Debug, Clone)]
pub enum Action {
    GetBaseAccount(Address),
    QueryAllBalances(Address),
    SmartQuery {
        contract: Address,
        message: StringOrBytes,
    },
    Sign(TxBuilder),
    Broadcast(TxBuilder),
    BroadcastRaw(String),
    GetTransaction(String),
    WaitForTransaction(String),
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Action::GetBaseAccount(address) => write!(f, "get base account {address}"),
            Action::QueryAllBalances(address) => write!(f, "query all balances for {address}"),
            Action::SmartQuery { contract, message } => {
                write!(f, "smart query contract {contract} with message: {message}")
            }
            Action::Sign(txbuilder) => write!(f, "signing transaction: {txbuilder}"),
            Action::Broadcast(txbuilder) => write!(f, "broadcasting transaction: {txbuilder}"),
            Action::BroadcastRaw(txhash) => write!(f, "broadcasting raw transaction {txhash}"),
            Action::GetTransaction(txhash) => write!(f, "get transaction {txhash}"),
            Action::WaitForTransaction(txhash) => write!(f, "wait for transaction {txhash}"),
        }
    }
}

/// A helper type to display either as UTF8 data or the underlying bytes
#[derive(Debug, Clone)]
pub struct StringOrBytes(pub Vec<u8>);

impl From<Vec<u8>> for StringOrBytes {
    fn from(value: Vec<u8>) -> Self {
        StringOrBytes(value)
    }
}

impl Display for StringOrBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// Different known Cosmos SDK error codes
///
/// We can expand this over time, just including the most common ones for now
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CosmosSdkError {
    /// Code 4
    Unauthorized,
    /// Code 5
    InsufficientFunds,
    /// Code 11
    OutOfGas,
    /// Code 13
    InsufficientFee,
    /// Code 19
    TxInMempool,
    /// Code 28
    InvalidChainId,
    /// Code 32
    IncorrectAccountSequence,
    /// Some other error code
    Other(u32),
}

impl Display for CosmosSdkError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CosmosSdkError::Unauthorized => f.write_str("unauthorized (4)"),
            CosmosSdkError::InsufficientFunds => f.write_str("insufficient funds (5)"),
            CosmosSdkError::OutOfGas => f.write_str("out of gas (11)"),
            CosmosSdkError::InsufficientFee => f.write_str("insufficient fee (13)"),
            CosmosSdkError::TxInMempool => f.write_str("tx already in mempool (19)"),
            CosmosSdkError::InvalidChainId => f.write_str("invalid chain ID (28)"),
            CosmosSdkError::IncorrectAccountSequence => {
                f.write_str("incorrect account sequence (32)")
            }
            CosmosSdkError::Other(code) => write!(f, "Cosmos SDK error {code}"),
        }
    }
}

impl From<u32> for CosmosSdkError {
    fn from(value: u32) -> Self {
        match value {
            4 => Self::Unauthorized,
            5 => Self::InsufficientFunds,
            11 => Self::OutOfGas,
            13 => Self::InsufficientFee,
            19 => Self::TxInMempool,
            28 => Self::InvalidChainId,
            32 => Self::IncorrectAccountSequence,
            _ => Self::Other(value),
        }
    }
}

/// Errors which can occur while loading the config file.
#[derive(thiserror::Error, Debug)]
pub enum DappConfigError {
    #[error("Config file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("Misconfiguration detected, unable to find your default config file location")]
    ProjectDirsNotFound,
    #[cfg(feature = "config")]
    #[error("Error loading config file {}: {source}", path.display())]
    ConfigLoadError {
        source: Box<figment::Error>,
        path: PathBuf,
    },
    #[error("Unknown network {network:?} specified, not a known built-in network or found in config {}", config.display())]
    UnknownNetwork { network: String, config: PathBuf },
    #[error("Missing required config values for network {network:?} in config file {}: {missing}", path.display())]
    MissingRequiredConfig {
        missing: String,
        path: PathBuf,
        network: String,
    },
    #[error("Invalid gas price for network {network:?}: {source}")]
    InvalidGasPrice {
        network: String,
        source: GasPriceError,
    },
    #[cfg(feature = "config")]
    #[error(transparent)]
    TomlSerialization { source: toml::ser::Error },
    #[error("Unable to write config to {}: {source}", path.display())]
    ConfigWrite {
        source: std::io::Error,
        path: PathBuf,
    },
}
