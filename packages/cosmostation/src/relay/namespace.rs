//! Namespace (CAIP) types for the namespaced relay protocol.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde_json::Value;

use super::{JsonRpcRequest, COSMOS_SIGN_AMINO, COSMOS_SIGN_DIRECT};
use crate::{
    error::RelayError,
    sign_doc::{DirectSignDoc, StdSignDoc},
    Address,
};

/// CAIP-2 namespace for Cosmos SDK chains.
pub const COSMOS_NAMESPACE: &str = "cosmos";

/// What the dApp asks for in one namespace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProposeNamespace {
    /// CAIP-2 chain IDs, e.g. `cosmos:cosmoshub-4`.
    pub chains: Vec<String>,
    #[allow(missing_docs)]
    pub methods: Vec<String>,
    #[allow(missing_docs)]
    pub events: Vec<String>,
}

/// Required namespaces keyed by namespace name.
pub type RequiredNamespaces = BTreeMap<String, ProposeNamespace>;

/// What the wallet granted in one namespace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionNamespace {
    /// CAIP-10 account IDs.
    pub accounts: Vec<String>,
    #[allow(missing_docs)]
    pub methods: Vec<String>,
    #[allow(missing_docs)]
    pub events: Vec<String>,
}

/// Approved namespaces keyed by namespace name.
pub type SessionNamespaces = BTreeMap<String, SessionNamespace>;

/// Every CAIP-10 account granted across `namespaces`.
pub fn session_accounts(namespaces: &SessionNamespaces) -> Vec<String> {
    namespaces
        .values()
        .flat_map(|namespace| namespace.accounts.iter().cloned())
        .collect()
}

/// Whether any granted namespace allows `method`.
pub fn allows_method(namespaces: &SessionNamespaces, method: &str) -> bool {
    namespaces
        .values()
        .any(|namespace| namespace.methods.iter().any(|m| m == method))
}

/// CAIP-2 chain ID for a Cosmos chain ID.
pub fn caip_chain_id(chain_id: &str) -> String {
    format!("{COSMOS_NAMESPACE}:{chain_id}")
}

/// Cosmos chain ID from a CAIP-2 chain ID in the `cosmos` namespace.
pub fn cosmos_chain_id(caip: &str) -> Option<&str> {
    caip.strip_prefix(COSMOS_NAMESPACE)?.strip_prefix(':')
}

/// The `cosmos` namespace requesting both signing methods and no events.
pub fn cosmos_required_namespaces(chain_ids: &[String]) -> RequiredNamespaces {
    let mut namespaces = RequiredNamespaces::new();
    namespaces.insert(
        COSMOS_NAMESPACE.to_owned(),
        ProposeNamespace {
            chains: chain_ids.iter().map(|id| caip_chain_id(id)).collect(),
            methods: vec![COSMOS_SIGN_DIRECT.to_owned(), COSMOS_SIGN_AMINO.to_owned()],
            events: vec![],
        },
    );
    namespaces
}

/// A CAIP-10 account such as `cosmos:cosmoshub-4:cosmos1...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceAccount {
    #[allow(missing_docs)]
    pub namespace: String,
    #[allow(missing_docs)]
    pub chain_id: String,
    #[allow(missing_docs)]
    pub address: Address,
}

impl NamespaceAccount {
    /// Build the account string for an address on a Cosmos chain.
    pub fn cosmos(chain_id: impl Into<String>, address: Address) -> Self {
        NamespaceAccount {
            namespace: COSMOS_NAMESPACE.to_owned(),
            chain_id: chain_id.into(),
            address,
        }
    }
}

impl Display for NamespaceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.chain_id, self.address)
    }
}

impl FromStr for NamespaceAccount {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| RelayError::InvalidCaipAccount {
            account: s.to_owned(),
            reason,
        };
        // Chain IDs may not contain ':' but addresses never do either.
        let mut parts = s.splitn(3, ':');
        let (namespace, chain_id, address) = match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(chain_id), Some(address))
                if !namespace.is_empty() && !chain_id.is_empty() =>
            {
                (namespace, chain_id, address)
            }
            _ => return Err(invalid("expected namespace:chain_id:address".to_owned())),
        };
        let address = address
            .parse()
            .map_err(|e: crate::error::AddressError| invalid(e.to_string()))?;
        Ok(NamespaceAccount {
            namespace: namespace.to_owned(),
            chain_id: chain_id.to_owned(),
            address,
        })
    }
}

/// Builders for namespaced signing requests.
pub struct NamespaceRequest;

impl NamespaceRequest {
    /// `cosmos_signAmino` with `{signerAddress, signDoc}`.
    pub fn sign_amino(
        chain_id: &str,
        signer_address: Address,
        doc: &StdSignDoc,
    ) -> Result<JsonRpcRequest, serde_json::Error> {
        Ok(JsonRpcRequest::session_request(
            chain_id,
            COSMOS_SIGN_AMINO,
            sign_params(signer_address, serde_json::to_value(doc)?),
        ))
    }

    /// `cosmos_signDirect` with `{signerAddress, signDoc}`.
    pub fn sign_direct(
        chain_id: &str,
        signer_address: Address,
        doc: &DirectSignDoc,
    ) -> Result<JsonRpcRequest, serde_json::Error> {
        Ok(JsonRpcRequest::session_request(
            chain_id,
            COSMOS_SIGN_DIRECT,
            sign_params(signer_address, serde_json::to_value(doc)?),
        ))
    }
}

fn sign_params(signer_address: Address, doc: Value) -> Value {
    serde_json::json!({
        "signerAddress": signer_address.to_string(),
        "signDoc": doc,
    })
}
