//! Contract for an injected Cosmostation extension provider.

use std::future::Future;

use crate::{
    error::ExtensionError,
    sign_doc::{DirectSignDoc, PubKeyValue, StdSignDoc, StdSignature},
};

/// Account as reported by the extension.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionAccount {
    /// Account name in the extension.
    pub name: String,
    /// Bech32 address for the requested chain.
    pub address: String,
    /// Compressed public key bytes.
    #[serde(with = "crate::encoding::bytes")]
    pub public_key: Vec<u8>,
    #[serde(default)]
    #[allow(missing_docs)]
    pub is_ledger: bool,
    #[serde(default)]
    #[allow(missing_docs)]
    pub is_ethermint: bool,
}

/// Reply to an Amino signing request.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtensionAminoResponse {
    /// Base64 compact signature.
    pub signature: String,
    #[allow(missing_docs)]
    pub pub_key: PubKeyValue,
    /// The document as signed, possibly edited by the user.
    pub signed_doc: StdSignDoc,
}

/// Direct sign document in the shape the extension expects.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtensionDirectDoc {
    #[allow(missing_docs)]
    pub chain_id: String,
    #[serde(with = "crate::encoding::bytes")]
    #[allow(missing_docs)]
    pub body_bytes: Vec<u8>,
    #[serde(with = "crate::encoding::bytes")]
    #[allow(missing_docs)]
    pub auth_info_bytes: Vec<u8>,
    #[serde(with = "crate::encoding::u64_string")]
    #[allow(missing_docs)]
    pub account_number: u64,
}

impl From<&DirectSignDoc> for ExtensionDirectDoc {
    fn from(doc: &DirectSignDoc) -> Self {
        ExtensionDirectDoc {
            chain_id: doc.chain_id.clone(),
            body_bytes: doc.body_bytes.clone(),
            auth_info_bytes: doc.auth_info_bytes.clone(),
            account_number: doc.account_number,
        }
    }
}

impl From<ExtensionDirectDoc> for DirectSignDoc {
    fn from(doc: ExtensionDirectDoc) -> Self {
        DirectSignDoc {
            body_bytes: doc.body_bytes,
            auth_info_bytes: doc.auth_info_bytes,
            chain_id: doc.chain_id,
            account_number: doc.account_number,
        }
    }
}

/// Reply to a direct signing request.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtensionDirectResponse {
    /// Base64 compact signature.
    pub signature: String,
    #[allow(missing_docs)]
    pub pub_key: PubKeyValue,
    /// The document as signed.
    pub signed_doc: ExtensionDirectDoc,
}

impl ExtensionAminoResponse {
    /// Split into the echoed document and the signature.
    pub fn into_parts(self) -> (StdSignDoc, StdSignature) {
        (
            self.signed_doc,
            StdSignature {
                pub_key: self.pub_key,
                signature: self.signature,
            },
        )
    }
}

impl ExtensionDirectResponse {
    /// Split into the echoed document and the signature.
    pub fn into_parts(self) -> (DirectSignDoc, StdSignature) {
        (
            self.signed_doc.into(),
            StdSignature {
                pub_key: self.pub_key,
                signature: self.signature,
            },
        )
    }
}

/// The `cosmos` namespace of an injected Cosmostation provider.
///
/// Every call is keyed by chain ID. Implementations talk to whatever actually
/// holds the keys: a browser bridge, a hardware device, or an in-process
/// [crate::LocalKeyProvider].
pub trait ExtensionProvider: Send + Sync {
    /// Ask the user to expose an account for `chain_id`. Fails when the provider is missing.
    fn request_account(
        &self,
        chain_id: &str,
    ) -> impl Future<Output = Result<ExtensionAccount, ExtensionError>> + Send;

    /// Fetch the already exposed account for `chain_id`.
    fn get_account(
        &self,
        chain_id: &str,
    ) -> impl Future<Output = Result<ExtensionAccount, ExtensionError>> + Send;

    /// Sign an Amino document.
    fn sign_amino(
        &self,
        chain_id: &str,
        doc: &StdSignDoc,
    ) -> impl Future<Output = Result<ExtensionAminoResponse, ExtensionError>> + Send;

    /// Sign a direct document.
    fn sign_direct(
        &self,
        chain_id: &str,
        doc: &ExtensionDirectDoc,
    ) -> impl Future<Output = Result<ExtensionDirectResponse, ExtensionError>> + Send;
}

/// Stands in for a missing extension. Every call fails with [ExtensionError::NotInstalled].
#[derive(Clone, Copy, Debug, Default)]
pub struct MissingExtension;

impl ExtensionProvider for MissingExtension {
    async fn request_account(&self, _chain_id: &str) -> Result<ExtensionAccount, ExtensionError> {
        Err(ExtensionError::NotInstalled)
    }

    async fn get_account(&self, _chain_id: &str) -> Result<ExtensionAccount, ExtensionError> {
        Err(ExtensionError::NotInstalled)
    }

    async fn sign_amino(
        &self,
        _chain_id: &str,
        _doc: &StdSignDoc,
    ) -> Result<ExtensionAminoResponse, ExtensionError> {
        Err(ExtensionError::NotInstalled)
    }

    async fn sign_direct(
        &self,
        _chain_id: &str,
        _doc: &ExtensionDirectDoc,
    ) -> Result<ExtensionDirectResponse, ExtensionError> {
        Err(ExtensionError::NotInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_doc_uses_snake_case() {
        let doc = ExtensionDirectDoc {
            chain_id: "juno-1".to_owned(),
            body_bytes: vec![1, 2],
            auth_info_bytes: vec![3],
            account_number: 12,
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["chain_id"], "juno-1");
        assert_eq!(json["body_bytes"], "AQI=");
        assert_eq!(json["account_number"], "12");
        let back: DirectSignDoc = doc.into();
        assert_eq!(back.auth_info_bytes, vec![3]);
    }

    #[test]
    fn account_accepts_number_array_key() {
        let account: ExtensionAccount = serde_json::from_str(
            r#"{"name":"a","address":"cosmos1x","publicKey":[2,3],"isLedger":true}"#,
        )
        .unwrap();
        assert_eq!(account.public_key, vec![2, 3]);
        assert!(account.is_ledger);
        assert!(!account.is_ethermint);
    }
}
