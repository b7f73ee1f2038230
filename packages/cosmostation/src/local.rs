//! A mnemonic-backed stand-in for the Cosmostation wallet.
//!
//! Serves both as an [ExtensionProvider] for the desktop path and as the
//! [WalletApp] answering relay requests on the mobile path.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    account::CosmostationAccount,
    error::{ExtensionError, JsonRpcError, WalletError},
    extension::{
        ExtensionAccount, ExtensionAminoResponse, ExtensionDirectDoc, ExtensionDirectResponse,
        ExtensionProvider,
    },
    relay::{WalletApp, ACCOUNTS_V1, COSMOS_SIGN_AMINO, COSMOS_SIGN_DIRECT, SIGN_TX_V1},
    sign_doc::{DirectSignDoc, StdSignDoc},
    Address, AddressHrp, HasAddress, SeedPhrase, Wallet,
};

/// Software wallet holding one derived key per chain.
#[derive(Clone)]
pub struct LocalKeyProvider {
    seed: SeedPhrase,
    name: String,
    wallets: BTreeMap<String, Wallet>,
}

impl std::fmt::Debug for LocalKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyProvider")
            .field("name", &self.name)
            .field("wallets", &self.wallets)
            .finish()
    }
}

impl LocalKeyProvider {
    /// A provider with no chains enabled yet.
    pub fn new(seed: SeedPhrase, name: impl Into<String>) -> Self {
        LocalKeyProvider {
            seed,
            name: name.into(),
            wallets: BTreeMap::new(),
        }
    }

    /// Derive the key for `chain_id` with the given address prefix.
    pub fn add_chain(
        &mut self,
        chain_id: impl Into<String>,
        hrp: AddressHrp,
    ) -> Result<(), WalletError> {
        let wallet = self.seed.with_hrp(hrp)?;
        self.wallets.insert(chain_id.into(), wallet);
        Ok(())
    }

    /// The key used for `chain_id`.
    pub fn wallet(&self, chain_id: &str) -> Result<&Wallet, ExtensionError> {
        self.wallets
            .get(chain_id)
            .ok_or_else(|| ExtensionError::UnknownChain {
                chain_id: chain_id.to_owned(),
            })
    }

    /// Chains with a derived key.
    pub fn chain_ids(&self) -> impl Iterator<Item = &str> {
        self.wallets.keys().map(String::as_str)
    }

    fn extension_account(&self, chain_id: &str) -> Result<ExtensionAccount, ExtensionError> {
        let wallet = self.wallet(chain_id)?;
        Ok(ExtensionAccount {
            name: self.name.clone(),
            address: wallet.get_address().to_string(),
            public_key: wallet.public_key_bytes().to_vec(),
            is_ledger: false,
            is_ethermint: false,
        })
    }

    fn signing_wallet(
        &self,
        chain_id: &str,
        doc_chain_id: &str,
    ) -> Result<&Wallet, ExtensionError> {
        if chain_id != doc_chain_id {
            return Err(ExtensionError::SigningFailed {
                message: format!("Document is for {doc_chain_id}, request is for {chain_id}"),
            });
        }
        self.wallet(chain_id)
    }

    /// Find the wallet for a relay request and check it owns `signer`.
    fn relay_wallet(&self, chain_id: &str, signer: &str) -> Result<&Wallet, JsonRpcError> {
        let wallet = self.wallet(chain_id).map_err(invalid_params)?;
        if wallet.get_address().to_string() != signer {
            return Err(JsonRpcError::new(
                JsonRpcError::INVALID_PARAMS,
                format!("Unknown signer {signer} on {chain_id}"),
            ));
        }
        Ok(wallet)
    }

    fn cosmostation_account(&self, chain_id: &str) -> Result<CosmostationAccount, JsonRpcError> {
        let wallet = self.wallet(chain_id).map_err(invalid_params)?;
        let address = wallet.get_address();
        Ok(CosmostationAccount {
            address: address.raw().as_ref().to_vec(),
            algo: crate::account::Algo::Secp256k1.to_string(),
            bech32_address: address.to_string(),
            is_nano_ledger: false,
            name: self.name.clone(),
            pub_key: wallet.public_key_bytes().to_vec(),
        })
    }
}

fn invalid_params(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(JsonRpcError::INVALID_PARAMS, e.to_string())
}

fn to_result(value: impl serde::Serialize) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, e.to_string()))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespacedSign<Doc> {
    signer_address: String,
    sign_doc: Doc,
}

impl ExtensionProvider for LocalKeyProvider {
    async fn request_account(&self, chain_id: &str) -> Result<ExtensionAccount, ExtensionError> {
        self.extension_account(chain_id)
    }

    async fn get_account(&self, chain_id: &str) -> Result<ExtensionAccount, ExtensionError> {
        self.extension_account(chain_id)
    }

    async fn sign_amino(
        &self,
        chain_id: &str,
        doc: &StdSignDoc,
    ) -> Result<ExtensionAminoResponse, ExtensionError> {
        let response = self
            .signing_wallet(chain_id, &doc.chain_id)?
            .sign_amino(doc)
            .map_err(|e| ExtensionError::SigningFailed {
                message: e.to_string(),
            })?;
        Ok(ExtensionAminoResponse {
            signature: response.signature.signature,
            pub_key: response.signature.pub_key,
            signed_doc: response.signed,
        })
    }

    async fn sign_direct(
        &self,
        chain_id: &str,
        doc: &ExtensionDirectDoc,
    ) -> Result<ExtensionDirectResponse, ExtensionError> {
        let wallet = self.signing_wallet(chain_id, &doc.chain_id)?;
        let response = wallet.sign_direct(&DirectSignDoc::from(doc.clone()));
        Ok(ExtensionDirectResponse {
            signature: response.signature.signature,
            pub_key: response.signature.pub_key,
            signed_doc: doc.clone(),
        })
    }
}

impl WalletApp for LocalKeyProvider {
    async fn session_addresses(&self, chain_id: &str) -> Result<Vec<Address>, JsonRpcError> {
        self.wallet(chain_id)
            .map(|wallet| vec![wallet.get_address()])
            .map_err(|e| JsonRpcError::new(JsonRpcError::USER_REJECTED, e.to_string()))
    }

    async fn handle_request(
        &self,
        chain_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<Value, JsonRpcError> {
        tracing::debug!("Local wallet handling {method}");
        match method {
            ACCOUNTS_V1 => {
                let chain_ids: Vec<String> =
                    serde_json::from_value(params).map_err(invalid_params)?;
                let accounts = chain_ids
                    .iter()
                    .map(|chain_id| self.cosmostation_account(chain_id))
                    .collect::<Result<Vec<_>, _>>()?;
                to_result(accounts)
            }
            SIGN_TX_V1 => {
                let (chain_id, signer, doc): (String, String, StdSignDoc) =
                    serde_json::from_value(params).map_err(invalid_params)?;
                let response = self
                    .relay_wallet(&chain_id, &signer)?
                    .sign_amino(&doc)
                    .map_err(|e| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, e.to_string()))?;
                to_result([response])
            }
            COSMOS_SIGN_AMINO => {
                let chain_id = chain_id.ok_or_else(|| invalid_params("Missing chainId"))?;
                let NamespacedSign {
                    signer_address,
                    sign_doc,
                }: NamespacedSign<StdSignDoc> =
                    serde_json::from_value(params).map_err(invalid_params)?;
                let response = self
                    .relay_wallet(chain_id, &signer_address)?
                    .sign_amino(&sign_doc)
                    .map_err(|e| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, e.to_string()))?;
                to_result(response)
            }
            COSMOS_SIGN_DIRECT => {
                let chain_id = chain_id.ok_or_else(|| invalid_params("Missing chainId"))?;
                let NamespacedSign {
                    signer_address,
                    sign_doc,
                }: NamespacedSign<DirectSignDoc> =
                    serde_json::from_value(params).map_err(invalid_params)?;
                to_result(
                    self.relay_wallet(chain_id, &signer_address)?
                        .sign_direct(&sign_doc),
                )
            }
            _ => Err(JsonRpcError::new(
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Unsupported method {method}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign_doc::{make_sign_doc, StdFee};

    fn provider() -> LocalKeyProvider {
        let mut provider = LocalKeyProvider::new(
            "dilemma flavor noise circle voyage vacant amateur mass morning tunnel unhappy entire"
                .parse()
                .unwrap(),
            "local",
        );
        provider
            .add_chain("osmosis-1", AddressHrp::from_static("osmo"))
            .unwrap();
        provider
    }

    #[tokio::test]
    async fn unknown_chain() {
        let err = provider().request_account("juno-1").await.unwrap_err();
        assert!(matches!(err, ExtensionError::UnknownChain { .. }));
    }

    #[tokio::test]
    async fn extension_account() {
        let account = provider().get_account("osmosis-1").await.unwrap();
        assert_eq!(account.address, "osmo1t3mvqjxvfxlstyzfskl37zqgu5ftq0rttpqqc5");
        assert_eq!(account.public_key.len(), 33);
        assert_eq!(account.name, "local");
    }

    #[tokio::test]
    async fn refuses_mismatched_chain() {
        let doc = make_sign_doc(vec![], StdFee::new(vec![], 1), "juno-1", "", 0, 0);
        let err = provider().sign_amino("osmosis-1", &doc).await.unwrap_err();
        assert!(matches!(err, ExtensionError::SigningFailed { .. }));
    }

    #[tokio::test]
    async fn legacy_accounts_reply() {
        let reply = provider()
            .handle_request(None, ACCOUNTS_V1, serde_json::json!(["osmosis-1"]))
            .await
            .unwrap();
        let accounts: Vec<CosmostationAccount> = serde_json::from_value(reply).unwrap();
        assert_eq!(
            accounts[0].bech32_address,
            "osmo1t3mvqjxvfxlstyzfskl37zqgu5ftq0rttpqqc5"
        );
        assert_eq!(accounts[0].address.len(), 20);
    }

    #[tokio::test]
    async fn wrong_signer_is_invalid_params() {
        let doc = make_sign_doc(vec![], StdFee::new(vec![], 1), "osmosis-1", "", 0, 0);
        let err = provider()
            .handle_request(
                None,
                SIGN_TX_V1,
                serde_json::json!(["osmosis-1", "osmo1someoneelse", doc]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method() {
        let err = provider()
            .handle_request(None, "eth_sign", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, JsonRpcError::METHOD_NOT_FOUND);
    }
}
