use crate::{
    account::{AccountData, Algo},
    error::{ExtensionError, SignerError},
    extension::{ExtensionDirectDoc, ExtensionProvider},
    sign_doc::{AminoSignResponse, DirectSignDoc, DirectSignResponse, StdSignDoc},
    Address, OfflineSigner,
};

/// Signs through an injected extension provider.
///
/// Every provider failure surfaces as [SignerError::ExtensionInstall].
pub struct ExtensionSigner<P> {
    provider: P,
    chain_id: String,
}

fn install_error(chain_id: &str, action: &str, e: ExtensionError) -> SignerError {
    tracing::warn!("Extension {action} failed for {chain_id}: {e}");
    SignerError::extension_install(e)
}

impl<P: ExtensionProvider> ExtensionSigner<P> {
    /// Ask the provider for an account on `chain_id`.
    pub async fn connect(provider: P, chain_id: impl Into<String>) -> Result<Self, SignerError> {
        let chain_id = chain_id.into();
        let account = provider
            .request_account(&chain_id)
            .await
            .map_err(|e| install_error(&chain_id, "account request", e))?;
        tracing::info!(
            "Extension connected for {chain_id} with account {}",
            account.address
        );
        Ok(ExtensionSigner { provider, chain_id })
    }
}

impl<P> ExtensionSigner<P> {
    /// Chain every request is made for.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    #[allow(missing_docs)]
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: ExtensionProvider> OfflineSigner for ExtensionSigner<P> {
    async fn get_accounts(&self) -> Result<Vec<AccountData>, SignerError> {
        let account = self
            .provider
            .get_account(&self.chain_id)
            .await
            .map_err(|e| install_error(&self.chain_id, "get account", e))?;
        let address = account.address.parse::<Address>().map_err(|source| {
            install_error(
                &self.chain_id,
                "get account",
                ExtensionError::InvalidAddress {
                    address: account.address.clone(),
                    source,
                },
            )
        })?;
        Ok(vec![AccountData {
            address,
            pubkey: account.public_key,
            algo: Algo::Secp256k1,
        }])
    }

    async fn sign_amino(
        &self,
        signer_address: Address,
        doc: &StdSignDoc,
    ) -> Result<AminoSignResponse, SignerError> {
        tracing::debug!("Requesting Amino signature from extension for {signer_address}");
        let (signed, signature) = self
            .provider
            .sign_amino(&self.chain_id, doc)
            .await
            .map_err(|e| install_error(&self.chain_id, "Amino signing", e))?
            .into_parts();
        Ok(AminoSignResponse { signed, signature })
    }

    async fn sign_direct(
        &self,
        signer_address: Address,
        doc: &DirectSignDoc,
    ) -> Result<DirectSignResponse, SignerError> {
        tracing::debug!("Requesting direct signature from extension for {signer_address}");
        let (signed, signature) = self
            .provider
            .sign_direct(&self.chain_id, &ExtensionDirectDoc::from(doc))
            .await
            .map_err(|e| install_error(&self.chain_id, "direct signing", e))?
            .into_parts();
        Ok(DirectSignResponse { signed, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SignerErrorKind,
        extension::{ExtensionAccount, ExtensionAminoResponse, ExtensionDirectResponse},
        sign_doc::{make_sign_doc, StdFee},
        AddressHrp, HasAddress, LocalKeyProvider, SeedPhrase,
    };

    /// Connects fine but refuses to sign.
    struct RefusingProvider(LocalKeyProvider);

    impl ExtensionProvider for RefusingProvider {
        async fn request_account(&self, chain_id: &str) -> Result<ExtensionAccount, ExtensionError> {
            self.0.request_account(chain_id).await
        }

        async fn get_account(&self, _chain_id: &str) -> Result<ExtensionAccount, ExtensionError> {
            Ok(ExtensionAccount {
                name: "broken".to_owned(),
                address: "not-an-address".to_owned(),
                public_key: vec![],
                is_ledger: false,
                is_ethermint: false,
            })
        }

        async fn sign_amino(
            &self,
            _chain_id: &str,
            _doc: &StdSignDoc,
        ) -> Result<ExtensionAminoResponse, ExtensionError> {
            Err(ExtensionError::Rejected {
                message: "Rejected by user".to_owned(),
            })
        }

        async fn sign_direct(
            &self,
            _chain_id: &str,
            _doc: &ExtensionDirectDoc,
        ) -> Result<ExtensionDirectResponse, ExtensionError> {
            Err(ExtensionError::Rejected {
                message: "Rejected by user".to_owned(),
            })
        }
    }

    fn provider() -> LocalKeyProvider {
        let mut provider = LocalKeyProvider::new(SeedPhrase::random().unwrap(), "main");
        provider
            .add_chain("cosmoshub-4", AddressHrp::from_static("cosmos"))
            .unwrap();
        provider
    }

    fn doc() -> StdSignDoc {
        make_sign_doc(vec![], StdFee::new(vec![], 80000), "cosmoshub-4", "", 3, 7)
    }

    #[tokio::test]
    async fn unknown_chain_is_install_error() {
        let err = match ExtensionSigner::connect(provider(), "juno-1").await {
            Ok(_) => panic!("connected to an unknown chain"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), SignerErrorKind::ExtensionInstall);
        assert!(err.to_string().contains("juno-1"));
    }

    #[tokio::test]
    async fn single_secp256k1_account() {
        let provider = provider();
        let expected = provider.wallet("cosmoshub-4").unwrap().to_account_data();
        let signer = ExtensionSigner::connect(provider, "cosmoshub-4").await.unwrap();
        let accounts = signer.get_accounts().await.unwrap();
        assert_eq!(accounts, vec![expected]);
        assert_eq!(accounts[0].algo, Algo::Secp256k1);
    }

    #[tokio::test]
    async fn signs_with_chain_of_signer() {
        let signer = ExtensionSigner::connect(provider(), "cosmoshub-4").await.unwrap();
        let address = signer.provider().wallet("cosmoshub-4").unwrap().get_address();
        let response = signer.sign_amino(address, &doc()).await.unwrap();
        assert_eq!(response.signed, doc());
        assert_eq!(response.signature.signature_bytes().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn every_failure_is_install_error() {
        let signer = ExtensionSigner::connect(RefusingProvider(provider()), "cosmoshub-4")
            .await
            .unwrap();
        let address = signer.provider().0.wallet("cosmoshub-4").unwrap().get_address();

        let err = signer.get_accounts().await.unwrap_err();
        assert_eq!(err.kind(), SignerErrorKind::ExtensionInstall);

        let err = signer.sign_amino(address, &doc()).await.unwrap_err();
        assert_eq!(err.kind(), SignerErrorKind::ExtensionInstall);
        assert!(err.to_string().contains("Rejected by user"));

        let direct = DirectSignDoc {
            body_bytes: vec![],
            auth_info_bytes: vec![],
            chain_id: "cosmoshub-4".to_owned(),
            account_number: 3,
        };
        let err = signer.sign_direct(address, &direct).await.unwrap_err();
        assert_eq!(err.kind(), SignerErrorKind::ExtensionInstall);
    }
}
