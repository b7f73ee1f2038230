use serde::de::DeserializeOwned;

use crate::{
    account::{AccountData, Algo, CosmostationAccount},
    error::{RelayError, SignerError},
    relay::{
        connect_session,
        namespace::{NamespaceAccount, NamespaceRequest, COSMOS_NAMESPACE},
        BootstrapOptions, JsonRpcRequest, QrModal, RelayConfig, RelayProtocol, RelayTransport,
        Session, ACCOUNTS_V1, COSMOS_SIGN_DIRECT, SIGN_TX_V1,
    },
    sign_doc::{AminoSignResponse, DirectSignDoc, DirectSignResponse, StdSignDoc},
    Address, OfflineSigner,
};

/// Signs by forwarding requests to the mobile app over a relay session.
pub struct MobileSigner<R> {
    transport: R,
    chain_id: String,
    session: Session,
}

impl<R: RelayTransport> MobileSigner<R> {
    /// Bootstrap a fresh session for `chain_id` and wrap it.
    pub async fn connect<M: QrModal>(
        transport: R,
        modal: &M,
        chain_id: impl Into<String>,
        config: &RelayConfig,
        options: &BootstrapOptions,
    ) -> Result<Self, SignerError> {
        let chain_id = chain_id.into();
        let session = connect_session(
            &transport,
            modal,
            config,
            std::slice::from_ref(&chain_id),
            options,
        )
        .await?;
        Ok(MobileSigner {
            transport,
            chain_id,
            session,
        })
    }

    async fn request<T: DeserializeOwned>(&self, request: JsonRpcRequest) -> Result<T, RelayError> {
        let method = request.inner_method().to_owned();
        tracing::debug!("Sending relay request {method} (id {})", request.id);
        let reply = self.transport.send_custom_request(request).await?;
        serde_json::from_value(reply).map_err(|source| RelayError::InvalidReply {
            method,
            source: source.into(),
        })
    }
}

impl<R> MobileSigner<R> {
    /// Accounts the wallet granted for our chain when the namespaced session was approved.
    ///
    /// Public keys are not part of the grant and are left empty.
    fn session_accounts(&self) -> Result<Vec<AccountData>, SignerError> {
        let mut accounts = vec![];
        for account in &self.session.accounts {
            let account = account
                .parse::<NamespaceAccount>()
                .map_err(get_account_error)?;
            if account.namespace == COSMOS_NAMESPACE && account.chain_id == self.chain_id {
                accounts.push(AccountData {
                    address: account.address,
                    pubkey: vec![],
                    algo: Algo::Secp256k1,
                });
            }
        }
        Ok(accounts)
    }

    /// Chain every request is made for.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// The session established on connect.
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[allow(missing_docs)]
    pub fn transport(&self) -> &R {
        &self.transport
    }
}

fn get_account_error(e: impl std::error::Error + Send + Sync + 'static) -> SignerError {
    tracing::warn!("Mobile wallet account request failed: {e}");
    SignerError::get_account(e)
}

fn sign_error(e: impl std::error::Error + Send + Sync + 'static) -> SignerError {
    tracing::warn!("Mobile wallet signing failed: {e}");
    SignerError::sign(e)
}

impl<R: RelayTransport> OfflineSigner for MobileSigner<R> {
    async fn get_accounts(&self) -> Result<Vec<AccountData>, SignerError> {
        match self.session.protocol {
            RelayProtocol::Legacy => {
                let accounts: Vec<CosmostationAccount> = self
                    .request(JsonRpcRequest::new(
                        ACCOUNTS_V1,
                        serde_json::json!([self.chain_id]),
                    ))
                    .await
                    .map_err(get_account_error)?;
                accounts
                    .into_iter()
                    .map(|account| {
                        let address = account
                            .bech32_address
                            .parse::<Address>()
                            .map_err(get_account_error)?;
                        Ok::<_, SignerError>(AccountData {
                            address,
                            pubkey: account.pub_key,
                            algo: Algo::Secp256k1,
                        })
                    })
                    .collect()
            }
            RelayProtocol::Namespaced => self.session_accounts(),
        }
    }

    async fn sign_amino(
        &self,
        signer_address: Address,
        doc: &StdSignDoc,
    ) -> Result<AminoSignResponse, SignerError> {
        match self.session.protocol {
            RelayProtocol::Legacy => {
                let replies: Vec<AminoSignResponse> = self
                    .request(JsonRpcRequest::new(
                        SIGN_TX_V1,
                        serde_json::json!([self.chain_id, signer_address.to_string(), doc]),
                    ))
                    .await
                    .map_err(sign_error)?;
                replies.into_iter().next().ok_or_else(|| {
                    sign_error(RelayError::EmptyReply {
                        method: SIGN_TX_V1.to_owned(),
                    })
                })
            }
            RelayProtocol::Namespaced => {
                let request = NamespaceRequest::sign_amino(&self.chain_id, signer_address, doc)
                    .map_err(sign_error)?;
                self.request(request).await.map_err(sign_error)
            }
        }
    }

    async fn sign_direct(
        &self,
        signer_address: Address,
        doc: &DirectSignDoc,
    ) -> Result<DirectSignResponse, SignerError> {
        match self.session.protocol {
            RelayProtocol::Legacy => Err(sign_error(RelayError::UnsupportedMethod {
                method: COSMOS_SIGN_DIRECT.to_owned(),
                protocol: RelayProtocol::Legacy,
            })),
            RelayProtocol::Namespaced => {
                let request = NamespaceRequest::sign_direct(&self.chain_id, signer_address, doc)
                    .map_err(sign_error)?;
                self.request(request).await.map_err(sign_error)
            }
        }
    }
}
