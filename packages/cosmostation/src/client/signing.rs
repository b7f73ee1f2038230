use std::{fmt::Display, str::FromStr, sync::Arc};

use cosmos_sdk_proto::{
    cosmos::{
        base::v1beta1::Coin,
        crypto::secp256k1::PubKey,
        tx::v1beta1::{mode_info, AuthInfo, Fee, ModeInfo, SignerInfo, TxBody, TxRaw},
    },
    Any,
};
use prost::Message;
use serde::de::DeserializeOwned;

use super::{txhash_for, BaseAccount, LcdClient, TxResponse};
use crate::{
    account::AccountData,
    error::{Action, BuilderError, TransactionStage},
    gas_price::calculate_fee,
    sign_doc::{
        make_sign_doc, AminoSignResponse, DirectSignDoc, DirectSignResponse, StdFee, StdSignDoc,
        StdSignature,
    },
    Address, ClientBuilder, HasAddress, OfflineSigner, TxBuilder,
};

/// How the transaction is signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SignMode {
    /// `SIGN_MODE_LEGACY_AMINO_JSON`, supported by every wallet backend.
    #[default]
    Amino,
    /// `SIGN_MODE_DIRECT`, protobuf sign documents.
    Direct,
}

impl SignMode {
    /// Protobuf enum value placed in `ModeInfo`.
    pub fn as_proto(self) -> i32 {
        match self {
            SignMode::Amino => 127,
            SignMode::Direct => 1,
        }
    }
}

impl Display for SignMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            SignMode::Amino => "amino",
            SignMode::Direct => "direct",
        })
    }
}

impl FromStr for SignMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amino" => Ok(SignMode::Amino),
            "direct" => Ok(SignMode::Direct),
            _ => Err(format!("Unknown sign mode {s:?}, expected amino or direct")),
        }
    }
}

/// A signed transaction ready for broadcast.
///
/// Only produced from a wallet's sign response.
#[derive(Clone, Debug)]
pub struct SignedTx {
    raw: TxRaw,
    mode: SignMode,
}

impl SignedTx {
    /// Protobuf encoded `TxRaw`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.encode_to_vec()
    }

    /// Hash the chain will report for this transaction.
    pub fn txhash(&self) -> String {
        txhash_for(&self.to_bytes())
    }

    #[allow(missing_docs)]
    pub fn mode(&self) -> SignMode {
        self.mode
    }

    /// The single signature included.
    pub fn signature(&self) -> &[u8] {
        self.raw
            .signatures
            .first()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Encoded `TxBody`, exactly as signed.
    pub fn body_bytes(&self) -> &[u8] {
        &self.raw.body_bytes
    }

    /// Encoded `AuthInfo`, exactly as signed.
    pub fn auth_info_bytes(&self) -> &[u8] {
        &self.raw.auth_info_bytes
    }
}

/// An empty `pubkey` leaves the key out, so the chain uses the one already on the account.
fn signer_info(pubkey: &[u8], sequence: u64, mode: SignMode) -> SignerInfo {
    SignerInfo {
        public_key: (!pubkey.is_empty()).then(|| Any {
            type_url: "/cosmos.crypto.secp256k1.PubKey".to_owned(),
            value: PubKey {
                key: pubkey.to_vec(),
            }
            .encode_to_vec(),
        }),
        mode_info: Some(ModeInfo {
            sum: Some(mode_info::Sum::Single(mode_info::Single {
                mode: mode.as_proto(),
            })),
        }),
        sequence,
    }
}

fn proto_fee(fee: &StdFee, action: &Action) -> Result<Fee, crate::Error> {
    Ok(Fee {
        amount: fee.amount.iter().cloned().map(Coin::from).collect(),
        gas_limit: fee
            .gas_limit()
            .map_err(|e| crate::Error::InvalidSignedDoc {
                message: format!("Invalid gas {:?} while {action}: {e}", fee.gas),
            })?,
        payer: fee.payer.clone().unwrap_or_default(),
        granter: fee.granter.clone().unwrap_or_default(),
    })
}

fn signature_bytes(signature: &StdSignature) -> Result<Vec<u8>, crate::Error> {
    signature
        .signature_bytes()
        .map_err(|source| crate::Error::InvalidSignature { source })
}

/// Build the Amino sign document for a transaction.
pub(crate) fn amino_sign_doc(
    txbuilder: &TxBuilder,
    fee: StdFee,
    chain_id: &str,
    base_account: &BaseAccount,
) -> Result<StdSignDoc, crate::Error> {
    Ok(make_sign_doc(
        txbuilder.amino_msgs()?,
        fee,
        chain_id,
        txbuilder.memo(),
        base_account.account_number,
        base_account.sequence,
    ))
}

/// Turn a wallet's Amino response into a transaction.
///
/// The wallet may change the fee and memo but not the messages or chain.
pub(crate) fn tx_from_amino(
    txbuilder: &TxBuilder,
    requested: &StdSignDoc,
    response: &AminoSignResponse,
    pubkey: &[u8],
) -> Result<SignedTx, crate::Error> {
    let signed = &response.signed;
    if signed.msgs != requested.msgs
        || signed.chain_id != requested.chain_id
        || signed.account_number != requested.account_number
    {
        return Err(crate::Error::InvalidSignedDoc {
            message: "Signed document does not match the requested messages, chain or account"
                .to_owned(),
        });
    }
    let sequence = signed
        .sequence_number()
        .map_err(|e| crate::Error::InvalidSignedDoc {
            message: format!("Invalid sequence {:?}: {e}", signed.sequence),
        })?;
    let action = Action::Sign(txbuilder.clone());
    let body = TxBody {
        memo: signed.memo.clone(),
        ..txbuilder.make_tx_body()
    };
    let auth_info = AuthInfo {
        signer_infos: vec![signer_info(pubkey, sequence, SignMode::Amino)],
        fee: Some(proto_fee(&signed.fee, &action)?),
        #[allow(deprecated)]
        tip: None,
    };
    Ok(SignedTx {
        raw: TxRaw {
            body_bytes: body.encode_to_vec(),
            auth_info_bytes: auth_info.encode_to_vec(),
            signatures: vec![signature_bytes(&response.signature)?],
        },
        mode: SignMode::Amino,
    })
}

/// Build the direct sign document for a transaction.
pub(crate) fn direct_sign_doc(
    txbuilder: &TxBuilder,
    fee: &StdFee,
    chain_id: &str,
    base_account: &BaseAccount,
    pubkey: &[u8],
) -> Result<DirectSignDoc, crate::Error> {
    let action = Action::Sign(txbuilder.clone());
    let auth_info = AuthInfo {
        signer_infos: vec![signer_info(pubkey, base_account.sequence, SignMode::Direct)],
        fee: Some(proto_fee(fee, &action)?),
        #[allow(deprecated)]
        tip: None,
    };
    Ok(DirectSignDoc {
        body_bytes: txbuilder.make_tx_body().encode_to_vec(),
        auth_info_bytes: auth_info.encode_to_vec(),
        chain_id: chain_id.to_owned(),
        account_number: base_account.account_number,
    })
}

/// Turn a wallet's direct response into a transaction.
pub(crate) fn tx_from_direct(
    requested: &DirectSignDoc,
    response: &DirectSignResponse,
) -> Result<SignedTx, crate::Error> {
    let signed = &response.signed;
    if signed.chain_id != requested.chain_id || signed.account_number != requested.account_number
    {
        return Err(crate::Error::InvalidSignedDoc {
            message: "Signed document does not match the requested chain or account".to_owned(),
        });
    }
    Ok(SignedTx {
        raw: TxRaw {
            body_bytes: signed.body_bytes.clone(),
            auth_info_bytes: signed.auth_info_bytes.clone(),
            signatures: vec![signature_bytes(&response.signature)?],
        },
        mode: SignMode::Direct,
    })
}

/// An [LcdClient] paired with an [OfflineSigner].
#[derive(Clone)]
pub struct SigningClient<S> {
    client: LcdClient,
    signer: S,
}

impl<S> std::fmt::Debug for SigningClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningClient")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl<S: OfflineSigner> SigningClient<S> {
    /// Build the LCD client and pair it with `signer`.
    pub fn connect_with_signer(builder: ClientBuilder, signer: S) -> Result<Self, BuilderError> {
        Ok(Self::new(builder.build()?, signer))
    }

    #[allow(missing_docs)]
    pub fn new(client: LcdClient, signer: S) -> Self {
        SigningClient { client, signer }
    }

    /// The read-only client.
    pub fn client(&self) -> &LcdClient {
        &self.client
    }

    #[allow(missing_docs)]
    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Fee for `gas_limit` (or the configured default) at the configured gas price.
    pub fn calculate_fee(&self, gas_limit: Option<u64>) -> Result<StdFee, crate::Error> {
        let builder = self.client.get_client_builder();
        let gas_price = builder.gas_price().ok_or(crate::Error::NoGasPrice)?;
        Ok(calculate_fee(
            gas_limit.unwrap_or_else(|| builder.gas_limit()),
            gas_price,
        ))
    }

    async fn find_account(&self, address: Address) -> Result<AccountData, crate::Error> {
        self.signer
            .get_accounts()
            .await?
            .into_iter()
            .find(|account| account.address == address)
            .ok_or(crate::Error::SignerAccountNotFound { address })
    }

    async fn prepare(
        &self,
        signer_address: Address,
    ) -> Result<(AccountData, BaseAccount), crate::Error> {
        let account = self.find_account(signer_address).await?;
        let base_account = self.client.get_base_account(signer_address).await?;
        Ok((account, base_account))
    }

    /// Have the wallet sign the Amino form of the transaction, without broadcasting.
    pub async fn sign_amino_only(
        &self,
        signer_address: impl HasAddress,
        txbuilder: &TxBuilder,
        fee: StdFee,
    ) -> Result<AminoSignResponse, crate::Error> {
        let signer_address = signer_address.get_address();
        let (_, base_account) = self.prepare(signer_address).await?;
        let doc = amino_sign_doc(
            txbuilder,
            fee,
            self.client.get_client_builder().chain_id(),
            &base_account,
        )?;
        Ok(self.signer.sign_amino(signer_address, &doc).await?)
    }

    /// Have the wallet sign the direct form of the transaction, without broadcasting.
    pub async fn sign_direct_only(
        &self,
        signer_address: impl HasAddress,
        txbuilder: &TxBuilder,
        fee: StdFee,
    ) -> Result<DirectSignResponse, crate::Error> {
        let signer_address = signer_address.get_address();
        let (account, base_account) = self.prepare(signer_address).await?;
        let doc = direct_sign_doc(
            txbuilder,
            &fee,
            self.client.get_client_builder().chain_id(),
            &base_account,
            &account.pubkey,
        )?;
        Ok(self.signer.sign_direct(signer_address, &doc).await?)
    }

    /// Sign the transaction through the wallet and assemble the raw transaction.
    pub async fn sign(
        &self,
        signer_address: impl HasAddress,
        txbuilder: &TxBuilder,
        fee: StdFee,
        mode: SignMode,
    ) -> Result<SignedTx, crate::Error> {
        let signer_address = signer_address.get_address();
        let (account, base_account) = self.prepare(signer_address).await?;
        let chain_id = self.client.get_client_builder().chain_id();
        tracing::debug!(
            "Signing {} message(s) for {signer_address} in {mode} mode",
            txbuilder.message_count()
        );
        match mode {
            SignMode::Amino => {
                let doc = amino_sign_doc(txbuilder, fee, chain_id, &base_account)?;
                let response = self.signer.sign_amino(signer_address, &doc).await?;
                let pubkey = if account.pubkey.is_empty() {
                    response
                        .signature
                        .pub_key
                        .key_bytes()
                        .map_err(|source| crate::Error::InvalidSignature { source })?
                } else {
                    account.pubkey
                };
                tx_from_amino(txbuilder, &doc, &response, &pubkey)
            }
            SignMode::Direct => {
                let doc =
                    direct_sign_doc(txbuilder, &fee, chain_id, &base_account, &account.pubkey)?;
                let response = self.signer.sign_direct(signer_address, &doc).await?;
                tx_from_direct(&doc, &response)
            }
        }
    }

    /// Sign, broadcast, and wait for the transaction to land in a block.
    ///
    /// A non-zero code at either stage is reported as [crate::Error::TransactionFailed].
    pub async fn sign_and_broadcast(
        &self,
        signer_address: impl HasAddress,
        txbuilder: &TxBuilder,
        fee: StdFee,
        mode: SignMode,
    ) -> Result<TxResponse, crate::Error> {
        let signed = self.sign(signer_address, txbuilder, fee, mode).await?;
        let action = Action::Broadcast(txbuilder.clone());
        let res = self
            .client
            .broadcast_tx_with_action(&signed.to_bytes(), action.clone())
            .await?;
        self.check_code(&res, &action, TransactionStage::Broadcast)?;
        tracing::info!("Broadcast transaction {}", res.txhash);

        let res = self.client.wait_for_transaction(res.txhash).await?;
        self.check_code(&res, &action, TransactionStage::Wait)?;
        tracing::info!(
            "Transaction {} included at height {}, gas used {}",
            res.txhash,
            res.height,
            res.gas_used
        );
        Ok(res)
    }

    fn check_code(
        &self,
        res: &TxResponse,
        action: &Action,
        stage: TransactionStage,
    ) -> Result<(), crate::Error> {
        if res.code == 0 {
            return Ok(());
        }
        Err(crate::Error::TransactionFailed {
            code: res.code.into(),
            txhash: res.txhash.clone(),
            raw_log: res.raw_log.clone(),
            action: Arc::new(action.clone()),
            lcd_url: self.client.lcd_url(),
            stage,
        })
    }

    /// Bank transfer from `from` to `to` using the default fee.
    pub async fn send_tokens(
        &self,
        from: impl HasAddress,
        to: impl HasAddress,
        amount: Vec<Coin>,
        memo: Option<String>,
        mode: SignMode,
    ) -> Result<TxResponse, crate::Error> {
        let from = from.get_address();
        let mut txbuilder = TxBuilder::default();
        txbuilder
            .add_send_message(from, to, amount)
            .set_optional_memo(memo);
        let fee = self.calculate_fee(None)?;
        self.sign_and_broadcast(from, &txbuilder, fee, mode).await
    }

    /// Execute a CosmWasm contract using the default fee.
    pub async fn execute(
        &self,
        sender: impl HasAddress,
        contract: impl HasAddress,
        msg: &impl serde::Serialize,
        funds: Vec<Coin>,
        mode: SignMode,
    ) -> Result<TxResponse, crate::Error> {
        let sender = sender.get_address();
        let mut txbuilder = TxBuilder::default();
        txbuilder.add_execute_message(contract, sender, funds, msg)?;
        let fee = self.calculate_fee(None)?;
        self.sign_and_broadcast(sender, &txbuilder, fee, mode).await
    }

    /// See [LcdClient::query_contract_smart].
    pub async fn query_contract_smart<T: DeserializeOwned>(
        &self,
        contract: impl HasAddress,
        msg: &impl serde::Serialize,
    ) -> Result<T, crate::Error> {
        self.client.query_contract_smart(contract, msg).await
    }
}
