use std::{fmt::Display, sync::Arc};

use cosmos_sdk_proto::{
    cosmos::{bank::v1beta1::MsgSend, base::v1beta1::Coin, tx::v1beta1::TxBody},
    cosmwasm::wasm::v1::MsgExecuteContract,
};
use prost::Message;

use crate::{
    error::StringOrBytes,
    sign_doc::{AminoCoin, AminoMsg},
    HasAddress,
};

/// Transaction builder
///
/// Collects the messages and memo of a transaction. Signing and broadcasting
/// is done by [crate::SigningClient].
#[derive(Default, Clone, Debug)]
pub struct TxBuilder {
    pub(crate) messages: Vec<Arc<TxMessage>>,
    pub(crate) memo: Option<String>,
}

impl Display for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(memo) = &self.memo {
            writeln!(f, "Memo: {memo}")?;
        }
        for (idx, msg) in self.messages.iter().enumerate() {
            write!(f, "Message {idx}: {}", msg.description)?;
            if idx + 1 < self.messages.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl TxBuilder {
    /// Add a message to this transaction.
    pub fn add_message(&mut self, msg: impl Into<TxMessage>) -> &mut Self {
        self.messages.push(msg.into().into());
        self
    }

    /// Add a bank send message.
    pub fn add_send_message(
        &mut self,
        from: impl HasAddress,
        to: impl HasAddress,
        amount: Vec<Coin>,
    ) -> &mut Self {
        self.add_message(MsgSend {
            from_address: from.get_address_string(),
            to_address: to.get_address_string(),
            amount,
        })
    }

    /// Add an execute message on a contract.
    pub fn add_execute_message(
        &mut self,
        contract: impl HasAddress,
        wallet: impl HasAddress,
        funds: Vec<Coin>,
        msg: impl serde::Serialize,
    ) -> Result<&mut Self, serde_json::Error> {
        Ok(self.add_message(MsgExecuteContract {
            sender: wallet.get_address_string(),
            contract: contract.get_address_string(),
            msg: serde_json::to_vec(&msg)?,
            funds,
        }))
    }

    /// Set the memo field.
    pub fn set_memo(&mut self, memo: impl Into<String>) -> &mut Self {
        self.memo = Some(memo.into());
        self
    }

    /// Clear the memo field
    pub fn clear_memo(&mut self) -> &mut Self {
        self.memo = None;
        self
    }

    /// Either set or clear the memo field.
    pub fn set_optional_memo(&mut self, memo: impl Into<Option<String>>) -> &mut Self {
        self.memo = memo.into();
        self
    }

    /// The memo, or an empty string.
    pub fn memo(&self) -> &str {
        self.memo.as_deref().unwrap_or_default()
    }

    /// Number of messages added so far.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn make_tx_body(&self) -> TxBody {
        TxBody {
            messages: self.messages.iter().map(|msg| msg.get_protobuf()).collect(),
            memo: self.memo().to_owned(),
            timeout_height: 0,
            extension_options: vec![],
            non_critical_extension_options: vec![],
        }
    }

    /// Amino forms of every message, failing on the first message without one.
    pub fn amino_msgs(&self) -> Result<Vec<AminoMsg>, crate::Error> {
        self.messages
            .iter()
            .map(|msg| {
                msg.amino
                    .clone()
                    .ok_or_else(|| crate::Error::AminoUnsupported {
                        type_url: msg.type_url.clone(),
                    })
            })
            .collect()
    }
}

/// A message to include in a transaction.
///
/// Carries the protobuf encoding used for direct signing and broadcasting,
/// plus the Amino JSON form when the message has one.
#[derive(Debug)]
pub struct TxMessage {
    type_url: String,
    value: Vec<u8>,
    amino: Option<AminoMsg>,
    description: String,
}

impl TxMessage {
    /// Generate a new [TxMessage] without an Amino form.
    pub fn new(
        type_url: impl Into<String>,
        value: Vec<u8>,
        description: impl Into<String>,
    ) -> Self {
        TxMessage {
            type_url: type_url.into(),
            value,
            amino: None,
            description: description.into(),
        }
    }

    /// Attach the Amino JSON form of this message.
    pub fn with_amino(mut self, amino: AminoMsg) -> Self {
        self.amino = Some(amino);
        self
    }

    /// Protobuf type URL.
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// Amino form, if any.
    pub fn amino(&self) -> Option<&AminoMsg> {
        self.amino.as_ref()
    }

    /// Get an [cosmos_sdk_proto::Any] value for including in a protobuf message.
    pub fn get_protobuf(&self) -> cosmos_sdk_proto::Any {
        cosmos_sdk_proto::Any {
            type_url: self.type_url.clone(),
            value: self.value.clone(),
        }
    }

    /// Set the description, useful if the raw message is very large and makes error messages hard to parse.
    pub fn set_description(&mut self, desc: impl Into<String>) {
        self.description = desc.into();
    }
}

fn amino_coins(coins: &[Coin]) -> Vec<AminoCoin> {
    coins.iter().cloned().map(AminoCoin::from).collect()
}

impl From<MsgSend> for TxMessage {
    fn from(msg: MsgSend) -> Self {
        let amino = AminoMsg {
            type_: "cosmos-sdk/MsgSend".to_owned(),
            value: serde_json::json!({
                "amount": amino_coins(&msg.amount),
                "from_address": msg.from_address,
                "to_address": msg.to_address,
            }),
        };
        TxMessage::new(
            "/cosmos.bank.v1beta1.MsgSend",
            msg.encode_to_vec(),
            format!(
                "{} sending {} to {}",
                msg.from_address,
                PrettyCoins(msg.amount.as_slice()),
                msg.to_address,
            ),
        )
        .with_amino(amino)
    }
}

impl From<MsgExecuteContract> for TxMessage {
    fn from(msg: MsgExecuteContract) -> Self {
        // Amino embeds the contract message as JSON, so only JSON payloads qualify.
        let amino = serde_json::from_slice::<serde_json::Value>(&msg.msg)
            .ok()
            .map(|inner| AminoMsg {
                type_: "wasm/MsgExecuteContract".to_owned(),
                value: serde_json::json!({
                    "contract": msg.contract,
                    "funds": amino_coins(&msg.funds),
                    "msg": inner,
                    "sender": msg.sender,
                }),
            });
        let mut txmsg = TxMessage::new(
            "/cosmwasm.wasm.v1.MsgExecuteContract",
            msg.encode_to_vec(),
            format!(
                "{} executing contract {} with message: {}",
                msg.sender,
                msg.contract,
                StringOrBytes(msg.msg)
            ),
        );
        txmsg.amino = amino;
        txmsg
    }
}

struct PrettyCoins<'a>(&'a [Coin]);

impl Display for PrettyCoins<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (idx, Coin { denom, amount }) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{amount}{denom}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_has_amino_form() {
        let mut builder = TxBuilder::default();
        builder.add_message(MsgSend {
            from_address: "cosmos1from".to_owned(),
            to_address: "cosmos1to".to_owned(),
            amount: vec![Coin {
                denom: "uatom".to_owned(),
                amount: "1".to_owned(),
            }],
        });
        let amino = builder.amino_msgs().unwrap();
        assert_eq!(amino.len(), 1);
        assert_eq!(amino[0].type_, "cosmos-sdk/MsgSend");
        assert_eq!(amino[0].value["amount"][0]["amount"], "1");
        assert_eq!(builder.to_string(), "Message 0: cosmos1from sending 1uatom to cosmos1to");
    }

    #[test]
    fn execute_embeds_json_message() {
        let msg: TxMessage = MsgExecuteContract {
            sender: "juno1sender".to_owned(),
            contract: "juno1contract".to_owned(),
            msg: br#"{"transfer":{"amount":"1","recipient":"juno1to"}}"#.to_vec(),
            funds: vec![],
        }
        .into();
        let amino = msg.amino().unwrap();
        assert_eq!(amino.type_, "wasm/MsgExecuteContract");
        assert_eq!(amino.value["msg"]["transfer"]["recipient"], "juno1to");
    }

    #[test]
    fn raw_message_blocks_amino() {
        let mut builder = TxBuilder::default();
        builder.add_message(TxMessage::new("/custom.Msg", vec![1, 2, 3], "custom"));
        builder.set_memo("hello");
        match builder.amino_msgs() {
            Err(crate::Error::AminoUnsupported { type_url }) => assert_eq!(type_url, "/custom.Msg"),
            other => panic!("unexpected {other:?}"),
        }
        let body = builder.make_tx_body();
        assert_eq!(body.memo, "hello");
        assert_eq!(body.messages[0].type_url, "/custom.Msg");
    }
}
