//! Sign documents in both Cosmos SDK encodings, and the responses wallets return.

use std::fmt::Display;

use base64::{engine::general_purpose::STANDARD, Engine};
use cosmos_sdk_proto::cosmos::{base::v1beta1::Coin, tx::v1beta1::SignDoc};
use prost::Message;
use serde_json::Value;

/// A coin as it appears in Amino JSON.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct AminoCoin {
    #[allow(missing_docs)]
    pub denom: String,
    /// Integer amount, encoded as a string.
    pub amount: String,
}

impl AminoCoin {
    /// Convenience constructor.
    pub fn new(amount: impl Display, denom: impl Into<String>) -> Self {
        AminoCoin {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

impl Display for AminoCoin {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl From<AminoCoin> for Coin {
    fn from(AminoCoin { denom, amount }: AminoCoin) -> Self {
        Coin { denom, amount }
    }
}

impl From<Coin> for AminoCoin {
    fn from(Coin { denom, amount }: Coin) -> Self {
        AminoCoin { denom, amount }
    }
}

/// Fee section of an Amino sign document.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct StdFee {
    /// Coins paid for the fee.
    pub amount: Vec<AminoCoin>,
    /// Gas limit, encoded as a string.
    pub gas: String,
    /// Optional fee payer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    /// Optional fee granter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granter: Option<String>,
}

impl StdFee {
    /// A fee with the given coins and gas limit, no payer or granter.
    pub fn new(amount: Vec<AminoCoin>, gas_limit: u64) -> Self {
        StdFee {
            amount,
            gas: gas_limit.to_string(),
            payer: None,
            granter: None,
        }
    }

    /// Parse the gas limit back into a number.
    pub fn gas_limit(&self) -> Result<u64, std::num::ParseIntError> {
        self.gas.parse()
    }
}

/// A single Amino JSON message, e.g. `cosmos-sdk/MsgSend`.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct AminoMsg {
    /// Amino type name.
    #[serde(rename = "type")]
    pub type_: String,
    /// Message body.
    pub value: Value,
}

/// Build a `cosmos-sdk/MsgSend` transferring `amount` of `denom`.
pub fn make_amino_send_message(
    from: impl Display,
    to: impl Display,
    amount: impl Display,
    denom: impl Into<String>,
) -> AminoMsg {
    AminoMsg {
        type_: "cosmos-sdk/MsgSend".to_owned(),
        value: serde_json::json!({
            "amount": [AminoCoin::new(amount, denom)],
            "from_address": from.to_string(),
            "to_address": to.to_string(),
        }),
    }
}

/// Amino JSON sign document.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct StdSignDoc {
    #[allow(missing_docs)]
    pub chain_id: String,
    /// Account number, encoded as a string.
    pub account_number: String,
    /// Account sequence, encoded as a string.
    pub sequence: String,
    #[allow(missing_docs)]
    pub fee: StdFee,
    #[allow(missing_docs)]
    pub msgs: Vec<AminoMsg>,
    #[allow(missing_docs)]
    pub memo: String,
}

/// Assemble a [StdSignDoc] from its parts.
pub fn make_sign_doc(
    msgs: Vec<AminoMsg>,
    fee: StdFee,
    chain_id: impl Into<String>,
    memo: impl Into<String>,
    account_number: u64,
    sequence: u64,
) -> StdSignDoc {
    StdSignDoc {
        chain_id: chain_id.into(),
        account_number: account_number.to_string(),
        sequence: sequence.to_string(),
        fee,
        msgs,
        memo: memo.into(),
    }
}

impl StdSignDoc {
    /// The exact bytes a wallet hashes and signs.
    ///
    /// Keys are sorted at every level, no whitespace is emitted, and `&`, `<`
    /// and `>` are escaped as unicode sequences.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let value = sort_value(serde_json::to_value(self)?);
        let json = serde_json::to_string(&value)?;
        Ok(escape_html_chars(&json).into_bytes())
    }

    /// Parse the sequence back into a number.
    pub fn sequence_number(&self) -> Result<u64, std::num::ParseIntError> {
        self.sequence.parse()
    }
}

fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_value(value)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_value).collect()),
        other => other,
    }
}

fn escape_html_chars(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '&' => out.push_str("\\u0026"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            c => out.push(c),
        }
    }
    out
}

/// Protobuf ("direct") sign document.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectSignDoc {
    /// Encoded `TxBody`.
    #[serde(with = "crate::encoding::bytes")]
    pub body_bytes: Vec<u8>,
    /// Encoded `AuthInfo`.
    #[serde(with = "crate::encoding::bytes")]
    pub auth_info_bytes: Vec<u8>,
    #[allow(missing_docs)]
    pub chain_id: String,
    #[allow(missing_docs)]
    #[serde(with = "crate::encoding::u64_string")]
    pub account_number: u64,
}

impl DirectSignDoc {
    /// The exact bytes a wallet hashes and signs.
    pub fn to_bytes(&self) -> Vec<u8> {
        SignDoc::from(self.clone()).encode_to_vec()
    }
}

impl From<DirectSignDoc> for SignDoc {
    fn from(doc: DirectSignDoc) -> Self {
        SignDoc {
            body_bytes: doc.body_bytes,
            auth_info_bytes: doc.auth_info_bytes,
            chain_id: doc.chain_id,
            account_number: doc.account_number,
        }
    }
}

impl From<SignDoc> for DirectSignDoc {
    fn from(doc: SignDoc) -> Self {
        DirectSignDoc {
            body_bytes: doc.body_bytes,
            auth_info_bytes: doc.auth_info_bytes,
            chain_id: doc.chain_id,
            account_number: doc.account_number,
        }
    }
}

/// Amino-encoded public key, e.g. `tendermint/PubKeySecp256k1`.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct PubKeyValue {
    /// Amino type name of the key.
    #[serde(rename = "type")]
    pub type_: String,
    /// Base64 key bytes.
    pub value: String,
}

impl PubKeyValue {
    /// Amino type for compressed secp256k1 keys.
    pub const SECP256K1: &'static str = "tendermint/PubKeySecp256k1";

    /// Wrap compressed secp256k1 public key bytes.
    pub fn secp256k1(pubkey: &[u8]) -> Self {
        PubKeyValue {
            type_: Self::SECP256K1.to_owned(),
            value: STANDARD.encode(pubkey),
        }
    }

    /// Decode the key bytes.
    pub fn key_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.value)
    }
}

/// Signature plus the key that produced it.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct StdSignature {
    #[allow(missing_docs)]
    pub pub_key: PubKeyValue,
    /// Base64 encoded 64-byte compact signature.
    pub signature: String,
}

impl StdSignature {
    /// Build from raw bytes.
    pub fn new(pubkey: &[u8], signature: &[u8]) -> Self {
        StdSignature {
            pub_key: PubKeyValue::secp256k1(pubkey),
            signature: STANDARD.encode(signature),
        }
    }

    /// Decode the signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.signature)
    }
}

/// Result of an Amino signing request.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct AminoSignResponse {
    /// The document the wallet actually signed. Wallets may adjust fee or memo.
    pub signed: StdSignDoc,
    #[allow(missing_docs)]
    pub signature: StdSignature,
}

/// Result of a direct signing request.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct DirectSignResponse {
    /// The document the wallet actually signed.
    pub signed: DirectSignDoc,
    #[allow(missing_docs)]
    pub signature: StdSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> StdSignDoc {
        make_sign_doc(
            vec![make_amino_send_message(
                "cosmos1from",
                "cosmos1to",
                "1",
                "uatom",
            )],
            StdFee::new(vec![AminoCoin::new(0, "uatom")], 80000),
            "cosmoshub-4",
            "",
            12,
            3,
        )
    }

    #[test]
    fn canonical_bytes_are_sorted_and_compact() {
        let bytes = sample_doc().to_canonical_bytes().unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert_eq!(
            s,
            r#"{"account_number":"12","chain_id":"cosmoshub-4","fee":{"amount":[{"amount":"0","denom":"uatom"}],"gas":"80000"},"memo":"","msgs":[{"type":"cosmos-sdk/MsgSend","value":{"amount":[{"amount":"1","denom":"uatom"}],"from_address":"cosmos1from","to_address":"cosmos1to"}}],"sequence":"3"}"#
        );
    }

    #[test]
    fn canonical_bytes_escape_html() {
        let mut doc = sample_doc();
        doc.memo = "<a&b>".to_owned();
        let s = String::from_utf8(doc.to_canonical_bytes().unwrap()).unwrap();
        assert!(s.contains(r#""memo":"\u003ca\u0026b\u003e""#), "{s}");
    }

    #[test]
    fn direct_doc_json_shape() {
        let doc = DirectSignDoc {
            body_bytes: vec![1, 2],
            auth_info_bytes: vec![3],
            chain_id: "juno-1".to_owned(),
            account_number: 42,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["accountNumber"], "42");
        assert_eq!(value["bodyBytes"], "AQI=");
        let back: DirectSignDoc = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn fee_gas_limit() {
        let fee = StdFee::new(vec![], 500000);
        assert_eq!(fee.gas_limit().unwrap(), 500000);
        assert!(serde_json::to_value(&fee).unwrap().get("payer").is_none());
    }
}
