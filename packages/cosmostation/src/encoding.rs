//! Serde helpers for byte fields exchanged with wallets.
//!
//! Browser wallets serialize `Uint8Array` values inconsistently: as base64
//! strings, as plain JSON arrays, or as objects keyed by index. Readers here
//! accept all three, writers always emit base64.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum BytesRepr {
    Base64(String),
    List(Vec<u8>),
    Indexed(BTreeMap<String, u8>),
}

fn from_repr<E: serde::de::Error>(repr: BytesRepr) -> Result<Vec<u8>, E> {
    match repr {
        BytesRepr::Base64(s) => STANDARD.decode(s.as_bytes()).map_err(E::custom),
        BytesRepr::List(bytes) => Ok(bytes),
        BytesRepr::Indexed(map) => {
            let mut indexed = map
                .into_iter()
                .map(|(key, byte)| key.parse::<usize>().map(|idx| (idx, byte)))
                .collect::<Result<Vec<_>, _>>()
                .map_err(E::custom)?;
            indexed.sort_by_key(|(idx, _)| *idx);
            Ok(indexed.into_iter().map(|(_, byte)| byte).collect())
        }
    }
}

/// Use with `#[serde(with = "crate::encoding::bytes")]`.
pub(crate) mod bytes {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        from_repr(BytesRepr::deserialize(deserializer)?)
    }
}

/// Numbers that some wallets send as strings and others as JSON numbers.
pub(crate) mod u64_string {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub(crate) fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(x) => Ok(x),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Holder {
        #[serde(with = "super::bytes")]
        data: Vec<u8>,
        #[serde(with = "super::u64_string")]
        number: u64,
    }

    #[test]
    fn accepts_all_byte_shapes() {
        let expected = Holder {
            data: vec![1, 2, 3],
            number: 7,
        };
        for input in [
            r#"{"data":"AQID","number":"7"}"#,
            r#"{"data":[1,2,3],"number":7}"#,
            r#"{"data":{"2":3,"0":1,"1":2},"number":"7"}"#,
        ] {
            let parsed: Holder = serde_json::from_str(input).unwrap();
            assert_eq!(parsed, expected, "{input}");
        }
    }

    #[test]
    fn writes_base64_and_string_numbers() {
        let holder = Holder {
            data: vec![1, 2, 3],
            number: 7,
        };
        assert_eq!(
            serde_json::to_string(&holder).unwrap(),
            r#"{"data":"AQID","number":"7"}"#
        );
    }
}
