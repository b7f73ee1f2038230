use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::hashes::{ripemd160, sha256, Hash};
use bitcoin::secp256k1::{All, Message, Secp256k1, SecretKey};
use rand::RngCore;

use crate::account::{AccountData, Algo};
use crate::address::{AddressHrp, HasAddressHrp, RawAddress};
use crate::error::WalletError;
use crate::sign_doc::{
    AminoSignResponse, DirectSignDoc, DirectSignResponse, StdSignDoc, StdSignature,
};
use crate::{Address, HasAddress};

/// A seed phrase for a wallet, together with an optional derivation path.
///
/// The derivation path can be provided before the seed phrase to override the default derivation path.
#[derive(Clone)]
pub struct SeedPhrase {
    /// The mnemonic seed phrase itself, used for deriving private keys.
    pub mnemonic: bip39::Mnemonic,
    /// The override derivation path to use when deriving private keys.
    pub derivation_path: Option<Arc<DerivationPath>>,
}

/// Derivation path used by Cosmos SDK chains for the given account index.
pub fn cosmos_derivation_path(index: u32) -> Result<DerivationPath, WalletError> {
    let path = format!("m/44'/118'/0'/0/{index}");
    path.parse()
        .map_err(|source| WalletError::InvalidDerivationPath { path, source })
}

impl SeedPhrase {
    /// Generate a random [SeedPhrase].
    pub fn random() -> Result<SeedPhrase, WalletError> {
        let mut entropy = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut entropy);
        let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
            .map_err(|source| WalletError::InvalidPhrase { source })?;
        Ok(mnemonic.into())
    }

    /// Generate the seed phrase itself.
    ///
    /// Note that this should be considered security-sensitive content.
    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    /// Make a new [SeedPhrase] using a Cosmos derivation path and the given index.
    pub fn with_cosmos_numbered(mut self, index: u32) -> Result<Self, WalletError> {
        self.derivation_path = Some(Arc::new(cosmos_derivation_path(index)?));
        Ok(self)
    }

    /// Generate a new [Wallet] with the given HRP.
    ///
    /// Uses the Cosmos derivation path at index 0 unless `self` overrides it.
    pub fn with_hrp(&self, hrp: AddressHrp) -> Result<Wallet, WalletError> {
        let root_private_key =
            Xpriv::new_master(bitcoin::Network::Bitcoin, &self.mnemonic.to_seed(""))
                .map_err(|source| WalletError::CouldNotGetRootPrivateKey { source })?;

        let derivation_path = match &self.derivation_path {
            Some(path) => path.clone(),
            None => Arc::new(cosmos_derivation_path(0)?),
        };
        let secp = global_secp();
        let privkey = root_private_key
            .derive_priv(secp, &*derivation_path)
            .map_err(|source| WalletError::CouldNotDerivePrivateKey {
                derivation_path: (*derivation_path).clone(),
                source,
            })?;
        let public_key = Xpub::from_priv(secp, &privkey).public_key.serialize();
        let address = RawAddress::from(cosmos_address_from_public_key(&public_key)).with_hrp(hrp);

        Ok(Wallet {
            address,
            privkey: privkey.private_key,
            public_key,
        })
    }
}

impl From<bip39::Mnemonic> for SeedPhrase {
    fn from(mnemonic: bip39::Mnemonic) -> Self {
        SeedPhrase {
            mnemonic,
            derivation_path: None,
        }
    }
}

impl FromStr for SeedPhrase {
    type Err = WalletError;

    fn from_str(mut phrase: &str) -> Result<Self, Self::Err> {
        if phrase == "juno-local" {
            phrase = JUNO_LOCAL_PHRASE;
        }

        let (derivation_path, phrase) = match phrase.split_once(' ') {
            Some((path, phrase)) if path.starts_with("m/44") => {
                let path = Arc::new(path.parse().map_err(|source| {
                    WalletError::InvalidDerivationPath {
                        path: path.to_owned(),
                        source,
                    }
                })?);
                (Some(path), phrase)
            }
            _ => (None, phrase),
        };

        let mnemonic = phrase
            .parse()
            .map_err(|source| WalletError::InvalidPhrase { source })?;

        Ok(SeedPhrase {
            derivation_path,
            mnemonic,
        })
    }
}

const JUNO_LOCAL_PHRASE: &str = "clip hire initial neck maid actor venue client foam budget lock catalog sweet steak waste crater broccoli pipe steak sister coyote moment obvious choose";

/// A key held in process memory, capable of signing for one chain.
#[derive(Clone)]
// Not deriving Copy since this is a pretty large data structure.
pub struct Wallet {
    address: Address,
    privkey: SecretKey,
    public_key: [u8; 33],
}

fn global_secp() -> &'static Secp256k1<All> {
    static CELL: OnceLock<Secp256k1<All>> = OnceLock::new();
    CELL.get_or_init(Secp256k1::new)
}

impl Wallet {
    /// Generate a random wallet
    pub fn generate(hrp: AddressHrp) -> Result<Self, WalletError> {
        SeedPhrase::random()?.with_hrp(hrp)
    }

    /// Compressed public key bytes.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// Describe this key as a wallet account.
    pub fn to_account_data(&self) -> AccountData {
        AccountData {
            address: self.address,
            pubkey: self.public_key.to_vec(),
            algo: Algo::Secp256k1,
        }
    }

    /// Sign the SHA-256 digest of the given bytes, returning the compact 64-byte form.
    pub fn sign_bytes(&self, msg: &[u8]) -> [u8; 64] {
        let digest = sha256::Hash::hash(msg).to_byte_array();
        let msg = Message::from_digest(digest);
        global_secp()
            .sign_ecdsa(&msg, &self.privkey)
            .serialize_compact()
    }

    /// Sign an Amino JSON document exactly as given.
    pub fn sign_amino(&self, doc: &StdSignDoc) -> Result<AminoSignResponse, WalletError> {
        let bytes = doc
            .to_canonical_bytes()
            .map_err(|source| WalletError::SignDocSerialize { source })?;
        Ok(AminoSignResponse {
            signed: doc.clone(),
            signature: StdSignature::new(&self.public_key, &self.sign_bytes(&bytes)),
        })
    }

    /// Sign a protobuf document exactly as given.
    pub fn sign_direct(&self, doc: &DirectSignDoc) -> DirectSignResponse {
        DirectSignResponse {
            signed: doc.clone(),
            signature: StdSignature::new(&self.public_key, &self.sign_bytes(&doc.to_bytes())),
        }
    }
}

fn cosmos_address_from_public_key(public_key: &[u8]) -> [u8; 20] {
    let sha = sha256::Hash::hash(public_key);
    ripemd160::Hash::hash(sha.as_ref()).to_byte_array()
}

impl Display for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wallet({})", self.address)
    }
}

impl HasAddressHrp for Wallet {
    fn get_address_hrp(&self) -> AddressHrp {
        self.address.get_address_hrp()
    }
}

impl HasAddress for Wallet {
    fn get_address(&self) -> Address {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::secp256k1::{ecdsa::Signature, PublicKey};

    use super::*;
    use crate::sign_doc::{make_amino_send_message, make_sign_doc, AminoCoin, StdFee};

    const PHRASE: &str =
        "dilemma flavor noise circle voyage vacant amateur mass morning tunnel unhappy entire";

    #[test]
    fn test_osmosis_address() {
        let expected: Address = "osmo1t3mvqjxvfxlstyzfskl37zqgu5ftq0rttpqqc5"
            .parse()
            .unwrap();
        let wallet = SeedPhrase::from_str(PHRASE)
            .unwrap()
            .with_hrp(AddressHrp::from_static("osmo"))
            .unwrap();
        assert_eq!(expected, wallet.get_address());
    }

    #[test]
    fn explicit_path_matches_default() {
        let default = SeedPhrase::from_str(PHRASE)
            .unwrap()
            .with_hrp(AddressHrp::from_static("cosmos"))
            .unwrap();
        let explicit = SeedPhrase::from_str(&format!("m/44'/118'/0'/0/0 {PHRASE}"))
            .unwrap()
            .with_hrp(AddressHrp::from_static("cosmos"))
            .unwrap();
        let second = SeedPhrase::from_str(PHRASE)
            .unwrap()
            .with_cosmos_numbered(1)
            .unwrap()
            .with_hrp(AddressHrp::from_static("cosmos"))
            .unwrap();
        assert_eq!(default.get_address(), explicit.get_address());
        assert_ne!(default.get_address(), second.get_address());
    }

    #[test]
    fn amino_signature_verifies() {
        let wallet = SeedPhrase::from_str(PHRASE)
            .unwrap()
            .with_hrp(AddressHrp::from_static("cosmos"))
            .unwrap();
        let doc = make_sign_doc(
            vec![make_amino_send_message(wallet.get_address(), wallet.get_address(), 1, "uatom")],
            StdFee::new(vec![AminoCoin::new(0, "uatom")], 80000),
            "cosmoshub-4",
            "",
            1,
            0,
        );
        let res = wallet.sign_amino(&doc).unwrap();
        assert_eq!(res.signed, doc);
        assert_eq!(res.signature.pub_key.key_bytes().unwrap(), wallet.public_key_bytes());

        let digest = sha256::Hash::hash(&doc.to_canonical_bytes().unwrap()).to_byte_array();
        let sig = Signature::from_compact(&res.signature.signature_bytes().unwrap()).unwrap();
        let pubkey = PublicKey::from_slice(wallet.public_key_bytes()).unwrap();
        global_secp()
            .verify_ecdsa(&Message::from_digest(digest), &sig, &pubkey)
            .unwrap();
    }

    #[test]
    fn random_phrases_differ() {
        let a = SeedPhrase::random().unwrap();
        let b = SeedPhrase::random().unwrap();
        assert_ne!(a.phrase(), b.phrase());
        assert_eq!(a.phrase().split(' ').count(), 24);
    }
}
