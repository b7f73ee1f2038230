use std::{
    collections::HashSet,
    fmt::{Debug, Display},
    str::FromStr,
    sync::OnceLock,
};

use bech32::{Bech32, Hrp};
use parking_lot::RwLock;
use serde::de::Visitor;

use crate::error::AddressError;

/// A raw address value not connected to a specific blockchain.
///
/// Wallets report public key hashes of either 20 bytes (secp256k1 accounts)
/// or 32 bytes (contracts and module accounts).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Ord, PartialOrd)]
pub struct RawAddress(RawAddressInner);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Ord, PartialOrd)]
enum RawAddressInner {
    Twenty { raw_address: [u8; 20] },
    ThirtyTwo { raw_address: [u8; 32] },
}

impl RawAddress {
    /// Parse a bech32 address into an HRP and [RawAddress].
    pub fn parse_with_hrp(s: &str) -> Result<(Hrp, RawAddress), AddressError> {
        let (hrp, data) = bech32::decode(s).map_err(|source| AddressError::InvalidBech32 {
            address: s.to_owned(),
            source,
        })?;

        let data = data.as_slice();
        let inner = match data.try_into() {
            Ok(raw_address) => RawAddressInner::Twenty { raw_address },
            Err(_) => data
                .try_into()
                .map(|raw_address| RawAddressInner::ThirtyTwo { raw_address })
                .map_err(|_| AddressError::InvalidByteCount {
                    address: s.to_owned(),
                    actual: data.len(),
                })?,
        };

        Ok((hrp, RawAddress(inner)))
    }

    /// Generates a new [Address] given the raw address and HRP for the chain.
    pub fn with_hrp(self, hrp: AddressHrp) -> Address {
        Address {
            raw_address: self,
            hrp,
        }
    }
}

/// Note that using this instance throws away the human readable part of the address!
impl FromStr for RawAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RawAddress::parse_with_hrp(s).map(|x| x.1)
    }
}

impl AsRef<[u8]> for RawAddress {
    fn as_ref(&self) -> &[u8] {
        match &self.0 {
            RawAddressInner::Twenty { raw_address } => raw_address,
            RawAddressInner::ThirtyTwo { raw_address } => raw_address,
        }
    }
}

impl From<[u8; 20]> for RawAddress {
    fn from(raw_address: [u8; 20]) -> Self {
        RawAddress(RawAddressInner::Twenty { raw_address })
    }
}

impl From<[u8; 32]> for RawAddress {
    fn from(raw_address: [u8; 32]) -> Self {
        RawAddress(RawAddressInner::ThirtyTwo { raw_address })
    }
}

/// A chain-specific address as reported by the wallet, e.g. `cosmos1...` or `juno1...`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    raw_address: RawAddress,
    hrp: AddressHrp,
}

impl Address {
    /// Get the raw bytes without the chain's HRP.
    pub fn raw(self) -> RawAddress {
        self.raw_address
    }

    /// Get the HRP for this address.
    pub fn hrp(self) -> AddressHrp {
        self.hrp
    }
}

impl Display for Address {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Every AddressHrp was validated on construction.
        let hrp = Hrp::parse(self.hrp.0).map_err(|_| std::fmt::Error)?;
        bech32::encode_to_fmt::<Bech32, _>(fmt, hrp, self.raw_address.as_ref())
            .map_err(|_| std::fmt::Error)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, raw_address) = RawAddress::parse_with_hrp(s)?;
        Ok(raw_address.with_hrp(AddressHrp::from_hrp(hrp)))
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AddressVisitor)
    }
}

struct AddressVisitor;

impl Visitor<'_> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("bech32 Cosmos address")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

/// Anything which has an on-chain [Address].
pub trait HasAddress {
    /// Get the raw address itself.
    fn get_address(&self) -> Address;

    /// Get the string representation of the address.
    fn get_address_string(&self) -> String {
        self.get_address().to_string()
    }
}

impl HasAddress for Address {
    fn get_address(&self) -> Address {
        *self
    }
}

impl<T: HasAddress> HasAddress for &T {
    fn get_address(&self) -> Address {
        HasAddress::get_address(*self)
    }
}

/// The human-readable part (HRP) of a bech32 address, such as `cosmos` or `juno`.
///
/// Values are interned so that both this type and [Address] can be [Copy].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize)]
pub struct AddressHrp(&'static str);

type AddressHrpSet = RwLock<HashSet<&'static str>>;
static ADDRESS_HRPS: OnceLock<AddressHrpSet> = OnceLock::new();

impl AddressHrp {
    fn get_set() -> &'static AddressHrpSet {
        ADDRESS_HRPS.get_or_init(|| RwLock::new(HashSet::new()))
    }

    fn intern(s: &str) -> Self {
        let set = Self::get_set();
        if let Some(s) = set.read().get(s) {
            return AddressHrp(*s);
        }
        let mut guard = set.write();
        // Someone may have added it between our read and write locks.
        if let Some(s) = guard.get(s) {
            return AddressHrp(*s);
        }
        let s: &'static str = Box::leak(s.to_owned().into_boxed_str());
        guard.insert(s);
        AddressHrp(s)
    }

    /// Generate a new value from a [String]-like value.
    pub fn new(s: impl AsRef<str>) -> Result<Self, AddressError> {
        let s = s.as_ref();
        match Hrp::parse(s) {
            Ok(hrp) => Ok(Self::from_hrp(hrp)),
            Err(_) => Err(AddressError::InvalidHrp { hrp: s.to_owned() }),
        }
    }

    /// Use a static string for initializing.
    ///
    /// Note that this bypasses the check that the HRP is valid.
    pub fn from_static(s: &'static str) -> Self {
        let set = Self::get_set();
        if let Some(s) = set.read().get(s) {
            return AddressHrp(*s);
        }
        set.write().insert(s);
        AddressHrp(s)
    }

    /// Convert an already-validated [Hrp].
    pub fn from_hrp(hrp: Hrp) -> Self {
        Self::intern(&hrp.to_lowercase())
    }

    /// Get the raw string HRP
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl FromStr for AddressHrp {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressHrp::new(s)
    }
}

impl Display for AddressHrp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for AddressHrp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Trait for any values that can report their bech32 HRP.
pub trait HasAddressHrp {
    /// Return the HRP
    fn get_address_hrp(&self) -> AddressHrp;
}

impl HasAddressHrp for Address {
    fn get_address_hrp(&self) -> AddressHrp {
        self.hrp
    }
}
