use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;
use crate::network::Network;

/// Length of the public key hash carried by an address.
pub const HASH160_LEN: usize = 20;

const CHECKSUM_LEN: usize = 4;
const ENCODED_LEN: usize = 1 + HASH160_LEN + CHECKSUM_LEN;

/// Identity derived from a public key hash, scoped to a [`Network`].
///
/// The string form is base58check: `version || hash160 || checksum`, where
/// the checksum is the first four bytes of a double BLAKE3 over the version
/// byte and hash. Two addresses are equal iff their string forms are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    network: Network,
    hash: [u8; HASH160_LEN],
}

impl Address {
    /// Build an address from its 160-bit hash form.
    pub const fn from_hash(network: Network, hash: [u8; HASH160_LEN]) -> Self {
        Self { network, hash }
    }

    /// Parse a base58check address.
    ///
    /// When `network` is given the address must belong to it; otherwise the
    /// network is inferred from the version byte.
    pub fn parse(s: &str, network: Option<Network>) -> Result<Self, TypeError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TypeError::InvalidBase58(e.to_string()))?;
        if bytes.len() != ENCODED_LEN {
            return Err(TypeError::InvalidLength {
                expected: ENCODED_LEN,
                actual: bytes.len(),
            });
        }

        let (body, checksum) = bytes.split_at(1 + HASH160_LEN);
        if checksum != checksum_of(body) {
            return Err(TypeError::ChecksumMismatch);
        }

        let parsed = Network::from_version_byte(body[0])?;
        if let Some(expected) = network {
            if expected != parsed {
                return Err(TypeError::WrongNetwork {
                    expected: expected.to_string(),
                    actual: parsed.to_string(),
                });
            }
        }

        let mut hash = [0u8; HASH160_LEN];
        hash.copy_from_slice(&body[1..]);
        Ok(Self {
            network: parsed,
            hash,
        })
    }

    /// `true` if `s` parses as an address (on `network`, when given).
    pub fn is_valid(s: &str, network: Option<Network>) -> bool {
        Self::parse(s, network).is_ok()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The 160-bit hash form used in message payloads.
    pub fn hash160(&self) -> &[u8; HASH160_LEN] {
        &self.hash
    }

    /// Hex encoding of the hash form.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    fn encode(&self) -> String {
        let mut body = Vec::with_capacity(ENCODED_LEN);
        body.push(self.network.version_byte());
        body.extend_from_slice(&self.hash);
        let checksum = checksum_of(&body);
        body.extend_from_slice(&checksum);
        bs58::encode(body).into_string()
    }
}

fn checksum_of(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = blake3::hash(body);
    let second = blake3::hash(first.as_bytes());
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second.as_bytes()[..CHECKSUM_LEN]);
    out
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}, {})", self.network, self.encode())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, None)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s, None).map_err(serde::de::Error::custom)
    }
}
