use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Ledger network an address is scoped to.
///
/// Address validity is network-dependent: the same public key hash renders
/// to a different string on each network, and an address parsed for one
/// network is rejected on the other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// Version byte prefixed to the public key hash in the address string.
    pub const fn version_byte(self) -> u8 {
        match self {
            Self::Mainnet => 0x00,
            Self::Testnet => 0x6f,
        }
    }

    /// Inverse of [`Network::version_byte`].
    pub fn from_version_byte(byte: u8) -> Result<Self, TypeError> {
        match byte {
            0x00 => Ok(Self::Mainnet),
            0x6f => Ok(Self::Testnet),
            other => Err(TypeError::UnknownVersion(other)),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "livenet" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            other => Err(TypeError::UnknownNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_bytes_roundtrip() {
        for network in [Network::Mainnet, Network::Testnet] {
            assert_eq!(
                Network::from_version_byte(network.version_byte()).unwrap(),
                network
            );
        }
    }

    #[test]
    fn unknown_version_rejected() {
        assert_eq!(
            Network::from_version_byte(0x05).unwrap_err(),
            TypeError::UnknownVersion(0x05)
        );
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("livenet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Testnet);
        assert!("regtest".parse::<Network>().is_err());
    }

    #[test]
    fn default_is_testnet() {
        assert_eq!(Network::default(), Network::Testnet);
    }
}
