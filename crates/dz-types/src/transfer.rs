use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;

/// Outbound disposition set by a profile message.
///
/// `Closed` is the reserved `0` sentinel: the owner cancels the account
/// rather than handing it to another address. It serialises as the integer
/// `0`; an address serialises as its string form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferTarget {
    Closed,
    Address(Address),
}

impl TransferTarget {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn address(&self) -> Option<&Address> {
        match self {
            Self::Closed => None,
            Self::Address(addr) => Some(addr),
        }
    }
}

impl From<Address> for TransferTarget {
    fn from(addr: Address) -> Self {
        Self::Address(addr)
    }
}

impl fmt::Display for TransferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("0"),
            Self::Address(addr) => write!(f, "{addr}"),
        }
    }
}

impl Serialize for TransferTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Closed => serializer.serialize_u8(0),
            Self::Address(addr) => addr.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TransferTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TargetVisitor;

        impl<'de> Visitor<'de> for TargetVisitor {
            type Value = TransferTarget;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("the integer 0 or an address string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                if v == 0 {
                    Ok(TransferTarget::Closed)
                } else {
                    Err(E::custom(format!("invalid transfer sentinel {v}")))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v == 0 {
                    Ok(TransferTarget::Closed)
                } else {
                    Err(E::custom(format!("invalid transfer sentinel {v}")))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v == "0" {
                    return Ok(TransferTarget::Closed);
                }
                Address::parse(v, None)
                    .map(TransferTarget::Address)
                    .map_err(E::custom)
            }
        }

        deserializer.deserialize_any(TargetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    #[test]
    fn closed_serialises_as_zero() {
        let json = serde_json::to_string(&TransferTarget::Closed).unwrap();
        assert_eq!(json, "0");
        let parsed: TransferTarget = serde_json::from_str("0").unwrap();
        assert!(parsed.is_closed());
    }

    #[test]
    fn address_target_serde() {
        let addr = Address::from_hash(Network::Testnet, [5; 20]);
        let target = TransferTarget::from(addr);
        let json = serde_json::to_string(&target).unwrap();
        let parsed: TransferTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, target);
        assert_eq!(parsed.address(), Some(&addr));
    }

    #[test]
    fn non_zero_integer_rejected() {
        assert!(serde_json::from_str::<TransferTarget>("1").is_err());
    }
}
