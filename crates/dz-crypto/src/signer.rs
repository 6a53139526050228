use dz_types::{Address, Network};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hasher::ContentHasher;

/// Secret key that authorises transactions for one address per network.
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Public half of a [`SigningKey`], carried on every transaction record.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// Ed25519 signature over a transaction's signing digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl SigningKey {
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::thread_rng()))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a hex-encoded 32-byte secret.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s.trim()).map_err(|_| SignatureError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::from_bytes(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Address controlled by this key on `network`.
    pub fn address(&self, network: Network) -> Address {
        self.verifying_key().to_address(network)
    }

    pub fn sign(&self, digest: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(digest))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    pub fn verify(&self, digest: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(digest, &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Address of this key on `network`: version byte plus the hash160 of
    /// the raw public key.
    pub fn to_address(&self, network: Network) -> Address {
        Address::from_hash(network, ContentHasher::ADDRESS.hash160(self.0.as_bytes()))
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Rejects byte strings that are not a valid curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(ed25519_dalek::Signature::from_bytes(&bytes))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(self.0.to_bytes()))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0.to_bytes()[..8]))
    }
}

impl Serialize for VerifyingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for VerifyingKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let arr: [u8; 32] = decode_hex_array(deserializer)?;
        Self::from_bytes(arr).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let arr: [u8; 64] = decode_hex_array(deserializer)?;
        Ok(Self::from_bytes(arr))
    }
}

fn decode_hex_array<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    bytes
        .try_into()
        .map_err(|_| serde::de::Error::custom(format!("expected {N} hex-encoded bytes")))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match signer and digest")]
    InvalidSignature,
    #[error("malformed ed25519 key")]
    InvalidKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_signature_verifies_only_for_signer() {
        let seller = SigningKey::from_bytes([1; 32]);
        let stranger = SigningKey::from_bytes([2; 32]);
        let digest = [0xab; 32];
        let sig = seller.sign(&digest);

        assert_eq!(seller.verifying_key().verify(&digest, &sig), Ok(()));
        assert_eq!(
            seller.verifying_key().verify(&[0xac; 32], &sig),
            Err(SignatureError::InvalidSignature)
        );
        assert!(stranger.verifying_key().verify(&digest, &sig).is_err());
    }

    #[test]
    fn address_shares_hash_across_networks() {
        let key = SigningKey::from_bytes([3; 32]);
        let testnet = key.address(Network::Testnet);
        assert_eq!(testnet, key.verifying_key().to_address(Network::Testnet));

        let mainnet = key.address(Network::Mainnet);
        assert_eq!(mainnet.hash160(), testnet.hash160());
        assert_ne!(mainnet, testnet);
        assert_ne!(testnet, SigningKey::from_bytes([4; 32]).address(Network::Testnet));
    }

    #[test]
    fn secret_hex_import() {
        let key = SigningKey::generate();
        let imported = SigningKey::from_hex(&format!("  {}\n", key.to_hex())).unwrap();
        assert_eq!(imported.as_bytes(), key.as_bytes());
        assert!(matches!(SigningKey::from_hex("abcd"), Err(SignatureError::InvalidKey)));
    }

    #[test]
    fn record_fields_serialise_as_hex() {
        let key = SigningKey::from_bytes([5; 32]);
        let vk = key.verifying_key();
        let sig = key.sign(b"payload digest");

        let vk_json = serde_json::to_string(&vk).unwrap();
        assert_eq!(vk_json, format!("\"{}\"", hex::encode(vk.as_bytes())));
        assert_eq!(serde_json::from_str::<VerifyingKey>(&vk_json).unwrap(), vk);

        let sig_json = serde_json::to_string(&sig).unwrap();
        assert_eq!(serde_json::from_str::<Signature>(&sig_json).unwrap(), sig);
        assert!(serde_json::from_str::<Signature>("\"00ff\"").is_err());
    }

    #[test]
    fn secret_never_appears_in_debug() {
        let key = SigningKey::from_bytes([6; 32]);
        assert_eq!(format!("{key:?}"), "SigningKey(..)");
    }
}
