use dz_types::{TxId, HASH160_LEN};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"dz-tx-v1"`, `"dz-addr-v1"`)
/// that is prepended to every hash computation, so a transaction body and a
/// public key with identical bytes never hash to the same value.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for transaction identifiers.
    pub const TRANSACTION: Self = Self { domain: "dz-tx-v1" };
    /// Hasher for public key to address derivation.
    pub const ADDRESS: Self = Self {
        domain: "dz-addr-v1",
    };
    /// Hasher for the bytes a transaction signer authorises.
    pub const SIGNING: Self = Self {
        domain: "dz-sign-v1",
    };

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash a sequence of parts, each length-prefixed so part boundaries
    /// cannot be shifted.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    /// Truncated 160-bit hash, the form addresses are carried in.
    pub fn hash160(&self, data: &[u8]) -> [u8; HASH160_LEN] {
        let full = self.hash(data);
        let mut out = [0u8; HASH160_LEN];
        out.copy_from_slice(&full[..HASH160_LEN]);
        out
    }

    /// Hash parts into a transaction identifier.
    pub fn tx_id(&self, parts: &[&[u8]]) -> TxId {
        TxId::from_bytes(self.hash_parts(parts))
    }

    pub fn domain(&self) -> &str {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(
            ContentHasher::TRANSACTION.hash(data),
            ContentHasher::TRANSACTION.hash(data)
        );
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        assert_ne!(
            ContentHasher::TRANSACTION.hash(data),
            ContentHasher::ADDRESS.hash(data)
        );
        assert_ne!(
            ContentHasher::ADDRESS.hash(data),
            ContentHasher::SIGNING.hash(data)
        );
    }

    #[test]
    fn parts_are_boundary_sensitive() {
        let h = &ContentHasher::TRANSACTION;
        assert_ne!(h.hash_parts(&[b"ab", b"c"]), h.hash_parts(&[b"a", b"bc"]));
    }

    #[test]
    fn hash160_is_prefix_of_full_hash() {
        let full = ContentHasher::ADDRESS.hash(b"key");
        let short = ContentHasher::ADDRESS.hash160(b"key");
        assert_eq!(&full[..HASH160_LEN], &short[..]);
    }
}
