//! Content digest used to derive and validate keys of stored values.

use std::fmt::Debug;

use sha1_smol::Sha1;

use crate::Id;

/// A deterministic, collision resistant hash producing an [Id] sized output.
///
/// Any cryptographic hash of [crate::ID_SIZE] bytes output satisfies the
/// content-addressing invariant `digest(value) == key`.
pub trait Digest: Debug + Send + Sync {
    /// Digest `value` into an [Id].
    fn digest(&self, value: &[u8]) -> Id;

    /// Returns `true` if `key` is the digest of `value`.
    fn validate(&self, key: &Id, value: &[u8]) -> bool {
        &self.digest(value) == key
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Default [Digest] implementation, plain SHA-1.
pub struct Sha1Digest;

impl Digest for Sha1Digest {
    fn digest(&self, value: &[u8]) -> Id {
        Id::from(Sha1::from(value).digest().bytes())
    }
}

/// Returns the key a value is stored under using the default [Sha1Digest].
pub fn hash_value(value: &[u8]) -> Id {
    Sha1Digest.digest(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_hash_value() {
        let target = Id::from_str("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d").unwrap();

        assert_eq!(hash_value(b"hello"), target);
    }

    #[test]
    fn test_validate() {
        let v = b"From the river to the sea";
        let key = hash_value(v);

        assert!(Sha1Digest.validate(&key, v));
        assert!(!Sha1Digest.validate(&key, &v[1..]));
    }
}
