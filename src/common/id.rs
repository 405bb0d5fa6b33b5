//! Kademlia node Id or a content key
use rand::Rng;
use std::{
    fmt::{self, Debug, Display, Formatter, UpperHex},
    str::FromStr,
};

use crate::Error;

/// The size of Ids in bytes.
pub const ID_SIZE: usize = 20;
/// The size of Ids in bits, which is also the number of buckets in a routing table.
pub const ID_BITS: usize = ID_SIZE * 8;

#[derive(Clone, Copy, PartialEq, Ord, PartialOrd, Eq, Hash)]
/// Kademlia node Id or a content key.
///
/// Both peers and stored values live in the same identifier space, a node's
/// Id is its address, and a value's Id is the digest of its bytes.
pub struct Id([u8; ID_SIZE]);

impl Id {
    /// Generate a random Id.
    ///
    /// Only meant for tests and harnesses, nothing in the routing or lookup
    /// logic depends on randomness.
    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; ID_SIZE] = rng.gen();

        Id(random_bytes)
    }

    /// Create a new Id from some bytes. Returns Err if `bytes` is not of length
    /// [ID_SIZE].
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Id, Error> {
        let bytes = bytes.as_ref();
        if bytes.len() != ID_SIZE {
            return Err(Error::InvalidIdSize(bytes.len()));
        }

        let mut tmp: [u8; ID_SIZE] = [0; ID_SIZE];
        tmp.copy_from_slice(bytes);

        Ok(Id(tmp))
    }

    /// Returns the bytes of this Id.
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// XOR metric between this Id and another one.
    ///
    /// Compared as a big-endian unsigned integer, a smaller result means closer.
    pub fn xor(&self, other: &Id) -> Id {
        let mut result = [0_u8; ID_SIZE];

        for (i, byte) in result.iter_mut().enumerate() {
            *byte = self.0[i] ^ other.0[i];
        }

        Id(result)
    }

    /// Number of leading zero bits of the XOR between this Id and `other`.
    ///
    /// Returns `None` if both Ids are equal, otherwise a value in `0..160`,
    /// where `0` means the most significant bit differs (the farthest bucket),
    /// and `159` means only the least significant bit differs (the closest bucket).
    pub fn bucket_index(&self, other: &Id) -> Option<usize> {
        for i in 0..ID_SIZE {
            let a = self.0[i];
            let b = other.0[i];

            if a != b {
                // leading zeros so far + leading zeros of this byte
                return Some(i * 8 + (a ^ b).leading_zeros() as usize);
            }
        }

        None
    }
}

impl From<[u8; ID_SIZE]> for Id {
    fn from(bytes: [u8; ID_SIZE]) -> Self {
        Id(bytes)
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl UpperHex for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }

        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}

impl FromStr for Id {
    type Err = Error;

    /// Parse an Id from a 40 characters hex string.
    fn from_str(s: &str) -> Result<Id, Error> {
        if s.len() != ID_SIZE * 2 || !s.is_ascii() {
            return Err(Error::InvalidIdEncoding(s.to_string()));
        }

        let mut bytes = [0_u8; ID_SIZE];

        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidIdEncoding(s.to_string()))?;
        }

        Ok(Id(bytes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bucket_index_to_self() {
        let id = Id::random();

        assert_eq!(id.bucket_index(&id), None)
    }

    #[test]
    fn bucket_index_to_id() {
        let id = Id([
            6, 57, 161, 226, 79, 187, 138, 178, 119, 223, 3, 52, 118, 171, 13, 225, 15, 171, 59,
            220,
        ]);
        let target = Id([
            3, 91, 26, 235, 151, 55, 173, 225, 168, 9, 51, 89, 79, 64, 93, 63, 119, 42, 160, 142,
        ]);

        // 6 ^ 3 = 0b0000_0101
        assert_eq!(id.bucket_index(&target), Some(5));
        assert_eq!(target.bucket_index(&id), Some(5));
    }

    #[test]
    fn bucket_index_to_furthest() {
        let id = Id::random();

        let mut opposite = [0_u8; ID_SIZE];
        for (i, &value) in id.0.iter().enumerate() {
            opposite[i] = value ^ 0xff;
        }

        assert_eq!(id.bucket_index(&Id(opposite)), Some(0))
    }

    #[test]
    fn bucket_index_to_closest() {
        let id = Id::random();

        let mut neighbour = id.0;
        neighbour[ID_SIZE - 1] ^= 1;

        assert_eq!(id.bucket_index(&Id(neighbour)), Some(ID_BITS - 1))
    }

    #[test]
    fn bucket_index_depends_on_target() {
        let owner = Id([0; ID_SIZE]);

        let mut near = [0_u8; ID_SIZE];
        near[ID_SIZE - 1] = 1;
        let mut far = [0_u8; ID_SIZE];
        far[0] = 0x80;

        let near = owner.bucket_index(&Id(near));
        let far = owner.bucket_index(&Id(far));

        assert_eq!(near, Some(159));
        assert_eq!(far, Some(0));
        assert_ne!(near, far);
    }

    #[test]
    fn xor() {
        let a = Id([0xff; ID_SIZE]);
        let b = Id([0x0f; ID_SIZE]);

        assert_eq!(a.xor(&b), Id([0xf0; ID_SIZE]));
        assert_eq!(a.xor(&a), Id([0; ID_SIZE]));
    }

    #[test]
    fn from_bytes_wrong_size() {
        assert!(matches!(
            Id::from_bytes([0_u8; 19]),
            Err(Error::InvalidIdSize(19))
        ));
    }

    #[test]
    fn hex_round_trip() {
        let hex = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
        let id = Id::from_str(hex).unwrap();

        assert_eq!(id.as_bytes()[0], 0xaa);
        assert_eq!(id.to_string(), hex);
        assert_eq!(format!("{id:?}"), format!("Id({hex})"));
    }

    #[test]
    fn upper_hex() {
        let id = Id::from_str("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d").unwrap();

        assert_eq!(format!("{id:X}"), "AAF4C61DDCC5E8A2DABEDE0F3B482CD9AEA9434D");
        assert_eq!(Id::from_str(&format!("{id:X}")).unwrap(), id);
    }

    #[test]
    fn invalid_hex() {
        assert!(Id::from_str("aaf4").is_err());
        assert!(Id::from_str("zzf4c61ddcc5e8a2dabede0f3b482cd9aea9434d").is_err());
    }
}
