//! 32-byte identifiers: job hashes and validator identity commitments.

use crate::TypesError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

type Blake2b256 = Blake2b<U32>;

fn decode_32(s: &str) -> Result<[u8; 32], TypesError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHash(format!("{s}: {e}")))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| TypesError::InvalidHash(format!("expected 32 bytes, got {}", b.len())))
}

/// Hex strings in human-readable formats (JSON, TOML), raw bytes otherwise.
macro_rules! hex_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&hex::encode(self.0))
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    $ty::from_hex(&s).map_err(serde::de::Error::custom)
                } else {
                    <[u8; 32]>::deserialize(deserializer).map($ty)
                }
            }
        }
    };
}

hex_serde!(JobId);
hex_serde!(PublicKeyHash);

/// Unique identifier of a compute job.
///
/// Job ids are chosen by the requester; the ledger only requires that no two
/// live jobs share one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId([u8; 32]);

impl JobId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a job id as the Blake2b-256 digest of a job description.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        decode_32(s).map(Self)
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for JobId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Hash of a validator's public key, bound to the validator record once at
/// creation. The all-zero value means "no identity".
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyHash([u8; 32]);

impl PublicKeyHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        decode_32(s).map(Self)
    }
}

impl fmt::Debug for PublicKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for PublicKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PublicKeyHash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_hex_round_trip() {
        let id = JobId::new([0xab; 32]);
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(JobId::from_hex(&format!("0x{id}")).unwrap(), id);
    }

    #[test]
    fn job_id_rejects_wrong_length() {
        assert!(JobId::from_hex("abcd").is_err());
        assert!(JobId::from_hex("zz").is_err());
    }

    #[test]
    fn digest_is_deterministic_and_distinct() {
        let a = JobId::digest(b"render frame 1");
        let b = JobId::digest(b"render frame 1");
        let c = JobId::digest(b"render frame 2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, JobId::ZERO);
    }

    #[test]
    fn json_uses_hex_and_bincode_stays_raw() {
        let id = JobId::digest(b"render frame 1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<JobId>(&json).unwrap(), id);

        let raw = bincode::serialize(&id).unwrap();
        assert_eq!(raw.len(), 32);
        assert_eq!(bincode::deserialize::<JobId>(&raw).unwrap(), id);

        let key = PublicKeyHash::new([7; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));
        assert_eq!(serde_json::from_str::<PublicKeyHash>(&json).unwrap(), key);
    }

    #[test]
    fn json_rejects_malformed_hex() {
        assert!(serde_json::from_str::<JobId>("\"abcd\"").is_err());
        assert!(serde_json::from_str::<JobId>("[1,2,3]").is_err());
    }

    #[test]
    fn public_key_hash_zero_detection() {
        assert!(PublicKeyHash::ZERO.is_zero());
        assert!(!PublicKeyHash::new([1; 32]).is_zero());
    }
}
