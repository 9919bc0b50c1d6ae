use proptest::prelude::*;

use tasknet_types::{Address, JobId, PublicKeyHash, Timestamp};

proptest! {
    /// JobId hex rendering parses back to the same id.
    #[test]
    fn job_id_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = JobId::new(bytes);
        prop_assert_eq!(JobId::from_hex(&id.to_string()).unwrap(), id);
    }

    /// PublicKeyHash::is_zero is true only for all-zero bytes.
    #[test]
    fn public_key_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(PublicKeyHash::new(bytes).is_zero(), bytes == [0u8; 32]);
    }

    /// Every generated well-formed address parses; prefix-less strings never do.
    #[test]
    fn address_parse_matches_grammar(body in "[a-z0-9_]{1,40}") {
        let with_prefix = format!("tn_{body}");
        prop_assert!(Address::parse(with_prefix).is_ok());
        prop_assert!(Address::parse(body.clone()).is_err() || body.starts_with("tn_"));
    }

    /// has_expired flips exactly at start + duration.
    #[test]
    fn has_expired_boundary(start in 0u64..1_000_000_000, dur in 0u64..10_000_000) {
        let t = Timestamp::new(start);
        prop_assert!(t.has_expired(dur, Timestamp::new(start + dur)));
        if dur > 0 {
            prop_assert!(!t.has_expired(dur, Timestamp::new(start + dur - 1)));
        }
    }
}
