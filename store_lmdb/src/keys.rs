//! Composite binary keys for the secondary indexes.
//!
//! Big-endian integer segments sort lexicographically in numeric order, so a
//! plain ascending range scan over `entries_due` walks entries oldest
//! schedule first, and a descending scan over `actions_by_wallet` walks a
//! wallet's actions newest first.

use merit_types::{ActionId, EntryId, Timestamp, WalletAddress};

/// `scheduled_for_be(8) ++ entry_id(16)` for the due index.
pub(crate) fn due_key(scheduled_for: Timestamp, id: &EntryId) -> [u8; 24] {
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&scheduled_for.as_secs().to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}

/// `wallet(utf8) ++ created_at_be(8) ++ action_id(16)` for the per-wallet index.
pub(crate) fn wallet_time_key(wallet: &WalletAddress, at: Timestamp, id: &ActionId) -> Vec<u8> {
    let mut key = wallet.as_str().as_bytes().to_vec();
    key.extend_from_slice(&at.as_secs().to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// `wallet(utf8) ++ day_be(8)` for the daily commit quota counter.
pub(crate) fn wallet_day_key(wallet: &WalletAddress, day: u64) -> Vec<u8> {
    let mut key = wallet.as_str().as_bytes().to_vec();
    key.extend_from_slice(&day.to_be_bytes());
    key
}

/// Turn `prefix` into the smallest byte string greater than every key that
/// starts with it, for use as an exclusive upper bound in range scans.
///
/// Our prefixes are ASCII wallet strings, so the all-0xff case cannot occur;
/// if it ever did the prefix is left unchanged and the scan degenerates to
/// empty rather than walking unrelated keys.
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) {
    for i in (0..prefix.len()).rev() {
        if prefix[i] < 0xff {
            prefix[i] += 1;
            prefix.truncate(i + 1);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn due_keys_sort_by_schedule_then_id() {
        let early = due_key(Timestamp::new(100), &EntryId::from_bytes([0xff; 16]));
        let late = due_key(Timestamp::new(101), &EntryId::from_bytes([0x00; 16]));
        assert!(early.as_slice() < late.as_slice());
    }

    #[test]
    fn increment_prefix_carries() {
        let mut p = vec![0x61, 0xff];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x62]);
    }

    #[test]
    fn incremented_prefix_bounds_the_range() {
        let mut upper = b"0xaa".to_vec();
        increment_prefix(&mut upper);
        assert!(b"0xaa\x00".as_slice() >= b"0xaa".as_slice());
        assert!(b"0xaa\xff\xff".as_slice() < upper.as_slice());
        assert!(b"0xab".as_slice() >= upper.as_slice());
    }

    proptest! {
        #[test]
        fn due_key_order_matches_schedule_order(
            a in 0u64..u64::MAX / 2,
            b in 0u64..u64::MAX / 2,
            id_a: [u8; 16],
            id_b: [u8; 16],
        ) {
            let ka = due_key(Timestamp::new(a), &EntryId::from_bytes(id_a));
            let kb = due_key(Timestamp::new(b), &EntryId::from_bytes(id_b));
            prop_assert_eq!(
                ka.as_slice().cmp(kb.as_slice()),
                (a, id_a).cmp(&(b, id_b))
            );
        }

        #[test]
        fn every_prefixed_key_is_below_the_incremented_bound(
            prefix in "[ -~]{1,16}",
            suffix in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let mut upper = prefix.as_bytes().to_vec();
            increment_prefix(&mut upper);
            let mut key = prefix.as_bytes().to_vec();
            key.extend_from_slice(&suffix);
            prop_assert!(key.as_slice() < upper.as_slice());
        }
    }
}
