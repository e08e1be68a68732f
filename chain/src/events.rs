//! The contract events the pipeline recognizes, and their decoding.
//!
//! Each action kind is backed by exactly one event signature. Verification
//! looks for that event in the receipt logs and checks the indexed actor and
//! the amount word against the submitted action.

use merit_types::{ActionKind, WalletAddress};
use sha3::{Digest, Keccak256};

use crate::receipt::EventLog;

/// Keccak-256 of an event signature string (topic 0 of its logs).
pub fn event_topic(signature: &str) -> [u8; 32] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut topic = [0u8; 32];
    topic.copy_from_slice(&digest);
    topic
}

/// Contract events emitted by the staking and rewards contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    Staked,
    Unstaked,
    RewardsClaimed,
    CommitRewarded,
}

impl ChainEvent {
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Staked => "Staked(address,uint256)",
            Self::Unstaked => "Unstaked(address,uint256)",
            Self::RewardsClaimed => "RewardsClaimed(address,uint256)",
            Self::CommitRewarded => "CommitRewarded(address,uint256)",
        }
    }

    pub fn topic(&self) -> [u8; 32] {
        event_topic(self.signature())
    }

    /// The event a kind's backing transaction must emit.
    pub fn expected_for(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Stake => Self::Staked,
            ActionKind::Unstake => Self::Unstaked,
            ActionKind::Claim => Self::RewardsClaimed,
            ActionKind::Commit => Self::CommitRewarded,
        }
    }
}

/// A decoded pipeline event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedEvent {
    pub event: ChainEvent,
    /// Indexed actor (topic 1).
    pub actor: WalletAddress,
    /// First data word.
    pub amount: u128,
}

/// Find and decode the first `expected` event in `logs`.
pub fn find_event(logs: &[EventLog], expected: ChainEvent) -> Option<DecodedEvent> {
    let topic = expected.topic();
    logs.iter().find_map(|log| decode_log(log, expected, &topic))
}

fn decode_log(log: &EventLog, event: ChainEvent, topic: &[u8; 32]) -> Option<DecodedEvent> {
    if log.topics.first()? != topic {
        return None;
    }
    let actor = topic_address(log.topics.get(1)?)?;
    let amount = data_word_u128(&log.data, 0)?;
    Some(DecodedEvent {
        event,
        actor,
        amount,
    })
}

/// An indexed address: 12 zero bytes of padding, then 20 address bytes.
fn topic_address(topic: &[u8; 32]) -> Option<WalletAddress> {
    if topic[..12] != [0u8; 12] {
        return None;
    }
    WalletAddress::parse(&format!("0x{}", hex::encode(&topic[12..]))).ok()
}

/// The `index`-th 32-byte data word as a u128. `None` when the word is
/// missing or does not fit.
fn data_word_u128(data: &[u8], index: usize) -> Option<u128> {
    let start = index.checked_mul(32)?;
    let word = data.get(start..start + 32)?;
    if word[..16] != [0u8; 16] {
        return None;
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Some(u128::from_be_bytes(low))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTOR: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

    fn actor_topic() -> [u8; 32] {
        let mut topic = [0u8; 32];
        topic[12..].copy_from_slice(&hex::decode(&ACTOR[2..]).unwrap());
        topic
    }

    fn amount_word(amount: u128) -> Vec<u8> {
        let mut word = vec![0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());
        word
    }

    fn staked_log(amount: u128) -> EventLog {
        EventLog {
            address: "0xabcd000000000000000000000000000000000001".into(),
            topics: vec![ChainEvent::Staked.topic(), actor_topic()],
            data: amount_word(amount),
        }
    }

    #[test]
    fn topics_are_distinct_per_event() {
        let topics = [
            ChainEvent::Staked.topic(),
            ChainEvent::Unstaked.topic(),
            ChainEvent::RewardsClaimed.topic(),
            ChainEvent::CommitRewarded.topic(),
        ];
        for (i, a) in topics.iter().enumerate() {
            for b in &topics[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn decodes_a_matching_log() {
        let logs = vec![staked_log(500)];
        let decoded = find_event(&logs, ChainEvent::Staked).expect("decoded");
        assert_eq!(decoded.actor.as_str(), ACTOR);
        assert_eq!(decoded.amount, 500);
    }

    #[test]
    fn skips_foreign_logs() {
        let mut foreign = staked_log(500);
        foreign.topics[0] = [0x99u8; 32];
        let logs = vec![foreign, staked_log(700)];
        let decoded = find_event(&logs, ChainEvent::Staked).expect("decoded");
        assert_eq!(decoded.amount, 700);
    }

    #[test]
    fn wrong_event_finds_nothing() {
        let logs = vec![staked_log(500)];
        assert!(find_event(&logs, ChainEvent::Unstaked).is_none());
    }

    #[test]
    fn rejects_dirty_address_padding() {
        let mut log = staked_log(500);
        log.topics[1][0] = 1;
        assert!(find_event(&[log], ChainEvent::Staked).is_none());
    }

    #[test]
    fn rejects_oversized_amounts() {
        let mut log = staked_log(500);
        log.data[0] = 1;
        assert!(find_event(&[log], ChainEvent::Staked).is_none());
    }

    #[test]
    fn kind_to_event_mapping_is_total() {
        assert_eq!(
            ChainEvent::expected_for(ActionKind::Stake),
            ChainEvent::Staked
        );
        assert_eq!(
            ChainEvent::expected_for(ActionKind::Unstake),
            ChainEvent::Unstaked
        );
        assert_eq!(
            ChainEvent::expected_for(ActionKind::Claim),
            ChainEvent::RewardsClaimed
        );
        assert_eq!(
            ChainEvent::expected_for(ActionKind::Commit),
            ChainEvent::CommitRewarded
        );
    }
}
