//! Shared State Store
//!
//! The three authoritative mappings: players, treasures, scores.
//! Uses BTreeMap so snapshots serialize in a stable order.
//!
//! There are no transactional guarantees across the mappings. Collection
//! mutates treasures and scores sequentially; that is safe only because the
//! relay task processes events one at a time, run to completion.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::pose::Pose;
use crate::{POINTS_PER_TREASURE, TREASURE_COUNT};

// =============================================================================
// CONNECTION ID
// =============================================================================

/// Opaque per-session identifier, assigned at accept time and destroyed on
/// disconnect. A client that reconnects gets a fresh id (and a fresh score).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Generate a fresh id for a new connection.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create from raw bytes (mainly for tests).
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// TREASURE
// =============================================================================

/// Stable treasure identifier, `treasure-0`..`treasure-N-1`, assigned at
/// process start. Serialized as the `treasure-N` string on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreasureId(pub usize);

impl TreasureId {
    /// Parse from the `treasure-N` wire form. Non-canonical spellings
    /// (`treasure-03`, `treasure-+3`) are unknown ids, not aliases.
    pub fn parse(s: &str) -> Option<Self> {
        let index = s.strip_prefix("treasure-")?;
        let id = index.parse().ok().map(Self)?;
        (id.to_string() == s).then_some(id)
    }

    /// Index into the treasure set.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TreasureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "treasure-{}", self.0)
    }
}

impl Serialize for TreasureId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TreasureId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom("expected `treasure-N`"))
    }
}

/// A single treasure: fixed id, mutable collected flag.
///
/// State machine: `available --(collect, first-wins)--> collected
/// --(respawn timer)--> available`. Cycles indefinitely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasure {
    /// Stable identifier.
    pub id: TreasureId,
    /// Whether the treasure is currently held.
    pub collected: bool,
}

// =============================================================================
// WORLD STATE
// =============================================================================

/// The Shared State Store: three independent mappings with the same lifecycle
/// as the server process. Exclusively owned and mutated by the relay task;
/// no locking because handlers never interleave.
#[derive(Debug)]
pub struct WorldState {
    /// Live players by connection id. Created on join, not on connect.
    players: BTreeMap<ConnectionId, Pose>,
    /// The fixed-size treasure set. Membership never changes.
    treasures: Vec<Treasure>,
    /// Scores by connection id. Created on connect, deleted on disconnect.
    scores: BTreeMap<ConnectionId, u32>,
    /// Points awarded per collection.
    points_per_treasure: u32,
}

impl WorldState {
    /// Create a world with `treasure_count` treasures, all available.
    pub fn new(treasure_count: usize, points_per_treasure: u32) -> Self {
        let treasures = (0..treasure_count)
            .map(|i| Treasure {
                id: TreasureId(i),
                collected: false,
            })
            .collect();

        Self {
            players: BTreeMap::new(),
            treasures,
            scores: BTreeMap::new(),
            points_per_treasure,
        }
    }

    /// Initialize a connection's score to 0. Called on connect, before join.
    pub fn insert_score(&mut self, id: ConnectionId) {
        self.scores.insert(id, 0);
    }

    /// Insert or wholesale-overwrite a player's pose.
    pub fn upsert_player(&mut self, id: ConnectionId, pose: Pose) {
        self.players.insert(id, pose);
    }

    /// Attempt to collect a treasure for `collector`.
    ///
    /// First collector wins: returns true and awards points only if the
    /// treasure exists and is currently available. Unknown ids and
    /// already-collected treasures are silent no-ops.
    pub fn collect(&mut self, collector: ConnectionId, treasure_id: TreasureId) -> bool {
        let Some(treasure) = self.treasures.get_mut(treasure_id.index()) else {
            return false;
        };
        if treasure.collected {
            return false;
        }

        treasure.collected = true;
        *self.scores.entry(collector).or_insert(0) += self.points_per_treasure;
        true
    }

    /// Return a collected treasure to the available state.
    ///
    /// Returns false for unknown ids (cannot occur in-process, but the
    /// operation is total).
    pub fn respawn(&mut self, treasure_id: TreasureId) -> bool {
        match self.treasures.get_mut(treasure_id.index()) {
            Some(treasure) => {
                treasure.collected = false;
                true
            }
            None => false,
        }
    }

    /// Delete a connection's player and score entries. Treasures (and any
    /// pending respawn timers) are unaffected: they are treasure-scoped,
    /// not connection-scoped.
    pub fn remove_connection(&mut self, id: ConnectionId) {
        self.players.remove(&id);
        self.scores.remove(&id);
    }

    /// Full player mapping snapshot for broadcast.
    pub fn players_snapshot(&self) -> BTreeMap<ConnectionId, Pose> {
        self.players.clone()
    }

    /// Ordered treasure list snapshot for broadcast.
    pub fn treasures_snapshot(&self) -> Vec<Treasure> {
        self.treasures.clone()
    }

    /// Full score mapping snapshot for broadcast.
    pub fn scores_snapshot(&self) -> BTreeMap<ConnectionId, u32> {
        self.scores.clone()
    }

    /// Look up a connection's score.
    pub fn score(&self, id: ConnectionId) -> Option<u32> {
        self.scores.get(&id).copied()
    }

    /// Whether a connection has a live player entry.
    pub fn has_player(&self, id: ConnectionId) -> bool {
        self.players.contains_key(&id)
    }

    /// Number of live players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(TREASURE_COUNT, POINTS_PER_TREASURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cid(n: u8) -> ConnectionId {
        ConnectionId::from_bytes([n; 16])
    }

    #[test]
    fn test_initial_treasures_all_available() {
        let state = WorldState::default();
        let treasures = state.treasures_snapshot();

        assert_eq!(treasures.len(), TREASURE_COUNT);
        for (i, t) in treasures.iter().enumerate() {
            assert_eq!(t.id, TreasureId(i));
            assert!(!t.collected);
        }
    }

    #[test]
    fn test_treasure_id_wire_form() {
        let id = TreasureId(3);
        assert_eq!(id.to_string(), "treasure-3");
        assert_eq!(TreasureId::parse("treasure-3"), Some(id));
        assert_eq!(TreasureId::parse("treasure-"), None);
        assert_eq!(TreasureId::parse("chest-3"), None);
        assert_eq!(TreasureId::parse("treasure-x"), None);
    }

    #[test]
    fn test_treasure_id_rejects_noncanonical_spellings() {
        // Ids are matched as exact strings: alternate renderings of the
        // same number do not name a treasure.
        assert_eq!(TreasureId::parse("treasure-0"), Some(TreasureId(0)));
        assert_eq!(TreasureId::parse("treasure-03"), None);
        assert_eq!(TreasureId::parse("treasure-+3"), None);
        assert_eq!(TreasureId::parse("treasure-00"), None);
        assert_eq!(TreasureId::parse("treasure- 3"), None);
    }

    #[test]
    fn test_first_collector_wins() {
        let mut state = WorldState::default();
        let a = cid(1);
        let b = cid(2);
        state.insert_score(a);
        state.insert_score(b);

        assert!(state.collect(a, TreasureId(0)));
        assert!(!state.collect(b, TreasureId(0)));

        assert_eq!(state.score(a), Some(POINTS_PER_TREASURE));
        assert_eq!(state.score(b), Some(0));
    }

    #[test]
    fn test_collect_unknown_treasure_is_noop() {
        let mut state = WorldState::default();
        let a = cid(1);
        state.insert_score(a);

        assert!(!state.collect(a, TreasureId(TREASURE_COUNT)));
        assert_eq!(state.score(a), Some(0));
    }

    #[test]
    fn test_respawn_cycle() {
        let mut state = WorldState::default();
        let a = cid(1);
        state.insert_score(a);

        assert!(state.collect(a, TreasureId(4)));
        assert!(state.treasures_snapshot()[4].collected);

        assert!(state.respawn(TreasureId(4)));
        assert!(!state.treasures_snapshot()[4].collected);

        // Collectable again after respawn
        assert!(state.collect(a, TreasureId(4)));
        assert_eq!(state.score(a), Some(2 * POINTS_PER_TREASURE));
    }

    #[test]
    fn test_remove_connection_leaves_treasures() {
        let mut state = WorldState::default();
        let a = cid(1);
        state.insert_score(a);
        state.upsert_player(a, Pose::default());
        state.collect(a, TreasureId(0));

        state.remove_connection(a);

        assert!(!state.has_player(a));
        assert_eq!(state.score(a), None);
        // The collected treasure stays collected until its respawn fires.
        assert!(state.treasures_snapshot()[0].collected);
    }

    proptest! {
        // At most one collect succeeds per treasure between a transition to
        // collected and the matching respawn, regardless of who tries when.
        #[test]
        fn prop_single_winner_per_window(attempts in proptest::collection::vec((0u8..8, 0usize..TREASURE_COUNT), 1..64)) {
            let mut state = WorldState::default();
            for n in 0..8 {
                state.insert_score(cid(n));
            }

            let mut wins = vec![0u32; TREASURE_COUNT];
            for (who, which) in attempts {
                if state.collect(cid(who), TreasureId(which)) {
                    wins[which] += 1;
                }
            }

            for count in wins {
                prop_assert!(count <= 1);
            }

            let total_points: u32 = state.scores_snapshot().values().sum();
            let total_collected = state
                .treasures_snapshot()
                .iter()
                .filter(|t| t.collected)
                .count() as u32;
            prop_assert_eq!(total_points, total_collected * POINTS_PER_TREASURE);
        }
    }
}
