//! Vote-round scoring
//!
//! Points reward agreement: every numeric vote equal to a most frequent
//! numeric value earns [`MODAL_POINTS`], any other numeric vote earns
//! [`NUMERIC_POINTS`] and non-numeric cards earn nothing. Rounds in rooms with
//! fewer than [`MIN_PLAYERS_FOR_POINTS`] players award nothing at all.

use crate::profile::{AwardRecord, ProfileStore};
use chrono::{DateTime, Utc};
use log::{error, warn};
use shared::{PlayerId, PointsAward};

pub const MIN_PLAYERS_FOR_POINTS: usize = 3;
pub const MODAL_POINTS: u32 = 3;
pub const NUMERIC_POINTS: u32 = 1;

fn numeric_value(card: &str) -> Option<f64> {
    card.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Points for every voter, in input order. Non-numeric voters get 0.
pub fn calculate_points(votes: &[(PlayerId, String)]) -> Vec<(PlayerId, u32)> {
    let numeric: Vec<Option<f64>> = votes.iter().map(|(_, card)| numeric_value(card)).collect();

    let mut counts: Vec<(f64, usize)> = Vec::new();
    for value in numeric.iter().flatten() {
        match counts.iter_mut().find(|(v, _)| v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((*value, 1)),
        }
    }
    let max_count = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);

    votes
        .iter()
        .zip(numeric)
        .map(|((player_id, _), value)| {
            let points = match value {
                None => 0,
                Some(v) => {
                    let modal = counts.iter().any(|(m, c)| *m == v && *c == max_count);
                    if modal {
                        MODAL_POINTS
                    } else {
                        NUMERIC_POINTS
                    }
                }
            };
            (*player_id, points)
        })
        .collect()
}

/// Nonzero awards for a revealed round, or nothing when the room is too small.
pub fn round_awards(room_size: usize, votes: &[(PlayerId, String)]) -> Vec<PointsAward> {
    if room_size < MIN_PLAYERS_FOR_POINTS {
        return Vec::new();
    }

    calculate_points(votes)
        .into_iter()
        .filter(|(_, points)| *points > 0)
        .map(|(player_id, points)| PointsAward { player_id, points })
        .collect()
}

/// An award owed to a player with a stable identity
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAward {
    pub player_id: PlayerId,
    pub uid: String,
    pub points: u32,
}

/// A persisted award and the profile totals that resulted from it
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedAward {
    pub player_id: PlayerId,
    pub uid: String,
    pub total_points: u64,
    pub season_points: u64,
}

/// Writes each award to the profile store. Failed writes are logged and left
/// out of the result; the round itself is never undone.
pub fn persist_awards(
    store: &dyn ProfileStore,
    awards: &[PendingAward],
    season_id: &str,
    room_id: &str,
    now: DateTime<Utc>,
) -> Vec<PersistedAward> {
    let mut persisted = Vec::with_capacity(awards.len());

    for award in awards {
        let record = AwardRecord {
            uid: award.uid.clone(),
            points: award.points,
            timestamp: now,
            season_id: season_id.to_string(),
            room_id: room_id.to_string(),
        };

        match store.record_award(record) {
            Ok(profile) => persisted.push(PersistedAward {
                player_id: award.player_id,
                uid: award.uid.clone(),
                total_points: profile.points,
                season_points: profile.season_points,
            }),
            Err(crate::profile::StoreError::NotFound) => {
                warn!("No profile for {}, skipping award", award.uid);
            }
            Err(e) => {
                error!("Failed to record award for {}: {}", award.uid, e);
            }
        }
    }

    persisted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MemoryProfileStore;

    fn votes(pairs: &[(PlayerId, &str)]) -> Vec<(PlayerId, String)> {
        pairs.iter().map(|(id, v)| (*id, v.to_string())).collect()
    }

    #[test]
    fn test_modal_consensus_scenario() {
        // A=1, B=2, C=3, D=4
        let round = votes(&[(1, "3"), (2, "3"), (3, "5"), (4, "?")]);
        assert_eq!(
            calculate_points(&round),
            vec![(1, 3), (2, 3), (3, 1), (4, 0)]
        );
        assert_eq!(
            round_awards(4, &round),
            vec![
                PointsAward { player_id: 1, points: 3 },
                PointsAward { player_id: 2, points: 3 },
                PointsAward { player_id: 3, points: 1 },
            ]
        );
    }

    #[test]
    fn test_small_room_awards_nothing() {
        let round = votes(&[(1, "3"), (2, "3")]);
        assert!(round_awards(2, &round).is_empty());
        // Room size, not voter count, decides.
        assert_eq!(round_awards(3, &round).len(), 2);
    }

    #[test]
    fn test_tied_modes_all_score() {
        let round = votes(&[(1, "2"), (2, "2"), (3, "8"), (4, "8"), (5, "13")]);
        assert_eq!(
            calculate_points(&round),
            vec![(1, 3), (2, 3), (3, 3), (4, 3), (5, 1)]
        );
    }

    #[test]
    fn test_all_distinct_numeric_votes_are_all_modal() {
        let round = votes(&[(1, "1"), (2, "2"), (3, "3")]);
        assert!(calculate_points(&round).iter().all(|(_, p)| *p == MODAL_POINTS));
    }

    #[test]
    fn test_only_non_numeric_votes() {
        let round = votes(&[(1, "?"), (2, "☕"), (3, "?")]);
        assert!(round_awards(3, &round).is_empty());
    }

    #[test]
    fn test_numeric_equivalence() {
        let round = votes(&[(1, "5"), (2, "5.0"), (3, "8")]);
        assert_eq!(calculate_points(&round), vec![(1, 3), (2, 3), (3, 1)]);
    }

    #[test]
    fn test_persist_awards_skips_missing_profiles() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();

        let awards = vec![
            PendingAward { player_id: 1, uid: "u1".into(), points: 3 },
            PendingAward { player_id: 2, uid: "ghost".into(), points: 1 },
        ];
        let persisted = persist_awards(&store, &awards, "2026-S22", "ROOM01", Utc::now());

        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].player_id, 1);
        assert_eq!(persisted[0].total_points, 3);
        assert_eq!(persisted[0].season_points, 3);

        let ledger = store.awards_for("u1").unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].room_id, "ROOM01");
        assert_eq!(ledger[0].season_id, "2026-S22");
    }

    #[test]
    fn test_persist_awards_with_store_down() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();
        store.set_available(false);

        let awards = vec![PendingAward { player_id: 1, uid: "u1".into(), points: 3 }];
        assert!(persist_awards(&store, &awards, "2026-S22", "ROOM01", Utc::now()).is_empty());

        store.set_available(true);
        assert!(store.awards_for("u1").unwrap().is_empty());
    }
}
