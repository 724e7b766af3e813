use rand::seq::SliceRandom;
use rand::Rng;
use shared::MAX_NAME_LEN;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const PLAYER_COLORS: [&str; 6] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FD79A8",
];

pub const DEFAULT_AVATARS: [&str; 8] = [
    "cat", "dog", "rabbit", "panda", "fox", "bear", "koala", "lion",
];

const FALLBACK_NAME: &str = "Player";

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    PLAYER_COLORS
        .choose(rng)
        .unwrap_or(&PLAYER_COLORS[0])
        .to_string()
}

pub fn random_avatar<R: Rng + ?Sized>(rng: &mut R) -> String {
    DEFAULT_AVATARS
        .choose(rng)
        .unwrap_or(&DEFAULT_AVATARS[0])
        .to_string()
}

// Trim and cap a client-chosen name, falling back to a placeholder
pub fn sanitize_player_name(name: &str) -> String {
    let trimmed: String = name.trim().chars().take(MAX_NAME_LEN).collect();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sanitize_player_name() {
        assert_eq!(sanitize_player_name("  Ada  "), "Ada");
        assert_eq!(sanitize_player_name("   "), "Player");
        assert_eq!(
            sanitize_player_name(&"x".repeat(100)).chars().count(),
            MAX_NAME_LEN
        );
    }

    #[test]
    fn test_random_picks_come_from_palettes() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert!(PLAYER_COLORS.contains(&random_color(&mut rng).as_str()));
            assert!(DEFAULT_AVATARS.contains(&random_avatar(&mut rng).as_str()));
        }
    }

    #[test]
    fn test_timestamp_is_recent() {
        // 2020-01-01 in milliseconds
        assert!(get_timestamp() > 1_577_836_800_000);
    }
}
