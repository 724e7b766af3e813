//! Persistent player profiles, award ledger and season records
//!
//! [`ProfileStore`] is the boundary to the identity backend. Calls are
//! synchronous and may block; the session coordinator only ever invokes them
//! from `spawn_blocking` tasks. [`MemoryProfileStore`] is the in-process
//! implementation used by the server binary and the tests.

use crate::season::SeasonRecord;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use shared::{LeaderboardEntry, ProfileView};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_AVATAR: &str = "cat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub uid: String,
    pub display_name: String,
    pub avatar: String,
    /// Lifetime total
    pub points: u64,
    /// Running total for `season_id`
    pub season_points: u64,
    /// Season the running total belongs to
    pub season_id: Option<String>,
    pub is_registered: bool,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last authenticated connect
    pub last_active: DateTime<Utc>,
    /// Set while the account is archived. An archived profile does not hold
    /// its display name.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(uid: &str, display_name: &str, avatar: &str, now: DateTime<Utc>) -> Self {
        Self {
            uid: uid.to_string(),
            display_name: display_name.to_string(),
            avatar: avatar.to_string(),
            points: 0,
            season_points: 0,
            season_id: None,
            is_registered: false,
            email: None,
            created_at: now,
            updated_at: now,
            last_active: now,
            archived_at: None,
        }
    }

    /// Adds `points` to the lifetime and season totals. The season total starts
    /// over when the award belongs to a different season than the last one.
    pub fn apply_award(&mut self, points: u32, season_id: &str, now: DateTime<Utc>) {
        if self.season_id.as_deref() != Some(season_id) {
            self.season_points = 0;
            self.season_id = Some(season_id.to_string());
        }
        self.points += u64::from(points);
        self.season_points += u64::from(points);
        self.updated_at = now;
    }

    pub fn view(&self) -> ProfileView {
        ProfileView {
            uid: self.uid.clone(),
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
            points: self.points,
            season_points: self.season_points,
            is_registered: self.is_registered,
        }
    }
}

/// One point award, recorded once and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRecord {
    pub uid: String,
    pub points: u32,
    pub timestamp: DateTime<Utc>,
    pub season_id: String,
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Unavailable(String),
    NotFound,
    DisplayNameTaken,
    NotRegistered,
    Invalid(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "profile store unavailable: {}", reason),
            StoreError::NotFound => write!(f, "User not found"),
            StoreError::DisplayNameTaken => write!(f, "Display name is already taken"),
            StoreError::NotRegistered => {
                write!(f, "Avatar selection is only available for registered users")
            }
            StoreError::Invalid(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

pub trait ProfileStore: Send + Sync {
    /// Maps a client token to a stable uid, or `None` for unknown tokens.
    fn verify_token(&self, token: &str) -> Result<Option<String>, StoreError>;

    fn get_profile(&self, uid: &str) -> Result<Option<Profile>, StoreError>;

    fn create_profile(
        &self,
        uid: &str,
        display_name: &str,
        avatar: &str,
    ) -> Result<Profile, StoreError>;

    /// Case-insensitive availability; a name held by `exclude_uid` counts as free.
    /// Always true while display-name conflict checks are switched off.
    fn is_display_name_available(
        &self,
        display_name: &str,
        exclude_uid: Option<&str>,
    ) -> Result<bool, StoreError>;

    fn update_display_name(&self, uid: &str, display_name: &str) -> Result<Profile, StoreError>;

    fn update_avatar(&self, uid: &str, avatar: &str) -> Result<Profile, StoreError>;

    fn touch_last_active(&self, uid: &str) -> Result<(), StoreError>;

    /// Brings an archived profile back and tries to reclaim its display name.
    /// Returns true when the name went to someone else in the meantime and the
    /// user has to pick a new one. A profile that is not archived is left alone.
    fn restore_archived(&self, uid: &str) -> Result<bool, StoreError>;

    /// Applies an award to the profile totals and appends it to the ledger as
    /// one atomic step.
    fn record_award(&self, award: AwardRecord) -> Result<Profile, StoreError>;

    fn awards_for(&self, uid: &str) -> Result<Vec<AwardRecord>, StoreError>;

    /// Top `limit` players of a season by points awarded in that season.
    fn season_standings(
        &self,
        season_id: &str,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, StoreError>;

    fn get_season(&self, season_id: &str) -> Result<Option<SeasonRecord>, StoreError>;

    fn save_season(&self, record: SeasonRecord) -> Result<(), StoreError>;

    fn active_seasons(&self) -> Result<Vec<SeasonRecord>, StoreError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    profiles: HashMap<String, Profile>,
    /// lower-cased display name -> uid
    display_names: HashMap<String, String>,
    tokens: HashMap<String, String>,
    awards: Vec<AwardRecord>,
    seasons: HashMap<String, SeasonRecord>,
}

/// Profile store kept in process memory
#[derive(Debug)]
pub struct MemoryProfileStore {
    inner: Mutex<StoreInner>,
    available: AtomicBool,
    display_name_check: AtomicBool,
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            available: AtomicBool::new(true),
            display_name_check: AtomicBool::new(true),
        }
    }

    /// Switches display-name conflict checks on or off. With checks off any
    /// valid name is accepted, duplicates included.
    pub fn set_display_name_check(&self, enabled: bool) {
        self.display_name_check.store(enabled, Ordering::SeqCst);
    }

    fn name_free(&self, inner: &StoreInner, display_name: &str, exclude_uid: Option<&str>) -> bool {
        if !self.display_name_check.load(Ordering::SeqCst) {
            return true;
        }
        match inner.display_names.get(&display_name.to_lowercase()) {
            None => true,
            Some(owner) => exclude_uid == Some(owner.as_str()),
        }
    }

    /// Simulates the backend going down or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("backend offline".to_string()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    pub fn issue_token(&self, token: &str, uid: &str) -> Result<(), StoreError> {
        self.lock()?
            .tokens
            .insert(token.to_string(), uid.to_string());
        Ok(())
    }

    /// Marks an existing profile as a registered account.
    pub fn register(&self, uid: &str, email: &str) -> Result<Profile, StoreError> {
        let mut inner = self.lock()?;
        let profile = inner.profiles.get_mut(uid).ok_or(StoreError::NotFound)?;
        profile.is_registered = true;
        profile.email = Some(email.to_string());
        profile.updated_at = Utc::now();
        info!("Upgraded user {} to registered", uid);
        Ok(profile.clone())
    }

    /// Archives a profile and releases its display name.
    pub fn archive(&self, uid: &str) -> Result<Profile, StoreError> {
        let mut inner = self.lock()?;
        let key = inner
            .profiles
            .get(uid)
            .map(|p| p.display_name.to_lowercase())
            .ok_or(StoreError::NotFound)?;
        release_name(&mut inner, &key, uid);

        let profile = inner.profiles.get_mut(uid).ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        profile.archived_at = Some(now);
        profile.updated_at = now;
        info!("Archived user {}", uid);
        Ok(profile.clone())
    }
}

fn validate_display_name(display_name: &str) -> Result<String, StoreError> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Invalid("Display name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > shared::MAX_NAME_LEN {
        return Err(StoreError::Invalid(format!(
            "Display name must be at most {} characters",
            shared::MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Drops a name from the index, but only while `uid` still holds it.
fn release_name(inner: &mut StoreInner, key: &str, uid: &str) {
    if inner.display_names.get(key).map(String::as_str) == Some(uid) {
        inner.display_names.remove(key);
    }
}

impl ProfileStore for MemoryProfileStore {
    fn verify_token(&self, token: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.tokens.get(token).cloned())
    }

    fn get_profile(&self, uid: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.lock()?.profiles.get(uid).cloned())
    }

    fn create_profile(
        &self,
        uid: &str,
        display_name: &str,
        avatar: &str,
    ) -> Result<Profile, StoreError> {
        let display_name = validate_display_name(display_name)?;
        let mut inner = self.lock()?;

        if inner.profiles.contains_key(uid) {
            return Err(StoreError::Invalid("Profile already exists".to_string()));
        }
        if !self.name_free(&inner, &display_name, None) {
            return Err(StoreError::DisplayNameTaken);
        }

        let profile = Profile::new(uid, &display_name, avatar, Utc::now());
        inner
            .display_names
            .insert(display_name.to_lowercase(), uid.to_string());
        inner.profiles.insert(uid.to_string(), profile.clone());
        info!("Created user profile for {}: {}", uid, display_name);
        Ok(profile)
    }

    fn is_display_name_available(
        &self,
        display_name: &str,
        exclude_uid: Option<&str>,
    ) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(self.name_free(&inner, display_name.trim(), exclude_uid))
    }

    fn update_display_name(&self, uid: &str, display_name: &str) -> Result<Profile, StoreError> {
        let display_name = validate_display_name(display_name)?;
        let mut inner = self.lock()?;

        if !self.name_free(&inner, &display_name, Some(uid)) {
            return Err(StoreError::DisplayNameTaken);
        }
        let old_name = inner
            .profiles
            .get(uid)
            .map(|p| p.display_name.to_lowercase())
            .ok_or(StoreError::NotFound)?;

        release_name(&mut inner, &old_name, uid);
        inner
            .display_names
            .insert(display_name.to_lowercase(), uid.to_string());

        let profile = inner.profiles.get_mut(uid).ok_or(StoreError::NotFound)?;
        profile.display_name = display_name;
        profile.updated_at = Utc::now();
        info!("Updated display name for {}: {}", uid, profile.display_name);
        Ok(profile.clone())
    }

    fn update_avatar(&self, uid: &str, avatar: &str) -> Result<Profile, StoreError> {
        if avatar.trim().is_empty() {
            return Err(StoreError::Invalid("Avatar cannot be empty".to_string()));
        }
        let mut inner = self.lock()?;
        let profile = inner.profiles.get_mut(uid).ok_or(StoreError::NotFound)?;
        if !profile.is_registered {
            return Err(StoreError::NotRegistered);
        }
        profile.avatar = avatar.to_string();
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    fn touch_last_active(&self, uid: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let profile = inner.profiles.get_mut(uid).ok_or(StoreError::NotFound)?;
        profile.last_active = Utc::now();
        Ok(())
    }

    fn restore_archived(&self, uid: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let key = match inner.profiles.get(uid) {
            Some(profile) if profile.archived_at.is_some() => profile.display_name.to_lowercase(),
            Some(_) => return Ok(false),
            None => return Err(StoreError::NotFound),
        };

        let needs_new_name = !self.name_free(&inner, &key, Some(uid));
        if !needs_new_name {
            inner.display_names.insert(key, uid.to_string());
        }

        let profile = inner.profiles.get_mut(uid).ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        profile.archived_at = None;
        profile.last_active = now;
        profile.updated_at = now;
        info!(
            "Restored archived user {}{}",
            uid,
            if needs_new_name { ", display name was taken" } else { "" }
        );
        Ok(needs_new_name)
    }

    fn record_award(&self, award: AwardRecord) -> Result<Profile, StoreError> {
        let mut inner = self.lock()?;
        let profile = inner
            .profiles
            .get_mut(&award.uid)
            .ok_or(StoreError::NotFound)?;
        profile.apply_award(award.points, &award.season_id, award.timestamp);
        let updated = profile.clone();

        info!(
            "Added {} points to {}. New total: {}",
            award.points, award.uid, updated.points
        );
        inner.awards.push(award);
        Ok(updated)
    }

    fn awards_for(&self, uid: &str) -> Result<Vec<AwardRecord>, StoreError> {
        Ok(self
            .lock()?
            .awards
            .iter()
            .filter(|a| a.uid == uid)
            .cloned()
            .collect())
    }

    fn season_standings(
        &self,
        season_id: &str,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let inner = self.lock()?;

        let mut totals: HashMap<&str, u64> = HashMap::new();
        for award in inner.awards.iter().filter(|a| a.season_id == season_id) {
            *totals.entry(award.uid.as_str()).or_insert(0) += u64::from(award.points);
        }

        let mut entries: Vec<LeaderboardEntry> = totals
            .into_iter()
            .filter(|(_, points)| *points > 0)
            .filter_map(|(uid, points)| {
                inner.profiles.get(uid).map(|p| LeaderboardEntry {
                    uid: uid.to_string(),
                    display_name: p.display_name.clone(),
                    avatar: p.avatar.clone(),
                    season_points: points,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.season_points
                .cmp(&a.season_points)
                .then_with(|| a.display_name.cmp(&b.display_name))
                .then_with(|| a.uid.cmp(&b.uid))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    fn get_season(&self, season_id: &str) -> Result<Option<SeasonRecord>, StoreError> {
        Ok(self.lock()?.seasons.get(season_id).cloned())
    }

    fn save_season(&self, record: SeasonRecord) -> Result<(), StoreError> {
        self.lock()?.seasons.insert(record.id.clone(), record);
        Ok(())
    }

    fn active_seasons(&self) -> Result<Vec<SeasonRecord>, StoreError> {
        Ok(self
            .lock()?
            .seasons
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn award(uid: &str, points: u32, season: &str) -> AwardRecord {
        AwardRecord {
            uid: uid.to_string(),
            points,
            timestamp: Utc::now(),
            season_id: season.to_string(),
            room_id: "ROOM01".to_string(),
        }
    }

    #[test]
    fn test_apply_award_resets_on_new_season() {
        let mut profile = Profile::new("u1", "Ada", "cat", Utc::now());
        profile.apply_award(3, "2026-S01", Utc::now());
        profile.apply_award(1, "2026-S01", Utc::now());
        assert_eq!(profile.points, 4);
        assert_eq!(profile.season_points, 4);

        profile.apply_award(3, "2026-S02", Utc::now());
        assert_eq!(profile.points, 7);
        assert_eq!(profile.season_points, 3);
        assert_eq!(profile.season_id.as_deref(), Some("2026-S02"));
    }

    #[test]
    fn test_display_names_unique_case_insensitive() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();

        assert!(!store.is_display_name_available("ada", None).unwrap());
        assert!(store.is_display_name_available("ADA", Some("u1")).unwrap());
        assert_eq!(
            store.create_profile("u2", "ADA", "dog"),
            Err(StoreError::DisplayNameTaken)
        );
    }

    #[test]
    fn test_update_display_name_releases_old_name() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();
        store.create_profile("u2", "Grace", "dog").unwrap();

        assert_eq!(
            store.update_display_name("u2", "ada"),
            Err(StoreError::DisplayNameTaken)
        );
        let updated = store.update_display_name("u1", "Lovelace").unwrap();
        assert_eq!(updated.display_name, "Lovelace");
        assert!(store.is_display_name_available("Ada", None).unwrap());
        assert_eq!(
            store.update_display_name("nobody", "Someone"),
            Err(StoreError::NotFound)
        );
    }

    #[test]
    fn test_avatar_requires_registration() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();
        assert_eq!(
            store.update_avatar("u1", "fox"),
            Err(StoreError::NotRegistered)
        );

        store.register("u1", "ada@example.com").unwrap();
        assert_eq!(store.update_avatar("u1", "fox").unwrap().avatar, "fox");
    }

    #[test]
    fn test_record_award_appends_ledger() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();

        store.record_award(award("u1", 3, "2026-S10")).unwrap();
        let profile = store.record_award(award("u1", 1, "2026-S10")).unwrap();
        assert_eq!(profile.points, 4);
        assert_eq!(store.awards_for("u1").unwrap().len(), 2);
        assert_eq!(
            store.record_award(award("ghost", 3, "2026-S10")),
            Err(StoreError::NotFound)
        );
    }

    #[test]
    fn test_season_standings_ordering() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();
        store.create_profile("u2", "Grace", "dog").unwrap();
        store.create_profile("u3", "Alan", "fox").unwrap();

        store.record_award(award("u1", 3, "2026-S10")).unwrap();
        store.record_award(award("u2", 3, "2026-S10")).unwrap();
        store.record_award(award("u2", 1, "2026-S10")).unwrap();
        store.record_award(award("u3", 3, "2026-S10")).unwrap();
        store.record_award(award("u3", 3, "2026-S09")).unwrap();

        let standings = store.season_standings("2026-S10", 10).unwrap();
        let names: Vec<&str> = standings.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Grace", "Ada", "Alan"]);
        assert_eq!(standings[0].season_points, 4);

        assert_eq!(store.season_standings("2026-S10", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_name_check_switched_off_allows_duplicates() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();
        store.create_profile("u2", "Grace", "dog").unwrap();
        store.set_display_name_check(false);

        assert!(store.is_display_name_available("ADA", None).unwrap());
        assert_eq!(store.create_profile("u3", "ada", "fox").unwrap().display_name, "ada");
        assert_eq!(store.update_display_name("u2", "Ada").unwrap().display_name, "Ada");

        // Names are still validated.
        assert!(matches!(
            store.create_profile("u4", "   ", "fox"),
            Err(StoreError::Invalid(_))
        ));

        store.set_display_name_check(true);
        assert!(!store.is_display_name_available("Ada", None).unwrap());
    }

    #[test]
    fn test_touch_last_active() {
        let store = MemoryProfileStore::new();
        let created = store.create_profile("u1", "Ada", "cat").unwrap();

        store.touch_last_active("u1").unwrap();
        let profile = store.get_profile("u1").unwrap().unwrap();
        assert!(profile.last_active >= created.last_active);
        assert_eq!(profile.updated_at, created.updated_at);
        assert_eq!(store.touch_last_active("ghost"), Err(StoreError::NotFound));
    }

    #[test]
    fn test_archive_releases_name_and_restore_reclaims_it() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();

        let archived = store.archive("u1").unwrap();
        assert!(archived.archived_at.is_some());
        assert!(store.is_display_name_available("ada", None).unwrap());

        assert_eq!(store.restore_archived("u1"), Ok(false));
        let restored = store.get_profile("u1").unwrap().unwrap();
        assert!(restored.archived_at.is_none());
        assert_eq!(restored.display_name, "Ada");
        assert!(!store.is_display_name_available("ada", None).unwrap());

        // Restoring an active profile changes nothing.
        assert_eq!(store.restore_archived("u1"), Ok(false));
        assert_eq!(store.restore_archived("ghost"), Err(StoreError::NotFound));
    }

    #[test]
    fn test_restore_with_taken_name_needs_new_name() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();
        store.archive("u1").unwrap();
        store.create_profile("u2", "ADA", "dog").unwrap();

        assert_eq!(store.restore_archived("u1"), Ok(true));
        assert!(store.get_profile("u1").unwrap().unwrap().archived_at.is_none());
        // The newcomer keeps the name.
        assert!(store.is_display_name_available("ada", Some("u2")).unwrap());
        assert!(!store.is_display_name_available("ada", Some("u1")).unwrap());

        // Picking a new name must not release the newcomer's.
        store.update_display_name("u1", "Lovelace").unwrap();
        assert!(!store.is_display_name_available("Ada", None).unwrap());
        assert!(!store.is_display_name_available("lovelace", None).unwrap());
    }

    #[test]
    fn test_unavailable_store_fails_every_call() {
        let store = MemoryProfileStore::new();
        store.create_profile("u1", "Ada", "cat").unwrap();
        store.set_available(false);

        assert!(matches!(
            store.get_profile("u1"),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.verify_token("t").is_err());

        store.set_available(true);
        assert!(store.get_profile("u1").unwrap().is_some());
    }
}
