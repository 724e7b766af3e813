//! Resolution of connecting clients to profiles
//!
//! Any failure on the way (no token, unknown token, backend down) yields a
//! guest identity. The real-time session never fails because of the identity
//! backend. Resolving a signed-in user also records the visit, and brings an
//! archived account back.

use crate::profile::{Profile, ProfileStore};
use log::{info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub uid: Option<String>,
    pub profile: Option<Profile>,
    /// Restored from the archive, but someone else took the display name.
    pub needs_new_display_name: bool,
}

impl Identity {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn signed_in(uid: &str, profile: Option<Profile>) -> Self {
        Self {
            uid: Some(uid.to_string()),
            profile,
            needs_new_display_name: false,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.uid.is_none()
    }

    /// Signed in but has no usable display name yet.
    pub fn needs_display_name(&self) -> bool {
        self.uid.is_some() && (self.profile.is_none() || self.needs_new_display_name)
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn ProfileStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Blocking; call from a blocking-capable context.
    pub fn resolve(&self, token: Option<&str>) -> Identity {
        let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => return Identity::guest(),
        };

        let uid = match self.store.verify_token(token) {
            Ok(Some(uid)) => uid,
            Ok(None) => {
                info!("Token invalid or expired, proceeding as guest");
                return Identity::guest();
            }
            Err(e) => {
                warn!("Identity backend error, proceeding as guest: {}", e);
                return Identity::guest();
            }
        };

        let profile = match self.store.get_profile(&uid) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Failed to load profile for {}, proceeding as guest: {}", uid, e);
                return Identity::guest();
            }
        };

        let archived = profile.as_ref().map(|p| p.archived_at.is_some());
        let mut identity = Identity::signed_in(&uid, profile);
        match archived {
            Some(true) => self.restore(&mut identity, &uid),
            Some(false) => {
                if let Err(e) = self.store.touch_last_active(&uid) {
                    warn!("Failed to record activity for {}: {}", uid, e);
                }
            }
            None => info!("No user profile found for {}", uid),
        }
        if let Some(p) = &identity.profile {
            info!("User profile loaded: {}", p.display_name);
        }
        identity
    }

    /// A failed restore keeps the archived profile as loaded.
    fn restore(&self, identity: &mut Identity, uid: &str) {
        info!("Restoring archived user {}", uid);
        let needs_new_name = match self.store.restore_archived(uid) {
            Ok(needs_new_name) => needs_new_name,
            Err(e) => {
                warn!("Failed to restore archived user {}: {}", uid, e);
                return;
            }
        };

        match self.store.get_profile(uid) {
            Ok(profile) => identity.profile = profile,
            Err(e) => warn!("Failed to reload restored profile for {}: {}", uid, e),
        }
        identity.needs_new_display_name = needs_new_name;
        if needs_new_name {
            info!("Restored user {} needs a new display name", uid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MemoryProfileStore;

    fn resolver_with_user() -> (Arc<MemoryProfileStore>, IdentityResolver) {
        let store = Arc::new(MemoryProfileStore::new());
        store.create_profile("u1", "Ada", "fox").unwrap();
        store.issue_token("token-ada", "u1").unwrap();
        store.issue_token("token-new", "u2").unwrap();
        let resolver = IdentityResolver::new(store.clone());
        (store, resolver)
    }

    #[test]
    fn test_missing_or_blank_token_is_guest() {
        let (_, resolver) = resolver_with_user();
        assert!(resolver.resolve(None).is_guest());
        assert!(resolver.resolve(Some("  ")).is_guest());
    }

    #[test]
    fn test_known_token_loads_profile() {
        let (_, resolver) = resolver_with_user();
        let identity = resolver.resolve(Some("token-ada"));
        assert_eq!(identity.uid.as_deref(), Some("u1"));
        assert_eq!(identity.profile.unwrap().display_name, "Ada");
    }

    #[test]
    fn test_signed_in_without_profile_needs_name() {
        let (_, resolver) = resolver_with_user();
        let identity = resolver.resolve(Some("token-new"));
        assert!(!identity.is_guest());
        assert!(identity.needs_display_name());
    }

    #[test]
    fn test_unknown_token_is_guest() {
        let (_, resolver) = resolver_with_user();
        assert!(resolver.resolve(Some("forged")).is_guest());
    }

    #[test]
    fn test_resolve_records_activity() {
        let (store, resolver) = resolver_with_user();
        let before = store.get_profile("u1").unwrap().unwrap().last_active;

        resolver.resolve(Some("token-ada"));
        assert!(store.get_profile("u1").unwrap().unwrap().last_active >= before);
    }

    #[test]
    fn test_archived_user_restored_on_connect() {
        let (store, resolver) = resolver_with_user();
        store.archive("u1").unwrap();

        let identity = resolver.resolve(Some("token-ada"));
        let profile = identity.profile.as_ref().unwrap();
        assert!(profile.archived_at.is_none());
        assert_eq!(profile.display_name, "Ada");
        assert!(!identity.needs_display_name());
        assert!(!store.is_display_name_available("ada", None).unwrap());
    }

    #[test]
    fn test_restored_user_with_taken_name_must_rename() {
        let (store, resolver) = resolver_with_user();
        store.archive("u1").unwrap();
        store.create_profile("u3", "Ada", "cat").unwrap();

        let identity = resolver.resolve(Some("token-ada"));
        assert!(identity.profile.is_some());
        assert!(identity.needs_new_display_name);
        assert!(identity.needs_display_name());
    }

    #[test]
    fn test_backend_down_degrades_to_guest() {
        let (store, resolver) = resolver_with_user();
        store.set_available(false);
        let identity = resolver.resolve(Some("token-ada"));
        assert!(identity.is_guest());
        assert!(!identity.needs_display_name());
    }
}
