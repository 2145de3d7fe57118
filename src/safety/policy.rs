use std::sync::RwLock;

use crate::api::{AdminApi, TransportError};
use crate::models::ModerationPolicy;

/// Process-wide moderation policy.
///
/// Read by the safety filter on every evaluation; mutated only through an
/// explicit administrator update. Readers always see the latest committed
/// policy. The local `version` counter bumps on every committed change and
/// is stamped onto audit records.
#[derive(Debug)]
pub struct PolicyStore {
    inner: RwLock<ModerationPolicy>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(ModerationPolicy::default())
    }
}

impl PolicyStore {
    pub fn new(policy: ModerationPolicy) -> Self {
        Self {
            inner: RwLock::new(policy),
        }
    }

    /// Snapshot of the current policy.
    pub fn current(&self) -> ModerationPolicy {
        self.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Administrator update: replace the editable fields and bump the
    /// version. Returns the new version.
    pub fn update(&self, edited: ModerationPolicy) -> u64 {
        let mut policy = self.write();
        let version = policy.version + 1;
        *policy = ModerationPolicy { version, ..edited };
        tracing::info!(
            version,
            blocked = policy.blocked_words.len(),
            allowed = policy.allowed_phrases.len(),
            "Moderation policy updated"
        );
        version
    }

    /// Replace the policy with the server's `/admin/rules` content.
    /// Counts as a committed change: bumps the local version.
    pub async fn load<A: AdminApi>(&self, api: &A) -> Result<u64, TransportError> {
        let remote = api.fetch_rules().await?;
        Ok(self.update(remote))
    }

    /// Push the current policy to `/admin/rules`.
    pub async fn publish<A: AdminApi>(&self, api: &A) -> Result<(), TransportError> {
        let snapshot = self.current();
        api.update_rules(&snapshot).await
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ModerationPolicy> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ModerationPolicy> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_bumps_version_and_replaces_content() {
        let store = PolicyStore::default();
        let before = store.version();

        let mut edited = store.current();
        edited.blocked_words.push("miracle".into());
        let after = store.update(edited);

        assert_eq!(after, before + 1);
        assert!(store.current().blocked_words.iter().any(|w| w == "miracle"));
    }

    #[test]
    fn readers_see_latest_committed_policy() {
        let store = PolicyStore::default();
        let mut edited = store.current();
        edited.disclaimer = "Updated disclaimer.".into();
        store.update(edited);
        assert_eq!(store.current().disclaimer, "Updated disclaimer.");
    }

    #[test]
    fn update_ignores_caller_supplied_version() {
        let store = PolicyStore::default();
        let mut edited = store.current();
        edited.version = 999;
        let version = store.update(edited);
        assert_eq!(version, 2);
        assert_eq!(store.version(), 2);
    }
}
