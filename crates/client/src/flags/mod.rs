//! Feature flags and flag-gated degradation
//!
//! A process-wide registry of boolean switches, used to turn risky or
//! backend-dependent features off without shipping code. The
//! [`FeatureFlags::guard`] helpers run an operation only while its flag is
//! enabled and degrade silently to a fallback otherwise.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::RwLock;
use tracing::debug;

/// Process-wide feature flag registry
///
/// Constructed once at composition time and shared by handle; flags are
/// plain booleans with a caller-supplied default for unknown names.
#[derive(Debug, Default)]
pub struct FeatureFlags {
    flags: RwLock<HashMap<String, bool>>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self, feature: &str) {
        debug!(feature, "feature enabled");
        self.flags.write().insert(feature.to_string(), true);
    }

    pub fn disable(&self, feature: &str) {
        debug!(feature, "feature disabled");
        self.flags.write().insert(feature.to_string(), false);
    }

    pub fn toggle(&self, feature: &str) {
        let mut flags = self.flags.write();
        let current = flags.get(feature).copied().unwrap_or(false);
        flags.insert(feature.to_string(), !current);
    }

    /// Current value, or `default` when the flag was never set
    pub fn is_enabled(&self, feature: &str, default: bool) -> bool {
        self.flags.read().get(feature).copied().unwrap_or(default)
    }

    /// Run `operation` only when the flag is enabled, degrading to
    /// `fallback` otherwise
    pub fn guard<T>(
        &self,
        feature: &str,
        operation: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> T {
        if self.is_enabled(feature, false) {
            operation()
        } else {
            fallback()
        }
    }

    /// Async variant of [`guard`](Self::guard)
    pub async fn guard_async<T, Fut, Fb>(
        &self,
        feature: &str,
        operation: impl FnOnce() -> Fut,
        fallback: impl FnOnce() -> Fb,
    ) -> T
    where
        Fut: Future<Output = T>,
        Fb: Future<Output = T>,
    {
        if self.is_enabled(feature, false) {
            operation().await
        } else {
            fallback().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable_toggle() {
        let flags = FeatureFlags::new();

        assert!(!flags.is_enabled("video_analysis", false));
        assert!(flags.is_enabled("video_analysis", true), "default applies when unset");

        flags.enable("video_analysis");
        assert!(flags.is_enabled("video_analysis", false));

        flags.disable("video_analysis");
        assert!(!flags.is_enabled("video_analysis", true), "explicit value beats default");

        flags.toggle("video_analysis");
        assert!(flags.is_enabled("video_analysis", false));

        flags.toggle("brand_new");
        assert!(flags.is_enabled("brand_new", false), "toggle of unset flag turns it on");
    }

    #[test]
    fn test_guard_runs_or_degrades() {
        let flags = FeatureFlags::new();

        let out = flags.guard("experimental", || "real", || "fallback");
        assert_eq!(out, "fallback");

        flags.enable("experimental");
        let out = flags.guard("experimental", || "real", || "fallback");
        assert_eq!(out, "real");
    }

    #[tokio::test]
    async fn test_guard_async() {
        let flags = FeatureFlags::new();
        flags.enable("remote_tips");

        let out = flags
            .guard_async("remote_tips", || async { 10 }, || async { 0 })
            .await;
        assert_eq!(out, 10);

        flags.disable("remote_tips");
        let out = flags
            .guard_async("remote_tips", || async { 10 }, || async { 0 })
            .await;
        assert_eq!(out, 0);
    }
}
