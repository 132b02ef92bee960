//! User directory capability
//!
//! Resolves chat-platform user ids to display names for the leaderboard.
//! Injected at startup; running without one is valid and falls back to raw ids.

use async_trait::async_trait;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Display name for `user_id`, `None` when unknown or the lookup failed
    async fn display_name(&self, user_id: &str) -> Option<String>;
}
