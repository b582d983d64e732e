//! Memory trait: the short, per-session rolling log of recent turns.
//!
//! A session is an opaque string key. It comes into existence on the first
//! `add` and lives as long as the memory instance does. Reads never fail:
//! an unknown session, or no session at all, simply has no entries.

use async_trait::async_trait;

/// Bounded per-session memory shared across chain invocations.
///
/// Implementations must keep each session's sequence consistent when
/// independent sessions are read and written concurrently.
#[async_trait]
pub trait SessionMemory: Send + Sync {
    /// The backend name (e.g., "rolling").
    fn name(&self) -> &str;

    /// Append `text` to the session, evicting the oldest entry once the
    /// session holds more than [`capacity`](SessionMemory::capacity) entries.
    async fn add(&self, session_id: &str, text: String);

    /// Entries for the session, oldest first. Empty for unknown or absent ids.
    async fn get_recent(&self, session_id: Option<&str>) -> Vec<String>;

    /// Drop every entry of a session. Returns whether the session existed.
    async fn clear(&self, session_id: &str) -> bool;

    /// Maximum number of entries retained per session.
    fn capacity(&self) -> usize;
}
