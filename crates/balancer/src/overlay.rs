//! In-memory overlay the balancer keeps alongside the persisted account
//! rows: cooldowns and the last-used stamp never touch the database,
//! since they only matter to the process currently serving traffic.

use std::collections::HashMap;
use std::time::Instant;

/// Default cooldown applied when a transient failure carries no usable
/// reset timestamp.
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

#[derive(Debug, Clone, Copy)]
pub struct AccountOverlay {
    pub last_used: Instant,
    pub cooldown_until: Option<Instant>,
}

impl Default for AccountOverlay {
    fn default() -> Self {
        Self {
            last_used: Instant::now(),
            cooldown_until: None,
        }
    }
}

impl AccountOverlay {
    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }
}

/// The overlay map, one entry per account id seen so far. A single
/// `Mutex` guards the whole map — critical sections are O(accounts) and
/// short, matching the spec's guidance against finer-grained locking.
#[derive(Debug, Default)]
pub struct Overlay {
    entries: HashMap<String, AccountOverlay>,
}

impl Overlay {
    pub fn entries_view(&self) -> &HashMap<String, AccountOverlay> {
        &self.entries
    }

    pub fn get_or_insert(&mut self, account_id: &str) -> AccountOverlay {
        *self
            .entries
            .entry(account_id.to_string())
            .or_insert_with(AccountOverlay::default)
    }

    pub fn stamp_last_used(&mut self, account_id: &str, now: Instant) {
        self.entries.entry(account_id.to_string()).or_insert_with(AccountOverlay::default).last_used = now;
    }

    pub fn place_in_cooldown(&mut self, account_id: &str, until: Instant) {
        let entry = self.entries.entry(account_id.to_string()).or_insert_with(AccountOverlay::default);
        entry.cooldown_until = Some(until);
    }

    pub fn clear_cooldown(&mut self, account_id: &str) {
        if let Some(entry) = self.entries.get_mut(account_id) {
            entry.cooldown_until = None;
        }
    }

    pub fn remove(&mut self, account_id: &str) {
        self.entries.remove(account_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_entry_is_not_in_cooldown() {
        let mut overlay = Overlay::default();
        let entry = overlay.get_or_insert("acc-1");
        assert!(!entry.in_cooldown(Instant::now()));
    }

    #[test]
    fn cooldown_expires_after_deadline() {
        let mut overlay = Overlay::default();
        let now = Instant::now();
        overlay.place_in_cooldown("acc-1", now + Duration::from_secs(10));
        let entry = overlay.get_or_insert("acc-1");
        assert!(entry.in_cooldown(now));
        assert!(!entry.in_cooldown(now + Duration::from_secs(11)));
    }

    #[test]
    fn clear_cooldown_makes_account_eligible_again() {
        let mut overlay = Overlay::default();
        let now = Instant::now();
        overlay.place_in_cooldown("acc-1", now + Duration::from_secs(100));
        overlay.clear_cooldown("acc-1");
        let entry = overlay.get_or_insert("acc-1");
        assert!(!entry.in_cooldown(now));
    }
}
