//! Account selection: sticky-key fast path, eligible-partition, and
//! either prefer-earlier-reset or round-robin-by-`last_used` ordering.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use common::AccountStatus;
use store::{Account, Store};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::overlay::{DEFAULT_COOLDOWN_SECS, Overlay};

pub struct Balancer {
    store: Store,
    overlay: Mutex<Overlay>,
    prefer_earlier_reset_accounts: bool,
}

impl Balancer {
    pub fn new(store: Store, prefer_earlier_reset_accounts: bool) -> Self {
        Self {
            store,
            overlay: Mutex::new(Overlay::default()),
            prefer_earlier_reset_accounts,
        }
    }

    /// Select an account for a request, honoring a sticky key when one
    /// is supplied and valid.
    pub async fn select(&self, sticky_key: Option<&str>) -> Result<Account> {
        let accounts = self.store.accounts.list_active().await?;
        let now = Instant::now();

        if let Some(key) = sticky_key {
            if let Some(account_id) = self.store.sticky_sessions.get_account_id(key).await? {
                if let Some(account) = accounts.iter().find(|a| a.id == account_id) {
                    if self.is_eligible(account, now) {
                        self.stamp_selected(account);
                        return Ok(account.clone());
                    }
                }
            }
        }

        let mut eligible: Vec<&Account> = accounts.iter().filter(|a| self.is_eligible(a, now)).collect();
        if eligible.is_empty() {
            return Err(Error::NoAccounts(format!(
                "no eligible accounts among {} known",
                accounts.len()
            )));
        }

        if self.prefer_earlier_reset_accounts {
            eligible.sort_by(|a, b| {
                let reset_a = effective_reset_at(a);
                let reset_b = effective_reset_at(b);
                reset_a
                    .cmp(&reset_b)
                    .then_with(|| self.last_used(&a.id).cmp(&self.last_used(&b.id)))
                    .then_with(|| a.id.cmp(&b.id))
            });
        } else {
            eligible.sort_by(|a, b| {
                self.last_used(&a.id)
                    .cmp(&self.last_used(&b.id))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }

        let chosen = eligible[0];
        self.stamp_selected(chosen);
        Ok(chosen.clone())
    }

    fn is_eligible(&self, account: &Account, now: Instant) -> bool {
        if account.status != AccountStatus::Active {
            return false;
        }
        let overlay = self.overlay.lock().expect("overlay mutex poisoned");
        !overlay
            .entries_view()
            .get(&account.id)
            .is_some_and(|entry| entry.in_cooldown(now))
    }

    fn last_used(&self, account_id: &str) -> Instant {
        let mut overlay = self.overlay.lock().expect("overlay mutex poisoned");
        overlay.get_or_insert(account_id).last_used
    }

    fn stamp_selected(&self, account: &Account) {
        let mut overlay = self.overlay.lock().expect("overlay mutex poisoned");
        overlay.stamp_last_used(&account.id, Instant::now());
    }

    /// Release an account after a request completes, recording its
    /// `last_used` timestamp again so idle time is measured from when
    /// the request actually finished rather than when it started.
    pub fn release(&self, account_id: &str) {
        let mut overlay = self.overlay.lock().expect("overlay mutex poisoned");
        overlay.stamp_last_used(account_id, Instant::now());
    }

    /// Record a transient upstream failure (rate limit, 5xx): place the
    /// account in cooldown until `reset_at`, or a short default backoff
    /// when the upstream gave no usable timestamp.
    pub fn report_transient(&self, account_id: &str, reset_at: Option<i64>, now_unix: i64) {
        let until = match reset_at {
            Some(reset) if reset > now_unix => Instant::now() + Duration::from_secs((reset - now_unix) as u64),
            _ => Instant::now() + Duration::from_secs(DEFAULT_COOLDOWN_SECS),
        };
        let mut overlay = self.overlay.lock().expect("overlay mutex poisoned");
        overlay.place_in_cooldown(account_id, until);
        info!(account_id, "account placed in cooldown");
    }

    /// Record a permanent upstream failure: deactivate the account in
    /// the store and drop its overlay entry.
    pub async fn report_permanent(&self, account_id: &str, reason: &str) -> Result<()> {
        self.store
            .accounts
            .update_status(account_id, AccountStatus::Deactivated, Some(reason))
            .await?;
        let mut overlay = self.overlay.lock().expect("overlay mutex poisoned");
        overlay.remove(account_id);
        warn!(account_id, reason, "account deactivated");
        Ok(())
    }

    /// Clear a cooldown once the account's status has recovered to
    /// `ACTIVE` (called after the quota state machine reports recovery).
    pub fn clear_cooldown(&self, account_id: &str) {
        let mut overlay = self.overlay.lock().expect("overlay mutex poisoned");
        overlay.clear_cooldown(account_id);
    }
}

fn effective_reset_at(account: &Account) -> i64 {
    match (account.usage.primary_reset_at, account.usage.secondary_reset_at) {
        (Some(p), Some(s)) => p.min(s),
        (Some(p), None) => p,
        (None, Some(s)) => s,
        (None, None) => i64::MAX,
    }
}
