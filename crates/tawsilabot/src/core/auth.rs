//! Staff authorization
//!
//! A static allow-list of Telegram user ids, loaded once from the
//! environment. Unauthorized users can still place orders; the list only
//! gates staff features (order listing, statistics, payment management).

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::core::config;

static AUTHORIZED_IDS: Lazy<HashSet<u64>> = Lazy::new(|| {
    let raw = config::AUTHORIZED_USER_IDS.trim();
    if raw.is_empty() {
        log::warn!("AUTHORIZED_USER_IDS is not set. No user will be authorized for staff features.");
        return HashSet::new();
    }

    let ids: HashSet<u64> = raw.split(',').filter_map(|id| id.trim().parse().ok()).collect();
    log::info!("Authorized user ids loaded: {}", ids.len());
    ids
});

/// Checks whether a Telegram user id is on the staff allow-list.
pub fn is_authorized(user_id: u64) -> bool {
    AUTHORIZED_IDS.contains(&user_id)
}
