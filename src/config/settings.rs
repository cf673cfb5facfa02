//! Process-wide transport settings.
//!
//! Linger and the send/receive deadlines are shared by every connection the
//! process creates. A [`SecureChannel`] reads them whenever it builds a
//! socket (connect and reset), so a change never affects a socket that
//! already exists.
//!
//! [`SecureChannel`]: crate::channel::SecureChannel

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

use crate::config::schema::TransportConfig;

static TRANSPORT: LazyLock<ArcSwap<TransportConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(TransportConfig::default()));

/// Current transport settings.
pub fn transport() -> TransportConfig {
    **TRANSPORT.load()
}

/// Replace all transport settings at once.
pub fn store(config: TransportConfig) {
    TRANSPORT.store(Arc::new(config));
    tracing::debug!(
        linger_ms = config.linger_ms,
        send_timeout_ms = config.send_timeout_ms,
        recv_timeout_ms = config.recv_timeout_ms,
        "Transport settings updated"
    );
}

fn update(f: impl Fn(&mut TransportConfig)) {
    TRANSPORT.rcu(|current| {
        let mut next = **current;
        f(&mut next);
        next
    });
}

pub fn set_linger(ms: u64) {
    update(|c| c.linger_ms = ms);
}

pub fn set_send_timeout(ms: u64) {
    update(|c| c.send_timeout_ms = ms);
}

pub fn set_recv_timeout(ms: u64) {
    update(|c| c.recv_timeout_ms = ms);
}
