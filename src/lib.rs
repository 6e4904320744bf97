//! Centralized routing control plane for an emulated UDP packet-switch
//! network.
//!
//! A single [`controller`] process holds the authoritative declared
//! topology and pushes shortest-path routing tables to `N` [`switch`]
//! processes over loopback UDP. Switches track liveness of their own
//! neighbors; the Controller tracks liveness of switches. See
//! [`engine`] for the shortest-path computation and [`codec`] for the
//! wire format both sides speak.

pub mod codec;
pub mod controller;
pub mod engine;
pub mod error;
pub mod logging;
pub mod switch;
pub mod topology;

use std::time::Duration;

/// How often each timer loop wakes up to send keep-alives / topology
/// updates and check for timeouts.
pub const UPDATE_DELAY: Duration = Duration::from_secs(2);

/// A peer is declared dead once this much time has passed since the last
/// message was heard from it. Three missed ticks.
pub const TIMEOUT: Duration = Duration::from_secs(6);
