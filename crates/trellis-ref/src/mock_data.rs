//! Simulated operations events for the TRELLIS reference scenarios.
//!
//! All data in this module is hardcoded and fictional.

use serde_json::json;

use trellis_contracts::event::Event;

/// Name of the tree every scenario logs into.
pub const TREE_NAME: &str = "acme-ops-audit";

/// Client configuration shared by the scenarios.
pub const CLIENT_CONFIG: &str = include_str!("../config/client.toml");

/// Seed for the scenarios' local Ed25519 signer. Fictional; never use a
/// fixed seed outside a demo.
pub const SIGNER_SEED: [u8; 32] = [
    0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c, 0xc4,
    0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae, 0x7f, 0x60,
];

/// A day of activity on a small operations team.
pub fn operations_events() -> Vec<Event> {
    vec![
        Event::new("alice signed in from the VPN")
            .with_actor("alice")
            .with_action("login")
            .with_status("success")
            .with_source("vpn-gw-2"),
        Event::new("deployed billing-api v2.14.0")
            .with_actor("ci-bot")
            .with_action("deploy")
            .with_status("success")
            .with_target("billing-api"),
        Event::new("raised connection pool size")
            .with_actor("bob")
            .with_action("config_change")
            .with_target("orders-db")
            .with_old(json!({ "pool_size": 20, "timeout_ms": 5000 }))
            .with_new(json!({ "timeout_ms": 5000, "pool_size": 40 })),
        Event::new("failed sign-in, bad second factor")
            .with_actor("mallory")
            .with_action("login")
            .with_status("failure")
            .with_source("203.0.113.7"),
        Event::new("rotated the payments signing key")
            .with_actor("carol")
            .with_action("key_rotation")
            .with_status("success")
            .with_target("payments-hsm"),
        Event::new("granted read access to finance reports")
            .with_actor("alice")
            .with_action("grant")
            .with_target("finance-reports")
            .with_custom("ticket", json!("OPS-4412")),
        Event::new("alice signed out")
            .with_actor("alice")
            .with_action("logout")
            .with_status("success"),
    ]
}

/// The forged version of the config change a compromised service might
/// substitute.
pub fn forged_config_change() -> Event {
    Event::new("raised connection pool size")
        .with_actor("bob")
        .with_action("config_change")
        .with_target("orders-db")
        .with_old(json!({ "pool_size": 20, "timeout_ms": 5000 }))
        .with_new(json!({ "pool_size": 400, "timeout_ms": 5000 }))
}
