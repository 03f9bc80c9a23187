//! Port traits: the capability seams between the domain and the outside world.

pub mod config_port;
pub mod exchange_port;
pub mod gate_port;
pub mod notifier_port;
