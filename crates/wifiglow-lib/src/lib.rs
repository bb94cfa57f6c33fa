//! WiFiGlow — mode and LED effects controller for a self-provisioning
//! WiFi reachability lamp.

pub mod association;
pub mod color;
pub mod command;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod effects;
pub mod error;
pub mod hal;
pub mod reset;
pub mod store;

pub use error::WifiglowError;
