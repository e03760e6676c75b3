//! CLI command implementations.

mod config;
mod encode;
mod inspect;

pub use config::{run_config, show_config, ConfigArgs, ConfigCommand};
pub use encode::{encode, run_encode, EncodeArgs};
pub use inspect::{decode_hex, render, run_inspect, InspectArgs, InspectAs};
