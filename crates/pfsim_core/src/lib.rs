//! Intrahost dynamics engine for a single *Plasmodium falciparum* host:
//! infection trajectories, antibody state, and red-blood-cell/fever dynamics
//! under a deterministic RNG stream. No file I/O, no ECS, no networking —
//! those live in the sibling `pfsim_config`/`pfsim_io` crates.

pub mod antibody;
pub mod config;
pub mod error;
pub mod infection;
pub mod intrahost;
pub mod rng;
pub mod susceptibility;

pub use antibody::*;
pub use config::*;
pub use error::*;
pub use infection::*;
pub use intrahost::*;
pub use rng::*;
pub use susceptibility::*;
