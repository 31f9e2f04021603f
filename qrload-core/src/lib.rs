#![doc = include_str!("../README.md")]

mod config;
mod constants;
mod error;
mod outcome;
mod report;
mod stats;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use outcome::*;
pub use report::*;
pub use stats::*;
