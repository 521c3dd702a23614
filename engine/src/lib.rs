// Engine library root

pub mod config;
pub mod error;
pub mod page;
pub mod services;
pub mod session;
pub mod stats;
