pub mod artifact;
pub mod cli;
pub mod config;
pub mod contract;
pub mod diff;
pub mod emoji;
pub mod error;
pub mod fetch;
pub mod load_config;
pub mod normalize;
pub mod publish;
pub mod synchronise;
