pub mod config;
pub mod dist;
pub mod envs;
pub mod runtime;
pub mod tooling;
