pub mod facade;
pub mod process;
