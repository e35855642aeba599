pub mod cli;
pub mod driver;
pub mod interactive;
pub mod payloads;
