pub mod blockchain;
pub mod config;
pub mod logger;
pub mod price;
pub mod providers;
