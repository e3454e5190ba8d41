pub mod amount;
pub mod error;
pub mod network;
pub mod portfolio;
