pub mod aggregator;

pub use aggregator::{merge_balances, Aggregator};
