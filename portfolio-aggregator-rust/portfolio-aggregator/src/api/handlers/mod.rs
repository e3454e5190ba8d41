pub mod portfolio;
pub mod system;

pub use portfolio::{get_balances, get_transactions, PortfolioQuery};
pub use system::{health, list_networks};
