// Contracts Module - read-only ABIs used by the adapters

pub mod balance_checker;
pub mod comptroller;
pub mod erc20;
pub mod f_token;

// Public exports
pub use balance_checker::BalanceChecker;
pub use comptroller::Comptroller;
pub use erc20::Erc20;
pub use f_token::FToken;
