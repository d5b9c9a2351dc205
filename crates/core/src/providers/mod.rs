pub mod registry;
pub mod traits;

// Resolver implementations
pub mod alphavantage;
pub mod static_prices;
pub mod yahoo_finance;
