pub mod chart;
pub mod cost_basis;
pub mod instrument;
pub mod ledger;
pub mod portfolio;
pub mod settings;
pub mod transaction;
