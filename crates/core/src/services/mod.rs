pub mod cost_basis_service;
pub mod performance_service;
pub mod transaction_service;
pub mod valuation_service;
