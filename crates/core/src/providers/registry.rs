use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::CoreError;

use super::alphavantage::AlphaVantageResolver;
use super::traits::{validate_price, PriceResolver};
use super::yahoo_finance::YahooFinanceResolver;

/// Ordered list of price resolvers with automatic fallback.
///
/// Tries resolvers in registration order. If the primary fails (API down,
/// rate limited, no data), the next one is asked. The chain itself is a
/// `PriceResolver`, so instruments never know how many sources back them.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn PriceResolver>>,
}

impl ResolverChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Create a chain with all default resolvers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut chain = Self::new();

        // Yahoo Finance: no API key needed (primary)
        match YahooFinanceResolver::new() {
            Ok(yahoo) => chain.register(Box::new(yahoo)),
            Err(e) => log::warn!("Yahoo Finance resolver unavailable: {e}"),
        }

        // Alpha Vantage: requires an API key (fallback)
        if let Some(key) = api_keys.get("alphavantage") {
            chain.register(Box::new(AlphaVantageResolver::new(key.clone())));
        }

        chain
    }

    /// Register a new resolver at the end of the chain.
    pub fn register(&mut self, resolver: Box<dyn PriceResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Names of the registered resolvers, in priority order.
    pub fn names(&self) -> Vec<String> {
        self.resolvers.iter().map(|r| r.name().to_string()).collect()
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceResolver for ResolverChain {
    fn name(&self) -> &str {
        "Resolver chain"
    }

    async fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, CoreError> {
        let mut last_error = None;

        for resolver in &self.resolvers {
            let result = resolver
                .closing_price(symbol, date)
                .await
                .and_then(|price| validate_price(resolver.name(), symbol, price));

            match result {
                Ok(price) => return Ok(price),
                Err(e) => {
                    log::debug!("{} could not price {symbol} on {date}: {e}", resolver.name());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::PriceNotAvailable {
            symbol: symbol.to_string(),
            date,
        }))
    }
}
