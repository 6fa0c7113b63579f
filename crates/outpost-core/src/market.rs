//! Market: sell stored resources for currency at fixed prices.

use crate::display::format_number;
use crate::id::ResourceId;
use crate::session::Session;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MarketError {
    #[error("the market does not buy {0}")]
    NoPrice(ResourceId),
    #[error("no {0} available to sell")]
    NothingToSell(ResourceId),
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),
}

/// A completed sale.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub resource: ResourceId,
    pub sold: f64,
    pub earned: f64,
}

impl Session {
    /// Price per unit of `resource`.
    pub fn sell_price(&self, resource: &str) -> Option<f64> {
        self.config
            .market
            .prices
            .get(resource)
            .copied()
            .filter(|p| *p > 0.0)
    }

    /// What the whole stock of `resource` would fetch right now.
    pub fn sale_value(&self, resource: &str) -> Result<f64, MarketError> {
        let price = self
            .sell_price(resource)
            .ok_or_else(|| MarketError::NoPrice(ResourceId::new(resource)))?;
        Ok(self.ledger.amount(resource) * price)
    }

    /// Sell up to `amount` of `resource`. Selling more than is stored sells
    /// everything that is stored.
    pub fn sell(&mut self, resource: &str, amount: f64) -> Result<Sale, MarketError> {
        let price = self
            .sell_price(resource)
            .ok_or_else(|| MarketError::NoPrice(ResourceId::new(resource)))?;
        let currency = self.config.market.currency.clone();
        for id in [resource, currency.as_str()] {
            if !self.ledger.contains(id) {
                return Err(MarketError::UnknownResource(ResourceId::new(id)));
            }
        }

        let available = self.ledger.amount(resource);
        let sold = if amount.is_nan() { 0.0 } else { amount.min(available) };
        if sold <= 0.0 {
            tracing::debug!(resource, "nothing to sell");
            return Err(MarketError::NothingToSell(ResourceId::new(resource)));
        }

        self.ledger.remove(resource, sold);
        let earned = self.ledger.add(currency.as_str(), sold * price);
        tracing::info!(
            resource,
            sold = %format_number(sold),
            earned = %format_number(earned),
            "sold resources"
        );
        Ok(Sale {
            resource: ResourceId::new(resource),
            sold,
            earned,
        })
    }

    /// Sell the entire stock of `resource`.
    pub fn sell_all(&mut self, resource: &str) -> Result<Sale, MarketError> {
        let available = self.ledger.amount(resource);
        self.sell(resource, available)
    }
}
