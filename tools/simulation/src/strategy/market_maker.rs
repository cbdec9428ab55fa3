//! Market maker strategy
//!
//! Quotes both sides around the mid with a fixed spread in basis points and
//! skews both quotes against its inventory so fills tend to flatten it.
//! Each market data snapshot replaces the whole ladder, so quotes are simply
//! re-posted on every update.

use std::collections::BTreeMap;

use market_data::BookView;
use rust_decimal::prelude::Signed;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::ids::Symbol;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::trade::Trade;

use super::{parse_param, require_positive, MarketTracker, OrderIds, Strategy, StrategyError, StrategyParams};

/// Configuration for the market maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketMakerConfig {
    /// Full quoted spread in basis points (e.g., 10 = 0.10%)
    pub spread_bps: u32,
    /// Size of each quote
    pub order_size: Decimal,
    /// Maximum absolute net inventory per symbol
    pub max_inventory: Decimal,
    /// Decimal places of quoted prices
    pub price_dp: u32,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            spread_bps: 10,
            order_size: Decimal::from(10),
            max_inventory: Decimal::from(500),
            price_dp: 2,
        }
    }
}

impl MarketMakerConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        require_positive("order_size", self.order_size)?;
        require_positive("max_inventory", self.max_inventory)?;
        if self.spread_bps == 0 {
            return Err(StrategyError::InvalidParameter {
                key: "spread_bps".to_string(),
                value: "0".to_string(),
                reason: "quotes would collapse onto the mid".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MarketMaker {
    name: String,
    config: MarketMakerConfig,
    tracker: MarketTracker,
    inventory: BTreeMap<Symbol, Decimal>,
    ids: OrderIds,
}

impl MarketMaker {
    pub fn new(name: impl Into<String>, config: MarketMakerConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        let name = name.into();
        Ok(Self {
            ids: OrderIds::new(&name),
            tracker: MarketTracker::new(1),
            name,
            config,
            inventory: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &MarketMakerConfig {
        &self.config
    }

    /// Net inventory: positive = long
    pub fn inventory(&self, symbol: &Symbol) -> Decimal {
        self.inventory.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    fn half_spread(&self, mid: Decimal) -> Decimal {
        (mid / Decimal::from(20_000)).saturating_mul(Decimal::from(self.config.spread_bps))
    }

    /// Inventory skew: positive inventory shifts both quotes down
    ///
    /// At max inventory the skew equals a full half spread.
    fn skew(&self, mid: Decimal, inventory: Decimal) -> Decimal {
        let ratio = inventory
            .checked_div(self.config.max_inventory)
            .unwrap_or(inventory.signum())
            .max(-Decimal::ONE)
            .min(Decimal::ONE);
        ratio * self.half_spread(mid)
    }

    /// Bid price for a mid and inventory, rounded away from the mid
    pub fn calculate_bid(&self, mid: Decimal, inventory: Decimal) -> Decimal {
        let bid = mid
            .saturating_sub(self.half_spread(mid))
            .saturating_sub(self.skew(mid, inventory));
        bid.round_dp_with_strategy(self.config.price_dp, RoundingStrategy::ToZero)
    }

    /// Ask price for a mid and inventory, rounded away from the mid
    pub fn calculate_ask(&self, mid: Decimal, inventory: Decimal) -> Decimal {
        let ask = mid
            .saturating_add(self.half_spread(mid))
            .saturating_sub(self.skew(mid, inventory));
        ask.round_dp_with_strategy(self.config.price_dp, RoundingStrategy::AwayFromZero)
    }

    /// Quantity a quote on `side` may carry without breaching max inventory
    fn room(&self, symbol: &Symbol, side: Side) -> Decimal {
        let inventory = self.inventory(symbol);
        let room = match side {
            Side::Buy => self.config.max_inventory.saturating_sub(inventory),
            Side::Sell => self.config.max_inventory.saturating_add(inventory),
        };
        self.config.order_size.min(room)
    }

    fn quote(&mut self, view: &BookView, side: Side, mid: Decimal) -> Option<Order> {
        let size = self.room(&view.symbol, side);
        if size <= Decimal::ZERO {
            return None;
        }
        let inventory = self.inventory(&view.symbol);
        let raw = match side {
            Side::Buy => self.calculate_bid(mid, inventory),
            Side::Sell => self.calculate_ask(mid, inventory),
        };
        if raw <= Decimal::ZERO {
            return None;
        }
        let price = Price::try_new(raw)?;
        let quantity = Quantity::try_new(size)?;
        Some(Order::limit(
            self.ids.next(),
            view.symbol.clone(),
            side,
            price,
            quantity,
            view.timestamp,
        ))
    }
}

impl Strategy for MarketMaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, params: &StrategyParams) -> Result<(), StrategyError> {
        let mut next = self.config.clone();
        for (key, value) in params {
            match key.as_str() {
                "spread_bps" => next.spread_bps = parse_param(key, value)?,
                "order_size" => next.order_size = parse_param(key, value)?,
                "max_inventory" => next.max_inventory = parse_param(key, value)?,
                "price_dp" => next.price_dp = parse_param(key, value)?,
                _ => return Err(StrategyError::UnknownParameter(key.clone())),
            }
        }
        next.validate()?;
        self.config = next;
        Ok(())
    }

    fn on_market_data_update(&mut self, view: &BookView) -> Vec<Order> {
        self.tracker.observe(view);
        let Some(mid) = view.mid_price() else {
            return Vec::new();
        };

        let quotes: Vec<Order> = [Side::Buy, Side::Sell]
            .into_iter()
            .filter_map(|side| self.quote(view, side, mid))
            .collect();
        debug!(
            strategy = %self.name,
            symbol = %view.symbol,
            %mid,
            inventory = %self.inventory(&view.symbol),
            quotes = quotes.len(),
            "Requoting"
        );
        quotes
    }

    /// The quote that works the inventory back toward flat (the bid when flat)
    fn generate_order(&mut self, view: &BookView) -> Option<Order> {
        let mid = view.mid_price()?;
        let side = if self.inventory(&view.symbol) > Decimal::ZERO {
            Side::Sell
        } else {
            Side::Buy
        };
        self.quote(view, side, mid)
    }

    fn calculate_optimal_size(&self, symbol: &Symbol) -> Decimal {
        let inventory = self.inventory(symbol);
        let side = if inventory > Decimal::ZERO { Side::Buy } else { Side::Sell };
        // Size on the side that would grow the position further
        self.room(symbol, side).max(Decimal::ZERO)
    }

    fn calculate_spread(&self, symbol: &Symbol) -> Decimal {
        self.tracker
            .state(symbol)
            .and_then(|state| state.mid_price)
            .map_or(Decimal::ZERO, |mid| self.half_spread(mid) * Decimal::from(2))
    }

    fn on_fill(&mut self, trade: &Trade, signed_quantity: Decimal) {
        let inventory = self.inventory.entry(trade.symbol.clone()).or_insert(Decimal::ZERO);
        *inventory = inventory.saturating_add(signed_quantity);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{dec, view};
    use super::*;
    use types::ids::OrderId;

    fn maker() -> MarketMaker {
        MarketMaker::new("mm", MarketMakerConfig::default()).unwrap()
    }

    fn fill(mm: &mut MarketMaker, qty: i64) {
        let trade = Trade {
            sequence: 1,
            symbol: Symbol::new("AAPL"),
            maker_order_id: Some(OrderId::new("mm-1")),
            taker_order_id: OrderId::new("flow-1"),
            side: if qty > 0 { Side::Sell } else { Side::Buy },
            price: "100.00".parse().unwrap(),
            quantity: Quantity::from_u64(qty.unsigned_abs()),
            executed_at: 1,
        };
        mm.on_fill(&trade, Decimal::from(qty));
    }

    #[test]
    fn test_spread_calculation() {
        let mm = maker();
        let mid = dec("100.01");

        // Half spread = 100.01 * 10 / 20000 = 0.050005
        assert_eq!(mm.calculate_bid(mid, Decimal::ZERO), dec("99.95"));
        assert_eq!(mm.calculate_ask(mid, Decimal::ZERO), dec("100.07"));
    }

    #[test]
    fn test_quotes_at_decimal_range() {
        let mm = maker();
        assert_eq!(mm.calculate_ask(Decimal::MAX, Decimal::ZERO), Decimal::MAX);
        assert!(mm.calculate_bid(Decimal::MAX, Decimal::ZERO) < Decimal::MAX);
    }

    #[test]
    fn test_inventory_skew() {
        let mm = maker();
        let mid = dec("100.01");

        let bid_neutral = mm.calculate_bid(mid, Decimal::ZERO);
        let ask_neutral = mm.calculate_ask(mid, Decimal::ZERO);
        let bid_long = mm.calculate_bid(mid, Decimal::from(250));
        let ask_long = mm.calculate_ask(mid, Decimal::from(250));

        // Long skew: both quotes move down to encourage selling
        assert!(bid_long < bid_neutral);
        assert!(ask_long < ask_neutral);
        assert!(bid_long < ask_long);

        let bid_short = mm.calculate_bid(mid, Decimal::from(-250));
        assert!(bid_short > bid_neutral);
    }

    #[test]
    fn test_quotes_both_sides() {
        let mut mm = maker();
        let orders = mm.on_market_data_update(&view("100.00", "100.02", 7));
        assert_eq!(orders.len(), 2);

        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].price, "99.95".parse::<Price>().unwrap());
        assert_eq!(orders[1].side, Side::Sell);
        assert_eq!(orders[1].price, "100.07".parse::<Price>().unwrap());
        assert!(orders.iter().all(|o| o.quantity == Quantity::from_u64(10) && o.timestamp == 7));
        assert_eq!(orders[0].order_id.as_str(), "mm-1");
        assert_eq!(orders[1].order_id.as_str(), "mm-2");
    }

    #[test]
    fn test_max_inventory_stops_growing_side() {
        let mut mm = maker();
        fill(&mut mm, 500);
        assert_eq!(mm.inventory(&Symbol::new("AAPL")), Decimal::from(500));

        let orders = mm.on_market_data_update(&view("100.00", "100.02", 1));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Sell);
        assert_eq!(mm.calculate_optimal_size(&Symbol::new("AAPL")), Decimal::ZERO);
    }

    #[test]
    fn test_partial_room_caps_quote() {
        let mut mm = maker();
        fill(&mut mm, -496);
        let orders = mm.on_market_data_update(&view("100.00", "100.02", 1));
        let ask = orders.iter().find(|o| o.side == Side::Sell).unwrap();
        assert_eq!(ask.quantity, Quantity::from_u64(4));
    }

    #[test]
    fn test_generate_order_reduces_inventory() {
        let mut mm = maker();
        let v = view("100.00", "100.02", 1);
        assert_eq!(mm.generate_order(&v).unwrap().side, Side::Buy);

        fill(&mut mm, 20);
        assert_eq!(mm.generate_order(&v).unwrap().side, Side::Sell);
    }

    #[test]
    fn test_no_quotes_without_mid() {
        let mut mm = maker();
        let mut v = view("100.00", "100.02", 1);
        v.asks.clear();
        assert!(mm.on_market_data_update(&v).is_empty());
        assert_eq!(mm.calculate_spread(&Symbol::new("AAPL")), Decimal::ZERO);
    }

    #[test]
    fn test_initialize_rejects_zero_spread() {
        let mut mm = maker();
        let mut params = StrategyParams::new();
        params.insert("spread_bps".to_string(), "0".to_string());
        assert!(mm.initialize(&params).is_err());
        assert_eq!(mm.config().spread_bps, 10);

        params.insert("spread_bps".to_string(), "20".to_string());
        mm.initialize(&params).unwrap();
        assert_eq!(mm.config().spread_bps, 20);
    }
}
