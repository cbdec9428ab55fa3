//! Crossing detection logic
//!
//! Determines when an incoming order may trade against a resting price

use types::numeric::Price;
use types::order::Side;

/// Check if a bid and ask can match at given prices
///
/// For a buy order to match with a sell order the buy price must be >= the
/// sell price.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if an incoming order can match against a resting price
///
/// `limit` is None for market orders, which cross any price.
pub fn incoming_can_match(incoming_side: Side, limit: Option<Price>, resting_price: Price) -> bool {
    match (incoming_side, limit) {
        (_, None) => true,
        (Side::Buy, Some(price)) => can_match(price, resting_price), // Buy crosses sell if bid >= ask
        (Side::Sell, Some(price)) => can_match(resting_price, price), // Sell crosses buy if ask <= bid
    }
}
