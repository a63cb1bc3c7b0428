use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    // unix seconds
    pub date: i64,
}

/// One tracked product page for one owner.
///
/// `current_price` always mirrors the last entry of `price_history`; both are
/// only changed through [`Monitor::record_price`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub url: String,

    // alert destination, may differ from the login email
    pub email: String,

    pub target_price: f64,
    pub current_price: f64,
    pub price_history: Vec<PricePoint>,

    // last successful check that changed the price
    pub last_checked: i64,
}

impl Monitor {
    /// Builds a monitor seeded with its first observed price.
    pub fn new(
        user_id: ObjectId,
        url: String,
        email: String,
        target_price: f64,
        initial_price: f64,
        now: i64,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            url,
            email,
            target_price,
            current_price: initial_price,
            price_history: vec![PricePoint {
                price: initial_price,
                date: now,
            }],
            last_checked: now,
        }
    }

    /// Applies a freshly observed price. Returns false (and touches nothing)
    /// when it equals the current one.
    ///
    /// `max_samples` caps the history; the oldest samples are dropped first
    /// and the newest one is always kept.
    pub fn record_price(&mut self, price: f64, now: i64, max_samples: Option<usize>) -> bool {
        if price == self.current_price {
            return false;
        }

        self.price_history.push(PricePoint { price, date: now });
        self.current_price = price;
        self.last_checked = now;

        if let Some(cap) = max_samples.filter(|c| *c > 0) {
            if self.price_history.len() > cap {
                let excess = self.price_history.len() - cap;
                self.price_history.drain(..excess);
            }
        }

        true
    }

    pub fn is_at_or_below_target(&self, price: f64) -> bool {
        price <= self.target_price
    }

    /// Client-facing shape (hex ids, camelCase keys).
    pub fn to_json(&self) -> serde_json::Value {
        let history: Vec<serde_json::Value> = self
            .price_history
            .iter()
            .map(|p| json!({ "price": p.price, "date": p.date }))
            .collect();

        json!({
            "id": self.id.to_hex(),
            "user": self.user_id.to_hex(),
            "url": self.url,
            "email": self.email,
            "targetPrice": self.target_price,
            "currentPrice": self.current_price,
            "priceHistory": history,
            "lastChecked": self.last_checked,
        })
    }
}
