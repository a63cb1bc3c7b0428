pub mod monitor;
pub mod user;

pub use monitor::{Monitor, PricePoint};
pub use user::CurrentUser;
