pub mod db_init;
pub mod monitor_store;

pub mod extractor;
pub mod mailer;
pub mod identity;
pub mod sessions;
pub mod notifier;

pub mod monitor_service;
pub mod price_checker;
