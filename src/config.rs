use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,

    // scheduler
    pub check_interval: Duration,

    // extraction
    pub price_selector: String,
    pub price_strip_chars: String,
    pub extract_timeout: Duration,
    pub network_idle: Duration,
    pub network_idle_max_inflight: usize,
    pub chrome_executable: Option<String>,

    // email
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub email_from: String,

    pub history_max_samples: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "price_monitor".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            jwt_secret: "change-me-dev-secret".to_string(),
            check_interval: Duration::from_secs(4 * 60 * 60),
            price_selector: ".a-price-whole".to_string(),
            price_strip_chars: "₹$,".to_string(),
            extract_timeout: Duration::from_secs(60),
            network_idle: Duration::from_millis(500),
            network_idle_max_inflight: 2,
            chrome_executable: None,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            email_from: String::new(),
            history_max_samples: None,
        }
    }
}

fn var_or(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or(default)
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

// launch and teardown take up to 10s of the budget, rendering gets the rest
const MIN_EXTRACT_TIMEOUT_SECS: u64 = 15;

fn extract_timeout_from(secs: u64) -> Duration {
    Duration::from_secs(secs.max(MIN_EXTRACT_TIMEOUT_SECS))
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let d = Settings::default();

    let smtp_username = var_or("SMTP_USERNAME", d.smtp_username);
    let email_from = var_or("EMAIL_FROM", smtp_username.clone());

    let check_secs = parsed_or("CHECK_INTERVAL_SECS", d.check_interval.as_secs()).max(1);

    Settings {
        mongodb_uri: var_or("MONGODB_URI", d.mongodb_uri),
        mongodb_db: var_or("MONGODB_DB", d.mongodb_db),
        host: var_or("HOST", d.host),
        port: parsed_or("PORT", d.port),
        jwt_secret: var_or("JWT_SECRET", d.jwt_secret),
        check_interval: Duration::from_secs(check_secs),
        price_selector: var_or("PRICE_SELECTOR", d.price_selector),
        price_strip_chars: var_or("PRICE_STRIP_CHARS", d.price_strip_chars),
        extract_timeout: extract_timeout_from(parsed_or(
            "EXTRACT_TIMEOUT_SECS",
            d.extract_timeout.as_secs(),
        )),
        network_idle: Duration::from_millis(parsed_or(
            "NETWORK_IDLE_MS",
            d.network_idle.as_millis() as u64,
        )),
        network_idle_max_inflight: parsed_or(
            "NETWORK_IDLE_MAX_INFLIGHT",
            d.network_idle_max_inflight,
        ),
        chrome_executable: env::var("CHROME_EXECUTABLE")
            .ok()
            .filter(|v| !v.trim().is_empty()),
        smtp_host: var_or("SMTP_HOST", d.smtp_host),
        smtp_username,
        smtp_password: var_or("SMTP_PASSWORD", d.smtp_password),
        email_from,
        history_max_samples: env::var("HISTORY_MAX_SAMPLES")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0),
    }
}
