use std::{
    collections::HashSet,
    env::{self, VarError},
    time::Duration,
};

use teloxide::types::ChatId;

const DEFAULT_DATABASE_URL: &str = "sqlite:data/data.db";
const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_YOOKASSA_API_URL: &str = "https://api.yookassa.ru/v3";
const DEFAULT_PAYMENT_RETURN_URL: &str = "https://t.me";
const DEFAULT_PAYMENT_POLL_INTERVAL: u64 = 10;
const DEFAULT_PAYMENT_TIMEOUT: u64 = 3600;
const DEFAULT_SUBSCRIPTION_DAYS: u32 = 30;
const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Represents the application configuration.
#[derive(Debug)]
pub struct Config {
    /// The Telegram bot token.
    pub telegram_bot_token: String,
    /// The key for the chat completions API.
    pub openai_api_key: String,
    /// The chat completions endpoint.
    pub openai_api_url: String,
    /// The model used for outlines, book parts and chat.
    pub openai_model: String,
    /// The YooKassa shop id.
    pub yookassa_shop_id: String,
    /// The YooKassa secret key.
    pub yookassa_secret_key: String,
    /// The base URL of the YooKassa API.
    pub yookassa_api_url: String,
    /// Where the payment page sends the user back to.
    pub payment_return_url: String,
    /// The URL of the database.
    pub database_url: String,
    /// Chats allowed to open the admin panel.
    pub admins: HashSet<ChatId>,
    /// How often a pending payment is checked.
    pub payment_poll_interval: Duration,
    /// How long a payment is watched before giving up.
    pub payment_timeout: Duration,
    /// Length of a purchased subscription.
    pub subscription_days: u32,
    /// The maximum number of messages sent at once during a broadcast.
    pub max_concurrency: usize,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Parses a comma separated list of chat ids, skipping anything malformed.
fn parse_admins(value: &str) -> HashSet<ChatId> {
    value
        .split(',')
        .filter_map(|id| match id.trim().parse::<i64>() {
            Ok(id) => Some(ChatId(id)),
            Err(_) => {
                if !id.trim().is_empty() {
                    tracing::warn!("Ignoring invalid admin id '{id}'");
                }
                None
            }
        })
        .collect()
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    pub fn from_env() -> Result<Self, VarError> {
        Ok(Self {
            telegram_bot_token: env::var("TELOXIDE_TOKEN")?,
            openai_api_key: env::var("OPENAI_API_KEY")?,
            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            yookassa_shop_id: env::var("YOOKASSA_SHOP_ID")?,
            yookassa_secret_key: env::var("YOOKASSA_SECRET_KEY")?,
            yookassa_api_url: env::var("YOOKASSA_API_URL")
                .unwrap_or_else(|_| DEFAULT_YOOKASSA_API_URL.to_string()),
            payment_return_url: env::var("PAYMENT_RETURN_URL")
                .unwrap_or_else(|_| DEFAULT_PAYMENT_RETURN_URL.to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            admins: env::var("ADMINS").map(|v| parse_admins(&v)).unwrap_or_default(),
            // A zero period would make the payment watcher panic.
            payment_poll_interval: Duration::from_secs(
                parse_or("PAYMENT_POLL_INTERVAL", DEFAULT_PAYMENT_POLL_INTERVAL).max(1),
            ),
            payment_timeout: Duration::from_secs(parse_or(
                "PAYMENT_TIMEOUT",
                DEFAULT_PAYMENT_TIMEOUT,
            )),
            subscription_days: parse_or("SUBSCRIPTION_DAYS", DEFAULT_SUBSCRIPTION_DAYS),
            max_concurrency: parse_or("MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY).max(1),
        })
    }
}
