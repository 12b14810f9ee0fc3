use anyhow::anyhow;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub public_base_url: String,
    pub session_ttl_hours: i64,
    pub time_zone: Tz,
    pub cors_allow_origins: Vec<String>,
    pub notification_queue_capacity: usize,
    pub rate_limit_start_max_requests: u32,
    pub rate_limit_start_window_seconds: u64,
    pub sms: SmsConfig,
}

/// Credentials and endpoint for the outbound SMS provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
    pub skip_send: bool,
}

impl SmsConfig {
    /// True when every credential needed to reach the provider is present.
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

const DEFAULT_SESSION_TTL_HOURS: i64 = 6;
const DEFAULT_NOTIFICATION_QUEUE_CAPACITY: usize = 256;
const DEFAULT_SMS_API_BASE_URL: &str = "https://api.twilio.com";
const DEFAULT_SMS_REQUEST_TIMEOUT_SECONDS: u64 = 10;
/// Upper bound for `SESSION_TTL_HOURS` (one year).
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bind_address_raw =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address: SocketAddr = bind_address_raw
            .parse()
            .map_err(|_| anyhow!("Invalid BIND_ADDRESS value: {}", bind_address_raw))?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        Url::parse(&public_base_url)
            .map_err(|_| anyhow!("Invalid PUBLIC_BASE_URL value: {}", public_base_url))?;

        let session_ttl_hours = parse_session_ttl_hours(env::var("SESSION_TTL_HOURS").ok());

        let time_zone_name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let cors_allow_origins = parse_origins(
            &env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        );

        let notification_queue_capacity = env::var("NOTIFICATION_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|capacity| *capacity > 0)
            .unwrap_or(DEFAULT_NOTIFICATION_QUEUE_CAPACITY);

        let rate_limit_start_max_requests = env::var("RATE_LIMIT_START_MAX_REQUESTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let rate_limit_start_window_seconds = env::var("RATE_LIMIT_START_WINDOW_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let sms = SmsConfig {
            account_sid: env::var("SMS_ACCOUNT_SID").unwrap_or_default(),
            auth_token: env::var("SMS_AUTH_TOKEN").unwrap_or_default(),
            from_number: env::var("SMS_FROM_NUMBER").unwrap_or_default(),
            api_base_url: env::var("SMS_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SMS_API_BASE_URL.to_string()),
            request_timeout_seconds: env::var("SMS_REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|seconds| *seconds > 0)
                .unwrap_or(DEFAULT_SMS_REQUEST_TIMEOUT_SECONDS),
            skip_send: env::var("SMS_SKIP_SEND").unwrap_or_default() == "true",
        };

        Ok(Config {
            bind_address,
            public_base_url,
            session_ttl_hours,
            time_zone,
            cors_allow_origins,
            notification_queue_capacity,
            rate_limit_start_max_requests,
            rate_limit_start_window_seconds,
            sms,
        })
    }
}

/// Values outside `1..=MAX_SESSION_TTL_HOURS` fall back to the default.
fn parse_session_ttl_hours(raw: Option<String>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
        .unwrap_or(DEFAULT_SESSION_TTL_HOURS)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
