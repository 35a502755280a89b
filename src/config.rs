use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
}

/// Limits and defaults applied to user accounts.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountPolicy {
    pub password_min_len: usize,
    pub password_max_len: usize,
    pub bio_max_len: usize,
    pub default_photo: String,
    pub default_bio: String,
    pub reset_ttl_minutes: i64,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            password_min_len: 6,
            password_max_len: 16,
            bio_max_len: 255,
            default_photo: "https://i.ibb.co/4pDNDk1/avatar.png".into(),
            default_bio: "Tell more about yourself!".into(),
            reset_ttl_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub relay_url: Option<String>,
    pub api_key: Option<String>,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub frontend_url: String,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub accounts: AccountPolicy,
    pub mail: MailConfig,
    pub storage: Option<StorageConfig>,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: var_or("JWT_ISSUER", "shelfwave"),
            audience: var_or("JWT_AUDIENCE", "shelfwave-users"),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60 * 24),
        };
        let cookie = CookieConfig {
            name: "token".into(),
            secure: parsed_or("COOKIE_SECURE", false),
        };

        let mut accounts = AccountPolicy {
            password_min_len: parsed_or("PASSWORD_MIN_LEN", 6),
            ..AccountPolicy::default()
        };
        if let Ok(photo) = std::env::var("DEFAULT_PHOTO_URL") {
            accounts.default_photo = photo;
        }

        let mail = MailConfig {
            relay_url: std::env::var("MAIL_RELAY_URL").ok(),
            api_key: std::env::var("MAIL_API_KEY").ok(),
            sender: var_or("EMAIL_USER", "no-reply@shelfwave.local"),
        };

        let storage = match std::env::var("STORAGE_ENDPOINT") {
            Ok(endpoint) => Some(StorageConfig {
                public_base_url: var_or("STORAGE_PUBLIC_URL", &endpoint),
                endpoint,
                bucket: var_or("STORAGE_BUCKET", "shelfwave"),
                access_key: std::env::var("STORAGE_ACCESS_KEY")
                    .context("STORAGE_ACCESS_KEY must be set when STORAGE_ENDPOINT is")?,
                secret_key: std::env::var("STORAGE_SECRET_KEY")
                    .context("STORAGE_SECRET_KEY must be set when STORAGE_ENDPOINT is")?,
                region: var_or("STORAGE_REGION", "us-east-1"),
            }),
            Err(_) => None,
        };

        Ok(Self {
            host: var_or("APP_HOST", "0.0.0.0"),
            port: parsed_or("APP_PORT", 5000),
            database_url,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            jwt,
            cookie,
            accounts,
            mail,
            storage,
        })
    }
}
