
use std::net::IpAddr;

use tokio::fs;

pub async fn read() -> anyhow::Result<Config> {
    let config_path = std::env::var("KITCHEN_MENU_CONFIG")
        .unwrap_or_else(|_| "kitchen_menu.toml".into());

    let canon = tokio::fs::canonicalize(".").await?;
    tracing::info!("try reading config file {config_path} at {canon:?}");

    let mut config: Config = if fs::try_exists(&config_path).await? {
        tracing::info!("found config");

        let config = fs::read_to_string(&config_path).await?;
        let config = toml::from_str(&config)?;
        tracing::info!("read config");
        config
    } else {
        tracing::info!("config does not exist, using default config");
        Config::default()
    };

    config.auth.apply_env(|key| std::env::var(key).ok());
    config.auth.validate()?;

    tracing::info!("using config: {config:#?}");
    Ok(config)
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub db: Option<DbConfig>,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, serde::Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub database: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: format!("mongodb://localhost:27017"),
            database: format!("kitchen_menu"),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        #[cfg(not(debug_assertions))]
        tracing::warn!("using default server config in release");

        ServerConfig {
            address: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("ADMIN_SECRET is not set")]
    MissingSecret,
}

#[derive(Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_email: String,
    pub admin_password: String,
    /// key for the session token hmac
    pub secret: String,
    pub cookie_domain: Option<String>,
    /// public url of the app, its host is used when no cookie domain is set
    pub base_url: Option<String>,
    /// marks the session cookie `Secure`
    pub production: bool,
}

// keeps credentials out of the startup log
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("cookie_domain", &self.cookie_domain)
            .field("base_url", &self.base_url)
            .field("production", &self.production)
        .finish()
    }
}

impl AuthConfig {
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("ADMIN_EMAIL") { self.admin_email = v; }
        if let Some(v) = var("ADMIN_PASS") { self.admin_password = v; }
        if let Some(v) = var("ADMIN_SECRET") { self.secret = v; }
        if let Some(v) = var("COOKIE_DOMAIN").or_else(|| var("ADMIN_COOKIE_DOMAIN")) {
            self.cookie_domain = Some(v);
        }
        if let Some(v) = var("BASE_URL") { self.base_url = Some(v); }
        if let Some(v) = var("APP_ENV") {
            self.production = v.eq_ignore_ascii_case("production");
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.admin_email.is_empty() || self.admin_password.is_empty() {
            tracing::warn!("no admin credentials configured, login is disabled");
        }
        Ok(())
    }

    /// The explicit cookie domain, or else the host of `base_url`.
    pub fn cookie_domain(&self) -> Option<String> {
        self.cookie_domain.as_deref().and_then(normalize_domain)
            .or_else(|| self.base_url.as_deref().and_then(normalize_domain))
    }
}

/// `https://menu.example.org:8443/x` and `menu.example.org:8443` both
/// become `menu.example.org`; `localhost` never sets a domain.
pub fn normalize_domain(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let host = match trimmed.split_once("://") {
        Some(("http" | "https", rest)) => rest.split(['/', '?', '#']).next()?,
        Some(_) => return None,
        None => trimmed,
    };
    let host = host.rsplit_once('@').map_or(host, |(_, v)| v);
    let host = host.split(':').next()?.trim();

    if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
        None
    } else {
        Some(host.to_string())
    }
}
