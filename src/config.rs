use std::{
    env,
    fmt::{self, Display},
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
};

const DEV_JWT_SECRET: &str = "foodgram-development-secret";
const MAX_JWT_LIFETIME_HOURS: i64 = 24 * 365;

/// Runtime settings, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_lifetime_hours: i64,
    pub media_root: PathBuf,
    pub media_url: String,
    pub db_max_connections: u32,
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl ConfigError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration: {}", self.info)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::new("DATABASE_URL must be set".to_owned()))?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_owned()
        });

        let jwt_lifetime_hours: i64 = try_load(&lookup, "JWT_LIFETIME_HOURS", "24")?;
        if !(1..=MAX_JWT_LIFETIME_HOURS).contains(&jwt_lifetime_hours) {
            return Err(ConfigError::new(format!(
                "JWT_LIFETIME_HOURS={jwt_lifetime_hours} (must be between 1 and {MAX_JWT_LIFETIME_HOURS})"
            )));
        }

        let mut media_url: String = try_load(&lookup, "MEDIA_URL", "/media/")?;
        if !media_url.ends_with('/') {
            media_url.push('/');
        }

        Ok(Self {
            database_url,
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:8000")?,
            jwt_secret,
            jwt_lifetime_hours,
            media_root: try_load(&lookup, "MEDIA_ROOT", "media")?,
            media_url,
            db_max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", "5")?,
        })
    }

    /// Public URL of a stored media file.
    pub fn media_link(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path)
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value
        .parse()
        .map_err(|e| ConfigError::new(format!("{key}={value} ({e})")))
}
