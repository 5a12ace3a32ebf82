use std::net::IpAddr;

use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Unset runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub host: IpAddr,
    pub port: u16,
    /// Prefix every user route is nested under, e.g. `/api`. Empty for none.
    pub api_prefix: String,
    pub log_level: String,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub seed_admin: Option<SeedAdmin>,
}

/// Account created at startup if it does not exist yet.
#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let jwt_secret = env_required("JWT_SECRET")?;

        let jwt_expires_in = parse_expiry(&env_or("JWT_EXPIRES_IN", "10d"))
            .map_err(|e| format!("Invalid JWT_EXPIRES_IN: {e}"))?;

        let host: IpAddr = env_or("ROSTER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid ROSTER_HOST: {e}"))?;

        let port: u16 = env_or("ROSTER_PORT", "9000")
            .parse()
            .map_err(|e| format!("Invalid ROSTER_PORT: {e}"))?;

        let api_prefix = normalize_prefix(&env_or("ROSTER_API_PREFIX", ""))?;

        let log_level = env_or("ROSTER_LOG_LEVEL", "info");

        let argon2_memory_kib: u32 = env_or("ROSTER_ARGON2_MEMORY_KIB", "19456")
            .parse()
            .map_err(|e| format!("Invalid ROSTER_ARGON2_MEMORY_KIB: {e}"))?;

        let argon2_iterations: u32 = env_or("ROSTER_ARGON2_ITERATIONS", "2")
            .parse()
            .map_err(|e| format!("Invalid ROSTER_ARGON2_ITERATIONS: {e}"))?;

        let seed_admin = match (
            std::env::var("ROSTER_SEED_ADMIN_USERNAME").ok(),
            std::env::var("ROSTER_SEED_ADMIN_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) => Some(SeedAdmin {
                username,
                password,
                full_name: env_or("ROSTER_SEED_ADMIN_FULL_NAME", "Administrator"),
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expires_in,
            host,
            port,
            api_prefix,
            log_level,
            argon2_memory_kib,
            argon2_iterations,
            seed_admin,
        })
    }
}

/// Parse a token lifetime such as `10d`, `12h`, `30m`, `45s` or bare seconds.
pub fn parse_expiry(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: i64 = digits
        .parse()
        .map_err(|_| format!("'{value}' does not start with a number"))?;

    let duration = match unit {
        "" | "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        other => return Err(format!("unknown unit '{other}' in '{value}'")),
    };

    match duration {
        Some(d) if d > Duration::zero() => Ok(d),
        Some(_) => Err(format!("'{value}' must be positive")),
        None => Err(format!("'{value}' is out of range")),
    }
}

fn normalize_prefix(prefix: &str) -> Result<String, String> {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/') {
        return Err(format!("Invalid ROSTER_API_PREFIX '{prefix}': must start with '/'"));
    }
    Ok(trimmed.to_string())
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
