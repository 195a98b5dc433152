use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string; records are kept in memory without one
    pub database_url: Option<String>,
    pub port: u16,
    /// Populate the default tenant with demo goals and trips on startup
    pub seed_demo_data: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            port: parse_or("PORT", 8080),
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", 20),
        }
    }

    /// Check if a database is configured
    pub fn uses_database(&self) -> bool {
        self.database_url.is_some()
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
