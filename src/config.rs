use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    /// Apply the schema on startup (existing tables are left alone)
    pub init_db: bool,
    pub db_pool_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let init_db = env::var("INIT_DB")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        let db_pool_size: u32 = env::var("DB_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(4);

        Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "poslicense.db".to_string()),
            init_db,
            db_pool_size,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
