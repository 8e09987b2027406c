use std::{env, fmt, str::FromStr};

/// Connection parameters for the visits database.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to the defaults
    /// for keys that are missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Self {
            host: var("DATABASE_HOST", "localhost"),
            port: var("DATABASE_PORT", "5432"),
            database: lookup("BANKING_DATABASE_NAME")
                .or_else(|| lookup("DATABASE_NAME"))
                .unwrap_or_else(|| "banking".to_string()),
            user: var("DATABASE_USER", "dev"),
            password: var("DATABASE_PASSWORD", "none"),
        }
    }

    pub fn dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

// Never print the password, this struct ends up in the startup log.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub max_connections: u32,
    pub count_mode: CountMode,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind: lookup("SERVER_BIND").unwrap_or("0.0.0.0".into()),
            port: lookup("SERVER_PORT")
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(3333),
            max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(3),
            count_mode: lookup("VISIT_COUNT_MODE")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// What the root endpoint reports as "the count".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CountMode {
    /// Id of the most recently inserted visit row.
    #[default]
    LatestId,
    /// Number of visit rows in the table.
    RowCount,
}

impl FromStr for CountMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest-id" | "latest" => Ok(Self::LatestId),
            "rows" | "row-count" => Ok(Self::RowCount),
            other => Err(anyhow::anyhow!("unknown count mode {other:?}")),
        }
    }
}
