// API server configuration
//
// Read from environment variables (a .env file is loaded first when present).

/// Server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Postgres connection URL; the in-memory store is used when unset
    pub database_url: Option<String>,
    /// Listen address
    pub bind_addr: String,
    /// Prefix for the item routes, e.g. "/api" results in /api/items
    pub api_prefix: String,
    /// Allowed CORS origins; empty means same-origin only
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:9000".to_string(),
            api_prefix: "/api".to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            bind_addr: lookup("BIND_ADDR")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.bind_addr),
            // An explicitly empty API_PREFIX mounts the routes at the root
            api_prefix: lookup("API_PREFIX")
                .map(|s| normalize_prefix(&s))
                .unwrap_or(defaults.api_prefix),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Which store backend the configuration selects
    pub fn store_backend(&self) -> &'static str {
        if self.database_url.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
