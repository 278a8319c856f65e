use crate::config::env_or;

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub production: bool,
    pub level: String,
    pub dir: String,
}

impl LogSettings {
    /// `LOG_LEVEL` defaults to `info` in production and `debug` otherwise;
    /// `LOG_DIR` defaults to `logs`.
    pub fn from_env() -> Self {
        let production = env_or("ENVIRONMENT", "development") == "production";
        Self::new(
            production,
            std::env::var("LOG_LEVEL").ok(),
            env_or("LOG_DIR", "logs"),
        )
    }

    fn new(production: bool, level: Option<String>, dir: String) -> Self {
        let level = level.unwrap_or_else(|| {
            if production {
                "info".to_string()
            } else {
                "debug".to_string()
            }
        });
        Self {
            production,
            level,
            dir,
        }
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> String {
        format!(
            "blog_backend={},tower_http=debug,axum=debug",
            self.level
        )
    }
}
