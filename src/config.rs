use crate::models::CostStructure;
use serde::{Deserialize, Serialize};

/// 应用配置
///
/// 加载顺序: 默认值 -> `winkel.toml` (可选) -> `WINKEL_<SECTION>__<KEY>` 环境变量
/// -> `DATABASE_URL` / `SERVER_HOST` / `SERVER_PORT`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scan: ScanConfig,
    pub pricing: CostStructure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub slow_statement_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/winkel".to_string(),
            max_connections: 10,
            slow_statement_secs: 5,
        }
    }
}

/// AI 小票识别配置, 无 api_key 时禁用
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

// 启动日志会打印配置, 不输出密钥
impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// 从配置文件与环境变量加载
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("winkel")
    }

    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("WINKEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<i64>().ok()),
            )?
            .build()?
            .try_deserialize()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_sources() {
        let config = AppConfig::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.pricing.work_days, 22);
        assert!(config.scan.api_key.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winkel.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[pricing]
total_monthly_purchase = 12000.0
work_days = 26

[[pricing.fixed_costs]]
name = "huur"
monthly_amount = 1800.0
"#
        )
        .unwrap();

        let stem = dir.path().join("winkel");
        let config = AppConfig::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.pricing.work_days, 26);
        assert_eq!(config.pricing.total_fixed_costs(), 1800.0);
    }

    #[test]
    fn environment_uses_single_underscore_after_prefix() {
        std::env::set_var("WINKEL_SCAN__API_KEY", "sk-from-env");
        std::env::set_var("WINKEL_DATABASE__MAX_CONNECTIONS", "25");

        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("absent");
        let loaded = AppConfig::load_from(stem.to_str().unwrap());

        std::env::remove_var("WINKEL_SCAN__API_KEY");
        std::env::remove_var("WINKEL_DATABASE__MAX_CONNECTIONS");

        let config = loaded.unwrap();
        assert_eq!(config.scan.api_key.as_deref(), Some("sk-from-env"));
        assert_eq!(config.database.max_connections, 25);
    }

    #[test]
    fn debug_output_hides_api_key() {
        let scan = ScanConfig {
            api_key: Some("sk-secret".to_string()),
            ..ScanConfig::default()
        };
        assert!(!format!("{scan:?}").contains("sk-secret"));
    }
}
