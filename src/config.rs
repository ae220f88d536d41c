use serde::Deserialize;
use std::path::Path;

/// Environment variables Azure app settings arrive as
pub const ENV_TTN_REGION: &str = "TTN_REGION";
pub const ENV_TTN_APP_ID: &str = "TTN_APP_ID";
pub const ENV_TTN_API_KEY: &str = "TTN_API_KEY";
pub const ENV_TTN_BASE_URL: &str = "TTN_BASE_URL";
/// Port the Functions host expects a custom handler to listen on
pub const ENV_CUSTOM_HANDLER_PORT: &str = "FUNCTIONS_CUSTOMHANDLER_PORT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ttn: TtnConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the Functions host forwards HTTP trigger requests to
    pub route: String,
}

/// The Things Network application the downlinks are pushed into
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtnConfig {
    /// Cluster region, e.g. "eu1" or "nam1"
    pub region: String,
    pub app_id: String,
    pub api_key: String,
    /// Overrides the region-derived `https://{region}.cloud.thethings.network`
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (environment, test maps)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup(ENV_TTN_REGION) {
            self.ttn.region = region;
        }
        if let Some(app_id) = lookup(ENV_TTN_APP_ID) {
            self.ttn.app_id = app_id;
        }
        if let Some(api_key) = lookup(ENV_TTN_API_KEY) {
            self.ttn.api_key = api_key;
        }
        if let Some(base_url) = lookup(ENV_TTN_BASE_URL) {
            self.ttn.base_url = Some(base_url);
        }
        if let Some(port) = lookup(ENV_CUSTOM_HANDLER_PORT) {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => eprintln!(
                    "Warning: ignoring {}={:?}: {}",
                    ENV_CUSTOM_HANDLER_PORT, port, e
                ),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ttn.region.trim().is_empty() {
            anyhow::bail!("ttn.region must not be empty");
        }
        if self.ttn.app_id.trim().is_empty() {
            anyhow::bail!("ttn.app_id must not be empty");
        }
        if self.ttn.api_key.trim().is_empty() {
            anyhow::bail!(
                "ttn.api_key is not set (set it in the config file or via {})",
                ENV_TTN_API_KEY
            );
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TtnConfig {
    /// Root URL of the TTN cluster serving this application
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => format!("https://{}.cloud.thethings.network", self.region),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            route: "/api/PlantTypeDownlink".to_string(),
        }
    }
}

impl Default for TtnConfig {
    fn default() -> Self {
        Self {
            region: "eu1".to_string(),
            app_id: "prototest1".to_string(),
            api_key: String::new(),
            base_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_file() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 7071
            route = "/api/Relay"

            [ttn]
            region = "nam1"
            app_id = "greenhouse"
            api_key = "NNSXS.SECRET"

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_addr(), "0.0.0.0:7071");
        assert_eq!(config.server.route, "/api/Relay");
        assert_eq!(config.ttn.app_id, "greenhouse");
        assert_eq!(config.ttn.base_url(), "https://nam1.cloud.thethings.network");
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[ttn]\napi_key = \"k\"\n").unwrap();
        assert_eq!(config.ttn.region, "eu1");
        assert_eq!(config.ttn.app_id, "prototest1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            (ENV_TTN_REGION, "au1"),
            (ENV_TTN_APP_ID, "orchard"),
            (ENV_TTN_API_KEY, "from-env"),
            (ENV_TTN_BASE_URL, "http://127.0.0.1:9999"),
            (ENV_CUSTOM_HANDLER_PORT, "40123"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.ttn.region, "au1");
        assert_eq!(config.ttn.app_id, "orchard");
        assert_eq!(config.ttn.api_key, "from-env");
        assert_eq!(config.ttn.base_url(), "http://127.0.0.1:9999");
        assert_eq!(config.server.port, 40123);
    }

    #[test]
    fn test_bad_port_override_is_ignored() {
        let vars = env(&[(ENV_CUSTOM_HANDLER_PORT, "not-a-port")]);
        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).cloned());
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = Config::load(Path::new("/definitely/not/here.toml"));
        assert!(result.is_err());
    }
}
