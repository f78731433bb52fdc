use std::fs;
use std::path::PathBuf;

use serde_json::{json, Value};
use tempfile::TempDir;
use authz_bridge::config::{Config, OAuth2Config, SecretConfig};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("authz-bridge.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config pointing at a mock decision service.
#[allow(dead_code)]
pub fn config_for(service_url: &str) -> Config {
    let mut config = Config::default();
    config.service.url = service_url.to_string();
    config.service.timeout_seconds = 5;
    config
}

#[allow(dead_code)]
pub fn with_basic(mut config: Config, realm: Option<&str>) -> Config {
    let mut secrets = SecretConfig::new("bridge-svc", "bridge-pw");
    secrets.realm = realm.map(str::to_string);
    config.credentials.basic = Some(secrets);
    config
}

#[allow(dead_code)]
pub fn with_digest(mut config: Config) -> Config {
    config.credentials.digest = Some(SecretConfig::new("Mufasa", "Circle Of Life"));
    config
}

#[allow(dead_code)]
pub fn with_oauth2(mut config: Config, token_url: &str) -> Config {
    config.credentials.oauth2 = Some(OAuth2Config {
        realm: None,
        service_url: token_url.to_string(),
        client_id: "bridge".to_string(),
        client_secret: Some("bridge-secret".to_string()),
        scope: None,
    });
    config
}

/// Decision granting one SSH configuration.
#[allow(dead_code)]
pub fn granted_decision() -> Value {
    json!({
        "authorized": true,
        "configurations": {
            "build-host": {
                "protocol": "ssh",
                "parameters": { "hostname": "10.0.0.5", "port": 22 }
            }
        }
    })
}

/// `Basic bridge-svc:bridge-pw`
#[allow(dead_code)]
pub const BASIC_HEADER: &str = "Basic YnJpZGdlLXN2YzpicmlkZ2UtcHc=";
