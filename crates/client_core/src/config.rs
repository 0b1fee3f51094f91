use std::{collections::HashMap, fs, path::Path};

use shared::{domain::WireMode, error::ConfigError};
use url::Url;

const DEFAULT_CONFIG_FILE: &str = "console.toml";
const HUB_PATH: &str = "/ws/hub";
const ANCHORS_PATH: &str = "/anchors";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Origin the control plane is served from. Both endpoints derive from it
    /// unless overridden.
    pub origin: String,
    pub ws_url: Option<String>,
    pub api_base: Option<String>,
    pub wire_mode: WireMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".into(),
            ws_url: None,
            api_base: None,
            wire_mode: WireMode::default(),
        }
    }
}

impl Settings {
    pub fn resolve_ws_url(&self) -> Result<String, ConfigError> {
        if let Some(ws_url) = non_empty(self.ws_url.as_deref()) {
            let parsed = parse_url(ws_url)?;
            return match parsed.scheme() {
                "ws" | "wss" => Ok(ws_url.to_string()),
                other => Err(ConfigError::UnsupportedScheme(other.to_string())),
            };
        }

        let mut url = parse_url(&self.origin)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        url.set_path(HUB_PATH);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url.to_string())
    }

    pub fn resolve_registry_url(&self) -> Result<String, ConfigError> {
        let base = match non_empty(self.api_base.as_deref()) {
            Some(base) => base.to_string(),
            None => {
                let url = parse_url(&self.origin)?;
                url.origin().ascii_serialization()
            }
        };
        parse_url(&base)?;
        Ok(format!("{}{ANCHORS_PATH}", base.trim_end_matches('/')))
    }
}

/// Loads settings from defaults, then the config file, then the process
/// environment. CLI flags are layered on top by the caller.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw, path)?,
        Err(err) if config_path.is_some() => {
            return Err(ConfigError::File {
                path: path.display().to_string(),
                reason: err.to_string(),
            });
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str, path: &Path) -> Result<(), ConfigError> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw).map_err(|err| {
        ConfigError::File {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    })?;

    if let Some(v) = file_cfg.get("origin") {
        settings.origin = v.clone();
    }
    if let Some(v) = file_cfg.get("ws_url") {
        settings.ws_url = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("api_base") {
        settings.api_base = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("wire_mode") {
        settings.wire_mode = v.parse()?;
    }
    Ok(())
}

pub(crate) fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("SLIPSTREAM_ORIGIN") {
        settings.origin = v;
    }
    if let Some(v) = lookup("SLIPSTREAM_WS_URL") {
        settings.ws_url = Some(v);
    }
    if let Some(v) = lookup("SLIPSTREAM_API_BASE") {
        settings.api_base = Some(v);
    }
    if let Some(v) = lookup("SLIPSTREAM_WIRE_MODE") {
        settings.wire_mode = v.parse()?;
    }
    Ok(())
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|err| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
