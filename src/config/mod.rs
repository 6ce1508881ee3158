use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::core::error::GuardError;

/// What the guarded brand looks like and where it legitimately lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrandProfile {
    pub name: String,
    /// Lowercase token matched against alt/src/class hints.
    pub token: String,
    /// Lowercase phrase matched against the title and body text.
    pub phrase: String,
    pub url_hints: Vec<String>,
    pub legitimate_domains: Vec<String>,
}

impl Default for BrandProfile {
    fn default() -> Self {
        Self {
            name: "Google Forms".to_string(),
            token: "google".to_string(),
            phrase: "google form".to_string(),
            url_hints: vec!["google".to_string(), "form".to_string()],
            legitimate_domains: vec![
                "docs.google.com".to_string(),
                "forms.google.com".to_string(),
                "forms.gle".to_string(),
                "google.com".to_string(),
            ],
        }
    }
}

impl BrandProfile {
    fn normalized(mut self) -> Self {
        self.token = self.token.trim().to_lowercase();
        self.phrase = self.phrase.trim().to_lowercase();
        self.url_hints = lowered(self.url_hints);
        self.legitimate_domains = lowered(self.legitimate_domains);
        self
    }
}

fn lowered(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Caps applied to alert records before they leave the page.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AlertLimits {
    pub reason_chars: usize,
    pub form_action_chars: usize,
    pub page_url_chars: usize,
    pub max_links: usize,
    pub link_url_chars: usize,
    pub link_reason_chars: usize,
}

impl Default for AlertLimits {
    fn default() -> Self {
        Self {
            reason_chars: 500,
            form_action_chars: 200,
            page_url_chars: 200,
            max_links: 10,
            link_url_chars: 200,
            link_reason_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub debounce_ms: u64,
    pub brand: BrandProfile,
    pub limits: AlertLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            brand: BrandProfile::default(),
            limits: AlertLimits::default(),
        }
    }
}

impl AppConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

pub fn load_config(path: Option<&str>) -> Result<AppConfig, GuardError> {
    let default_path = Path::new("config/formguard.toml");
    let path = path.map(Path::new).unwrap_or(default_path);

    if !path.exists() {
        tracing::debug!("no config at {}; using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| GuardError::Config(e.to_string()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, GuardError> {
    let mut cfg: AppConfig = toml::from_str(content)?;
    cfg.brand = cfg.brand.normalized();
    if cfg.brand.token.is_empty() || cfg.brand.phrase.is_empty() {
        return Err(GuardError::Config(
            "brand.token and brand.phrase must not be empty".into(),
        ));
    }
    if cfg.brand.legitimate_domains.is_empty() {
        return Err(GuardError::Config(
            "brand.legitimate_domains must list at least one domain".into(),
        ));
    }
    Ok(cfg)
}
