use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sent as `key` on every YouTube request when present.
    pub api_key: Option<String>,

    /// Page size for both the subscription listing and the video search.
    /// The API accepts 1 through 50, anything else is clamped.
    pub max_results: u32,

    /// `order` for the subscription listing (`alphabetical`, `relevance`, `unread`).
    /// The API's own default is used when unset.
    pub subscription_order: Option<String>,

    pub youtube_base_url: String,

    pub firestore_project_id: String,
    pub firestore_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: Self::MAX_RESULTS as u32,
            subscription_order: None,
            youtube_base_url: "https://www.googleapis.com/youtube/v3".into(),
            firestore_project_id: String::new(),
            firestore_base_url: "https://firestore.googleapis.com/v1".into(),
        }
    }
}

impl Config {
    pub const MAX_RESULTS: u8 = 50;

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(get_var)
    }

    fn from_vars(get: impl Fn(&str) -> anyhow::Result<String>) -> anyhow::Result<Self> {
        let mut this = Self {
            firestore_project_id: get("FIRESTORE_PROJECT_ID")?,
            ..Self::default()
        };

        this.api_key = get("YOUTUBE_API_KEY").ok();
        this.subscription_order = get("YOUTUBE_SUBSCRIPTION_ORDER").ok();

        if let Ok(max) = get("YOUTUBE_MAX_RESULTS") {
            this.max_results = max
                .parse()
                .with_context(|| format!("invalid YOUTUBE_MAX_RESULTS '{max}'"))?;
        }
        if let Ok(url) = get("YOUTUBE_BASE_URL") {
            this.youtube_base_url = url;
        }
        if let Ok(url) = get("FIRESTORE_BASE_URL") {
            this.firestore_base_url = url;
        }

        Ok(this)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn max_results(&self) -> u8 {
        let max = self.max_results.clamp(1, Self::MAX_RESULTS as u32) as u8;
        if max as u32 != self.max_results {
            tracing::warn!(
                configured = self.max_results,
                using = max,
                "max_results out of range"
            );
        }
        max
    }
}

pub(crate) fn get_var(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("could not find key '{key}' in env"))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn vars<'a>(
        pairs: &'a [(&str, &str)],
    ) -> impl Fn(&str) -> anyhow::Result<String> + 'a {
        let map = pairs.iter().copied().collect::<HashMap<_, _>>();
        move |key: &str| {
            map.get(key)
                .map(|v| v.to_string())
                .ok_or_else(|| anyhow::anyhow!("missing {key}"))
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"firestore_project_id":"demo","max_results":2}"#)
            .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.firestore_project_id, "demo");
        assert_eq!(config.max_results(), 2);
        assert_eq!(config.youtube_base_url, Config::default().youtube_base_url);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn load_reports_the_path() {
        let err = Config::load("/nonexistent/tubesync.json").unwrap_err();
        assert!(format!("{err}").contains("/nonexistent/tubesync.json"));
    }

    #[test]
    fn max_results_is_clamped() {
        let mut config = Config {
            max_results: 0,
            ..Config::default()
        };
        assert_eq!(config.max_results(), 1);
        config.max_results = 200;
        assert_eq!(config.max_results(), 50);
    }

    #[test]
    fn env_max_results_is_clamped_like_json() {
        let config = Config::from_vars(vars(&[
            ("FIRESTORE_PROJECT_ID", "demo"),
            ("YOUTUBE_MAX_RESULTS", "300"),
        ]))
        .unwrap();
        assert_eq!(config.max_results, 300);
        assert_eq!(config.max_results(), 50);

        assert!(Config::from_vars(vars(&[
            ("FIRESTORE_PROJECT_ID", "demo"),
            ("YOUTUBE_MAX_RESULTS", "lots"),
        ]))
        .is_err());
    }

    #[test]
    fn env_requires_a_project() {
        assert!(Config::from_vars(vars(&[("YOUTUBE_API_KEY", "k")])).is_err());

        let config = Config::from_vars(vars(&[
            ("FIRESTORE_PROJECT_ID", "demo"),
            ("YOUTUBE_API_KEY", "k"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.max_results(), Config::MAX_RESULTS);
    }
}
