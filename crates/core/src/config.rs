use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fmt;

pub const DEFAULT_QDRANT_URL: &str = "http://192.168.10.3:32726";
pub const DEFAULT_QDRANT_API_KEY: &str = "";
pub const DEFAULT_COLLECTION_NAME: &str = "news";
pub const DEFAULT_EMBEDDING_MODEL: &str = "bge-m3";
pub const DEFAULT_EMBEDDING_PROVIDER: &str = "ollama";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://192.168.10.3:31784";

const REDACTED: &str = "***";

/// One of the six settings handed to the server process through its environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    QdrantUrl,
    QdrantApiKey,
    CollectionName,
    EmbeddingModel,
    EmbeddingProvider,
    OllamaBaseUrl,
}

impl ConfigKey {
    /// All keys, in the order they are logged and exported.
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::QdrantUrl,
        ConfigKey::QdrantApiKey,
        ConfigKey::CollectionName,
        ConfigKey::EmbeddingModel,
        ConfigKey::EmbeddingProvider,
        ConfigKey::OllamaBaseUrl,
    ];

    pub fn env_name(self) -> &'static str {
        match self {
            ConfigKey::QdrantUrl => "QDRANT_URL",
            ConfigKey::QdrantApiKey => "QDRANT_API_KEY",
            ConfigKey::CollectionName => "COLLECTION_NAME",
            ConfigKey::EmbeddingModel => "EMBEDDING_MODEL",
            ConfigKey::EmbeddingProvider => "EMBEDDING_PROVIDER",
            ConfigKey::OllamaBaseUrl => "OLLAMA_BASE_URL",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            ConfigKey::QdrantUrl => DEFAULT_QDRANT_URL,
            ConfigKey::QdrantApiKey => DEFAULT_QDRANT_API_KEY,
            ConfigKey::CollectionName => DEFAULT_COLLECTION_NAME,
            ConfigKey::EmbeddingModel => DEFAULT_EMBEDDING_MODEL,
            ConfigKey::EmbeddingProvider => DEFAULT_EMBEDDING_PROVIDER,
            ConfigKey::OllamaBaseUrl => DEFAULT_OLLAMA_BASE_URL,
        }
    }

    /// Secret values are never logged or printed in clear.
    pub fn is_secret(self) -> bool {
        matches!(self, ConfigKey::QdrantApiKey)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_name())
    }
}

/// Where a resolved value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Flag,
    Env,
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Flag => f.write_str("flag"),
            ValueSource::Env => f.write_str("env"),
            ValueSource::Default => f.write_str("default"),
        }
    }
}

/// The server's runtime configuration.
///
/// Resolved once at startup and read-only afterwards. Every key always holds a
/// value: an operator-supplied one, or the built-in default. Values are passed
/// through verbatim; nothing here validates URLs, providers or model names,
/// that is left to the server process.
///
/// An environment value that is not valid UTF-8 is kept byte-for-byte for the
/// server; the `String` fields then hold its lossy rendering for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub qdrant_url: String,
    pub qdrant_api_key: String,
    pub collection_name: String,
    pub embedding_model: String,
    pub embedding_provider: String,
    pub ollama_base_url: String,
    sources: [ValueSource; 6],
    raw: [Option<OsString>; 6],
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::resolve(|_| None)
    }
}

impl RuntimeConfig {
    /// Resolve every key through `lookup`, falling back to the default.
    ///
    /// A key that `lookup` reports as present wins even when its value is
    /// empty, the same way `docker run -e KEY=` overrides an image `ENV`.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Self {
            qdrant_url: String::new(),
            qdrant_api_key: String::new(),
            collection_name: String::new(),
            embedding_model: String::new(),
            embedding_provider: String::new(),
            ollama_base_url: String::new(),
            sources: [ValueSource::Default; 6],
            raw: Default::default(),
        };

        for key in ConfigKey::ALL {
            match lookup(key.env_name()).map(OsString::into_string) {
                Some(Ok(value)) => config.set(key, value, ValueSource::Env),
                Some(Err(raw)) => {
                    config.set(key, raw.to_string_lossy().into_owned(), ValueSource::Env);
                    config.raw[key.index()] = Some(raw);
                }
                None => config.set(key, key.default_value().to_string(), ValueSource::Default),
            }
        }

        config
    }

    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|name| std::env::var_os(name))
    }

    /// Apply an explicit override (a launcher flag). `None` leaves the key as is.
    pub fn with_override(mut self, key: ConfigKey, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.set(key, value, ValueSource::Flag);
        }
        self
    }

    pub fn get(&self, key: ConfigKey) -> &str {
        match key {
            ConfigKey::QdrantUrl => &self.qdrant_url,
            ConfigKey::QdrantApiKey => &self.qdrant_api_key,
            ConfigKey::CollectionName => &self.collection_name,
            ConfigKey::EmbeddingModel => &self.embedding_model,
            ConfigKey::EmbeddingProvider => &self.embedding_provider,
            ConfigKey::OllamaBaseUrl => &self.ollama_base_url,
        }
    }

    pub fn source(&self, key: ConfigKey) -> ValueSource {
        self.sources[key.index()]
    }

    /// Value safe to print: secrets are masked unless empty.
    pub fn display_value(&self, key: ConfigKey) -> &str {
        let value = self.get(key);
        if key.is_secret() && !value.is_empty() {
            REDACTED
        } else {
            value
        }
    }

    /// The `(NAME, value)` pairs exported to the server process, in key order.
    pub fn env_pairs(&self) -> Vec<(&'static str, &OsStr)> {
        ConfigKey::ALL
            .into_iter()
            .map(|key| {
                let value = match &self.raw[key.index()] {
                    Some(raw) => raw.as_os_str(),
                    None => OsStr::new(self.get(key)),
                };
                (key.env_name(), value)
            })
            .collect()
    }

    /// Redacted JSON view: `{ "QDRANT_URL": { "value": ..., "source": ... }, ... }`.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = ConfigKey::ALL
            .into_iter()
            .map(|key| {
                (
                    key.env_name().to_string(),
                    serde_json::json!({
                        "value": self.display_value(key),
                        "source": self.source(key),
                    }),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }

    fn set(&mut self, key: ConfigKey, value: String, source: ValueSource) {
        let slot = match key {
            ConfigKey::QdrantUrl => &mut self.qdrant_url,
            ConfigKey::QdrantApiKey => &mut self.qdrant_api_key,
            ConfigKey::CollectionName => &mut self.collection_name,
            ConfigKey::EmbeddingModel => &mut self.embedding_model,
            ConfigKey::EmbeddingProvider => &mut self.embedding_provider,
            ConfigKey::OllamaBaseUrl => &mut self.ollama_base_url,
        };
        *slot = value;
        self.sources[key.index()] = source;
        self.raw[key.index()] = None;
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in ConfigKey::ALL {
            writeln!(
                f,
                "{}={} ({})",
                key.env_name(),
                self.display_value(key),
                self.source(key)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_unset_keys_take_defaults() {
        let config = RuntimeConfig::resolve(|_| None);
        assert_eq!(config.qdrant_url, "http://192.168.10.3:32726");
        assert_eq!(config.qdrant_api_key, "");
        assert_eq!(config.collection_name, "news");
        assert_eq!(config.embedding_model, "bge-m3");
        assert_eq!(config.embedding_provider, "ollama");
        assert_eq!(config.ollama_base_url, "http://192.168.10.3:31784");
        for key in ConfigKey::ALL {
            assert_eq!(config.source(key), ValueSource::Default);
        }
    }

    #[test]
    fn test_set_keys_override_defaults() {
        let config = RuntimeConfig::resolve(lookup_from(&[
            ("QDRANT_URL", "http://qdrant:6333"),
            ("QDRANT_API_KEY", "secret"),
            ("COLLECTION_NAME", "articles"),
            ("EMBEDDING_MODEL", "nomic-embed-text"),
            ("EMBEDDING_PROVIDER", "fastembed"),
            ("OLLAMA_BASE_URL", "http://ollama:11434"),
        ]));
        assert_eq!(config.qdrant_url, "http://qdrant:6333");
        assert_eq!(config.qdrant_api_key, "secret");
        assert_eq!(config.collection_name, "articles");
        assert_eq!(config.embedding_model, "nomic-embed-text");
        assert_eq!(config.embedding_provider, "fastembed");
        assert_eq!(config.ollama_base_url, "http://ollama:11434");
        for key in ConfigKey::ALL {
            assert_eq!(config.source(key), ValueSource::Env);
        }
    }

    #[test]
    fn test_single_override_leaves_others_default() {
        let config = RuntimeConfig::resolve(lookup_from(&[("COLLECTION_NAME", "articles")]));
        assert_eq!(config.collection_name, "articles");
        assert_eq!(config.source(ConfigKey::CollectionName), ValueSource::Env);
        assert_eq!(config.qdrant_url, DEFAULT_QDRANT_URL);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.source(ConfigKey::QdrantUrl), ValueSource::Default);
    }

    #[test]
    fn test_empty_env_value_is_operator_supplied() {
        let config = RuntimeConfig::resolve(lookup_from(&[("COLLECTION_NAME", "")]));
        assert_eq!(config.collection_name, "");
        assert_eq!(config.source(ConfigKey::CollectionName), ValueSource::Env);
    }

    #[test]
    fn test_values_are_not_validated() {
        let config = RuntimeConfig::resolve(lookup_from(&[
            ("QDRANT_URL", "not a url"),
            ("EMBEDDING_PROVIDER", "unknown-provider"),
        ]));
        assert_eq!(config.qdrant_url, "not a url");
        assert_eq!(config.embedding_provider, "unknown-provider");
    }

    #[test]
    fn test_flag_beats_env() {
        let config = RuntimeConfig::resolve(lookup_from(&[("QDRANT_URL", "http://env:6333")]))
            .with_override(ConfigKey::QdrantUrl, Some("http://flag:6333".into()))
            .with_override(ConfigKey::CollectionName, None);
        assert_eq!(config.qdrant_url, "http://flag:6333");
        assert_eq!(config.source(ConfigKey::QdrantUrl), ValueSource::Flag);
        assert_eq!(config.collection_name, DEFAULT_COLLECTION_NAME);
        assert_eq!(config.source(ConfigKey::CollectionName), ValueSource::Default);
    }

    #[test]
    fn test_env_pairs_cover_every_key_in_order() {
        let config = RuntimeConfig::default();
        let names: Vec<&str> = config.env_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec![
                "QDRANT_URL",
                "QDRANT_API_KEY",
                "COLLECTION_NAME",
                "EMBEDDING_MODEL",
                "EMBEDDING_PROVIDER",
                "OLLAMA_BASE_URL",
            ]
        );
        assert!(config.env_pairs().contains(&("QDRANT_URL", OsStr::new(DEFAULT_QDRANT_URL))));
    }

    #[test]
    fn test_api_key_is_redacted() {
        let config = RuntimeConfig::resolve(lookup_from(&[("QDRANT_API_KEY", "hunter2")]));
        assert_eq!(config.display_value(ConfigKey::QdrantApiKey), "***");
        assert!(!config.to_string().contains("hunter2"));
        assert_eq!(config.to_json()["QDRANT_API_KEY"]["value"], "***");
        // The real value still reaches the server.
        assert!(config.env_pairs().contains(&("QDRANT_API_KEY", OsStr::new("hunter2"))));
    }

    #[test]
    fn test_empty_api_key_shown_as_empty() {
        let config = RuntimeConfig::default();
        assert_eq!(config.display_value(ConfigKey::QdrantApiKey), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_env_value_is_kept_verbatim() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"coll\xffname").to_os_string();
        let config = RuntimeConfig::resolve(|name| {
            (name == "COLLECTION_NAME").then(|| raw.clone())
        });
        assert_eq!(config.source(ConfigKey::CollectionName), ValueSource::Env);
        assert_eq!(config.collection_name, "coll\u{fffd}name");
        assert!(
            config
                .env_pairs()
                .contains(&("COLLECTION_NAME", raw.as_os_str()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_flag_replaces_non_utf8_env_value() {
        use std::os::unix::ffi::OsStrExt;

        let config = RuntimeConfig::resolve(|name| {
            (name == "COLLECTION_NAME").then(|| OsStr::from_bytes(b"\xfe").to_os_string())
        })
        .with_override(ConfigKey::CollectionName, Some("articles".into()));
        assert!(
            config
                .env_pairs()
                .contains(&("COLLECTION_NAME", OsStr::new("articles")))
        );
    }

    #[test]
    fn test_to_json_reports_sources() {
        let config = RuntimeConfig::resolve(lookup_from(&[("EMBEDDING_MODEL", "mxbai")]))
            .with_override(ConfigKey::OllamaBaseUrl, Some("http://gpu:11434".into()));
        let json = config.to_json();
        assert_eq!(json["EMBEDDING_MODEL"]["value"], "mxbai");
        assert_eq!(json["EMBEDDING_MODEL"]["source"], "env");
        assert_eq!(json["OLLAMA_BASE_URL"]["source"], "flag");
        assert_eq!(json["COLLECTION_NAME"]["source"], "default");
        assert_eq!(json.as_object().map(|o| o.len()), Some(6));
    }
}
