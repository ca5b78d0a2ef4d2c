//! Serde configuration: which class the pages belong to, which topic and
//! schema the records use, and how to reach the registry.
//!
//! Configuration is plain JSON, deserialized with serde. Deserialization
//! errors carry the JSON path of the offending key.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Network-protocol URLs, after the OWASP validation regex repository.
static URL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^((((https?|ftps?|gopher|telnet|nntp)://)|(mailto:|news:))",
        r"(%[0-9A-Fa-f]{2}|[-()_.!~*';/?:@&=+$,A-Za-z0-9])+)",
        r"([).!';/?:,][[:blank:]])?$",
    ))
    .unwrap()
});

pub const URL_KEY: &str = "schema.registry.url";
pub const AUTH_SOURCE_KEY: &str = "basic.auth.credentials.source";
pub const USER_INFO_KEY: &str = "basic.auth.user.info";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SerdeConfig {
    /// Class name given to decoded root pages.
    pub class_name: String,
    pub topic_name: String,
    pub schema: SchemaSource,
    #[serde(default)]
    pub use_schema_evolution: bool,
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaSource {
    /// The schema document itself.
    Inline(Json),
    /// Path to a schema file, relative to the working directory.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistryConfig {
    pub url: String,
    #[serde(default)]
    pub authentication_source: Option<String>,
    #[serde(default)]
    pub user_info: Option<String>,
    /// Extra client properties, passed through as-is.
    #[serde(default)]
    pub additional: IndexMap<String, String>,
}

fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize(de).map_err(|error| {
        let path = error.path().to_string();
        Error::Config(format!("at JSON path {path} → {}", error.into_inner()))
    })
}

pub fn validate_url(url: &str) -> Result<&str> {
    if !url.trim().is_empty() && URL_RX.is_match(url) {
        return Ok(url);
    }
    Err(Error::Config(
        "schema registry URL is not valid, ensure that it starts with a network protocol".into(),
    ))
}

impl SerdeConfig {
    /// Parse and validate.
    pub fn from_json_str(src: &str) -> Result<Self> {
        let config: SerdeConfig = from_str_with_path(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("cannot read {}: {error}", path.display())))?;
        Self::from_json_str(&src)
    }

    pub fn validate(&self) -> Result<()> {
        if self.class_name.trim().is_empty() {
            return Err(Error::Config("class name must not be blank".into()));
        }
        if self.topic_name.trim().is_empty() {
            return Err(Error::Config("topic name must not be blank".into()));
        }
        if let Some(registry) = &self.registry {
            registry.validate()?;
        }
        Ok(())
    }

    /// Registry subject holding the value schema of the topic.
    pub fn subject(&self) -> String {
        format!("{}-value", self.topic_name)
    }

    /// Client properties for the registry, in insertion order. Empty when no
    /// registry is configured.
    pub fn registry_properties(&self) -> IndexMap<String, String> {
        self.registry.as_ref().map(RegistryConfig::properties).unwrap_or_default()
    }

    pub fn load_schema(&self) -> Result<Schema> {
        match &self.schema {
            SchemaSource::Inline(json) => Schema::parse_value(json),
            SchemaSource::File(path) => {
                let src = std::fs::read_to_string(path)
                    .map_err(|error| Error::Config(format!("cannot read schema {}: {error}", path.display())))?;
                Schema::parse_str(&src)
            }
        }
    }
}

impl RegistryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), authentication_source: None, user_info: None, additional: IndexMap::new() }
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.url)?;
        let has = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        if has(&self.authentication_source) && !has(&self.user_info) {
            return Err(Error::Config("an authentication source requires user info".into()));
        }
        Ok(())
    }

    pub fn properties(&self) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        out.insert(URL_KEY.to_owned(), self.url.clone());
        if let Some(source) = &self.authentication_source {
            out.insert(AUTH_SOURCE_KEY.to_owned(), source.clone());
        }
        if let Some(user_info) = &self.user_info {
            out.insert(USER_INFO_KEY.to_owned(), user_info.clone());
        }
        out.extend(self.additional.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "className": "Data-Customer",
        "topicName": "customers",
        "schema": {"inline": {"type": "record", "name": "City", "fields": [{"name": "name", "type": "string"}]}},
        "useSchemaEvolution": true,
        "registry": {
            "url": "http://mySchemaRegistry:8081",
            "authenticationSource": "USER_INFO",
            "userInfo": "user:secret",
            "additional": {"auto.register.schemas": "false"}
        }
    }"#;

    #[test]
    fn parses_a_full_config() {
        let config = SerdeConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.class_name, "Data-Customer");
        assert!(config.use_schema_evolution);
        assert_eq!(config.subject(), "customers-value");
        assert_eq!(config.load_schema().unwrap().name(), Some("City"));

        let props = config.registry_properties();
        assert_eq!(props.keys().map(String::as_str).collect::<Vec<_>>(), [
            URL_KEY,
            AUTH_SOURCE_KEY,
            USER_INFO_KEY,
            "auto.register.schemas"
        ]);
        assert_eq!(props[URL_KEY], "http://mySchemaRegistry:8081");
    }

    #[test]
    fn urls_need_a_protocol() {
        assert!(validate_url("http://mySchemaRegistry:8081").is_ok());
        assert!(validate_url("https://registry.example.com/path?x=1").is_ok());
        assert!(validate_url("localhost:8081").is_err());
        assert!(validate_url("   ").is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        let src = CONFIG.replace("\"Data-Customer\"", "\" \"");
        assert!(matches!(SerdeConfig::from_json_str(&src), Err(Error::Config(_))));
        let src = CONFIG.replace("\"customers\"", "\"\"");
        assert!(matches!(SerdeConfig::from_json_str(&src), Err(Error::Config(_))));
    }

    #[test]
    fn authentication_source_requires_user_info() {
        let mut registry = RegistryConfig::new("http://mySchemaRegistry:8081");
        registry.authentication_source = Some("USER_INFO".into());
        assert!(registry.validate().is_err());
        registry.user_info = Some("user:secret".into());
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn deserialization_errors_name_the_key() {
        let src = r#"{"className": "C", "topicName": "t", "schema": {"inline": "string"}, "registry": {"url": 8081}}"#;
        match SerdeConfig::from_json_str(src) {
            Err(Error::Config(message)) => assert!(message.contains("registry.url"), "{message}"),
            other => panic!("expected a config error, got {other:?}"),
        }
    }
}
