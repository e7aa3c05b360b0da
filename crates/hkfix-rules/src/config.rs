//! Engine configuration

use hkfix_source::QualifiedName;
use serde::{Deserialize, Serialize};

/// Names the matchers and templates are parameterised by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Marker every legacy generated service extends (matched by last segment)
    pub marker_interface: String,
    /// Concrete async type the legacy shape is fixed to
    pub async_type: String,
    /// Name of the effect parameter introduced by the migration
    pub effect_param: String,
    /// Imports the generated bindings need
    pub imports: ImportConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With marker interface
    #[inline]
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker_interface = marker.into();
        self
    }

    /// With async type
    #[inline]
    #[must_use]
    pub fn with_async_type(mut self, async_type: impl Into<String>) -> Self {
        self.async_type = async_type.into();
        self
    }

    /// Last segment of the marker name
    #[must_use]
    pub fn marker_name(&self) -> &str {
        self.marker_interface
            .rsplit('.')
            .next()
            .unwrap_or(&self.marker_interface)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            marker_interface: "ThriftService".into(),
            async_type: "Future".into(),
            effect_param: "F".into(),
            imports: ImportConfig::default(),
        }
    }
}

/// Fully qualified names of the adapter library types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Reader monad transformer
    pub reader_t: QualifiedName,
    /// Functor over higher-kinded services
    pub functor_k: QualifiedName,
    /// Natural transformation
    pub natural_transformation: QualifiedName,
}

impl ImportConfig {
    /// Every import, in insertion order
    #[must_use]
    pub fn all(&self) -> [&QualifiedName; 3] {
        [&self.reader_t, &self.functor_k, &self.natural_transformation]
    }

    /// Simple name the templates use for the reader transformer
    #[must_use]
    pub fn reader_t_name(&self) -> &str {
        self.reader_t.last().unwrap_or("ReaderT")
    }

    /// Simple name the templates use for the functor
    #[must_use]
    pub fn functor_k_name(&self) -> &str {
        self.functor_k.last().unwrap_or("FunctorK")
    }

    /// Simple name the templates use for natural transformations
    #[must_use]
    pub fn arrow_name(&self) -> &str {
        self.natural_transformation.last().unwrap_or("~>")
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        let name = |segments: &[&str]| QualifiedName::new(segments.iter().map(ToString::to_string).collect());
        Self {
            reader_t: name(&["cats", "data", "ReaderT"]),
            functor_k: name(&["cats", "tagless", "FunctorK"]),
            natural_transformation: name(&["cats", "~>"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.marker_name(), "ThriftService");
        assert_eq!(config.async_type, "Future");
        assert_eq!(config.imports.reader_t.to_string(), "cats.data.ReaderT");
        assert_eq!(config.imports.arrow_name(), "~>");
    }

    #[test]
    fn config_marker_last_segment() {
        let config = EngineConfig::new().with_marker("com.twitter.finagle.thrift.ThriftService");
        assert_eq!(config.marker_name(), "ThriftService");
    }

    #[test]
    fn config_partial_toml() {
        let config: EngineConfig = toml::from_str(
            "async_type = \"Task\"\n[imports]\nfunctor_k = \"my.tagless.FunctorK\"\n",
        )
        .unwrap();
        assert_eq!(config.async_type, "Task");
        assert_eq!(config.marker_interface, "ThriftService");
        assert_eq!(config.imports.functor_k.to_string(), "my.tagless.FunctorK");
        assert_eq!(config.imports.reader_t.to_string(), "cats.data.ReaderT");
    }
}
