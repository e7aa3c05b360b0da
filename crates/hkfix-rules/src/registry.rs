//! Rule registry
//!
//! Provides [`RuleRegistry`] for managing and selecting rewrite rules. The
//! registry order is the order rules run in.

use crate::adapt_references::AdaptReferences;
use crate::add_instances::AddInstances;
use crate::config::EngineConfig;
use crate::rule::RewriteRule;
use indexmap::IndexMap;
use std::sync::Arc;

/// Requested rule is not registered
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown rule `{name}` (known: {})", known.join(", "))]
pub struct UnknownRule {
    /// Requested name
    pub name: String,
    /// Registered names
    pub known: Vec<String>,
}

/// Ordered registry of rewrite rules
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: IndexMap<&'static str, Arc<dyn RewriteRule>>,
}

impl RuleRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: IndexMap::new(),
        }
    }

    /// Create registry with built-in rules, `add-instances` first
    #[must_use]
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AddInstances::new(config.clone())));
        registry.register(Arc::new(AdaptReferences::new()));
        registry
    }

    /// Register a rule, replacing any rule with the same name in place
    pub fn register(&mut self, rule: Arc<dyn RewriteRule>) {
        self.rules.insert(rule.name(), rule);
    }

    /// Check if a rule exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Get a rule by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn RewriteRule>> {
        self.rules.get(name)
    }

    /// Remove a rule
    #[inline]
    pub fn remove(&mut self, name: &str) -> bool {
        self.rules.shift_remove(name).is_some()
    }

    /// Registered names, in run order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.keys().copied().collect()
    }

    /// Get number of registered rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over rules in run order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RewriteRule>> {
        self.rules.values()
    }

    /// Rules named in `names`, in registry order
    ///
    /// An empty selection means every rule.
    ///
    /// # Errors
    /// Returns [`UnknownRule`] for the first name that is not registered
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn RewriteRule>>, UnknownRule> {
        if let Some(unknown) = names.iter().find(|n| !self.contains(n.as_ref())) {
            return Err(UnknownRule {
                name: unknown.as_ref().to_string(),
                known: self.names().into_iter().map(String::from).collect(),
            });
        }
        Ok(self
            .rules
            .iter()
            .filter(|(name, _)| names.is_empty() || names.iter().any(|n| n.as_ref() == **name))
            .map(|(_, rule)| Arc::clone(rule))
            .collect())
    }
}
