//! Alternative - one named variant of an experiment

use serde::{Deserialize, Serialize};

/// A named variant a participant can be bucketed into.
///
/// The control/baseline is identified by its reserved name
/// (see [`crate::config::DEFAULT_CONTROL_GROUP`]), not by a flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alternative {
    name: String,
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    default: bool,
}

impl Alternative {
    /// Create an enabled, unweighted alternative.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            weight: None,
            default: false,
        }
    }

    /// Create an enabled alternative with an explicit weight.
    #[must_use]
    pub fn weighted(name: impl Into<String>, weight: f64) -> Self {
        Self {
            weight: Some(weight),
            ..Self::new(name)
        }
    }

    /// Set the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Mark this alternative as the experiment default.
    #[must_use]
    pub const fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    /// Alternative name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether new participants may be bucketed here.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Explicit weight, if any.
    #[must_use]
    pub const fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// Whether this is the experiment default.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.default
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = Some(weight);
    }

    pub(crate) fn set_default(&mut self, default: bool) {
        self.default = default;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternative_new() {
        let alt = Alternative::new("blue");
        assert_eq!(alt.name(), "blue");
        assert!(alt.is_enabled());
        assert!(alt.weight().is_none());
        assert!(!alt.is_default());
    }

    #[test]
    fn test_alternative_serialization_skips_unset_fields() {
        let json = serde_json::to_string(&Alternative::new("blue")).unwrap();
        assert_eq!(json, r#"{"name":"blue","enabled":true}"#);

        let weighted: Alternative =
            serde_json::from_str(r#"{"name":"red","enabled":false,"weight":2.5}"#).unwrap();
        assert_eq!(weighted.weight(), Some(2.5));
        assert!(!weighted.is_enabled());
    }
}
