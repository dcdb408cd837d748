//! Stager settings: default callbacks, default properties and game hooks.

use super::Stager;
use crate::core::Callback;
use crate::errors::StagerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings shared by every step of a game definition.
///
/// They are stored and transferred with the game definition; the executor
/// decides how to apply them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagerSettings {
    /// Callback of steps synthesized by shorthand calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_callback: Option<Callback>,
    /// Rule deciding when a step is over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_step_rule: Option<Callback>,
    /// Properties every step inherits unless it overrides them.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub default_properties: Map<String, Value>,
    /// Hook run when the game is initialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_init: Option<Callback>,
    /// Hook run when the game is over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_gameover: Option<Callback>,
}

impl StagerSettings {
    /// Creates default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, StagerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the default callback.
    #[must_use]
    pub fn with_default_callback(mut self, cb: impl Into<Callback>) -> Self {
        self.default_callback = Some(cb.into());
        self
    }

    /// Sets the default step rule.
    #[must_use]
    pub fn with_default_step_rule(mut self, rule: impl Into<Callback>) -> Self {
        self.default_step_rule = Some(rule.into());
        self
    }

    /// Sets a default property.
    #[must_use]
    pub fn with_default_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.default_properties.insert(key.into(), value);
        self
    }

    /// Sets the init hook.
    #[must_use]
    pub fn with_on_init(mut self, cb: impl Into<Callback>) -> Self {
        self.on_init = Some(cb.into());
        self
    }

    /// Sets the gameover hook.
    #[must_use]
    pub fn with_on_gameover(mut self, cb: impl Into<Callback>) -> Self {
        self.on_gameover = Some(cb.into());
        self
    }

    /// Merges incoming settings; values present in `other` win.
    pub fn merge(&mut self, other: Self) {
        if other.default_callback.is_some() {
            self.default_callback = other.default_callback;
        }
        if other.default_step_rule.is_some() {
            self.default_step_rule = other.default_step_rule;
        }
        if other.on_init.is_some() {
            self.on_init = other.on_init;
        }
        if other.on_gameover.is_some() {
            self.on_gameover = other.on_gameover;
        }
        self.default_properties.extend(other.default_properties);
    }
}

impl Stager {
    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &StagerSettings {
        &self.settings
    }

    /// Returns the callback used for synthesized steps.
    #[must_use]
    pub fn default_callback(&self) -> Callback {
        self.settings
            .default_callback
            .clone()
            .unwrap_or_else(Callback::default_callback)
    }

    /// Sets the callback used for steps synthesized from now on.
    pub fn set_default_callback(&mut self, cb: impl Into<Callback>) -> &mut Self {
        self.settings.default_callback = Some(cb.into());
        self
    }

    /// Returns the default step rule.
    #[must_use]
    pub fn default_step_rule(&self) -> Option<&Callback> {
        self.settings.default_step_rule.as_ref()
    }

    /// Sets the default step rule.
    pub fn set_default_step_rule(&mut self, rule: impl Into<Callback>) -> &mut Self {
        self.settings.default_step_rule = Some(rule.into());
        self
    }

    /// Returns the default properties.
    #[must_use]
    pub fn default_properties(&self) -> &Map<String, Value> {
        &self.settings.default_properties
    }

    /// Replaces every default property.
    pub fn set_default_properties(&mut self, properties: Map<String, Value>) -> &mut Self {
        self.settings.default_properties = properties;
        self
    }

    /// Sets one default property.
    pub fn set_default_property(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.settings.default_properties.insert(key.into(), value);
        self
    }

    /// Returns a default property.
    #[must_use]
    pub fn default_property(&self, key: &str) -> Option<&Value> {
        self.settings.default_properties.get(key)
    }

    /// Returns the init hook.
    #[must_use]
    pub fn on_init(&self) -> Option<&Callback> {
        self.settings.on_init.as_ref()
    }

    /// Sets the init hook.
    pub fn set_on_init(&mut self, cb: impl Into<Callback>) -> &mut Self {
        self.settings.on_init = Some(cb.into());
        self
    }

    /// Returns the gameover hook.
    #[must_use]
    pub fn on_gameover(&self) -> Option<&Callback> {
        self.settings.on_gameover.as_ref()
    }

    /// Sets the gameover hook.
    pub fn set_on_gameover(&mut self, cb: impl Into<Callback>) -> &mut Self {
        self.settings.on_gameover = Some(cb.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_from_json() {
        let settings = StagerSettings::from_json(
            r#"{"defaultCallback": "noop", "defaultProperties": {"timer": 5000}, "onGameover": "bye"}"#,
        )
        .unwrap();

        assert_eq!(settings.default_callback, Some(Callback::new("noop")));
        assert_eq!(settings.default_properties.get("timer"), Some(&json!(5000)));
        assert_eq!(settings.on_gameover, Some(Callback::new("bye")));
        assert_eq!(settings.on_init, None);
    }

    #[test]
    fn test_settings_from_invalid_json() {
        let err = StagerSettings::from_json("{").unwrap_err();
        assert!(matches!(err, StagerError::Serialization(_)));
    }

    #[test]
    fn test_settings_merge() {
        let mut settings = StagerSettings::new()
            .with_default_callback("a")
            .with_default_property("x", json!(1))
            .with_on_init("init");
        settings.merge(
            StagerSettings::new()
                .with_default_callback("b")
                .with_default_property("y", json!(2)),
        );

        assert_eq!(settings.default_callback, Some(Callback::new("b")));
        assert_eq!(settings.on_init, Some(Callback::new("init")));
        assert_eq!(settings.default_properties.len(), 2);
    }

    #[test]
    fn test_stager_default_callback() {
        let mut stager = Stager::new();
        assert_eq!(stager.default_callback(), Callback::default_callback());

        stager.set_default_callback("wait");
        assert_eq!(stager.default_callback(), Callback::new("wait"));
    }

    #[test]
    fn test_stager_hooks_and_properties() {
        let mut stager = Stager::new();
        stager
            .set_on_init("setup")
            .set_on_gameover("teardown")
            .set_default_step_rule("wait_for_all")
            .set_default_property("timer", json!(60_000));

        assert_eq!(stager.on_init(), Some(&Callback::new("setup")));
        assert_eq!(stager.on_gameover(), Some(&Callback::new("teardown")));
        assert_eq!(stager.default_step_rule(), Some(&Callback::new("wait_for_all")));
        assert_eq!(stager.default_property("timer"), Some(&json!(60_000)));

        stager.set_default_properties(Map::new());
        assert!(stager.default_properties().is_empty());
    }
}
