//! Opaque callback handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of the callback used when a step is synthesized without one.
pub const DEFAULT_CALLBACK: &str = "__default";

const ANONYMOUS_PREFIX: &str = "__anonymous_";

/// A handle to a callback registered with the executor.
///
/// The stager stores and transfers these handles but never resolves or
/// invokes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Callback(String);

impl Callback {
    /// Creates a handle for a named callback.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a handle with a fresh unique name.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(format!("{ANONYMOUS_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// The handle used for synthesized steps.
    #[must_use]
    pub fn default_callback() -> Self {
        Self::new(DEFAULT_CALLBACK)
    }

    /// Returns the callback name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns true if the handle was created by [`Callback::anonymous`].
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.starts_with(ANONYMOUS_PREFIX)
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Callback {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Callback {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_callbacks_are_unique() {
        let a = Callback::anonymous();
        let b = Callback::anonymous();
        assert_ne!(a, b);
        assert!(a.is_anonymous());
        assert!(!Callback::new("play").is_anonymous());
    }

    #[test]
    fn test_callback_serializes_as_string() {
        let cb = Callback::new("play");
        assert_eq!(serde_json::to_string(&cb).unwrap(), "\"play\"");
        let back: Callback = serde_json::from_str("\"play\"").unwrap();
        assert_eq!(back, cb);
    }
}
