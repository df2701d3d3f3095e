#![forbid(unsafe_code)]

//! Runtime configuration for registries and views.
//!
//! Environment variables (read by [`StateConfig::from_env`]):
//!
//! | Variable                    | Meaning                                   |
//! |-----------------------------|-------------------------------------------|
//! | `VIEWSTATE_MAX_SUBSCRIBERS` | live subscriber cap per registry          |
//! | `VIEWSTATE_PARAM_POLICY`    | `key-present` (default) or `truthy`       |

use std::env;
use std::fmt;
use std::str::FromStr;

/// How [`update_with_value_params`](crate::View::update_with_value_params)
/// decides whether a parameter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamPolicy {
    /// Apply every present parameter that is not the absent sentinel.
    #[default]
    KeyPresent,
    /// Compatibility mode: additionally skip falsy values (`false`, `0`,
    /// empty strings). Drops legitimate falsy updates.
    Truthy,
}

impl FromStr for ParamPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "key-present" | "key_present" | "present" => Ok(Self::KeyPresent),
            "truthy" => Ok(Self::Truthy),
            other => Err(format!("unknown param policy '{other}'")),
        }
    }
}

impl fmt::Display for ParamPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyPresent => f.write_str("key-present"),
            Self::Truthy => f.write_str("truthy"),
        }
    }
}

/// Configuration shared by a registry and the views built on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateConfig {
    /// Maximum number of simultaneously registered subscribers.
    pub max_subscribers: usize,
    /// Default parameter policy for views.
    pub param_policy: ParamPolicy,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_subscribers: usize::MAX,
            param_policy: ParamPolicy::KeyPresent,
        }
    }
}

impl StateConfig {
    /// Defaults overridden by `VIEWSTATE_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = env::var("VIEWSTATE_MAX_SUBSCRIBERS") {
            match val.parse() {
                Ok(n) => config.max_subscribers = n,
                Err(_) => tracing::warn!(value = %val, "ignoring VIEWSTATE_MAX_SUBSCRIBERS"),
            }
        }
        if let Ok(val) = env::var("VIEWSTATE_PARAM_POLICY") {
            match val.parse() {
                Ok(policy) => config.param_policy = policy,
                Err(err) => tracing::warn!(%err, "ignoring VIEWSTATE_PARAM_POLICY"),
            }
        }
        config
    }

    /// Cap the number of live subscribers.
    #[must_use]
    pub fn with_max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the default parameter policy.
    #[must_use]
    pub fn with_param_policy(mut self, policy: ParamPolicy) -> Self {
        self.param_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StateConfig::default();
        assert_eq!(config.max_subscribers, usize::MAX);
        assert_eq!(config.param_policy, ParamPolicy::KeyPresent);
    }

    #[test]
    fn builder_overrides() {
        let config = StateConfig::default()
            .with_max_subscribers(4)
            .with_param_policy(ParamPolicy::Truthy);
        assert_eq!(config.max_subscribers, 4);
        assert_eq!(config.param_policy, ParamPolicy::Truthy);
    }

    #[test]
    fn policy_parse() {
        assert_eq!("truthy".parse::<ParamPolicy>(), Ok(ParamPolicy::Truthy));
        assert_eq!(
            " Key-Present ".parse::<ParamPolicy>(),
            Ok(ParamPolicy::KeyPresent)
        );
        assert!("sometimes".parse::<ParamPolicy>().is_err());
    }

    #[test]
    fn policy_display_round_trips() {
        for policy in [ParamPolicy::KeyPresent, ParamPolicy::Truthy] {
            assert_eq!(policy.to_string().parse::<ParamPolicy>(), Ok(policy));
        }
    }
}
