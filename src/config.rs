//! Environment configuration.

use std::env;

use crate::prompt::{PromptConfig, DEFAULT_PLACEHOLDER};

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Show control-block error codes in the input hint.
    pub debug_interaction: bool,
    pub prompt_placeholder: String,
    pub log_level: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            debug_interaction: false,
            prompt_placeholder: DEFAULT_PLACEHOLDER.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            debug_interaction: env_flag("TURN_STREAM_DEBUG_INTERACTION"),
            prompt_placeholder: env_string_opt("TURN_STREAM_PROMPT")
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string()),
            log_level: env_string_opt("TURN_STREAM_LOG_LEVEL")
                .map(|level| level.trim().to_ascii_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    #[must_use]
    pub fn prompt_config(&self) -> PromptConfig {
        PromptConfig {
            placeholder: self.prompt_placeholder.clone(),
            debug_interaction: self.debug_interaction,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::EnvConfig;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const KEYS: [&str; 3] = [
        "TURN_STREAM_DEBUG_INTERACTION",
        "TURN_STREAM_PROMPT",
        "TURN_STREAM_LOG_LEVEL",
    ];

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults() {
        let _lock = env_lock();
        let _guards: Vec<EnvGuard> = KEYS
            .into_iter()
            .map(|key| set_env_guard(key, None))
            .collect();

        let config = EnvConfig::from_env();
        assert_eq!(config, EnvConfig::default());
        assert_eq!(config.prompt_placeholder, "Ask away");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn env_values_override_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard("TURN_STREAM_DEBUG_INTERACTION", Some("1"));
        let _g2 = set_env_guard("TURN_STREAM_PROMPT", Some("Reply here"));
        let _g3 = set_env_guard("TURN_STREAM_LOG_LEVEL", Some(" DEBUG "));

        let config = EnvConfig::from_env();
        assert!(config.debug_interaction);
        assert_eq!(config.log_level, "debug");

        let prompt = config.prompt_config();
        assert_eq!(prompt.placeholder, "Reply here");
        assert!(prompt.debug_interaction);
    }

    #[test]
    fn blank_values_and_non_one_flags_are_ignored() {
        let _lock = env_lock();
        let _g1 = set_env_guard("TURN_STREAM_DEBUG_INTERACTION", Some("true"));
        let _g2 = set_env_guard("TURN_STREAM_PROMPT", Some("   "));
        let _g3 = set_env_guard("TURN_STREAM_LOG_LEVEL", Some(""));

        let config = EnvConfig::from_env();
        assert!(!config.debug_interaction);
        assert_eq!(config.prompt_placeholder, "Ask away");
        assert_eq!(config.log_level, "info");
    }
}
