//! Configuration validation rules.

use std::collections::HashSet;

use super::schema::Config;
use crate::utils::is_valid_session_name;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.sessions.names.is_empty() {
        errors.push("sessions.names must list at least one session".to_string());
    }
    let mut seen = HashSet::new();
    for name in &config.sessions.names {
        if !is_valid_session_name(name) {
            errors.push(format!(
                "sessions.names: '{}' must be non-empty, use only [A-Za-z0-9_-] and not be reserved",
                name
            ));
        }
        if !seen.insert(name.as_str()) {
            errors.push(format!("sessions.names: duplicate session name '{}'", name));
        }
    }

    if config.bridge.bridge_url.trim().is_empty() {
        errors.push("bridge.bridge_url must not be empty".to_string());
    }

    if config.gateway.port == 0 {
        errors.push("gateway.port must be > 0".to_string());
    }
    if config.gateway.qr_wait_secs == 0 {
        errors.push("gateway.qr_wait_secs must be > 0".to_string());
    }

    let reconnect = &config.reconnect;
    if reconnect.initial_delay_ms == 0 {
        errors.push("reconnect.initial_delay_ms must be > 0".to_string());
    }
    if reconnect.initial_delay_ms > reconnect.max_delay_ms {
        errors.push("reconnect.initial_delay_ms must be <= reconnect.max_delay_ms".to_string());
    }
    if !(reconnect.multiplier >= 1.0) {
        errors.push("reconnect.multiplier must be >= 1.0".to_string());
    }

    if let Some(temperature) = config.providers.openai.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push("providers.openai.temperature must be in [0.0, 2.0]".to_string());
        }
    }
    if config.providers.openai.max_tokens == Some(0) {
        errors.push("providers.openai.max_tokens must be > 0 when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
