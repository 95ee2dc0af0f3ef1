//! Configuration fingerprinting for executor-cache invalidation.

use sha2::{Digest, Sha256};

use agentry_types::agent::AgentConfig;

/// SHA-256 hex fingerprint of an agent configuration.
///
/// Computed over the JSON serialization; struct field order is fixed and
/// skill-state maps are BTreeMaps, so equal configs always serialize to the
/// same bytes. A cached executor is reused only while the stored agent's
/// fingerprint matches the one it was built from.
pub fn config_fingerprint(config: &AgentConfig) -> String {
    let mut hasher = Sha256::new();
    // AgentConfig serialization cannot fail: no maps with non-string keys,
    // no non-finite float sources.
    let bytes = serde_json::to_vec(config).unwrap_or_default();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_types::agent::AgentConfig;

    #[test]
    fn test_equal_configs_have_equal_fingerprints() {
        let a = AgentConfig::default();
        let b = AgentConfig::default();
        assert_eq!(config_fingerprint(&a), config_fingerprint(&b));
        assert_eq!(config_fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_any_field_change_changes_fingerprint() {
        let base = AgentConfig::default();
        let mut changed = AgentConfig::default();
        changed.prompt = Some("new persona".into());
        assert_ne!(config_fingerprint(&base), config_fingerprint(&changed));

        let mut budget = AgentConfig::default();
        budget.history_token_budget = 2048;
        assert_ne!(config_fingerprint(&base), config_fingerprint(&budget));
    }
}
