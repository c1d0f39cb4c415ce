use inquisition_core::{ConfigSection, ConfigTree};

pub const REDACTION_MARKER: &str = "<REDACTED>";

/// Config keys whose values never leave the process.
pub const REDACTED_KEYS: [&str; 2] = ["sentry_api_key", "db_pass"];

pub fn is_redacted_key(key: &str) -> bool {
    REDACTED_KEYS.contains(&key)
}

pub fn redact_section(section: &ConfigSection) -> ConfigSection {
    section
        .iter()
        .map(|(k, v)| {
            let v = if is_redacted_key(k) {
                REDACTION_MARKER.to_string()
            } else {
                v.clone()
            };
            (k.clone(), v)
        })
        .collect()
}

pub fn redact_tree(tree: &ConfigTree) -> ConfigTree {
    tree.iter()
        .map(|(name, section)| (name.clone(), redact_section(section)))
        .collect()
}
