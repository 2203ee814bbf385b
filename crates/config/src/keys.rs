// Oracle API key lookup
//
// Keys come from, in order:
// 1. System keychain (feature `keychain`)
// 2. Environment variable PAYEEKIT_<PROVIDER>_KEY
//
// Keys are never read from settings.toml.

use std::env;

#[cfg(feature = "keychain")]
const KEYCHAIN_SERVICE: &str = "payeekit";

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Keychain,
    Environment,
    /// No key found
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

/// Result of key lookup
#[derive(Debug, Clone, PartialEq)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

/// Environment variable consulted for `provider`.
pub fn env_var_name(provider: &str) -> String {
    let provider: String = provider
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("PAYEEKIT_{provider}_KEY")
}

#[cfg(feature = "keychain")]
fn keychain_account(provider: &str) -> String {
    format!("oracle/{}", provider.to_lowercase())
}

/// Get the API key for `provider`, keychain first.
pub fn get_api_key(provider: &str) -> KeyLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider)) {
            if let Ok(key) = entry.get_password() {
                return KeyLookup {
                    key: Some(key),
                    source: KeySource::Keychain,
                };
            }
        }
    }

    lookup_env(&env_var_name(provider))
}

fn lookup_env(name: &str) -> KeyLookup {
    match env::var(name) {
        Ok(key) if !key.trim().is_empty() => KeyLookup {
            key: Some(key),
            source: KeySource::Environment,
        },
        _ => KeyLookup {
            key: None,
            source: KeySource::None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_names() {
        assert_eq!(env_var_name("oracle"), "PAYEEKIT_ORACLE_KEY");
        assert_eq!(env_var_name("open-ai"), "PAYEEKIT_OPEN_AI_KEY");
    }

    #[test]
    fn env_lookup() {
        let name = "PAYEEKIT_KEYS_TEST_ONLY_KEY";
        env::set_var(name, "sk-test");
        assert_eq!(
            lookup_env(name),
            KeyLookup {
                key: Some("sk-test".into()),
                source: KeySource::Environment,
            }
        );

        env::set_var(name, "   ");
        assert_eq!(lookup_env(name).source, KeySource::None);

        env::remove_var(name);
        assert_eq!(lookup_env(name).key, None);
    }
}
