// Authentication options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity providers a user can sign in with
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignInProvider {
    /// Google account popup
    Google,
    /// Any other provider, by id
    Custom(String),
}

impl SignInProvider {
    pub fn id(&self) -> &str {
        match self {
            SignInProvider::Google => "google.com",
            SignInProvider::Custom(id) => id,
        }
    }
}

/// Sign-in options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthOptions {
    /// How long a sign-in popup may stay open before the attempt is
    /// abandoned
    #[serde(with = "humantime_serde")]
    pub sign_in_timeout: Duration,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            sign_in_timeout: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_parse_from_human_strings() {
        let opts: AuthOptions =
            serde_json::from_value(serde_json::json!({"sign_in_timeout": "90s"})).unwrap();
        assert_eq!(opts.sign_in_timeout, Duration::from_secs(90));
        assert_eq!(AuthOptions::default().sign_in_timeout, Duration::from_secs(120));
    }
}
