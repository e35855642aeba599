use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Visitor identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Identity fields posted when a chat session is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "d_nickname")]
    pub nickname: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub subject: String,
    /// Sent as `userData[<key>]` form fields.
    #[serde(default)]
    pub user_data: HashMap<String, String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nickname: d_nickname(),
            first_name: String::new(),
            last_name: String::new(),
            email_address: String::new(),
            subject: String::new(),
            user_data: HashMap::new(),
        }
    }
}

fn d_nickname() -> String {
    "Guest".into()
}
