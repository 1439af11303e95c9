use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// A user record sourced from the external directory (§3). The master never
/// creates users — this is always read, never written, by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uuid: UserId,
    pub login: String,
    pub email: String,
    /// Every other directory attribute, keyed by attribute name. Contact-URN
    /// resolution (§4.6) reads addresses out of this map.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// True iff this user is a member of the directory's privileged
    /// operators group (§3 "A user is an operator iff...").
    #[serde(default)]
    pub is_operator: bool,
}

impl User {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
