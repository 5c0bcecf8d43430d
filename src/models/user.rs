use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Local,
    Federated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub kind: UserKind,
    pub id: String,
    pub display_name: String,
}

impl User {
    /// Local accounts are keyed by the lower-cased username.
    pub fn local(username: &str) -> Option<Self> {
        let username = username.trim();
        if username.is_empty() {
            return None;
        }
        let mut chars = username.chars();
        let display_name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Some(Self {
            kind: UserKind::Local,
            id: username.to_lowercase(),
            display_name,
        })
    }

    pub fn federated(id: &str, display_name: &str) -> Option<Self> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        let display_name = if display_name.trim().is_empty() {
            id.to_string()
        } else {
            display_name.trim().to_string()
        };
        Some(Self {
            kind: UserKind::Federated,
            id: id.to_string(),
            display_name,
        })
    }

    /// Key under which the workspace document is stored.
    pub fn storage_key(&self) -> String {
        match self.kind {
            UserKind::Local => format!("local:{}", self.id),
            UserKind::Federated => format!("federated:{}", self.id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub kind: UserKind,
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_user_normalizes_name() {
        let user = User::local("  alice ").unwrap();
        assert_eq!(user.id, "alice");
        assert_eq!(user.display_name, "Alice");
        assert_eq!(user.storage_key(), "local:alice");
        assert!(User::local("   ").is_none());
    }

    #[test]
    fn federated_user_falls_back_to_id_for_name() {
        let user = User::federated("uid-42", "").unwrap();
        assert_eq!(user.kind, UserKind::Federated);
        assert_eq!(user.display_name, "uid-42");
        assert!(User::federated("", "Bob").is_none());
    }
}
