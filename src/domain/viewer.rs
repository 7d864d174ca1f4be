use uuid::Uuid;

/// The identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated { id: Uuid, username: String },
}

impl Viewer {
    pub fn authenticated(id: Uuid, username: impl Into<String>) -> Self {
        Self::Authenticated {
            id,
            username: username.into(),
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated { id, .. } => Some(*id),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated { username, .. } => Some(username.as_str()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated { .. })
    }

    /// Whether this viewer is the user with the given id.
    pub fn is(&self, user_id: Uuid) -> bool {
        self.id() == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_nobody() {
        let viewer = Viewer::Anonymous;
        assert!(!viewer.is_authenticated());
        assert!(!viewer.is(Uuid::nil()));
        assert_eq!(viewer.username(), None);
    }

    #[test]
    fn authenticated_matches_own_id() {
        let id = Uuid::new_v4();
        let viewer = Viewer::authenticated(id, "leo");
        assert!(viewer.is(id));
        assert!(!viewer.is(Uuid::new_v4()));
        assert_eq!(viewer.username(), Some("leo"));
    }
}
