/// Session gate
///
/// The studio only runs with a user present. No remote auth backend is
/// wired up in this build, so the gate is satisfied by a local guest
/// identity created at startup; signing out drops back to the locked
/// screen.

/// Whoever is using the studio right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub display_name: String,
}

#[derive(Debug, Default)]
pub struct Session {
    user: Option<UserIdentity>,
}

impl Session {
    /// A session with a local guest signed in.
    pub fn local() -> Self {
        Self {
            user: Some(UserIdentity {
                display_name: "Studio Guest".to_string(),
            }),
        }
    }

    pub fn current_user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    pub fn sign_in_as_guest(&mut self) {
        self.user = Some(UserIdentity {
            display_name: "Studio Guest".to_string(),
        });
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_opens_and_closes() {
        let mut session = Session::local();
        assert!(session.current_user().is_some());

        session.sign_out();
        assert!(session.current_user().is_none());

        session.sign_in_as_guest();
        assert_eq!(
            session.current_user().map(|user| user.display_name.as_str()),
            Some("Studio Guest")
        );
    }
}
