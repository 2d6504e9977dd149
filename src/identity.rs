use crate::config::get_var;

/// A signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    /// OAuth token for the YouTube API.
    pub access_token: String,
    /// Firebase ID token, if the mirror is guarded by security rules.
    pub id_token: Option<String>,
}

impl Session {
    pub fn new(uid: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            access_token: access_token.into(),
            id_token: None,
        }
    }

    pub fn youtube_bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn firestore_bearer(&self) -> String {
        format!(
            "Bearer {}",
            self.id_token.as_deref().unwrap_or(&self.access_token)
        )
    }
}

pub trait Identity: Send + Sync {
    /// `None` when nobody is signed in.
    fn session(&self) -> Option<Session>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticIdentity(Option<Session>);

impl StaticIdentity {
    pub const fn signed_in(session: Session) -> Self {
        Self(Some(session))
    }

    pub const fn signed_out() -> Self {
        Self(None)
    }

    /// Reads `TUBESYNC_UID`, `YOUTUBE_ACCESS_TOKEN` and the optional `FIREBASE_ID_TOKEN`.
    /// Missing uid or access token means signed out.
    pub fn from_env() -> Self {
        let uid = get_var("TUBESYNC_UID");
        let access_token = get_var("YOUTUBE_ACCESS_TOKEN");
        let (Ok(uid), Ok(access_token)) = (uid, access_token) else {
            return Self::signed_out();
        };
        Self(Some(Session {
            uid,
            access_token,
            id_token: get_var("FIREBASE_ID_TOKEN").ok(),
        }))
    }
}

impl Identity for StaticIdentity {
    fn session(&self) -> Option<Session> {
        self.0.clone()
    }
}
