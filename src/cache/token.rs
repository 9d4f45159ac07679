use chrono::{DateTime, Duration, Utc};

/// Access token issued for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_id: String,
    pub token: String,
    pub expiry: DateTime<Utc>,
    // pass-through, never interpreted
    pub auth_creds: String,
    pub uam_creds: String,
    pub kfm_creds: String,
}

impl Token {
    pub fn new(access_id: String, token: String, expiry: DateTime<Utc>) -> Self {
        Self {
            access_id,
            token,
            expiry,
            auth_creds: String::new(),
            uam_creds: String::new(),
            kfm_creds: String::new(),
        }
    }

    /// A token is usable at `now` only if it outlives `now + buffer`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now.checked_add_signed(buffer)
            .is_some_and(|limit| self.expiry > limit)
    }

    pub fn is_owned_by(&self, access_id: &str) -> bool {
        self.access_id == access_id
    }
}
