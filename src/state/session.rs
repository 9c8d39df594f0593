// SPDX-License-Identifier: MPL-2.0

use candid::Principal;
use std::sync::RwLock;

/// An identity obtained externally (wallet or identity provider). The crate
/// never sees key material, only the principal it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Canonical principal text of the signed-in viewer.
    pub principal: String,
}

impl Session {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: principal.to_text(),
        }
    }
}

/// Who is signed in right now. Shared process-wide; the transport reads it
/// per call and update calls gate on it.
pub struct SessionState {
    current: RwLock<Option<Session>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    pub fn sign_in(&self, session: Session) {
        let mut guard = self.current.write().unwrap();
        *guard = Some(session);
    }

    pub fn sign_out(&self) {
        let mut guard = self.current.write().unwrap();
        *guard = None;
    }

    pub fn principal(&self) -> Option<String> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.principal.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().unwrap().is_some()
    }
}
