//! Per-connection diagnostic session and security state

/// Active diagnostic session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    /// No session selected yet (connection startup state).
    #[default]
    Idle,
    /// Default session, sub-function 0x01.
    Default,
    /// Extended session, sub-function 0x02. Required for SecurityAccess
    /// and ReadMemoryByAddress.
    Extended,
}

impl Session {
    /// Map a DiagnosticSessionControl sub-function byte to a session.
    pub fn from_sub_function(sf: u8) -> Option<Self> {
        match sf {
            0x01 => Some(Session::Default),
            0x02 => Some(Session::Extended),
            _ => None,
        }
    }
}

/// Security unlock progress within the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    #[default]
    Locked,
    /// A seed has been issued; the next sendKey is accepted.
    SeedIssued,
    /// Key accepted; privileged services are available.
    Unlocked,
}

/// Combined session/security state.
///
/// Session and security are deliberately not independently settable:
/// the only way to change session is [`DiagState::enter_session`],
/// which relocks security, so the "session change resets the unlock"
/// invariant holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagState {
    session: Session,
    security: Security,
}

impl DiagState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn security(&self) -> Security {
        self.security
    }

    /// Enter a session. Always relocks, even when re-entering the
    /// session that is already active.
    pub fn enter_session(&mut self, session: Session) {
        self.session = session;
        self.security = Security::Locked;
    }

    /// Record that a seed has been handed out.
    pub fn issue_seed(&mut self) {
        self.security = Security::SeedIssued;
    }

    /// Record a successful key exchange.
    pub fn unlock(&mut self) {
        self.security = Security::Unlocked;
    }
}
