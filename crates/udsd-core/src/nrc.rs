//! UDS Negative Response Codes (NRC)

use std::fmt;

/// The negative response codes this endpoint can emit.
///
/// The numeric code goes on the wire; the ISO 14229 camelCase name is
/// what appears in logs and is the form handlers are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Nrc {
    ServiceNotSupported = 0x11,
    SubFunctionNotSupported = 0x12,
    IncorrectMessageLengthOrInvalidFormat = 0x13,
    RequestSequenceError = 0x24,
    RequestOutOfRange = 0x31,
    SecurityAccessDenied = 0x33,
    InvalidKey = 0x35,
    SubFunctionNotSupportedInActiveSession = 0x7E,
    ServiceNotSupportedInActiveSession = 0x7F,
}

impl Nrc {
    pub const ALL: [Nrc; 9] = [
        Nrc::ServiceNotSupported,
        Nrc::SubFunctionNotSupported,
        Nrc::IncorrectMessageLengthOrInvalidFormat,
        Nrc::RequestSequenceError,
        Nrc::RequestOutOfRange,
        Nrc::SecurityAccessDenied,
        Nrc::InvalidKey,
        Nrc::SubFunctionNotSupportedInActiveSession,
        Nrc::ServiceNotSupportedInActiveSession,
    ];

    /// The one-byte wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The ISO 14229 symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            Nrc::ServiceNotSupported => "serviceNotSupported",
            Nrc::SubFunctionNotSupported => "subFunctionNotSupported",
            Nrc::IncorrectMessageLengthOrInvalidFormat => {
                "incorrectMessageLengthOrInvalidFormat"
            }
            Nrc::RequestSequenceError => "requestSequenceError",
            Nrc::RequestOutOfRange => "requestOutOfRange",
            Nrc::SecurityAccessDenied => "securityAccessDenied",
            Nrc::InvalidKey => "invalidKey",
            Nrc::SubFunctionNotSupportedInActiveSession => {
                "subFunctionNotSupportedInActiveSession"
            }
            Nrc::ServiceNotSupportedInActiveSession => "serviceNotSupportedInActiveSession",
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|nrc| nrc.code() == code)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|nrc| nrc.name() == name)
    }
}

impl fmt::Display for Nrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for nrc in Nrc::ALL {
            assert_eq!(Nrc::from_code(nrc.code()), Some(nrc));
        }
        assert_eq!(Nrc::from_code(0x10), None);
        assert_eq!(Nrc::from_code(0x00), None);
    }

    #[test]
    fn names_round_trip() {
        for nrc in Nrc::ALL {
            assert_eq!(Nrc::from_name(nrc.name()), Some(nrc));
        }
        assert_eq!(Nrc::from_name("generalReject"), None);
    }

    #[test]
    fn wire_codes_match_iso_values() {
        assert_eq!(Nrc::RequestOutOfRange.code(), 0x31);
        assert_eq!(Nrc::from_name("requestOutOfRange"), Some(Nrc::RequestOutOfRange));
        assert_eq!(Nrc::SubFunctionNotSupportedInActiveSession.code(), 0x7E);
        assert_eq!(Nrc::ServiceNotSupportedInActiveSession.code(), 0x7F);
    }
}
