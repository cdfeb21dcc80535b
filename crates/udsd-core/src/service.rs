//! Service identifiers and response framing

use crate::nrc::Nrc;

/// First byte of every negative response.
pub const NEGATIVE_RESPONSE_SID: u8 = 0x7F;

/// The closed set of services this endpoint implements.
///
/// Dispatch goes through this enum rather than a lookup table so an
/// unknown service id is rejected explicitly at the type boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceId {
    SessionControl = 0x10,
    ReadMemoryByAddress = 0x23,
    SecurityAccess = 0x27,
}

impl ServiceId {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Positive responses echo the service id with bit 6 set.
    pub fn response_code(self) -> u8 {
        self.code() + 0x40
    }
}

impl TryFrom<u8> for ServiceId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x10 => Ok(ServiceId::SessionControl),
            0x23 => Ok(ServiceId::ReadMemoryByAddress),
            0x27 => Ok(ServiceId::SecurityAccess),
            other => Err(other),
        }
    }
}

/// `[sid + 0x40] ++ data`
pub fn positive_response(service: ServiceId, data: &[u8]) -> Vec<u8> {
    let mut response = Vec::with_capacity(1 + data.len());
    response.push(service.response_code());
    response.extend_from_slice(data);
    response
}

/// `[0x7F, sid, nrc]`. Takes the raw request byte so negatives for
/// unsupported services echo whatever the client sent.
pub fn negative_response(service_byte: u8, nrc: Nrc) -> Vec<u8> {
    vec![NEGATIVE_RESPONSE_SID, service_byte, nrc.code()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_service_ids_parse() {
        assert_eq!(ServiceId::try_from(0x10), Ok(ServiceId::SessionControl));
        assert_eq!(ServiceId::try_from(0x23), Ok(ServiceId::ReadMemoryByAddress));
        assert_eq!(ServiceId::try_from(0x27), Ok(ServiceId::SecurityAccess));
        assert_eq!(ServiceId::try_from(0x22), Err(0x22));
        assert_eq!(ServiceId::try_from(0x3E), Err(0x3E));
    }

    #[test]
    fn response_framing() {
        assert_eq!(
            positive_response(ServiceId::SessionControl, &[0x02]),
            vec![0x50, 0x02]
        );
        assert_eq!(
            negative_response(0x23, Nrc::ServiceNotSupportedInActiveSession),
            vec![0x7F, 0x23, 0x7F]
        );
    }
}
