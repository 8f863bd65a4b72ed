/// Binary security identifier decoding
///
/// Layout: revision (1 byte), sub-authority count (1 byte), identifier
/// authority (6 bytes, big-endian), then `count` sub-authorities (4 bytes
/// each, little-endian). Canonical form is `S-<rev>-<auth>-<sub>-<sub>...`.
use crate::error::{LookupError, LookupResult};
use std::fmt;

const HEADER_LEN: usize = 8;
const SUB_AUTHORITY_LEN: usize = 4;

/// Decoded security identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sid {
    pub revision: u8,
    pub authority: u64,
    pub sub_authorities: Vec<u32>,
}

impl Sid {
    /// Decode the binary form, rejecting truncated input
    pub fn from_bytes(bytes: &[u8]) -> LookupResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(LookupError::Decode(format!(
                "SID needs at least {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            )));
        }

        let revision = bytes[0];
        let count = usize::from(bytes[1]);
        let needed = HEADER_LEN + count * SUB_AUTHORITY_LEN;
        if bytes.len() < needed {
            return Err(LookupError::Decode(format!(
                "SID declares {} sub-authorities ({} bytes) but only {} bytes present",
                count,
                needed,
                bytes.len()
            )));
        }

        let authority = bytes[2..HEADER_LEN]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

        let sub_authorities = bytes[HEADER_LEN..needed]
            .chunks_exact(SUB_AUTHORITY_LEN)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self {
            revision,
            authority,
            sub_authorities,
        })
    }

    /// Encode back into the binary layout
    #[cfg(test)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.sub_authorities.len() * SUB_AUTHORITY_LEN);
        out.push(self.revision);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub in &self.sub_authorities {
            out.extend_from_slice(&sub.to_le_bytes());
        }
        out
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-{}", self.revision, self.authority)?;
        for sub in &self.sub_authorities {
            write!(f, "-{}", sub)?;
        }
        Ok(())
    }
}

/// Decode straight to the canonical string
pub fn decode_sid(bytes: &[u8]) -> LookupResult<String> {
    Sid::from_bytes(bytes).map(|sid| sid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // S-1-5-21-3623763911-3361067900-30300820-1013
    const DOMAIN_USER: [u8; 28] = [
        0x01, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x15, 0x00, 0x00, 0x00, 0xc7, 0x3f, 0xfe,
        0xd7, 0x7c, 0xd3, 0x55, 0xc8, 0x94, 0x5a, 0xce, 0x01, 0xf5, 0x03, 0x00, 0x00,
    ];

    #[test]
    fn test_decode_domain_sid() {
        let sid = decode_sid(&DOMAIN_USER).unwrap();
        assert_eq!(sid, "S-1-5-21-3623763911-3361067900-30300820-1013");
    }

    #[test]
    fn test_decode_well_known_everyone() {
        // S-1-1-0
        let bytes = [0x01, 0x01, 0, 0, 0, 0, 0, 0x01, 0, 0, 0, 0];
        assert_eq!(decode_sid(&bytes).unwrap(), "S-1-1-0");
    }

    #[test]
    fn test_decode_no_sub_authorities() {
        let bytes = [0x01, 0x00, 0, 0, 0, 0, 0, 0x05];
        assert_eq!(decode_sid(&bytes).unwrap(), "S-1-5");
    }

    #[test]
    fn test_authority_uses_all_six_bytes() {
        let bytes = [0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(decode_sid(&bytes).unwrap(), format!("S-1-{}", 1u64 << 40));
    }

    #[test]
    fn test_decode_is_deterministic_and_keeps_count() {
        let first = Sid::from_bytes(&DOMAIN_USER).unwrap();
        let second = Sid::from_bytes(&DOMAIN_USER).unwrap();
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.sub_authorities.len(), usize::from(DOMAIN_USER[1]));
    }

    #[test]
    fn test_large_sub_authority_count() {
        // Fifteen sub-authorities, the protocol maximum
        let sid = Sid {
            revision: 1,
            authority: 5,
            sub_authorities: (1..=15).collect(),
        };
        let decoded = Sid::from_bytes(&sid.to_bytes()).unwrap();
        assert_eq!(decoded.sub_authorities.len(), 15);
        assert_eq!(decoded, sid);
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut bytes = DOMAIN_USER.to_vec();
        bytes.extend_from_slice(&[0xff, 0xff]);
        assert_eq!(
            decode_sid(&bytes).unwrap(),
            "S-1-5-21-3623763911-3361067900-30300820-1013"
        );
    }

    #[test]
    fn test_truncated_sub_authorities_rejected() {
        let truncated = &DOMAIN_USER[..DOMAIN_USER.len() - 1];
        let err = decode_sid(truncated).unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
    }

    #[test]
    fn test_short_header_rejected() {
        assert!(matches!(decode_sid(&[]), Err(LookupError::Decode(_))));
        assert!(matches!(decode_sid(&[0x01, 0x00, 0x00]), Err(LookupError::Decode(_))));
    }

    #[test]
    fn test_inflated_count_rejected() {
        let mut bytes = DOMAIN_USER.to_vec();
        bytes[1] = 0xff;
        assert!(matches!(decode_sid(&bytes), Err(LookupError::Decode(_))));
    }
}
