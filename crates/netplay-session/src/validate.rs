//! Input checks applied by front-ends before a command is issued.

use crate::error::ValidationError;

/// Accept a port number typed by the user.
pub fn validate_port(value: i64) -> Result<u16, ValidationError> {
    u16::try_from(value)
        .ok()
        .filter(|port| *port != 0)
        .ok_or(ValidationError::PortOutOfRange(value))
}

/// Accept a remote host name, trimming surrounding whitespace.
pub fn validate_address(value: &str) -> Result<&str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyAddress);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_bounds() {
        assert_eq!(validate_port(0), Err(ValidationError::PortOutOfRange(0)));
        assert_eq!(validate_port(1), Ok(1));
        assert_eq!(validate_port(6502), Ok(6502));
        assert_eq!(validate_port(65535), Ok(65535));
        assert_eq!(
            validate_port(65536),
            Err(ValidationError::PortOutOfRange(65536))
        );
        assert_eq!(validate_port(-1), Err(ValidationError::PortOutOfRange(-1)));
    }

    #[test]
    fn address_is_trimmed() {
        assert_eq!(validate_address("  10.0.0.5 "), Ok("10.0.0.5"));
        assert_eq!(validate_address("   "), Err(ValidationError::EmptyAddress));
        assert_eq!(validate_address(""), Err(ValidationError::EmptyAddress));
    }
}
