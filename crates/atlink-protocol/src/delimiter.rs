//! Response delimiters.
//!
//! A response is complete the moment the accumulated text ends with one of
//! these markers. There is no dedicated terminator character.

use std::fmt;

/// Success marker. The trailing space keeps `"OKAY"` from matching.
pub const OK_DELIMITER: &str = "OK ";

/// Failure marker.
pub const ERROR_DELIMITER: &str = "ERROR";

/// Marker sent when the device refuses a command.
pub const ACCESS_DENIED_DELIMITER: &str = "Access Denied";

/// The kind of delimiter that closed a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// `"OK "`
    Ok,
    /// `"ERROR"`
    Error,
    /// `"Access Denied"`
    AccessDenied,
}

impl Delimiter {
    /// All delimiters, in the order they are checked.
    pub const ALL: [Delimiter; 3] = [Delimiter::Ok, Delimiter::Error, Delimiter::AccessDenied];

    /// The marker text for this delimiter.
    pub const fn marker(&self) -> &'static str {
        match self {
            Delimiter::Ok => OK_DELIMITER,
            Delimiter::Error => ERROR_DELIMITER,
            Delimiter::AccessDenied => ACCESS_DENIED_DELIMITER,
        }
    }

    /// Short lowercase name, used for metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Delimiter::Ok => "ok",
            Delimiter::Error => "error",
            Delimiter::AccessDenied => "access_denied",
        }
    }

    /// Whether this delimiter reports success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Delimiter::Ok)
    }

    /// Find the delimiter that `text` ends with, if any.
    pub fn matching_suffix(text: &str) -> Option<Delimiter> {
        Self::ALL.into_iter().find(|d| text.ends_with(d.marker()))
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_requires_trailing_space() {
        assert_eq!(Delimiter::matching_suffix("AT\rOK "), Some(Delimiter::Ok));
        assert_eq!(Delimiter::matching_suffix("AT\rOK"), None);
        assert_eq!(Delimiter::matching_suffix("OKAYX"), None);
    }

    #[test]
    fn test_error_and_access_denied() {
        assert_eq!(Delimiter::matching_suffix("AT+FOO\rERROR"), Some(Delimiter::Error));
        assert_eq!(
            Delimiter::matching_suffix("WIPE\rAccess Denied"),
            Some(Delimiter::AccessDenied)
        );
        // Case matters.
        assert_eq!(Delimiter::matching_suffix("access denied"), None);
    }

    #[test]
    fn test_suffix_only() {
        assert_eq!(Delimiter::matching_suffix("ERROR then more"), None);
        assert_eq!(Delimiter::matching_suffix(""), None);
    }
}
