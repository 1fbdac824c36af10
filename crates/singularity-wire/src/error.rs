//! Error types for wire values.

use thiserror::Error;

/// Errors raised while interpreting wire-level values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A textual value does not name any variant of the enumeration.
    #[error("unknown {kind} '{value}' (expected one of: {expected})")]
    UnknownValue {
        kind: &'static str,
        value: String,
        expected: String,
    },
}

impl WireError {
    pub(crate) fn unknown(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self::UnknownValue {
            kind,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}

/// Match `value` case-insensitively against the wire names of `variants`.
pub(crate) fn parse_variant<T: Copy>(
    kind: &'static str,
    value: &str,
    variants: &[(T, &'static str)],
) -> Result<T, WireError> {
    variants
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(value.trim()))
        .map(|(v, _)| *v)
        .ok_or_else(|| {
            let names: Vec<&str> = variants.iter().map(|(_, n)| *n).collect();
            WireError::unknown(kind, value, &names)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variant_case_insensitive() {
        let table = [(1u8, "CRON"), (2u8, "QUARTZ")];
        assert_eq!(parse_variant("schedule type", "cron", &table).unwrap(), 1);
        assert_eq!(parse_variant("schedule type", " Quartz ", &table).unwrap(), 2);
    }

    #[test]
    fn test_parse_variant_unknown_lists_expected() {
        let table = [(1u8, "CRON")];
        let err = parse_variant("schedule type", "rrule", &table).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown schedule type 'rrule' (expected one of: CRON)"
        );
    }
}
