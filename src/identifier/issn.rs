use crate::{IdentifierError, IdentifierResult};
use std::fmt;
use std::str::FromStr;

/// A canonical ISSN, always rendered as `NNNN-NNNC`
///
/// The first seven characters are digits, the last one is a digit or `X`
/// (the check character). Construct one with [`Issn::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Issn(String);

impl Issn {
    /// Normalizes raw user input into canonical form
    ///
    /// Surrounding whitespace, inner spaces and hyphens are dropped and a
    /// lowercase check character is uppercased. Exactly eight characters must
    /// remain, otherwise the input is rejected rather than guessed at.
    ///
    /// # Examples
    ///
    /// ```
    /// use issnlister::Issn;
    ///
    /// assert_eq!(Issn::normalize("12345678").unwrap().as_str(), "1234-5678");
    /// assert_eq!(Issn::normalize("0003-200x").unwrap().as_str(), "0003-200X");
    /// assert!(Issn::normalize("1234567").is_err());
    /// ```
    pub fn normalize(raw: &str) -> IdentifierResult<Self> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if compact.chars().count() != 8 {
            return Err(IdentifierError::InvalidLength {
                input: raw.to_string(),
            });
        }

        let valid = compact
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || (i == 7 && c == 'X'));
        if !valid {
            return Err(IdentifierError::InvalidCharacters {
                input: raw.to_string(),
            });
        }

        Ok(Self(format!("{}-{}", &compact[..4], &compact[4..])))
    }

    /// Builds a full ISSN from its first seven digits by appending the check character
    pub fn complete(serial: &str) -> IdentifierResult<Self> {
        let compact: String = serial.chars().filter(|c| *c != '-').collect();
        let check = check_digit(&compact)?;
        Self::normalize(&format!("{}{}", compact, check))
    }

    /// The canonical hyphenated form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the last character matches the mod-11 checksum of the first seven digits
    pub fn has_valid_check_digit(&self) -> bool {
        let serial: String = self.0.chars().filter(|c| *c != '-').take(7).collect();
        match check_digit(&serial) {
            Ok(expected) => self.0.ends_with(expected),
            Err(_) => false,
        }
    }
}

impl fmt::Display for Issn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Issn {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl AsRef<str> for Issn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the ISSN check character for seven digits
///
/// Digits are weighted 8 down to 2; the check value is `11 - (sum mod 11)`,
/// with 11 mapped to `0` and 10 mapped to `X`.
pub fn check_digit(serial: &str) -> IdentifierResult<char> {
    if serial.chars().count() != 7 {
        return Err(IdentifierError::InvalidLength {
            input: serial.to_string(),
        });
    }

    let mut sum = 0u32;
    for (c, weight) in serial.chars().zip((2..=8u32).rev()) {
        let digit = c.to_digit(10).ok_or_else(|| IdentifierError::InvalidCharacters {
            input: serial.to_string(),
        })?;
        sum += digit * weight;
    }

    Ok(match (11 - sum % 11) % 11 {
        10 => 'X',
        n => char::from_digit(n, 10).unwrap_or('0'),
    })
}
