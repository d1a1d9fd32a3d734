/*!
The email address a run purges. Validated once, before any store is read.
*/

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAX_LENGTH: usize = 254;
const MAX_LOCAL_LENGTH: usize = 64;
const MAX_LABEL_LENGTH: usize = 63;

/// Characters allowed in a local part besides ASCII letters and digits.
const LOCAL_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,
    #[error("identity is longer than 254 characters")]
    TooLong,
    #[error("identity must be ASCII")]
    NonAscii,
    #[error("identity must contain exactly one '@'")]
    AtSign,
    #[error("local part `{0}` is not valid")]
    LocalPart(String),
    #[error("domain `{0}` must contain at least one dot")]
    DomainWithoutDot(String),
    #[error("domain `{0}` is not valid")]
    Domain(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    address: String,
    at: usize,
}

impl Identity {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        if raw.is_empty() {
            return Err(IdentityError::Empty);
        }
        if !raw.is_ascii() {
            return Err(IdentityError::NonAscii);
        }
        if raw.len() > MAX_LENGTH {
            return Err(IdentityError::TooLong);
        }

        let mut parts = raw.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(IdentityError::AtSign);
        };

        if !valid_local_part(local) {
            return Err(IdentityError::LocalPart(local.to_string()));
        }
        if !domain.contains('.') {
            return Err(IdentityError::DomainWithoutDot(domain.to_string()));
        }
        if !domain.split('.').all(valid_label) {
            return Err(IdentityError::Domain(domain.to_string()));
        }

        Ok(Self {
            address: raw.to_string(),
            at: local.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    pub fn local_part(&self) -> &str {
        &self.address[..self.at]
    }

    pub fn domain(&self) -> &str {
        &self.address[self.at + 1..]
    }
}

fn valid_local_part(local: &str) -> bool {
    !local.is_empty()
        && local.len() <= MAX_LOCAL_LENGTH
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LOCAL_SPECIALS.contains(c))
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LENGTH
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.address
    }
}
