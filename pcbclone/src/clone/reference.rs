//! Reference designator mapping.
//!
//! Hierarchical sheets are annotated so that each copy of the cell starts at
//! a different hundred: `D201` in the template sheet becomes `D301`, `D401`,
//! ... in the following ones.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Malformed reference '{0}': no number to offset")]
    Malformed(String),

    #[error("Reference '{reference}' cannot be offset by {offset}: number too large")]
    Overflow { reference: String, offset: u64 },
}

/// A reference designator split around its first run of digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub prefix: String,
    pub numeral: u64,
    pub suffix: String,
}

impl Reference {
    pub fn parse(reference: &str) -> Result<Self, ReferenceError> {
        let start = reference
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ReferenceError::Malformed(reference.to_string()))?;
        let len = reference[start..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(reference.len() - start);
        let end = start + len;

        let numeral = reference[start..end]
            .parse()
            .map_err(|_| ReferenceError::Overflow {
                reference: reference.to_string(),
                offset: 0,
            })?;

        Ok(Self {
            prefix: reference[..start].to_string(),
            numeral,
            suffix: reference[end..].to_string(),
        })
    }

    /// The same designator with its number moved up by `offset`.
    pub fn offset_by(&self, offset: u64) -> Result<Self, ReferenceError> {
        let numeral = self
            .numeral
            .checked_add(offset)
            .ok_or_else(|| ReferenceError::Overflow {
                reference: self.to_string(),
                offset,
            })?;
        Ok(Self {
            numeral,
            ..self.clone()
        })
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.numeral, self.suffix)
    }
}

/// Derives clone references from template references.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceMapper {
    step: u64,
}

impl ReferenceMapper {
    pub fn new(step: u64) -> Self {
        Self { step }
    }

    /// Reference of clone number `clone_index` (1-based; 0 is the template).
    pub fn map(&self, template: &str, clone_index: usize) -> Result<String, ReferenceError> {
        let reference = Reference::parse(template)?;
        let offset = (clone_index as u64)
            .checked_mul(self.step)
            .ok_or_else(|| ReferenceError::Overflow {
                reference: template.to_string(),
                offset: u64::MAX,
            })?;
        Ok(reference.offset_by(offset)?.to_string())
    }

    /// References of all `count - 1` clones of `template`, in slot order.
    pub fn clone_references(&self, template: &str, count: usize) -> Result<Vec<String>, ReferenceError> {
        (1..count).map(|i| self.map(template, i)).collect()
    }
}
