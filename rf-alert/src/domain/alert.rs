//! Alert code value objects.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Integer payload decoded from a received radio transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertCode(pub u64);

impl std::fmt::Display for AlertCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AlertCode {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Ordered list of alert codes paired 1:1 with human-readable descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCatalog {
    codes: Vec<AlertCode>,
    descriptions: Vec<String>,
}

impl AlertCatalog {
    /// Build a catalog from parallel lists.
    ///
    /// Fails when the lists differ in length or are empty.
    pub fn new(codes: Vec<AlertCode>, descriptions: Vec<String>) -> Result<Self> {
        if codes.is_empty() {
            return Err(Error::validation("at least one alert code is required"));
        }
        if codes.len() != descriptions.len() {
            return Err(Error::validation(format!(
                "{} alert codes but {} descriptions",
                codes.len(),
                descriptions.len()
            )));
        }
        Ok(Self {
            codes,
            descriptions,
        })
    }

    pub fn codes(&self) -> &[AlertCode] {
        &self.codes
    }

    pub fn contains(&self, code: AlertCode) -> bool {
        self.codes.contains(&code)
    }

    /// Description of the first entry matching `code`.
    pub fn description(&self, code: AlertCode) -> Option<&str> {
        self.codes
            .iter()
            .position(|c| *c == code)
            .map(|idx| self.descriptions[idx].as_str())
    }

    /// The code used by the simulated test alert.
    pub fn first(&self) -> AlertCode {
        self.codes[0]
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
