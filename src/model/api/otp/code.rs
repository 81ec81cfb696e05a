use std::fmt::Display;
use std::str::FromStr;

use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CODE_LENGTH: usize = 6;

/// A numeric one-time PIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code([u8; CODE_LENGTH]);

impl Code {
    /// Generate a random code.
    pub fn random() -> Self {
        let digits = Uniform::from(0..=9);
        let mut rng = rand::thread_rng();
        let mut code = [0; CODE_LENGTH];
        for digit in &mut code {
            *digit = digits.sample(&mut rng);
        }
        Self(code)
    }

    /// The individual digits.
    pub fn digits(&self) -> &[u8; CODE_LENGTH] {
        &self.0
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for digit in self.0 {
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("PIN must contain exactly 6 digits, found {0} characters")]
    InvalidLength(usize),
    #[error("PIN must only contain digits, found '{0}'")]
    InvalidChar(char),
}

impl FromStr for Code {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let len = s.chars().count();
        if len != CODE_LENGTH {
            return Err(CodeError::InvalidLength(len));
        }
        let mut code = [0; CODE_LENGTH];
        for (digit, c) in code.iter_mut().zip(s.chars()) {
            *digit = c.to_digit(10).ok_or(CodeError::InvalidChar(c))? as u8;
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for Code {
    type Error = CodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}
