use crate::Error;
use std::{fmt, str::FromStr};

/// HTTP method a signed url is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignAction {
    Get,
    Put,
    Delete,
}

impl SignAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for SignAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = s.to_uppercase();
        match action.as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(Error::InvalidSignAction(action)),
        }
    }
}

impl fmt::Display for SignAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
