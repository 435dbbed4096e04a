//! Staff Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff role carried by an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Waiter,
    Manager,
    Cook,
}

impl StaffRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Waiter => "waiter",
            StaffRole::Manager => "manager",
            StaffRole::Cook => "cook",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown staff role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for StaffRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waiter" => Ok(StaffRole::Waiter),
            "manager" => Ok(StaffRole::Manager),
            "cook" => Ok(StaffRole::Cook),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Staff member (员工)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub role: StaffRole,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("waiter".parse::<StaffRole>(), Ok(StaffRole::Waiter));
        assert_eq!("Manager".parse::<StaffRole>(), Ok(StaffRole::Manager));
        assert_eq!("COOK".parse::<StaffRole>(), Ok(StaffRole::Cook));
        assert!("cashier".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&StaffRole::Cook).unwrap(), "\"cook\"");
        assert_eq!(StaffRole::Waiter.to_string(), "waiter");
    }
}
