//! Caller identity as supplied by the authentication layer.
//!
//! The workflow trusts whatever identity it is given. Each service operation
//! takes an explicit [`Identity`] and checks the role it needs.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Inspector,
    Supervisor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Inspector => write!(f, "inspector"),
            Role::Supervisor => write!(f, "supervisor"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "inspector" => Ok(Role::Inspector),
            "supervisor" => Ok(Role::Supervisor),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

/// An authenticated caller.
///
/// Administrators and inspectors are identified by numeric id, supervisors
/// by their telephone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Admin { id: i64 },
    Inspector { id: i64 },
    Supervisor { tel: String },
}

impl Identity {
    pub fn admin(id: i64) -> Self {
        Identity::Admin { id }
    }

    pub fn inspector(id: i64) -> Self {
        Identity::Inspector { id }
    }

    pub fn supervisor(tel: impl Into<String>) -> Self {
        Identity::Supervisor { tel: tel.into() }
    }

    /// Build an identity from a role and its textual subject.
    ///
    /// Admin and inspector subjects must be positive integers; supervisor
    /// subjects must be non-empty.
    pub fn parse(role: Role, subject: &str) -> std::result::Result<Self, String> {
        let subject = subject.trim();
        let numeric = || {
            subject
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| format!("{role} id must be a positive integer, got {subject:?}"))
        };

        match role {
            Role::Admin => numeric().map(Identity::admin),
            Role::Inspector => numeric().map(Identity::inspector),
            Role::Supervisor if subject.is_empty() => {
                Err("supervisor telephone must not be empty".to_string())
            }
            Role::Supervisor => Ok(Identity::supervisor(subject)),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Admin { .. } => Role::Admin,
            Identity::Inspector { .. } => Role::Inspector,
            Identity::Supervisor { .. } => Role::Supervisor,
        }
    }

    fn forbidden(&self, required: Role) -> Error {
        Error::Forbidden {
            required,
            actual: self.role(),
        }
    }

    /// The admin id, or `Forbidden`.
    pub fn require_admin(&self) -> Result<i64> {
        match self {
            Identity::Admin { id } => Ok(*id),
            _ => Err(self.forbidden(Role::Admin)),
        }
    }

    /// The inspector id, or `Forbidden`.
    pub fn require_inspector(&self) -> Result<i64> {
        match self {
            Identity::Inspector { id } => Ok(*id),
            _ => Err(self.forbidden(Role::Inspector)),
        }
    }

    /// The supervisor telephone, or `Forbidden`.
    pub fn require_supervisor(&self) -> Result<&str> {
        match self {
            Identity::Supervisor { tel } => Ok(tel),
            _ => Err(self.forbidden(Role::Supervisor)),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Admin { id } => write!(f, "admin:{id}"),
            Identity::Inspector { id } => write!(f, "inspector:{id}"),
            Identity::Supervisor { tel } => write!(f, "supervisor:{tel}"),
        }
    }
}
