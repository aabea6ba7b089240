//! Access-control grants recorded by the owning application.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of principal a grant is issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Group,
    Role,
    /// Anonymous, unauthenticated callers.
    Public,
}

impl PrincipalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Role => "role",
            Self::Public => "public",
        }
    }
}

impl std::str::FromStr for PrincipalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "role" => Ok(Self::Role),
            "public" => Ok(Self::Public),
            other => Err(format!("unknown principal type: {other}")),
        }
    }
}

/// Kind of resource a grant refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Agent,
    PromptGroup,
    McpServer,
    /// Resource kinds this service does not know about.
    #[serde(other)]
    Other,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::PromptGroup => "promptGroup",
            Self::McpServer => "mcpServer",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "agent" => Self::Agent,
            "promptGroup" => Self::PromptGroup,
            "mcpServer" => Self::McpServer,
            _ => Self::Other,
        })
    }
}

/// Compact bitmask of granted capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionBits(u32);

impl PermissionBits {
    pub const VIEW: Self = Self(1);
    pub const EDIT: Self = Self(2);
    pub const DELETE: Self = Self(4);
    pub const SHARE: Self = Self(8);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for PermissionBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06b}", self.0)
    }
}

/// A single `(principal, resource, permissions)` grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub principal_type: PrincipalType,
    /// Absent for public grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub perm_bits: PermissionBits,
}

impl AccessGrant {
    /// Grant making `agent_id` viewable by anonymous callers.
    pub fn public_agent(agent_id: impl Into<String>, perm_bits: PermissionBits) -> Self {
        Self {
            principal_type: PrincipalType::Public,
            principal_id: None,
            resource_type: ResourceType::Agent,
            resource_id: agent_id.into(),
            perm_bits,
        }
    }

    /// Whether this grant exposes an agent to anonymous callers with `required` bits.
    pub fn exposes_agent(&self, required: PermissionBits) -> bool {
        self.principal_type == PrincipalType::Public
            && self.resource_type == ResourceType::Agent
            && self.perm_bits.contains(required)
    }
}
