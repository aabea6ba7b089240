//! Data structures shared by the storage layer, the catalog and the HTTP surface.

pub mod agent;
pub mod category;
pub mod grant;

pub use agent::{
    AgentRecord, AgentView, Avatar, AvatarFile, DEFAULT_CATEGORY, LegacyVisibility,
    VisibilityScope,
};
pub use category::{ALL_CATEGORY, CategoryDescriptor, CategoryEntry, PROMOTED_CATEGORY};
pub use grant::{AccessGrant, PermissionBits, PrincipalType, ResourceType};
