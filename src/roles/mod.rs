//! Role resolution subsystem.
//!
//! # Data Flow
//! ```text
//! raw payload bytes
//!     → generic JSON tree
//!     → user.rs (every field but role)
//!     → resolver.rs (RoleSeed reads the role field as RoleCode text)
//!     → lookup.rs (RoleLookup::read_by_description)
//!     → Role with its persisted id, or the whole payload is rejected
//! ```

pub mod lookup;
pub mod model;
pub mod resolver;
pub mod user;

pub use lookup::{LookupError, RoleLookup, RoleRepository};
pub use model::{Role, RoleCode};
pub use resolver::{RoleResolver, RoleSeed};
pub use user::{Gender, PayloadError, UserDto};
