//! Admin accounts, authorization predicates, bearer sessions, and the
//! authenticated review surface.

pub mod authorization;
pub mod domain;
pub mod password;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use authorization::{authorize, authorize_role};
pub use domain::{Admin, AdminId, AdminProfile, Capability, NewAdmin, Role};
pub use repository::AdminRepository;
pub use router::{admin_router, AdminRouterState};
pub use service::{AdminService, AdminServiceError, LoginSession, ProfileUpdate};
pub use session::TokenSessions;
