use super::domain::{Admin, Capability, Role};

/// True iff the admin is active and holds the capability. Capability and
/// role are independent axes; callers check whichever the operation
/// demands.
pub fn authorize(admin: &Admin, capability: Capability) -> bool {
    admin.is_active && admin.permissions.contains(&capability)
}

/// True iff the admin is active and their role is in the allowed set.
pub fn authorize_role(admin: &Admin, allowed: &[Role]) -> bool {
    admin.is_active && allowed.contains(&admin.role)
}
