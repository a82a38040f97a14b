use std::collections::HashMap;

use twilight_model::{
    guild::Permissions,
    id::{Id, marker::RoleMarker},
};

/// Check whether a permission set grants `required`, treating administrator as all.
pub fn grants(perms: Permissions, required: Permissions) -> bool {
    perms.contains(Permissions::ADMINISTRATOR) || perms.contains(required)
}

/// Whether `perms` allows changing other members' nicknames.
pub fn can_manage_nicknames(perms: Option<Permissions>) -> bool {
    perms.is_some_and(|perms| grants(perms, Permissions::MANAGE_NICKNAMES))
}

/// Highest position among `member_roles`; members without roles rank `0`.
///
/// Roles missing from `positions` are ignored.
pub fn role_rank(
    member_roles: &[Id<RoleMarker>],
    positions: &HashMap<Id<RoleMarker>, i64>,
) -> i64 {
    member_roles
        .iter()
        .filter_map(|role_id| positions.get(role_id).copied())
        .max()
        .unwrap_or(0)
}
