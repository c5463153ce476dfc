use crate::models::UserRole;

/// Roles a given role may create and list. Admin manages everyone, the CEO
/// manages staff roles, staff roles manage nobody.
pub fn manageable_roles(role: UserRole) -> &'static [UserRole] {
    match role {
        UserRole::Admin => &[
            UserRole::Ceo,
            UserRole::Accountant,
            UserRole::Expert,
            UserRole::Admin,
        ],
        UserRole::Ceo => &[UserRole::Accountant, UserRole::Expert],
        UserRole::Accountant | UserRole::Expert => &[],
    }
}

pub fn can_create(creator: UserRole, target: UserRole) -> bool {
    manageable_roles(creator).contains(&target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_creates_any_role() {
        for target in [
            UserRole::Ceo,
            UserRole::Accountant,
            UserRole::Expert,
            UserRole::Admin,
        ] {
            assert!(can_create(UserRole::Admin, target));
        }
    }

    #[test]
    fn ceo_creates_staff_only() {
        assert!(can_create(UserRole::Ceo, UserRole::Expert));
        assert!(can_create(UserRole::Ceo, UserRole::Accountant));
        assert!(!can_create(UserRole::Ceo, UserRole::Admin));
        assert!(!can_create(UserRole::Ceo, UserRole::Ceo));
    }

    #[test]
    fn staff_roles_create_nobody() {
        assert!(manageable_roles(UserRole::Expert).is_empty());
        assert!(manageable_roles(UserRole::Accountant).is_empty());
    }
}
