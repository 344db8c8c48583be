use crate::model::role::Role;

/// Roles that can manage sessions, members, rosters and notulensi.
pub fn is_administrative(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Ketua | Role::Pembina)
}

/// Roles eligible for core sessions and core attendance marks.
pub fn is_core_member(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Ketua)
}

/// A caller may mark attendance for a session if they hold an admin or
/// supervisor role, or if they are the session's designated responsible user.
pub fn can_mark_attendance_for(user_id: i64, role: Role, session_pic_id: Option<i64>) -> bool {
    if matches!(role, Role::Admin | Role::Pembina) {
        return true;
    }
    session_pic_id == Some(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrative_roles() {
        assert!(is_administrative(Role::Admin));
        assert!(is_administrative(Role::Ketua));
        assert!(is_administrative(Role::Pembina));
        assert!(!is_administrative(Role::Member));
    }

    #[test]
    fn core_membership_excludes_supervisor() {
        assert!(is_core_member(Role::Admin));
        assert!(is_core_member(Role::Ketua));
        assert!(!is_core_member(Role::Pembina));
        assert!(!is_core_member(Role::Member));
    }

    #[test]
    fn responsible_user_can_mark_without_admin_role() {
        assert!(can_mark_attendance_for(7, Role::Member, Some(7)));
        assert!(!can_mark_attendance_for(7, Role::Member, Some(8)));
        assert!(!can_mark_attendance_for(7, Role::Member, None));
    }

    #[test]
    fn admin_and_supervisor_can_mark_any_session() {
        assert!(can_mark_attendance_for(1, Role::Admin, None));
        assert!(can_mark_attendance_for(1, Role::Pembina, Some(99)));
        // ketua is administrative but not a session marker by role alone
        assert!(!can_mark_attendance_for(1, Role::Ketua, Some(99)));
    }
}
