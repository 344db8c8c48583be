use crate::api::attendance::{AttendanceSummary, MarkAttendanceReq};
use crate::api::members::{BatchDeleteReq, CreateMemberReq, UpdateMemberReq};
use crate::api::notulensi::UpsertNotulensiReq;
use crate::api::piket::{TestReminderReq, UpdatePiketReq};
use crate::api::sessions::{AssignPicReq, CreateSessionReq};
use crate::model::attendance::{Attendance, AttendanceKind, AttendanceStatus};
use crate::model::notulensi::Notulensi;
use crate::model::piket::{DispatchStatus, ReminderLog};
use crate::model::role::Role;
use crate::model::session::{Session, SessionKind};
use crate::model::user::UserOut;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rohis Attendance API",
        version = "1.0.0",
        description = r#"
## Rohis Attendance & Duty System

Backend for a student organisation: member accounts, per-session attendance,
meeting minutes (notulensi), the weekly duty roster (jadwal piket) and its
scheduled email reminders.

### 🔐 Security
All `/api` endpoints require **JWT Bearer authentication**. The cron endpoint
uses a shared secret instead.

All timestamps are reported in WIB (UTC+7).

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::mark_core_attendance,
        crate::api::attendance::my_history,
        crate::api::attendance::history_all,
        crate::api::attendance::history_for_user,

        crate::api::sessions::list_sessions,
        crate::api::sessions::create_session,
        crate::api::sessions::delete_session,
        crate::api::sessions::lock_session,
        crate::api::sessions::session_status,
        crate::api::sessions::session_attendance,
        crate::api::sessions::assign_pic,

        crate::api::piket::view_piket,
        crate::api::piket::update_piket,
        crate::api::piket::clear_piket,
        crate::api::piket::piket_logs,
        crate::api::piket::test_piket_reminder,
        crate::api::piket::cron_piket_reminder,

        crate::api::members::list_members,
        crate::api::members::create_member,
        crate::api::members::update_member,
        crate::api::members::delete_member,
        crate::api::members::batch_delete_members,

        crate::api::notulensi::overview,
        crate::api::notulensi::get_for_session,
        crate::api::notulensi::upsert,
        crate::api::notulensi::delete
    ),
    components(
        schemas(
            Role,
            UserOut,
            Session,
            SessionKind,
            CreateSessionReq,
            AssignPicReq,
            Attendance,
            AttendanceStatus,
            AttendanceKind,
            MarkAttendanceReq,
            AttendanceSummary,
            Notulensi,
            UpsertNotulensiReq,
            ReminderLog,
            DispatchStatus,
            UpdatePiketReq,
            TestReminderReq,
            CreateMemberReq,
            UpdateMemberReq,
            BatchDeleteReq
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance marking and history APIs"),
        (name = "Sessions", description = "Session management APIs"),
        (name = "Piket", description = "Duty roster and reminder APIs"),
        (name = "Members", description = "Member account APIs"),
        (name = "Notulensi", description = "Meeting minutes APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
