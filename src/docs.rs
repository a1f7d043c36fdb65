use crate::api::admin::{PersonDetail, PersonSummary};
use crate::api::attendance::{MarkAction, MarkRequest, RosterResponse, RosterRow};
use crate::api::person::CreatePerson;
use crate::backfill::{BackfillForm, BackfillOutcome};
use crate::model::attendance::AttendanceRecord;
use crate::model::person::Person;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Attendance Tracking System

This API powers an attendance tracker for an enrolled roster of people.

### 🔹 Key Features
- **Roster Management**
  - Create, update, list, and remove people (with photo)
- **Daily Attendance**
  - Check-in / check-out marking, idempotent per side
- **Admin Reporting**
  - Dashboard totals and per-person history
- **Synthetic Backfill**
  - Generate plausible historical attendance for demos and testing

### 📦 Response Format
- JSON-based RESTful responses

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::person::create_person,
        crate::api::person::list_people,
        crate::api::person::get_person,
        crate::api::person::update_person,
        crate::api::person::delete_person,

        crate::api::attendance::today_roster,
        crate::api::attendance::mark,

        crate::api::admin::dashboard,
        crate::api::admin::person_detail,
        crate::api::admin::backfill_attendance
    ),
    components(
        schemas(
            Person,
            AttendanceRecord,
            CreatePerson,
            MarkAction,
            MarkRequest,
            RosterRow,
            RosterResponse,
            PersonSummary,
            PersonDetail,
            BackfillForm,
            BackfillOutcome
        )
    ),
    tags(
        (name = "People", description = "Roster management APIs"),
        (name = "Attendance", description = "Daily attendance marking APIs"),
        (name = "Admin", description = "Reporting and backfill APIs"),
    )
)]
pub struct ApiDoc;
