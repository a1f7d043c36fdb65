use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub person_id: u64,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// A record with only this side filled is an "open" session.
    #[schema(example = "09:15:00", value_type = String, nullable = true)]
    pub in_time: Option<NaiveTime>,
    #[schema(example = "10:15:00", value_type = String, nullable = true)]
    pub out_time: Option<NaiveTime>,
}
