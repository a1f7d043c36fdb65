use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Arif Hossain",
        "phone": "+8801712345678",
        "image_path": "uploads/3f2a9c1d7b8e4e0f9a6b2c4d5e6f7a81.jpg",
        "created_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct Person {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Arif Hossain")]
    pub name: String,

    #[schema(example = "+8801712345678")]
    pub phone: String,

    /// Relative path under the static folder, if a photo was uploaded.
    #[schema(example = "uploads/3f2a9c1d7b8e4e0f9a6b2c4d5e6f7a81.jpg", nullable = true)]
    pub image_path: Option<String>,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
