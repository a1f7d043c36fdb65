use sqlx::MySqlPool;

pub async fn init_db(database_url: &str) -> MySqlPool {
    let pool = MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database");

    init_schema(&pool).await.expect("Failed to create tables");

    pool
}

/// Bootstraps the two tables. The UNIQUE(person_id, date) key is the
/// durability backstop for the one-record-per-day invariant.
async fn init_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            name VARCHAR(255) NOT NULL,
            phone VARCHAR(32) NOT NULL,
            image_path VARCHAR(512) NULL,
            created_at TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            person_id BIGINT UNSIGNED NOT NULL,
            date DATE NOT NULL,
            in_time TIME NULL,
            out_time TIME NULL,
            UNIQUE KEY uq_person_date (person_id, date),
            CONSTRAINT fk_attendance_person FOREIGN KEY (person_id) REFERENCES people(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
