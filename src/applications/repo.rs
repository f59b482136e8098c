use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Application lifecycle. Any known value may overwrite any other; recruiters
/// have full discretion and no ordering is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "application_status", rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Applied,
    Reviewed,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPLIED" => Some(Self::Applied),
            "REVIEWED" => Some(Self::Reviewed),
            "REJECTED" => Some(Self::Rejected),
            "HIRED" => Some(Self::Hired),
            _ => None,
        }
    }
}

/// Application row joined with its job title, the job's recruiter and the
/// applicant's email. The joined fields are read-time denormalization only.
#[derive(Debug, Clone, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub job_recruiter_id: Uuid,
    pub applicant_id: Uuid,
    pub applicant_email: String,
    pub status: ApplicationStatus,
    pub responses: Value,
    pub extra_attachment_key: Option<String>,
    pub applied_at: OffsetDateTime,
}

const APPLICATION_COLUMNS: &str = r#"
    a.id, a.job_id, j.title AS job_title, j.recruiter_id AS job_recruiter_id,
    a.applicant_id, u.email AS applicant_email, a.status, a.responses,
    a.extra_attachment_key, a.applied_at
"#;

const APPLICATION_JOINS: &str = r#"
    FROM applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN users u ON u.id = a.applicant_id
"#;

impl Application {
    /// Applications to jobs owned by this recruiter.
    pub async fn list_for_recruiter(
        db: &PgPool,
        recruiter_id: Uuid,
        job_id: Option<Uuid>,
    ) -> anyhow::Result<Vec<Application>> {
        let sql = format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            {APPLICATION_JOINS}
            WHERE j.recruiter_id = $1 AND ($2::uuid IS NULL OR a.job_id = $2)
            ORDER BY a.applied_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, Application>(&sql)
            .bind(recruiter_id)
            .bind(job_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Applications submitted by this user.
    pub async fn list_for_applicant(
        db: &PgPool,
        applicant_id: Uuid,
        job_id: Option<Uuid>,
    ) -> anyhow::Result<Vec<Application>> {
        let sql = format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            {APPLICATION_JOINS}
            WHERE a.applicant_id = $1 AND ($2::uuid IS NULL OR a.job_id = $2)
            ORDER BY a.applied_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, Application>(&sql)
            .bind(applicant_id)
            .bind(job_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Application>> {
        let sql = format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            {APPLICATION_JOINS}
            WHERE a.id = $1
            "#
        );
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Inserts with status fixed to APPLIED, attachment key included so the
    /// row never exists half-written. The `(job_id, applicant_id)` unique
    /// constraint is the sole duplicate guard; a concurrent second insert
    /// fails here and is surfaced to the caller unchanged.
    pub async fn insert(
        db: &PgPool,
        job_id: Uuid,
        applicant_id: Uuid,
        responses: &Map<String, Value>,
        extra_attachment_key: Option<&str>,
    ) -> Result<Uuid, sqlx::Error> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO applications (job_id, applicant_id, status, responses, extra_attachment_key)
            VALUES ($1, $2, 'APPLIED', $3, $4)
            RETURNING id
            "#,
        )
        .bind(job_id)
        .bind(applicant_id)
        .bind(Json(responses))
        .bind(extra_attachment_key)
        .fetch_one(db)
        .await?;
        Ok(id)
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: ApplicationStatus,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE applications SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_the_four_known_values() {
        assert_eq!(ApplicationStatus::parse("APPLIED"), Some(ApplicationStatus::Applied));
        assert_eq!(ApplicationStatus::parse("REVIEWED"), Some(ApplicationStatus::Reviewed));
        assert_eq!(ApplicationStatus::parse("REJECTED"), Some(ApplicationStatus::Rejected));
        assert_eq!(ApplicationStatus::parse("HIRED"), Some(ApplicationStatus::Hired));
    }

    #[test]
    fn parse_rejects_unknown_and_lowercase_values() {
        assert_eq!(ApplicationStatus::parse("hired"), None);
        assert_eq!(ApplicationStatus::parse("WITHDRAWN"), None);
        assert_eq!(ApplicationStatus::parse(""), None);
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Applied).unwrap(),
            "\"APPLIED\""
        );
    }
}
