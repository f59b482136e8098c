use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::jobs::schema::RequirementsSchema;

/// Job row plus the recruiter's email joined in at read time.
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub recruiter_email: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary_range: Option<String>,
    pub deadline: OffsetDateTime,
    pub requirements_schema: Json<RequirementsSchema>,
    pub created_at: OffsetDateTime,
}

const JOB_COLUMNS: &str = r#"
    j.id, j.recruiter_id, u.email AS recruiter_email, j.title, j.description,
    j.location, j.salary_range, j.deadline, j.requirements_schema, j.created_at
"#;

pub struct NewJob<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub salary_range: Option<&'a str>,
    pub deadline: OffsetDateTime,
    pub requirements_schema: &'a RequirementsSchema,
}

pub struct JobPatch<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub salary_range: Option<&'a str>,
    pub deadline: Option<OffsetDateTime>,
    pub requirements_schema: Option<&'a RequirementsSchema>,
}

impl Job {
    /// All jobs, newest first, optionally filtered by a case-insensitive
    /// substring over title, description, location and the requirements
    /// schema rendered as text.
    pub async fn list(db: &PgPool, search: Option<&str>) -> anyhow::Result<Vec<Job>> {
        let search = search.map(escape_like);
        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs j
            JOIN users u ON u.id = j.recruiter_id
            WHERE $1::text IS NULL
               OR j.title ILIKE '%' || $1 || '%'
               OR j.description ILIKE '%' || $1 || '%'
               OR j.location ILIKE '%' || $1 || '%'
               OR j.requirements_schema::text ILIKE '%' || $1 || '%'
            ORDER BY j.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, Job>(&sql)
            .bind(search)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Job>> {
        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs j
            JOIN users u ON u.id = j.recruiter_id
            WHERE j.id = $1
            "#
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(job)
    }

    pub async fn create(db: &PgPool, recruiter_id: Uuid, new: NewJob<'_>) -> anyhow::Result<Job> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO jobs (recruiter_id, title, description, location, salary_range,
                              deadline, requirements_schema)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(recruiter_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.location)
        .bind(new.salary_range)
        .bind(new.deadline)
        .bind(Json(new.requirements_schema))
        .fetch_one(db)
        .await?;

        let job = Job::find(db, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("job vanished after insert"))?;
        Ok(job)
    }

    pub async fn update(db: &PgPool, id: Uuid, patch: JobPatch<'_>) -> anyhow::Result<Option<Job>> {
        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                salary_range = COALESCE($5, salary_range),
                deadline = COALESCE($6, deadline),
                requirements_schema = COALESCE($7, requirements_schema)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.location)
        .bind(patch.salary_range)
        .bind(patch.deadline)
        .bind(patch.requirements_schema.map(Json))
        .execute(db)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Job::find(db, id).await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Escapes LIKE metacharacters so the query stays a literal substring match;
/// a search for "100%" must not match everything.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn escape_like_leaves_plain_terms_alone() {
        assert_eq!(escape_like("rust engineer"), "rust engineer");
        assert_eq!(escape_like(""), "");
    }

    #[test]
    fn escape_like_handles_combined_metacharacters() {
        assert_eq!(escape_like("\\%_"), "\\\\\\%\\_");
    }
}
