use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// One-per-seeker profile row. The four list fields are unstructured JSON;
/// clients own their shape.
#[derive(Debug, Clone, FromRow)]
pub struct SeekerProfile {
    pub user_id: Uuid,
    pub profile_picture_key: Option<String>,
    pub resume_key: Option<String>,
    pub skills: Value,
    pub experience: Value,
    pub education: Value,
    pub certifications: Value,
}

const PROFILE_COLUMNS: &str =
    "user_id, profile_picture_key, resume_key, skills, experience, education, certifications";

#[derive(Debug, Default)]
pub struct ProfilePatch {
    pub skills: Option<Value>,
    pub experience: Option<Value>,
    pub education: Option<Value>,
    pub certifications: Option<Value>,
}

impl SeekerProfile {
    pub async fn find(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<SeekerProfile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM seeker_profiles WHERE user_id = $1");
        let profile = sqlx::query_as::<_, SeekerProfile>(&sql)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
        Ok(profile)
    }

    /// Lazily creates an empty profile on first access. Idempotent upsert;
    /// there is no not-found path.
    pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<SeekerProfile> {
        let sql = format!(
            r#"
            INSERT INTO seeker_profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, SeekerProfile>(&sql)
            .bind(user_id)
            .fetch_one(db)
            .await?;
        Ok(profile)
    }

    /// Merges the supplied fields into the profile; absent fields keep their
    /// current value.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        patch: ProfilePatch,
    ) -> anyhow::Result<SeekerProfile> {
        let sql = format!(
            r#"
            UPDATE seeker_profiles
            SET skills = COALESCE($2, skills),
                experience = COALESCE($3, experience),
                education = COALESCE($4, education),
                certifications = COALESCE($5, certifications)
            WHERE user_id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, SeekerProfile>(&sql)
            .bind(user_id)
            .bind(patch.skills)
            .bind(patch.experience)
            .bind(patch.education)
            .bind(patch.certifications)
            .fetch_one(db)
            .await?;
        Ok(profile)
    }

    pub async fn set_resume_key(db: &PgPool, user_id: Uuid, key: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE seeker_profiles SET resume_key = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(key)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_picture_key(db: &PgPool, user_id: Uuid, key: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE seeker_profiles SET profile_picture_key = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(key)
            .execute(db)
            .await?;
        Ok(())
    }
}
