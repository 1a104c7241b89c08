use crate::{models::SqlProfile, Db};
use chrono::Utc;
use domain::{AuthorProfile, UserId};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

impl Db {
    // 批量解析，缺失的 ID 不出现在结果里
    pub async fn get_profiles(
        &self,
        user_ids: &[UserId],
    ) -> anyhow::Result<HashMap<UserId, AuthorProfile>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT user_id, display_name, avatar_ref FROM profiles WHERE user_id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in user_ids {
            sep.push_bind(id.as_str().to_owned());
        }
        sep.push_unseparated(")");

        let rows: Vec<SqlProfile> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| (UserId::new(row.user_id.clone()), row.into()))
            .collect())
    }

    pub async fn get_profile(&self, user_id: &UserId) -> anyhow::Result<Option<AuthorProfile>> {
        let row = sqlx::query_as::<_, SqlProfile>(
            r#"
            SELECT user_id, display_name, avatar_ref
            FROM profiles
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn upsert_profile(
        &self,
        user_id: &UserId,
        display_name: Option<&str>,
        avatar_ref: Option<&str>,
    ) -> anyhow::Result<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, display_name, avatar_ref, last_updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_ref = excluded.avatar_ref,
                last_updated_at = excluded.last_updated_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(display_name)
        .bind(avatar_ref)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
