use crate::{models::SqlComment, Db};
use chrono::{NaiveDateTime, Utc};
use domain::{validate_text, Comment, CommentId, NewComment, PostId, ValidationError};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

impl Db {
    /// Newest first. The total is only counted for the first page.
    pub async fn list_top_level(
        &self,
        post_id: &PostId,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Comment>, Option<i64>)> {
        let rows = sqlx::query_as::<_, SqlComment>(
            r#"
            SELECT id, post_id, parent_comment_id, author_id, text, created_at
            FROM comments
            WHERE post_id = ? AND parent_comment_id IS NULL
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(post_id.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = if offset == 0 {
            let count: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM comments
                WHERE post_id = ? AND parent_comment_id IS NULL
                "#,
            )
            .bind(post_id.as_str())
            .fetch_one(&self.pool)
            .await?;
            Some(count)
        } else {
            None
        };

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// One grouped query for the whole page; ids without replies map to 0.
    pub async fn count_replies(
        &self,
        post_id: &PostId,
        comment_ids: &[CommentId],
    ) -> anyhow::Result<HashMap<CommentId, i64>> {
        let mut counts: HashMap<CommentId, i64> =
            comment_ids.iter().map(|id| (id.clone(), 0)).collect();
        if comment_ids.is_empty() {
            return Ok(counts);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT parent_comment_id, COUNT(*) FROM comments WHERE post_id = ",
        );
        qb.push_bind(post_id.as_str().to_owned());
        qb.push(" AND parent_comment_id IN (");
        let mut sep = qb.separated(", ");
        for id in comment_ids {
            sep.push_bind(id.as_str().to_owned());
        }
        sep.push_unseparated(") GROUP BY parent_comment_id");

        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for (parent, n) in rows {
            counts.insert(CommentId::new(parent), n);
        }
        Ok(counts)
    }

    /// Oldest first.
    pub async fn list_replies(
        &self,
        comment_id: &CommentId,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(
            r#"
            SELECT id, post_id, parent_comment_id, author_id, text, created_at
            FROM comments
            WHERE parent_comment_id = ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(comment_id.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn insert_comment(&self, new: &NewComment) -> anyhow::Result<Comment> {
        self.insert_comment_at(new, Utc::now().naive_utc()).await
    }

    pub async fn insert_comment_at(
        &self,
        new: &NewComment,
        created_at: NaiveDateTime,
    ) -> anyhow::Result<Comment> {
        let text = validate_text(&new.text)?;
        let mut tx = self.pool.begin().await?;

        // 只允许一层嵌套
        if let Some(parent_id) = &new.parent_comment_id {
            let parent: Option<(String, Option<String>)> = sqlx::query_as(
                "SELECT post_id, parent_comment_id FROM comments WHERE id = ?",
            )
            .bind(parent_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            match parent {
                None => return Err(ValidationError::ParentNotFound(parent_id.to_string()).into()),
                Some((post, _)) if post != new.post_id.as_str() => {
                    return Err(ValidationError::ParentOnOtherPost(parent_id.to_string()).into())
                }
                Some((_, Some(_))) => {
                    return Err(ValidationError::NestedReply(parent_id.to_string()).into())
                }
                Some(_) => {}
            }
        }

        let id = format!("{:x}", rand::random::<u128>());
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, parent_comment_id, author_id, text, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new.post_id.as_str())
        .bind(new.parent_comment_id.as_ref().map(CommentId::as_str))
        .bind(new.author_id.as_str())
        .bind(&text)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Comment {
            id: CommentId::new(id),
            post_id: new.post_id.clone(),
            parent_comment_id: new.parent_comment_id.clone(),
            author_id: new.author_id.clone(),
            text,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::UserId;

    fn post() -> PostId {
        PostId::new("putna-2024").unwrap()
    }

    fn new_comment(text: &str, parent: Option<&CommentId>) -> NewComment {
        NewComment {
            post_id: post(),
            author_id: UserId::new("u1"),
            text: text.to_string(),
            parent_comment_id: parent.cloned(),
        }
    }

    async fn seed_top_level(db: &Db, n: usize) -> Vec<Comment> {
        let base = Utc::now().naive_utc() - Duration::hours(1);
        let mut out = Vec::new();
        for i in 0..n {
            let c = db
                .insert_comment_at(
                    &new_comment(&format!("comment {i}"), None),
                    base + Duration::seconds(i as i64),
                )
                .await
                .unwrap();
            out.push(c);
        }
        out
    }

    #[tokio::test]
    async fn pages_newest_first_with_total_on_first_page() {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let seeded = seed_top_level(&db, 12).await;

        let (first, total) = db.list_top_level(&post(), 10, 0).await.unwrap();
        assert_eq!(total, Some(12));
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].id, seeded[11].id);

        let (second, total) = db.list_top_level(&post(), 10, 10).await.unwrap();
        assert_eq!(total, None);
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].id, seeded[0].id);
    }

    #[tokio::test]
    async fn replies_are_oldest_first_and_excluded_from_top_level() {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let parent = seed_top_level(&db, 1).await.remove(0);
        let base = Utc::now().naive_utc();
        for i in 0..3 {
            db.insert_comment_at(
                &new_comment(&format!("reply {i}"), Some(&parent.id)),
                base + Duration::seconds(i),
            )
            .await
            .unwrap();
        }

        let replies = db.list_replies(&parent.id, 5, 0).await.unwrap();
        let texts: Vec<_> = replies.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["reply 0", "reply 1", "reply 2"]);

        let (top, total) = db.list_top_level(&post(), 10, 0).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(total, Some(1));
    }

    #[tokio::test]
    async fn reply_counts_cover_every_requested_id() {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let top = seed_top_level(&db, 2).await;
        db.insert_comment(&new_comment("a", Some(&top[0].id)))
            .await
            .unwrap();
        db.insert_comment(&new_comment("b", Some(&top[0].id)))
            .await
            .unwrap();

        let ids = vec![top[0].id.clone(), top[1].id.clone()];
        let counts = db.count_replies(&post(), &ids).await.unwrap();
        assert_eq!(counts[&top[0].id], 2);
        assert_eq!(counts[&top[1].id], 0);

        assert!(db.count_replies(&post(), &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_rejects_bad_text_and_deep_nesting() {
        let db = Db::new("sqlite::memory:").await.unwrap();

        let err = db.insert_comment(&new_comment("   ", None)).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyText)
        );

        let parent = db.insert_comment(&new_comment("top", None)).await.unwrap();
        let reply = db
            .insert_comment(&new_comment("reply", Some(&parent.id)))
            .await
            .unwrap();
        assert_eq!(reply.parent_comment_id.as_ref(), Some(&parent.id));

        let err = db
            .insert_comment(&new_comment("too deep", Some(&reply.id)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::NestedReply(_))
        ));

        let err = db
            .insert_comment(&new_comment("orphan", Some(&CommentId::new("missing"))))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::ParentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn insert_rejects_parent_on_other_post() {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let parent = db.insert_comment(&new_comment("top", None)).await.unwrap();

        let mut cross = new_comment("elsewhere", Some(&parent.id));
        cross.post_id = PostId::new("sihastria").unwrap();
        let err = db.insert_comment(&cross).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::ParentOnOtherPost(_))
        ));
    }

    #[tokio::test]
    async fn stored_text_is_trimmed() {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let c = db
            .insert_comment(&new_comment("  Hristos a înviat!  ", None))
            .await
            .unwrap();
        assert_eq!(c.text, "Hristos a înviat!");

        let (rows, _) = db.list_top_level(&post(), 10, 0).await.unwrap();
        assert_eq!(rows[0].id, c.id);
        assert_eq!(rows[0].text, c.text);
        assert!(rows[0].parent_comment_id.is_none());
    }
}
