use chrono::NaiveDateTime;
use domain::{AuthorProfile, Comment, CommentId, PostId, UserId};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub author_id: String,
    pub text: String,
    pub created_at: NaiveDateTime,
}

impl From<SqlComment> for Comment {
    fn from(sql: SqlComment) -> Self {
        Comment {
            id: CommentId::new(sql.id),
            post_id: PostId::new_unchecked(sql.post_id),
            parent_comment_id: sql.parent_comment_id.map(CommentId::new),
            author_id: UserId::new(sql.author_id),
            text: sql.text,
            created_at: sql.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct SqlProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

impl From<SqlProfile> for AuthorProfile {
    fn from(sql: SqlProfile) -> Self {
        // 资料存在但没有名字时，沿用占位名
        let display_name = sql
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| AuthorProfile::placeholder().display_name);
        AuthorProfile {
            display_name,
            avatar_ref: sql.avatar_ref,
        }
    }
}
