//! SQLite database operations
//!
//! All database access goes through this module.
//! Feed queries resolve author/sender fields with explicit joins so the
//! poll loop's per-iteration cost stays bounded.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryAnimeRow {
    category_id: String,
    title: String,
    description: String,
    image_detail: Option<String>,
    image_card: Option<String>,
    release_date: NaiveDate,
    total_episodes: i64,
    like_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationListRow {
    id: String,
    user_id: String,
    created_at: DateTime<Utc>,
    username: String,
}

#[derive(Debug, sqlx::FromRow)]
struct SuggestionListRow {
    id: String,
    user_id: Option<String>,
    subject: String,
    message: String,
    created_at: DateTime<Utc>,
    username: Option<String>,
}

impl Database {
    /// Connect to the SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    ///
    /// A duplicate username maps to a validation error rather than a bare
    /// database error.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, icon, is_superuser, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.icon)
        .bind(user.is_superuser)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Validation("username already taken".to_string())
            }
            _ => AppError::Database(err),
        })?;

        Ok(())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update a user's profile icon reference
    ///
    /// # Returns
    /// `true` if the user existed
    pub async fn update_user_icon(
        &self,
        user_id: &str,
        icon: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET icon = ? WHERE id = ?")
            .bind(icon)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn insert_category(&self, category: &Category) -> Result<(), AppError> {
        sqlx::query("INSERT INTO categories (id, name) VALUES (?, ?)")
            .bind(&category.id)
            .bind(&category.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn insert_anime(&self, anime: &Anime) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO animes (
                title, description, image_detail, image_card,
                release_date, total_episodes, like_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&anime.title)
        .bind(&anime.description)
        .bind(&anime.image_detail)
        .bind(&anime.image_card)
        .bind(anime.release_date)
        .bind(anime.total_episodes)
        .bind(anime.like_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn link_anime_category(
        &self,
        anime_title: &str,
        category_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO anime_categories (anime_title, category_id) VALUES (?, ?)")
            .bind(anime_title)
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn insert_episode(&self, episode: &Episode) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO episodes (
                id, anime_title, episode_number, title,
                release_date, video_url, image_url
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&episode.id)
        .bind(&episode.anime_title)
        .bind(episode.episode_number)
        .bind(&episode.title)
        .bind(episode.release_date)
        .bind(&episode.video_url)
        .bind(&episode.image_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_anime(&self, title: &str) -> Result<Option<Anime>, AppError> {
        let anime = sqlx::query_as::<_, Anime>("SELECT * FROM animes WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;

        Ok(anime)
    }

    pub async fn list_animes(&self) -> Result<Vec<Anime>, AppError> {
        let animes = sqlx::query_as::<_, Anime>("SELECT * FROM animes ORDER BY title")
            .fetch_all(&self.pool)
            .await?;

        Ok(animes)
    }

    /// Case-insensitive substring search over anime titles
    pub async fn search_animes(&self, query: &str) -> Result<Vec<Anime>, AppError> {
        let animes = sqlx::query_as::<_, Anime>(
            r#"
            SELECT * FROM animes
            WHERE title LIKE '%' || ? || '%' COLLATE NOCASE
            ORDER BY title
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await?;

        Ok(animes)
    }

    /// Categories that contain at least one anime, each with its animes
    ///
    /// Grouping is done from one join query, not per-category fetches.
    pub async fn list_categories_with_animes(
        &self,
    ) -> Result<Vec<(Category, Vec<Anime>)>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name FROM categories c
            WHERE EXISTS (SELECT 1 FROM anime_categories ac WHERE ac.category_id = c.id)
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, CategoryAnimeRow>(
            r#"
            SELECT ac.category_id, a.title, a.description, a.image_detail, a.image_card,
                   a.release_date, a.total_episodes, a.like_count
            FROM anime_categories ac
            JOIN animes a ON a.title = ac.anime_title
            ORDER BY a.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_category: HashMap<String, Vec<Anime>> = HashMap::new();
        for row in rows {
            by_category.entry(row.category_id).or_default().push(Anime {
                title: row.title,
                description: row.description,
                image_detail: row.image_detail,
                image_card: row.image_card,
                release_date: row.release_date,
                total_episodes: row.total_episodes,
                like_count: row.like_count,
            });
        }

        Ok(categories
            .into_iter()
            .map(|category| {
                let animes = by_category.remove(&category.id).unwrap_or_default();
                (category, animes)
            })
            .collect())
    }

    pub async fn list_episodes(&self, anime_title: &str) -> Result<Vec<Episode>, AppError> {
        let episodes = sqlx::query_as::<_, Episode>(
            "SELECT * FROM episodes WHERE anime_title = ? ORDER BY episode_number",
        )
        .bind(anime_title)
        .fetch_all(&self.pool)
        .await?;

        Ok(episodes)
    }

    pub async fn get_episode(
        &self,
        anime_title: &str,
        episode_number: i64,
    ) -> Result<Option<Episode>, AppError> {
        let episode = sqlx::query_as::<_, Episode>(
            "SELECT * FROM episodes WHERE anime_title = ? AND episode_number = ?",
        )
        .bind(anime_title)
        .bind(episode_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(episode)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, episode_id, anime_title, user_id, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.episode_id)
        .bind(&comment.anime_title)
        .bind(&comment.user_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Comments for an episode newer than `since`, ascending by creation time
    ///
    /// With no cursor, returns the full thread. This is the persistence
    /// query the comment feed's poll loop re-executes each iteration.
    pub async fn new_comments(
        &self,
        episode_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CommentFeedRow>, AppError> {
        let rows = match since {
            Some(since) => {
                sqlx::query_as::<_, CommentFeedRow>(
                    r#"
                    SELECT c.id, c.content, c.created_at, u.username
                    FROM comments c
                    JOIN users u ON u.id = c.user_id
                    WHERE c.episode_id = ? AND c.created_at > ?
                    ORDER BY c.created_at ASC
                    "#,
                )
                .bind(episode_id)
                .bind(since)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CommentFeedRow>(
                    r#"
                    SELECT c.id, c.content, c.created_at, u.username
                    FROM comments c
                    JOIN users u ON u.id = c.user_id
                    WHERE c.episode_id = ?
                    ORDER BY c.created_at ASC
                    "#,
                )
                .bind(episode_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    // =========================================================================
    // Help chat
    // =========================================================================

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    /// Get or create the conversation owned by `user_id`
    ///
    /// The insert is atomic under the `UNIQUE(user_id)` constraint, so two
    /// concurrent first visits by the same owner resolve to one row.
    ///
    /// # Returns
    /// The conversation and whether this call created it.
    pub async fn get_or_create_conversation(
        &self,
        user_id: &str,
    ) -> Result<(Conversation, bool), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(EntityId::new().0)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;

        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((conversation, created))
    }

    /// All conversations with their owner's username, for the staff overview
    pub async fn list_conversations(&self) -> Result<Vec<(Conversation, String)>, AppError> {
        let rows = sqlx::query_as::<_, ConversationListRow>(
            r#"
            SELECT c.id, c.user_id, c.created_at, u.username
            FROM conversations c
            JOIN users u ON u.id = c.user_id
            ORDER BY c.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    Conversation {
                        id: row.id,
                        user_id: row.user_id,
                        created_at: row.created_at,
                    },
                    row.username,
                )
            })
            .collect())
    }

    pub async fn insert_message(&self, message: &HelpMessage) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO help_messages (
                id, conversation_id, sender_id, recipient_id, message, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.recipient_id)
        .bind(&message.message)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent message in a conversation
    pub async fn last_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<HelpMessage>, AppError> {
        let message = sqlx::query_as::<_, HelpMessage>(
            r#"
            SELECT * FROM help_messages
            WHERE conversation_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    /// Messages in a conversation newer than `since`, ascending, with the
    /// sender joined in
    ///
    /// The chat feed's poll loop re-executes this each iteration.
    pub async fn new_messages(
        &self,
        conversation_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageFeedRow>, AppError> {
        let rows = match since {
            Some(since) => {
                sqlx::query_as::<_, MessageFeedRow>(
                    r#"
                    SELECT m.id, m.message, m.created_at,
                           u.id AS sender_id, u.username AS sender_username, u.icon AS sender_icon
                    FROM help_messages m
                    JOIN users u ON u.id = m.sender_id
                    WHERE m.conversation_id = ? AND m.created_at > ?
                    ORDER BY m.created_at ASC
                    "#,
                )
                .bind(conversation_id)
                .bind(since)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, MessageFeedRow>(
                    r#"
                    SELECT m.id, m.message, m.created_at,
                           u.id AS sender_id, u.username AS sender_username, u.icon AS sender_icon
                    FROM help_messages m
                    JOIN users u ON u.id = m.sender_id
                    WHERE m.conversation_id = ?
                    ORDER BY m.created_at ASC
                    "#,
                )
                .bind(conversation_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    // =========================================================================
    // Suggestions
    // =========================================================================

    pub async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO suggestions (id, user_id, subject, message, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&suggestion.id)
        .bind(&suggestion.user_id)
        .bind(&suggestion.subject)
        .bind(&suggestion.message)
        .bind(suggestion.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Suggestions newest-first with the author's username when still known
    pub async fn list_suggestions(&self) -> Result<Vec<(Suggestion, Option<String>)>, AppError> {
        let rows = sqlx::query_as::<_, SuggestionListRow>(
            r#"
            SELECT s.id, s.user_id, s.subject, s.message, s.created_at, u.username
            FROM suggestions s
            LEFT JOIN users u ON u.id = s.user_id
            ORDER BY s.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    Suggestion {
                        id: row.id,
                        user_id: row.user_id,
                        subject: row.subject,
                        message: row.message,
                        created_at: row.created_at,
                    },
                    row.username,
                )
            })
            .collect())
    }
}
