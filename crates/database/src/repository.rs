use crate::DbError;
use crate::session::Session;
use core_types::{Message, ProfileUpdate, User, UserProfile, verify_password};
use sqlx::postgres::PgPool;
use tracing::warn;

/// Column list matching the field order of [`User`].
pub(crate) const USER_COLUMNS: &str =
    "id, email, username, image_url, header_image_url, bio, location, password";

/// Column list matching the field order of [`Message`].
pub(crate) const MESSAGE_COLUMNS: &str = r#"id, text, "timestamp", user_id"#;

/// How many messages the home timeline shows by default.
pub const DEFAULT_TIMELINE_LIMIT: i64 = 100;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
/// Writes go through a [`Session`] obtained from [`DbRepository::session`].
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens an empty unit of work on this repository's pool.
    pub fn session(&self) -> Session {
        Session::new(self.pool.clone())
    }

    /// Fetches a user by primary key.
    pub async fn find_user(&self, user_id: i32) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Like [`DbRepository::find_user`], but a missing user is an error.
    pub async fn get_user(&self, user_id: i32) -> Result<User, DbError> {
        self.find_user(user_id).await?.ok_or(DbError::NotFound)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Looks the user up by username and checks the password against the
    /// stored bcrypt hash.
    ///
    /// An unknown username or a wrong password gives `Ok(None)`; only database
    /// failures are errors.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, DbError> {
        let Some(user) = self.find_user_by_username(username).await? else {
            warn!(username, "Authentication failed: unknown username.");
            return Ok(None);
        };

        if verify_password(password, &user.password) {
            Ok(Some(user))
        } else {
            warn!(username, "Authentication failed: wrong password.");
            Ok(None)
        }
    }

    /// All users, or those whose username contains `term` (case-insensitive),
    /// ordered by username.
    pub async fn search_users(&self, term: Option<&str>) -> Result<Vec<User>, DbError> {
        let users = match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => {
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE username ILIKE '%' || $1 || '%' ORDER BY username"
                ))
                .bind(escape_like(term))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(users)
    }

    /// Users that `user_id` follows.
    pub async fn following(&self, user_id: i32) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.username, u.image_url, u.header_image_url, u.bio, u.location, u.password
            FROM users AS u
            JOIN follows AS f ON f.followed_id = u.id
            WHERE f.follower_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Users following `user_id`.
    pub async fn followers(&self, user_id: i32) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.username, u.image_url, u.header_image_url, u.bio, u.location, u.password
            FROM users AS u
            JOIN follows AS f ON f.follower_id = u.id
            WHERE f.followed_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Does `follower_id` follow `followed_id`?
    pub async fn is_following(&self, follower_id: i32, followed_id: i32) -> Result<bool, DbError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Is `user_id` followed by `other_id`?
    pub async fn is_followed_by(&self, user_id: i32, other_id: i32) -> Result<bool, DbError> {
        self.is_following(other_id, user_id).await
    }

    /// Messages written by `user_id`, newest first.
    pub async fn messages_for_user(&self, user_id: i32, limit: i64) -> Result<Vec<Message>, DbError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, text, "timestamp", user_id
            FROM messages
            WHERE user_id = $1
            ORDER BY "timestamp" DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn find_message(&self, message_id: i32) -> Result<Option<Message>, DbError> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    /// The home timeline: messages by `user_id` and by everyone it follows,
    /// newest first.
    pub async fn timeline(&self, user_id: i32, limit: i64) -> Result<Vec<Message>, DbError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.id, m.text, m."timestamp", m.user_id
            FROM messages AS m
            WHERE m.user_id = $1
               OR m.user_id IN (SELECT followed_id FROM follows WHERE follower_id = $1)
            ORDER BY m."timestamp" DESC, m.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn liked_message_ids(&self, user_id: i32) -> Result<Vec<i32>, DbError> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT message_id FROM likes WHERE user_id = $1 ORDER BY message_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Loads a user with all of its relationship collections.
    pub async fn load_profile(&self, user_id: i32) -> Result<UserProfile, DbError> {
        let user = self.get_user(user_id).await?;
        let (following, followers, messages, liked_message_ids) = tokio::try_join!(
            self.following(user_id),
            self.followers(user_id),
            self.messages_for_user(user_id, DEFAULT_TIMELINE_LIMIT),
            self.liked_message_ids(user_id),
        )?;

        Ok(UserProfile { user, following, followers, messages, liked_message_ids })
    }

    /// Applies the non-`None` fields of `update` and returns the updated row.
    pub async fn update_profile(&self, user_id: i32, update: &ProfileUpdate) -> Result<User, DbError> {
        if update.is_empty() {
            return self.get_user(user_id).await;
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                image_url = COALESCE($4, image_url),
                header_image_url = COALESCE($5, header_image_url),
                bio = COALESCE($6, bio),
                location = COALESCE($7, location)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.image_url)
        .bind(&update.header_image_url)
        .bind(&update.bio)
        .bind(&update.location)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(DbError::NotFound)
    }
}

/// Escapes LIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
