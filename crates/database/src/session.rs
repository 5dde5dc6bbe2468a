//! A unit of work over the Warbler tables.
//!
//! Nothing staged on a [`Session`] reaches the database until [`Session::commit`],
//! which writes every staged operation in one transaction. Constraint
//! violations (duplicate username, missing email, following a deleted user,
//! ...) therefore only surface at commit time, as [`DbError::Integrity`].

use core_types::{Message, NewMessage, NewUser, User};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::repository::{MESSAGE_COLUMNS, USER_COLUMNS};

/// One staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    AddUser(NewUser),
    DeleteUser(i32),
    Follow { follower_id: i32, followed_id: i32 },
    Unfollow { follower_id: i32, followed_id: i32 },
    AddMessage(NewMessage),
    DeleteMessage(i32),
    Like { user_id: i32, message_id: i32 },
    Unlike { user_id: i32, message_id: i32 },
}

/// Rows created by a successful commit, in staging order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Committed {
    pub users: Vec<User>,
    pub messages: Vec<Message>,
}

#[derive(Debug)]
pub struct Session {
    pool: PgPool,
    pending: Vec<PendingOp>,
}

impl Session {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, pending: Vec::new() }
    }

    /// Stages a new user. Its id (and any constraint failure) is only known
    /// after [`Session::commit`].
    pub fn add_user(&mut self, user: NewUser) -> &mut Self {
        debug!(username = ?user.username, "Staging new user.");
        self.pending.push(PendingOp::AddUser(user));
        self
    }

    pub fn delete_user(&mut self, user: &User) -> &mut Self {
        self.pending.push(PendingOp::DeleteUser(user.id));
        self
    }

    /// Stages the edge "`follower` follows `followed`". Re-following is a no-op.
    pub fn follow(&mut self, follower: &User, followed: &User) -> &mut Self {
        debug!(follower = follower.id, followed = followed.id, "Staging follow.");
        self.pending.push(PendingOp::Follow { follower_id: follower.id, followed_id: followed.id });
        self
    }

    /// Stages removal of the edge. Removing a missing edge is a no-op.
    pub fn unfollow(&mut self, follower: &User, followed: &User) -> &mut Self {
        debug!(follower = follower.id, followed = followed.id, "Staging unfollow.");
        self.pending.push(PendingOp::Unfollow { follower_id: follower.id, followed_id: followed.id });
        self
    }

    pub fn add_message(&mut self, message: NewMessage) -> &mut Self {
        self.pending.push(PendingOp::AddMessage(message));
        self
    }

    pub fn delete_message(&mut self, message: &Message) -> &mut Self {
        self.pending.push(PendingOp::DeleteMessage(message.id));
        self
    }

    pub fn like(&mut self, user: &User, message: &Message) -> &mut Self {
        self.pending.push(PendingOp::Like { user_id: user.id, message_id: message.id });
        self
    }

    pub fn unlike(&mut self, user: &User, message: &Message) -> &mut Self {
        self.pending.push(PendingOp::Unlike { user_id: user.id, message_id: message.id });
        self
    }

    /// Operations staged since the last commit or rollback.
    pub fn pending(&self) -> &[PendingOp] {
        &self.pending
    }

    /// Discards every staged operation.
    pub fn rollback(&mut self) {
        if !self.pending.is_empty() {
            debug!(discarded = self.pending.len(), "Session rolled back.");
        }
        self.pending.clear();
    }

    /// Writes all staged operations in a single transaction.
    ///
    /// Staged operations are consumed either way: on error the transaction is
    /// rolled back and nothing from this batch is persisted.
    pub async fn commit(&mut self) -> Result<Committed, DbError> {
        let ops = std::mem::take(&mut self.pending);
        if ops.is_empty() {
            return Ok(Committed::default());
        }
        let count = ops.len();

        let mut tx: Transaction<Postgres> = self.pool.begin().await?;
        let mut committed = Committed::default();
        for op in ops {
            if let Err(e) = apply(&mut tx, op, &mut committed).await {
                warn!(error = %e, "Session commit failed; transaction rolled back.");
                return Err(e);
            }
        }
        tx.commit().await?;

        info!(
            operations = count,
            users = committed.users.len(),
            messages = committed.messages.len(),
            "Session committed."
        );
        Ok(committed)
    }
}

async fn apply(
    tx: &mut Transaction<'_, Postgres>,
    op: PendingOp,
    committed: &mut Committed,
) -> Result<(), DbError> {
    match op {
        PendingOp::AddUser(user) => {
            let query = format!(
                r#"
                INSERT INTO users (id, email, username, image_url, header_image_url, bio, location, password)
                VALUES (COALESCE($1::int4, nextval(pg_get_serial_sequence('users', 'id'))::int4),
                        $2, $3, $4, $5, $6, $7, $8)
                RETURNING {USER_COLUMNS}
                "#
            );
            let row = sqlx::query_as::<_, User>(&query)
                .bind(user.id)
                .bind(&user.email)
                .bind(&user.username)
                .bind(&user.image_url)
                .bind(&user.header_image_url)
                .bind(&user.bio)
                .bind(&user.location)
                .bind(&user.password)
                .fetch_one(&mut **tx)
                .await?;
            committed.users.push(row);
        }
        PendingOp::DeleteUser(user_id) => {
            let result = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&mut **tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::NotFound);
            }
        }
        PendingOp::Follow { follower_id, followed_id } => {
            sqlx::query(
                "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(follower_id)
            .bind(followed_id)
            .execute(&mut **tx)
            .await?;
        }
        PendingOp::Unfollow { follower_id, followed_id } => {
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
                .bind(follower_id)
                .bind(followed_id)
                .execute(&mut **tx)
                .await?;
        }
        PendingOp::AddMessage(message) => {
            let query = format!(
                "INSERT INTO messages (text, user_id) VALUES ($1, $2) RETURNING {MESSAGE_COLUMNS}"
            );
            let row = sqlx::query_as::<_, Message>(&query)
                .bind(&message.text)
                .bind(message.user_id)
                .fetch_one(&mut **tx)
                .await?;
            committed.messages.push(row);
        }
        PendingOp::DeleteMessage(message_id) => {
            let result = sqlx::query("DELETE FROM messages WHERE id = $1")
                .bind(message_id)
                .execute(&mut **tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::NotFound);
            }
        }
        PendingOp::Like { user_id, message_id } => {
            sqlx::query(
                "INSERT INTO likes (user_id, message_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(message_id)
            .execute(&mut **tx)
            .await?;
        }
        PendingOp::Unlike { user_id, message_id } => {
            sqlx::query("DELETE FROM likes WHERE user_id = $1 AND message_id = $2")
                .bind(user_id)
                .bind(message_id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}
