use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::CoreError;
use crate::password::{DEFAULT_COST, hash_password};

/// Image shown for users who never uploaded one.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

/// Banner shown on profiles without a custom header image.
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// A persisted row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// The bcrypt hash. Never serialized.
    #[serde(skip_serializing, default)]
    pub password: String,
}

/// A user that exists only in memory until a session commits it.
///
/// `username` and `email` are optional here; the database rejects a
/// missing value with an integrity error when the row is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Explicit primary key. `None` lets the database assign one.
    pub id: Option<i32>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl User {
    /// Builds an unpersisted user with a bcrypt-hashed password.
    ///
    /// Fails with [`CoreError::InvalidInput`] when the password is missing or
    /// empty. Nothing touches the database here: uniqueness and presence of
    /// `username`/`email` are only checked when the user is committed.
    pub fn signup(
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<NewUser, CoreError> {
        Self::signup_with_cost(username, email, password, image_url, DEFAULT_COST)
    }

    /// Same as [`User::signup`] with an explicit bcrypt cost.
    pub fn signup_with_cost(
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
        image_url: Option<&str>,
        cost: u32,
    ) -> Result<NewUser, CoreError> {
        let password = password.ok_or_else(|| CoreError::invalid("password", "is required"))?;
        let hashed = hash_password(password, cost)?;

        let image_url = image_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_URL);

        Ok(NewUser {
            id: None,
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password: hashed,
            image_url: image_url.to_string(),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_string(),
            bio: None,
            location: None,
        })
    }
}

impl NewUser {
    /// A user with the given credentials and default images. The password is
    /// stored exactly as given, so callers pass an already-hashed value.
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            id: None,
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: password.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_string(),
            bio: None,
            location: None,
        }
    }

    /// Inserts with this primary key instead of one from `users_id_seq`.
    ///
    /// The sequence is not advanced, so a later auto-assigned id can collide
    /// with it and fail on `users_pkey`.
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }
}

/// Editable profile fields. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
