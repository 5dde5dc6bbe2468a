//! # Warbler Core Types
//!
//! The foundational entities shared by every other crate: users, messages and
//! the loaded profile view, plus the pure logic that needs no database
//! (password hashing, signup, message validation).
//!
//! As a Layer 0 crate it depends on no other workspace crate.

pub mod error;
pub mod message;
pub mod password;
pub mod profile;
pub mod user;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use message::{MAX_MESSAGE_LEN, Message, NewMessage};
pub use password::{DEFAULT_COST, HASH_PREFIX, hash_password, verify_password};
pub use profile::UserProfile;
pub use user::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, NewUser, ProfileUpdate, User};
