use serde::Serialize;

use crate::message::Message;
use crate::user::User;

/// A user together with its loaded relationship collections.
///
/// Membership checks run over these in-memory vectors, so they reflect the
/// database as of the moment the profile was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user: User,
    /// Users this user follows.
    pub following: Vec<User>,
    /// Users following this user.
    pub followers: Vec<User>,
    /// Newest first.
    pub messages: Vec<Message>,
    pub liked_message_ids: Vec<i32>,
}

impl UserProfile {
    /// Does this user follow `other`?
    pub fn is_following(&self, other: &User) -> bool {
        self.following.iter().any(|u| u.id == other.id)
    }

    /// Is this user followed by `other`?
    pub fn is_followed_by(&self, other: &User) -> bool {
        self.followers.iter().any(|u| u.id == other.id)
    }

    pub fn has_liked(&self, message: &Message) -> bool {
        self.liked_message_ids.contains(&message.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
    use chrono::Utc;

    fn user(id: i32, name: &str) -> User {
        User {
            id,
            email: format!("{name}@email.com"),
            username: name.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_string(),
            bio: None,
            location: None,
            password: String::new(),
        }
    }

    fn profile(user: User) -> UserProfile {
        UserProfile {
            user,
            following: Vec::new(),
            followers: Vec::new(),
            messages: Vec::new(),
            liked_message_ids: Vec::new(),
        }
    }

    #[test]
    fn following_is_directional() {
        let u1 = user(1, "testuser1");
        let u2 = user(2, "testuser2");

        let mut p1 = profile(u1.clone());
        p1.following.push(u2.clone());
        let mut p2 = profile(u2.clone());
        p2.followers.push(u1.clone());

        assert!(p1.is_following(&u2));
        assert!(!p2.is_following(&u1));
        assert!(p2.is_followed_by(&u1));
        assert!(!p1.is_followed_by(&u2));
    }

    #[test]
    fn membership_compares_ids() {
        let u2 = user(2, "testuser2");
        let mut p1 = profile(user(1, "testuser1"));
        p1.following.push(u2.clone());

        let mut renamed = u2;
        renamed.username = "renamed".into();
        assert!(p1.is_following(&renamed));
    }

    #[test]
    fn has_liked_checks_message_ids() {
        let mut p = profile(user(1, "testuser1"));
        p.liked_message_ids.push(10);
        let liked = Message { id: 10, text: "hi".into(), timestamp: Utc::now(), user_id: 2 };
        let other = Message { id: 11, ..liked.clone() };
        assert!(p.has_liked(&liked));
        assert!(!p.has_liked(&other));
    }
}
