//! User model for FileVault.

/// A registered account.
///
/// Users are immutable once created and never deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// User ID.
    pub id: i64,
    /// Unique email address.
    pub email: String,
    /// Argon2 password hash.
    pub password: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Data for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    /// Already hashed password.
    pub password: String,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password_hash.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user() {
        let user = NewUser::new("a@b.com", "$argon2id$hash");
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.password, "$argon2id$hash");
    }
}
