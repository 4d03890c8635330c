use uuid::Uuid;

/// Generate a fresh correlation token for one login attempt.
pub fn generate_token() -> Uuid {
    Uuid::new_v4()
}
