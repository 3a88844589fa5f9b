use uuid::Uuid;

pub type Id = String;

/// Row cap applied to every relational list query.
pub const MAX_LIST_ROWS: i64 = 200;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
