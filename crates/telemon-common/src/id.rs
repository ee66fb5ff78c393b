use snowflake::SnowflakeIdBucket;
use std::sync::Mutex;

static ID_GENERATOR: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

/// Generate a Snowflake ID in string form, for rule bindings and alert
/// decisions. The bucket is created lazily on first use.
pub fn next_id() -> String {
    let mut gen = ID_GENERATOR.lock().unwrap();
    let bucket = gen.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn next_id_returns_unique_numeric_ids() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = next_id();
            assert!(id.parse::<i64>().is_ok(), "ID should be a valid i64: {id}");
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }
}
