//! # Record Managers
//!
//! Thin CRUD layers over one collection each: generated identity profiles and
//! user-curated academic resources. Both mint IDs with [`generate_id`] and
//! share the same surface: `save`, `save_many`, `get`, `get_all`, `delete`,
//! `clear_all`, plus their own filters.

pub mod academic;
pub mod identity;

use uuid::Uuid;

const ID_SUFFIX_LEN: usize = 9;

/// `prefix-<epoch-ms>-<random suffix>`.
pub fn generate_id(prefix: &str, now_ms: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, now_ms, &random[..ID_SUFFIX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_has_prefix_time_and_suffix() {
        let id = generate_id("identity", 1_700_000_000_000);
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "identity");
        assert_eq!(parts[1], "1700000000000");
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn ids_minted_in_the_same_millisecond_differ() {
        assert_ne!(generate_id("resource", 1), generate_id("resource", 1));
    }
}
