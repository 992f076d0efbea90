//! Generated identity profiles and the identity generator's settings.
//!
//! Profiles live in `identityProfiles`, indexed by state abbreviation. The
//! generator's settings are one record in `identitySettings`.

use super::generate_id;
use crate::clock::Clock;
use crate::error::Result;
use crate::model::{Collection, Envelope, BY_STATE_INDEX};
use crate::store::backend::StructuredBackend;
use crate::store::kv::KvStore;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

pub const IDENTITY_ID_PREFIX: &str = "identity";
pub const SETTINGS_RECORD_KEY: &str = "settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub state_abbreviation: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityProfile {
    /// Empty until saved; `save` mints one.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub birthday: String,
    pub ssn: String,
    pub phone: String,
    pub email: String,
    pub address: Address,
    pub created_at: i64,
}

impl IdentityProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentitySettings {
    /// Restrict generation to one state; None means any.
    pub preferred_state: Option<String>,
    pub batch_size: u32,
    pub show_ssn: bool,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            preferred_state: None,
            batch_size: 1,
            show_ssn: false,
        }
    }
}

pub struct IdentityManager<B: StructuredBackend> {
    kv: Rc<KvStore<B>>,
    clock: Rc<dyn Clock>,
}

impl<B: StructuredBackend> IdentityManager<B> {
    pub fn new(kv: Rc<KvStore<B>>, clock: Rc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Store a profile, minting its id and creation time when missing. The
    /// state abbreviation is stored uppercase so `by_state` can match it.
    pub fn save(&self, mut profile: IdentityProfile) -> Result<String> {
        let now = self.clock.now_ms();
        if profile.id.is_empty() {
            profile.id = generate_id(IDENTITY_ID_PREFIX, now);
        }
        if profile.created_at == 0 {
            profile.created_at = now;
        }
        let state = profile.address.state_abbreviation.trim().to_ascii_uppercase();
        profile.address.state_abbreviation = state;
        self.kv
            .set(&Collection::IdentityProfiles, &profile.id, &profile)?;
        debug!("Saved identity {}", profile.id);
        Ok(profile.id)
    }

    pub fn save_many(&self, profiles: Vec<IdentityProfile>) -> Result<Vec<String>> {
        profiles.into_iter().map(|p| self.save(p)).collect()
    }

    pub fn get(&self, id: &str) -> Result<Option<IdentityProfile>> {
        self.kv.get(&Collection::IdentityProfiles, id)
    }

    /// Every profile, newest first.
    pub fn get_all(&self) -> Result<Vec<IdentityProfile>> {
        let envelopes = self.kv.get_all(&Collection::IdentityProfiles)?;
        Ok(sorted_newest_first(parse_profiles(envelopes)))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.kv.delete(&Collection::IdentityProfiles, id)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.kv.clear(&Collection::IdentityProfiles)
    }

    /// Profiles whose address is in `state_abbreviation` (case-insensitive).
    pub fn by_state(&self, state_abbreviation: &str) -> Result<Vec<IdentityProfile>> {
        let wanted = state_abbreviation.trim().to_ascii_uppercase();
        let envelopes =
            self.kv
                .find_by_index(&Collection::IdentityProfiles, BY_STATE_INDEX, &wanted)?;
        Ok(sorted_newest_first(parse_profiles(envelopes)))
    }

    pub fn settings(&self) -> Result<IdentitySettings> {
        Ok(self
            .kv
            .get(&Collection::IdentitySettings, SETTINGS_RECORD_KEY)?
            .unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &IdentitySettings) -> Result<()> {
        self.kv
            .set(&Collection::IdentitySettings, SETTINGS_RECORD_KEY, settings)
    }
}

fn parse_profiles(envelopes: Vec<Envelope<Value>>) -> Vec<IdentityProfile> {
    envelopes
        .into_iter()
        .filter_map(|env| match serde_json::from_value(env.data) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Skipping unreadable identity '{}': {}", env.id, e);
                None
            }
        })
        .collect()
}

fn sorted_newest_first(mut profiles: Vec<IdentityProfile>) -> Vec<IdentityProfile> {
    profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::mem_backend::MemBackend;
    use serde_json::json;

    fn make_manager() -> (Rc<ManualClock>, IdentityManager<MemBackend>) {
        let clock = Rc::new(ManualClock::new(1_000));
        let kv = Rc::new(KvStore::new(MemBackend::new(), clock.clone()));
        (clock.clone(), IdentityManager::new(kv, clock))
    }

    fn person(first: &str, state: &str) -> IdentityProfile {
        IdentityProfile {
            first_name: first.to_string(),
            last_name: "Doe".to_string(),
            address: Address {
                state_abbreviation: state.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn save_mints_id_and_creation_time() {
        let (_clock, manager) = make_manager();
        let id = manager.save(person("Ann", "CA")).unwrap();
        assert!(id.starts_with("identity-1000-"));

        let stored = manager.get(&id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.created_at, 1_000);
        assert_eq!(stored.full_name(), "Ann Doe");
    }

    #[test]
    fn get_all_is_newest_first() {
        let (clock, manager) = make_manager();
        manager.save(person("Old", "CA")).unwrap();
        clock.advance(10);
        manager.save(person("New", "CA")).unwrap();

        let names: Vec<String> = manager
            .get_all()
            .unwrap()
            .into_iter()
            .map(|p| p.first_name)
            .collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[test]
    fn by_state_uses_index_and_ignores_case() {
        let (_clock, manager) = make_manager();
        manager
            .save_many(vec![person("A", "CA"), person("B", "NY"), person("C", "CA")])
            .unwrap();
        let in_ca = manager.by_state("ca").unwrap();
        assert_eq!(in_ca.len(), 2);
        assert!(in_ca.iter().all(|p| p.address.state_abbreviation == "CA"));
        assert!(manager.by_state("TX").unwrap().is_empty());
    }

    #[test]
    fn lowercase_state_is_found_by_either_case() {
        let (_clock, manager) = make_manager();
        let id = manager.save(person("Lo", " ca ")).unwrap();
        assert_eq!(manager.get(&id).unwrap().unwrap().address.state_abbreviation, "CA");
        assert_eq!(manager.by_state("CA").unwrap().len(), 1);
        assert_eq!(manager.by_state("ca").unwrap()[0].id, id);
    }

    #[test]
    fn delete_and_clear_all() {
        let (_clock, manager) = make_manager();
        let ids = manager
            .save_many(vec![person("A", "CA"), person("B", "NY")])
            .unwrap();
        manager.delete(&ids[0]).unwrap();
        assert!(manager.get(&ids[0]).unwrap().is_none());
        assert_eq!(manager.get_all().unwrap().len(), 1);

        manager.clear_all().unwrap();
        assert!(manager.get_all().unwrap().is_empty());
    }

    #[test]
    fn unreadable_records_are_skipped() {
        let (_clock, manager) = make_manager();
        manager.save(person("Ok", "WA")).unwrap();
        manager
            .kv
            .set(&Collection::IdentityProfiles, "junk", &json!("just a string"))
            .unwrap();
        assert_eq!(manager.get_all().unwrap().len(), 1);
    }

    #[test]
    fn settings_default_until_saved() {
        let (_clock, manager) = make_manager();
        assert_eq!(manager.settings().unwrap(), IdentitySettings::default());

        let settings = IdentitySettings {
            preferred_state: Some("OR".to_string()),
            batch_size: 5,
            show_ssn: true,
        };
        manager.save_settings(&settings).unwrap();
        assert_eq!(manager.settings().unwrap(), settings);
    }
}
