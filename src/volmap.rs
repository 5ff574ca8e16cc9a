//! Mapping from virtiofs share tags to volume identifiers, supplied by the
//! operator for the virtiofs conversion phase as `name,uuid+name,uuid`
//! pair listings.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::types::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeMap {
    map: BTreeMap<String, String>,
}

impl VolumeMap {
    /// Parse a `name,uuid+name,uuid` listing. Each id must be a valid UUID;
    /// a malformed pair rejects the whole listing since silently dropping a
    /// disk would convert it without a volume to mount.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut map = BTreeMap::new();
        for pair in spec.split('+') {
            let Some((name, id)) = pair.split_once(',') else {
                return Err(Error::Validation(format!(
                    "missing comma in volume pair '{pair}'"
                )));
            };
            if Uuid::parse_str(id).is_err() {
                return Err(Error::Validation(format!(
                    "invalid volume id for disk '{name}': '{id}'"
                )));
            }
            map.insert(name.to_string(), id.to_string());
        }
        Ok(Self { map })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, String)> for VolumeMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
