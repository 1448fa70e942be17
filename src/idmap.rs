//! A `BTreeMap<PackageId, V>` that (de)serializes through `scope/name`
//! string keys, the way every JSON object keyed by package id in the
//! manifest and lockfile schemas does.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::de::{Error as DeError, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::id::PackageId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMap<V>(pub BTreeMap<PackageId, V>);

impl<V> Default for IdMap<V> {
    fn default() -> Self {
        IdMap(BTreeMap::new())
    }
}

impl<V> Deref for IdMap<V> {
    type Target = BTreeMap<PackageId, V>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<V> DerefMut for IdMap<V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<V> IdMap<V> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(PackageId, V)> for IdMap<V> {
    fn from_iter<T: IntoIterator<Item = (PackageId, V)>>(iter: T) -> Self {
        IdMap(BTreeMap::from_iter(iter))
    }
}

impl<V: Serialize> Serialize for IdMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, value) in &self.0 {
            map.serialize_entry(&id.to_string(), value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for IdMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdMapVisitor<V>(std::marker::PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for IdMapVisitor<V> {
            type Value = IdMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map keyed by `scope/name` package ids")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut out = BTreeMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    let id = PackageId::from_str(&key).map_err(M::Error::custom)?;
                    out.insert(id, value);
                }
                Ok(IdMap(out))
            }
        }

        deserializer.deserialize_map(IdMapVisitor(std::marker::PhantomData))
    }
}

impl<V> IntoIterator for IdMap<V> {
    type Item = (PackageId, V);
    type IntoIter = std::collections::btree_map::IntoIter<PackageId, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a IdMap<V> {
    type Item = (&'a PackageId, &'a V);
    type IntoIter = std::collections::btree_map::Iter<'a, PackageId, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
