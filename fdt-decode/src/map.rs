//! Name to value mapping for the properties of one node.

use alloc::vec::Vec;
use core::ops::Index;

use crate::PropertyValue;

/// The decoded properties of one node.
///
/// Keys borrow the strings block of the tree. Entries keep the structure
/// order of the first occurrence of each name; inserting a name that is
/// already present replaces its value in place (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap<'a> {
    entries: Vec<(&'a str, PropertyValue)>,
}

impl<'a> PropertyMap<'a> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(&mut self, name: &'a str, value: PropertyValue) -> Option<PropertyValue> {
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Looks up a property by name.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Whether a property with this name exists.
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of distinct property names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the node has no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Property names in structure order.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// Iterates over `(name, value)` pairs in structure order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &PropertyValue)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

impl Index<&str> for PropertyMap<'_> {
    type Output = PropertyValue;

    /// # Panics
    ///
    /// Panics if the property does not exist.
    fn index(&self, name: &str) -> &Self::Output {
        match self.get(name) {
            Some(value) => value,
            None => panic!("property `{}` not found", name),
        }
    }
}

impl<'a> IntoIterator for PropertyMap<'a> {
    type Item = (&'a str, PropertyValue);
    type IntoIter = alloc::vec::IntoIter<(&'a str, PropertyValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> FromIterator<(&'a str, PropertyValue)> for PropertyMap<'a> {
    fn from_iter<I: IntoIterator<Item = (&'a str, PropertyValue)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::String, vec};

    #[test]
    fn test_last_write_wins_in_place() {
        let mut map = PropertyMap::new();
        assert_eq!(map.insert("reg", PropertyValue::Flag(true)), None);
        map.insert("status", PropertyValue::Text("okay".into()));
        let old = map.insert("reg", PropertyValue::NumberList(vec![String::from("0x1")]));
        assert_eq!(old, Some(PropertyValue::Flag(true)));

        assert_eq!(map.len(), 2);
        assert_eq!(map.keys().collect::<Vec<_>>(), ["reg", "status"]);
        assert_eq!(map["reg"], PropertyValue::NumberList(vec!["0x1".into()]));
    }

    #[test]
    fn test_lookup_missing() {
        let map: PropertyMap<'_> = [("a", PropertyValue::Flag(true))].into_iter().collect();
        assert!(map.contains_key("a"));
        assert!(map.get("b").is_none());
    }
}
