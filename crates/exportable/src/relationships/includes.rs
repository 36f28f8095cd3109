//! Include specifications - which associations an export traverses, and how deep
//!
//! ```text
//! Include := Name | [Include] | { Name: Include, ... }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Recursive include specification
#[derive(Debug, Clone, PartialEq)]
pub enum Includes {
    /// One association, one level deep
    Name(String),
    /// Several includes applied to the same record
    List(Vec<Includes>),
    /// Association name -> include specification for the next level
    Map(Vec<(String, Includes)>),
}

/// One resolved entry of an include specification
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeEntry {
    pub name: String,
    /// Includes for the related records, `None` when nothing is nested
    pub nested: Option<Includes>,
}

impl Includes {
    /// Specification that includes nothing
    pub fn none() -> Self {
        Includes::List(Vec::new())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Includes::Name(name.into())
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Includes>,
    {
        Includes::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Includes>,
        I: IntoIterator<Item = (K, V)>,
    {
        Includes::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// True when resolving yields no associations
    pub fn is_empty(&self) -> bool {
        match self {
            Includes::Name(name) => name.is_empty(),
            Includes::List(items) => items.iter().all(Includes::is_empty),
            Includes::Map(entries) => entries.is_empty(),
        }
    }

    /// Resolve this level into ordered `(association, next-level includes)` entries.
    ///
    /// A name appears at most once; repeated names keep their first position
    /// and have their nested specifications combined.
    pub fn resolve(&self) -> Vec<IncludeEntry> {
        let mut entries = Vec::new();
        self.collect_into(&mut entries);
        entries
    }

    fn collect_into(&self, entries: &mut Vec<IncludeEntry>) {
        match self {
            Includes::Name(name) => push_entry(entries, name, None),
            Includes::List(items) => {
                for item in items {
                    item.collect_into(entries);
                }
            }
            Includes::Map(map) => {
                for (name, nested) in map {
                    let nested = if nested.is_empty() { None } else { Some(nested.clone()) };
                    push_entry(entries, name, nested);
                }
            }
        }
    }
}

fn push_entry(entries: &mut Vec<IncludeEntry>, name: &str, nested: Option<Includes>) {
    if name.is_empty() {
        return;
    }

    match entries.iter_mut().find(|entry| entry.name == name) {
        Some(existing) => {
            existing.nested = match (existing.nested.take(), nested) {
                (None, next) => next,
                (current, None) => current,
                (Some(Includes::List(mut items)), Some(next)) => {
                    items.push(next);
                    Some(Includes::List(items))
                }
                (Some(current), Some(next)) => Some(Includes::List(vec![current, next])),
            };
        }
        None => entries.push(IncludeEntry {
            name: name.to_string(),
            nested,
        }),
    }
}

impl Default for Includes {
    fn default() -> Self {
        Includes::none()
    }
}

impl From<&str> for Includes {
    fn from(name: &str) -> Self {
        Includes::Name(name.to_string())
    }
}

impl From<String> for Includes {
    fn from(name: String) -> Self {
        Includes::Name(name)
    }
}

impl<T: Into<Includes>> From<Vec<T>> for Includes {
    fn from(items: Vec<T>) -> Self {
        Includes::list(items)
    }
}

impl FromStr for Includes {
    type Err = serde_yaml::Error;

    /// Parse YAML (or JSON) syntax, e.g. `items`, `[customer, items]` or
    /// `{items: product}`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Includes::none());
        }
        serde_yaml::from_str(s)
    }
}

impl Serialize for Includes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Includes::Name(name) => serializer.serialize_str(name),
            Includes::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Includes::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, nested) in entries {
                    map.serialize_entry(name, nested)?;
                }
                map.end()
            }
        }
    }
}

struct IncludesVisitor;

impl<'de> Visitor<'de> for IncludesVisitor {
    type Value = Includes;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an association name, a list of includes or a map of association names to includes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Includes, E> {
        Ok(Includes::Name(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Includes, E> {
        Ok(Includes::Name(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Includes, E> {
        Ok(Includes::none())
    }

    fn visit_none<E: de::Error>(self) -> Result<Includes, E> {
        Ok(Includes::none())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Includes, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Includes>()? {
            items.push(item);
        }
        Ok(Includes::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Includes, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, nested)) = map.next_entry::<String, Includes>()? {
            entries.push((name, nested));
        }
        Ok(Includes::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Includes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IncludesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[IncludeEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_name_resolves_one_level() {
        let entries = Includes::name("items").resolve();
        assert_eq!(
            entries,
            vec![IncludeEntry {
                name: "items".to_string(),
                nested: None
            }]
        );
    }

    #[test]
    fn test_list_applies_to_same_level() {
        let includes = Includes::list(["customer", "items"]);
        let entries = includes.resolve();
        assert_eq!(names(&entries), vec!["customer", "items"]);
        assert!(entries.iter().all(|e| e.nested.is_none()));
    }

    #[test]
    fn test_map_carries_next_level() {
        let includes = Includes::map([("a", Includes::map([("b", "c")]))]);

        let level_one = includes.resolve();
        assert_eq!(names(&level_one), vec!["a"]);

        let level_two = level_one[0].nested.as_ref().unwrap().resolve();
        assert_eq!(names(&level_two), vec!["b"]);

        let level_three = level_two[0].nested.as_ref().unwrap().resolve();
        assert_eq!(names(&level_three), vec!["c"]);
        assert!(level_three[0].nested.is_none());
    }

    #[test]
    fn test_duplicates_are_merged() {
        let includes = Includes::list(vec![
            Includes::name("items"),
            Includes::map([("customer", "address")]),
            Includes::map([("items", "product")]),
            Includes::map([("customer", "orders")]),
        ]);

        let entries = includes.resolve();
        assert_eq!(names(&entries), vec!["items", "customer"]);
        assert_eq!(entries[0].nested, Some(Includes::name("product")));
        assert_eq!(
            entries[1].nested,
            Some(Includes::List(vec![
                Includes::name("address"),
                Includes::name("orders")
            ]))
        );
    }

    #[test]
    fn test_empty_specifications() {
        assert!(Includes::none().is_empty());
        assert!(Includes::list(Vec::<Includes>::new()).resolve().is_empty());
        assert!(Includes::map([("items", Includes::none())]).resolve()[0]
            .nested
            .is_none());
    }

    #[test]
    fn test_parse_preserves_map_order() {
        let includes: Includes = "{items: product, customer: [address, orders]}".parse().unwrap();
        assert_eq!(
            includes,
            Includes::Map(vec![
                ("items".to_string(), Includes::name("product")),
                (
                    "customer".to_string(),
                    Includes::list(["address", "orders"])
                ),
            ])
        );

        let json: Includes = serde_json::from_str(r#"["customer", {"items": null}]"#).unwrap();
        assert_eq!(
            names(&json.resolve()),
            vec!["customer", "items"]
        );

        assert_eq!("".parse::<Includes>().unwrap(), Includes::none());
        assert_eq!("items".parse::<Includes>().unwrap(), Includes::name("items"));
    }

    #[test]
    fn test_serialize_matches_grammar() {
        let includes = Includes::map([("items", Includes::list(["product"]))]);
        assert_eq!(
            serde_json::to_string(&includes).unwrap(),
            r#"{"items":["product"]}"#
        );
    }
}
