//! Copy-on-write draft storage and its single update function.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::path::FieldPath;
use super::value::FieldValue;

/// Field name → value within one section.
pub type Section = BTreeMap<String, FieldValue>;

/// One change to a draft. [`Draft::apply`] is the only place these are
/// interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftUpdate {
    /// Write a value, replacing whatever was there.
    Set { path: FieldPath, value: FieldValue },
    /// Remove a value.
    Clear(FieldPath),
    /// Overlay every field of `partial`; fields it does not name are kept.
    Merge(Draft),
    /// Append to a list field. With `unique` set, an item already present is
    /// a no-op.
    AddToArray {
        path: FieldPath,
        item: String,
        unique: bool,
    },
    /// Remove one list element. An out-of-range index is a no-op.
    RemoveFromArray { path: FieldPath, index: usize },
}

impl DraftUpdate {
    /// Paths this update may change.
    pub fn touched_paths(&self) -> Vec<FieldPath> {
        match self {
            Self::Set { path, .. }
            | Self::Clear(path)
            | Self::AddToArray { path, .. }
            | Self::RemoveFromArray { path, .. } => vec![path.clone()],
            Self::Merge(partial) => partial.paths(),
        }
    }
}

/// The accumulated, not-yet-submitted answers of a wizard session.
///
/// Section maps are reference counted, so cloning a draft is cheap and an
/// update only copies the section it touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    sections: Arc<BTreeMap<String, Arc<Section>>>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update, returning the resulting draft. `self` is unchanged.
    pub fn apply(&self, update: DraftUpdate) -> Draft {
        match update {
            DraftUpdate::Set { path, value } => self.with_field(path, Some(value)),
            DraftUpdate::Clear(path) => {
                if self.get(&path).is_none() {
                    return self.clone();
                }
                self.with_field(path, None)
            }
            DraftUpdate::Merge(partial) => self.overlay(&partial),
            DraftUpdate::AddToArray { path, item, unique } => match self.get(&path) {
                None => self.with_field(path, Some(FieldValue::List(vec![item]))),
                Some(FieldValue::List(items)) => {
                    if unique && items.contains(&item) {
                        return self.clone();
                    }
                    let mut items = items.clone();
                    items.push(item);
                    self.with_field(path, Some(FieldValue::List(items)))
                }
                Some(_) => {
                    debug!(path = %path, "add_to_array on a non-list field ignored");
                    self.clone()
                }
            },
            DraftUpdate::RemoveFromArray { path, index } => match self.get(&path) {
                Some(FieldValue::List(items)) if index < items.len() => {
                    let mut items = items.clone();
                    items.remove(index);
                    self.with_field(path, Some(FieldValue::List(items)))
                }
                _ => self.clone(),
            },
        }
    }

    pub fn set(&self, path: FieldPath, value: impl Into<FieldValue>) -> Draft {
        self.apply(DraftUpdate::Set {
            path,
            value: value.into(),
        })
    }

    pub fn clear(&self, path: FieldPath) -> Draft {
        self.apply(DraftUpdate::Clear(path))
    }

    pub fn merge(&self, partial: Draft) -> Draft {
        self.apply(DraftUpdate::Merge(partial))
    }

    pub fn add_to_array(&self, path: FieldPath, item: impl Into<String>, unique: bool) -> Draft {
        self.apply(DraftUpdate::AddToArray {
            path,
            item: item.into(),
            unique,
        })
    }

    pub fn remove_from_array(&self, path: FieldPath, index: usize) -> Draft {
        self.apply(DraftUpdate::RemoveFromArray { path, index })
    }

    pub fn get(&self, path: &FieldPath) -> Option<&FieldValue> {
        self.sections.get(&path.section)?.get(&path.field)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name).map(|s| s.as_ref())
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Every populated path, in section/field order.
    pub fn paths(&self) -> Vec<FieldPath> {
        self.sections
            .iter()
            .flat_map(|(section, fields)| fields.keys().map(move |field| FieldPath::new(section, field)))
            .collect()
    }

    /// Number of populated fields across all sections.
    pub fn len(&self) -> usize {
        self.sections.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    fn with_field(&self, path: FieldPath, value: Option<FieldValue>) -> Draft {
        let mut next = self.clone();
        let sections = Arc::make_mut(&mut next.sections);
        match value {
            Some(value) => {
                let section = sections.entry(path.section).or_default();
                Arc::make_mut(section).insert(path.field, value);
            }
            None => {
                let now_empty = match sections.get_mut(&path.section) {
                    Some(section) => {
                        let section = Arc::make_mut(section);
                        section.remove(&path.field);
                        section.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    sections.remove(&path.section);
                }
            }
        }
        next
    }

    fn overlay(&self, partial: &Draft) -> Draft {
        if partial.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        let sections = Arc::make_mut(&mut next.sections);
        for (name, incoming) in partial.sections.iter() {
            match sections.get_mut(name) {
                Some(existing) => {
                    let target = Arc::make_mut(existing);
                    for (field, value) in incoming.iter() {
                        target.insert(field.clone(), value.clone());
                    }
                }
                None => {
                    sections.insert(name.clone(), Arc::clone(incoming));
                }
            }
        }
        next
    }
}

/// Empty sections are kept, so a draft read from JSON writes back the same
/// document. Clearing the last field of a section through [`Draft::apply`]
/// still drops the section.
impl From<BTreeMap<String, Section>> for Draft {
    fn from(map: BTreeMap<String, Section>) -> Self {
        let sections = map
            .into_iter()
            .map(|(name, fields)| (name, Arc::new(fields)))
            .collect();
        Self {
            sections: Arc::new(sections),
        }
    }
}

impl Serialize for Draft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.sections.iter().map(|(name, fields)| (name, fields.as_ref())))
    }
}

impl<'de> Deserialize<'de> for Draft {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, Section>::deserialize(deserializer).map(Draft::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn set_then_get_returns_value() {
        let draft = Draft::new().set(path("personal.full_name"), "Amara Okafor");
        assert_eq!(
            draft.get(&path("personal.full_name")),
            Some(&FieldValue::from("Amara Okafor"))
        );

        // Setting the same value again is idempotent.
        let again = draft.set(path("personal.full_name"), "Amara Okafor");
        assert_eq!(again, draft);
    }

    #[test]
    fn set_does_not_mutate_previous_draft() {
        let before = Draft::new().set(path("experience.region"), "london");
        let after = before.set(path("experience.region"), "north-west");
        assert_eq!(before.get(&path("experience.region")), Some(&FieldValue::from("london")));
        assert_eq!(after.get(&path("experience.region")), Some(&FieldValue::from("north-west")));
    }

    #[test]
    fn unrelated_sections_are_shared_not_copied() {
        let draft = Draft::new()
            .set(path("personal.full_name"), "A")
            .set(path("experience.specialty"), "Cardiology");
        let next = draft.set(path("experience.region"), "london");

        assert!(Arc::ptr_eq(
            &draft.sections["personal"],
            &next.sections["personal"]
        ));
        assert!(!Arc::ptr_eq(
            &draft.sections["experience"],
            &next.sections["experience"]
        ));
        assert_eq!(next.get(&path("personal.full_name")), Some(&FieldValue::from("A")));
    }

    #[test]
    fn same_field_name_in_two_sections_does_not_alias() {
        let draft = Draft::new()
            .set(path("current.notes"), "one")
            .set(path("previous.notes"), "two");
        assert_eq!(draft.get(&path("current.notes")), Some(&FieldValue::from("one")));
        assert_eq!(draft.get(&path("previous.notes")), Some(&FieldValue::from("two")));
    }

    #[test]
    fn clear_removes_field_and_empty_section() {
        let draft = Draft::new().set(path("goals.visa_status"), "tier-2");
        let cleared = draft.clear(path("goals.visa_status"));
        assert!(cleared.get(&path("goals.visa_status")).is_none());
        assert!(cleared.section("goals").is_none());
        assert!(cleared.is_empty());

        // Clearing a missing field is a no-op.
        assert_eq!(cleared.clear(path("goals.visa_status")), cleared);
    }

    #[test]
    fn merge_overlays_without_dropping_fields() {
        let draft = Draft::new()
            .set(path("personal.full_name"), "A")
            .set(path("personal.email"), "a@example.com");
        let partial = Draft::new()
            .set(path("personal.email"), "b@example.com")
            .set(path("education.primary_degree"), "MBBS");

        let merged = draft.merge(partial);
        assert_eq!(merged.get(&path("personal.full_name")), Some(&FieldValue::from("A")));
        assert_eq!(merged.get(&path("personal.email")), Some(&FieldValue::from("b@example.com")));
        assert_eq!(merged.get(&path("education.primary_degree")), Some(&FieldValue::from("MBBS")));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn add_to_unique_array_ignores_duplicates() {
        let p = path("experience.nhs_systems");
        let once = Draft::new().add_to_array(p.clone(), "EMIS", true);
        let twice = once.add_to_array(p.clone(), "EMIS", true);
        assert_eq!(once, twice);
        assert_eq!(twice.get(&p).unwrap().as_list().unwrap(), ["EMIS".to_string()]);
    }

    #[test]
    fn add_to_plain_array_keeps_duplicates() {
        let p = path("skills.keywords");
        let draft = Draft::new()
            .add_to_array(p.clone(), "audit", false)
            .add_to_array(p.clone(), "audit", false);
        assert_eq!(draft.get(&p).unwrap().as_list().unwrap().len(), 2);
    }

    #[test]
    fn add_to_non_list_is_noop() {
        let p = path("personal.full_name");
        let draft = Draft::new().set(p.clone(), "A");
        assert_eq!(draft.add_to_array(p, "x", true), draft);
    }

    #[test]
    fn remove_from_array_in_and_out_of_range() {
        let p = path("documents.checklist");
        let draft = Draft::new()
            .add_to_array(p.clone(), "passport", true)
            .add_to_array(p.clone(), "brp", true);

        let removed = draft.remove_from_array(p.clone(), 0);
        assert_eq!(removed.get(&p).unwrap().as_list().unwrap(), ["brp".to_string()]);

        assert_eq!(draft.remove_from_array(p.clone(), 5), draft);
        assert_eq!(Draft::new().remove_from_array(p, 0), Draft::new());
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let json = serde_json::json!({
            "personal": { "full_name": "Amara", "phone": "+44 7700 900123" },
            "experience": {
                "years_experience": 4,
                "nhs_induction_completed": true,
                "nhs_systems": ["EMIS", "ICE"],
                "placement": { "trust": "Barts", "months": 6 }
            }
        });
        let draft: Draft = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(draft.len(), 6);
        assert_eq!(draft.to_json(), json);
    }

    #[test]
    fn empty_sections_survive_json_round_trip() {
        let json = serde_json::json!({ "personal": {}, "goals": { "visa_status": "tier-2" } });
        let draft: Draft = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(draft.len(), 1);
        assert!(draft.section("personal").is_some_and(|s| s.is_empty()));
        assert_eq!(draft.to_json(), json);
    }

    #[test]
    fn paths_lists_every_field() {
        let draft = Draft::new()
            .set(path("b.y"), "1")
            .set(path("a.x"), "2");
        assert_eq!(draft.paths(), vec![path("a.x"), path("b.y")]);
        assert_eq!(draft.section_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
