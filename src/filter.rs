//! Filter criteria never mutate their input; every function returns a fresh
//! keyed collection containing the entries that pass.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::domain::Observation;

pub fn filter_by_search<T: Clone>(
    collection: &BTreeMap<i64, T>,
    fields: &[&dyn Fn(&T) -> String],
    query: &str,
) -> BTreeMap<i64, T> {
    if query.is_empty() {
        return collection.clone();
    }
    let query = query.to_lowercase();
    collection
        .iter()
        .filter(|(_, entry)| {
            fields
                .iter()
                .any(|field| field(entry).to_lowercase().contains(&query))
        })
        .map(|(id, entry)| (*id, entry.clone()))
        .collect()
}

/// Matches against `lower(a) + " " + lower(b)`, so a query can span the
/// boundary between the two attributes.
pub fn filter_by_combined_search<T: Clone>(
    collection: &BTreeMap<i64, T>,
    field_a: &dyn Fn(&T) -> String,
    field_b: &dyn Fn(&T) -> String,
    query: &str,
) -> BTreeMap<i64, T> {
    if query.is_empty() {
        return collection.clone();
    }
    let query = query.to_lowercase();
    collection
        .iter()
        .filter(|(_, entry)| {
            let combined = format!(
                "{} {}",
                field_a(entry).to_lowercase(),
                field_b(entry).to_lowercase()
            );
            combined.contains(&query)
        })
        .map(|(id, entry)| (*id, entry.clone()))
        .collect()
}

/// An entry passes if any date its accessor yields falls within the inclusive
/// range. Rivers yield both start and end date (overlap semantics), stations
/// their single survey date. No bounds at all returns the input unchanged.
pub fn filter_by_date_range<T, F>(
    collection: &BTreeMap<i64, T>,
    dates: F,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> BTreeMap<i64, T>
where
    T: Clone,
    F: Fn(&T) -> Vec<NaiveDate>,
{
    if start.is_none() && end.is_none() {
        return collection.clone();
    }
    let start = start.unwrap_or_else(range_min);
    let end = end.unwrap_or_else(range_max);
    collection
        .iter()
        .filter(|(_, entry)| {
            dates(entry)
                .iter()
                .any(|date| *date >= start && *date <= end)
        })
        .map(|(id, entry)| (*id, entry.clone()))
        .collect()
}

/// Keep entries whose species list intersects the selection. An empty
/// selection means no filtering.
pub fn filter_by_species<T, F>(
    collection: &BTreeMap<i64, T>,
    species: F,
    selected: &[String],
) -> BTreeMap<i64, T>
where
    T: Clone,
    F: Fn(&T) -> &[String],
{
    if selected.is_empty() {
        return collection.clone();
    }
    let selected = lowercase_set(selected);
    collection
        .iter()
        .filter(|(_, entry)| {
            species(entry)
                .iter()
                .any(|name| selected.contains(name.as_str()))
        })
        .map(|(id, entry)| (*id, entry.clone()))
        .collect()
}

pub fn filter_observations_by_species(
    observations: &[Observation],
    selected: &[String],
) -> Vec<Observation> {
    if selected.is_empty() {
        return observations.to_vec();
    }
    let selected = lowercase_set(selected);
    observations
        .iter()
        .filter(|observation| selected.contains(observation.species.as_str()))
        .cloned()
        .collect()
}

/// First-seen-ordered union of the species lists across all entries.
pub fn selectable_species<'a, I>(species_lists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut seen = HashSet::new();
    let mut union = Vec::new();
    for list in species_lists {
        for name in list {
            if seen.insert(name.clone()) {
                union.push(name.clone());
            }
        }
    }
    union
}

fn lowercase_set(selected: &[String]) -> HashSet<String> {
    selected.iter().map(|name| name.to_lowercase()).collect()
}

fn range_min() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn range_max() -> NaiveDate {
    NaiveDate::from_ymd_opt(2100, 1, 1).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawRiver, Reconcile, River};

    fn rivers() -> BTreeMap<i64, River> {
        let mut collection = BTreeMap::new();
        for (id, name, project, start, end, species) in [
            (1, "Glomma", "P-2024", "2024-05-01", "2024-05-03", vec!["laks"]),
            (2, "Otra", "P-2024", "2024-06-10", "2024-06-12", vec!["aure"]),
            (3, "Lærdalselva", "P-2023", "2023-08-20", "2023-08-21", vec!["laks", "aure"]),
        ] {
            collection.insert(
                id,
                River::from_raw(RawRiver {
                    id,
                    name: Some(name.to_string()),
                    project_id: Some(project.to_string()),
                    start_date: start.parse().ok(),
                    end_date: end.parse().ok(),
                    species: Some(species.into_iter().map(String::from).collect()),
                    ..RawRiver::default()
                }),
            );
        }
        collection
    }

    #[test]
    fn empty_query_passes_everything() {
        let collection = rivers();
        let filtered = filter_by_search(&collection, &[&|river: &River| river.name.clone()], "");
        assert_eq!(filtered, collection);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let collection = rivers();
        let filtered =
            filter_by_search(&collection, &[&|river: &River| river.name.clone()], "GLOM");
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key(&1));
    }

    #[test]
    fn search_spans_multiple_fields() {
        let collection = rivers();
        let filtered = filter_by_search(
            &collection,
            &[
                &|river: &River| river.name.clone(),
                &|river: &River| river.project_id.clone(),
            ],
            "p-2023",
        );
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key(&3));
    }

    #[test]
    fn combined_search_joins_with_space() {
        let collection = rivers();
        let filtered = filter_by_combined_search(
            &collection,
            &|river: &River| river.name.clone(),
            &|river: &River| river.project_id.clone(),
            "otra p-2024",
        );
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key(&2));
    }

    #[test]
    fn date_range_is_inclusive_at_both_bounds() {
        let collection = rivers();
        let accessor = |river: &River| {
            river
                .start_date
                .into_iter()
                .chain(river.end_date)
                .collect::<Vec<_>>()
        };
        let filtered = filter_by_date_range(
            &collection,
            accessor,
            "2024-05-03".parse().ok(),
            "2024-05-03".parse().ok(),
        );
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key(&1));
    }

    #[test]
    fn missing_bounds_default_to_sentinels() {
        let collection = rivers();
        let accessor = |river: &River| {
            river
                .start_date
                .into_iter()
                .chain(river.end_date)
                .collect::<Vec<_>>()
        };
        let unbounded = filter_by_date_range(&collection, accessor, None, None);
        assert_eq!(unbounded, collection);

        let from_2024 = filter_by_date_range(&collection, accessor, "2024-01-01".parse().ok(), None);
        assert_eq!(from_2024.len(), 2);
        assert!(!from_2024.contains_key(&3));
    }

    #[test]
    fn empty_species_selection_passes_everything() {
        let collection = rivers();
        let filtered = filter_by_species(&collection, |river: &River| river.species.as_slice(), &[]);
        assert_eq!(filtered, collection);
    }

    #[test]
    fn species_filter_keeps_intersecting_entries() {
        let collection = rivers();
        let filtered = filter_by_species(
            &collection,
            |river: &River| river.species.as_slice(),
            &["Aure".to_string()],
        );
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key(&2));
        assert!(filtered.contains_key(&3));
    }

    #[test]
    fn selectable_species_union_keeps_first_seen_order() {
        let collection = rivers();
        let union = selectable_species(
            collection
                .values()
                .map(|river| river.species.as_slice()),
        );
        assert_eq!(union, vec!["laks".to_string(), "aure".to_string()]);
    }
}
