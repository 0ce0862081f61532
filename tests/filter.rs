use std::collections::BTreeMap;

use fangstdata::domain::{Observation, RawObservation, RawRiver, RawStation, Reconcile, River, Station};
use fangstdata::filter::{
    filter_by_combined_search, filter_by_date_range, filter_by_search, filter_by_species,
    filter_observations_by_species, selectable_species,
};

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

fn river_dates(river: &River) -> Vec<chrono::NaiveDate> {
    river.start_date.into_iter().chain(river.end_date).collect()
}

#[test]
fn empty_search_string_is_identity() {
    let collection = rivers();
    let filtered = filter_by_search(
        &collection,
        &[
            &|river: &River| river.name.clone(),
            &|river: &River| river.project_id.clone(),
        ],
        "",
    );
    assert_eq!(filtered, collection);
}

#[test]
fn empty_species_list_is_identity() {
    let collection = rivers();
    let filtered = filter_by_species(&collection, |river: &River| river.species.as_slice(), &[]);
    assert_eq!(filtered, collection);
}

#[test]
fn date_range_includes_both_boundaries() {
    let collection = rivers();

    let on_start = filter_by_date_range(
        &collection,
        river_dates,
        "2024-05-01".parse().ok(),
        "2024-05-01".parse().ok(),
    );
    assert!(on_start.contains_key(&1));

    let on_end = filter_by_date_range(
        &collection,
        river_dates,
        "2024-05-03".parse().ok(),
        "2024-05-03".parse().ok(),
    );
    assert!(on_end.contains_key(&1));

    let outside = filter_by_date_range(
        &collection,
        river_dates,
        "2024-05-04".parse().ok(),
        "2024-05-09".parse().ok(),
    );
    assert!(outside.is_empty());
}

#[test]
fn river_passes_when_either_date_overlaps() {
    let collection = rivers();
    // window covers only the end date of river 2
    let filtered = filter_by_date_range(
        &collection,
        river_dates,
        "2024-06-12".parse().ok(),
        "2024-06-30".parse().ok(),
    );
    assert_eq!(filtered.len(), 1);
    assert!(filtered.contains_key(&2));
}

#[test]
fn combined_search_matches_across_the_join() {
    let collection = rivers();
    let filtered = filter_by_combined_search(
        &collection,
        &|river: &River| river.name.clone(),
        &|river: &River| river.project_id.clone(),
        "ma p-20",
    );
    assert_eq!(filtered.len(), 1);
    assert!(filtered.contains_key(&1));
}

#[test]
fn observation_species_filter() {
    let station = Station::from_raw(RawStation {
        id: 1,
        observations: Some(vec![
            RawObservation {
                id: 1,
                species: Some("laks".to_string()),
                ..RawObservation::default()
            },
            RawObservation {
                id: 2,
                species: Some("aure".to_string()),
                ..RawObservation::default()
            },
        ]),
        ..RawStation::default()
    });

    let all = filter_observations_by_species(&station.observations, &[]);
    assert_eq!(all.len(), 2);

    let laks = filter_observations_by_species(&station.observations, &["Laks".to_string()]);
    assert_eq!(laks.len(), 1);
    assert!(laks.iter().all(|observation: &Observation| observation.species == "laks"));
}

#[test]
fn selectable_species_is_a_first_seen_union() {
    let lists: Vec<Vec<String>> = vec![
        vec!["laks".to_string(), "aure".to_string()],
        vec!["aure".to_string(), "abbor".to_string()],
    ];
    let union = selectable_species(lists.iter().map(|list| list.as_slice()));
    assert_eq!(union, vec!["laks", "aure", "abbor"]);
}
