use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::domain::{Observation, River, Station};

/// Anything the chart builders can draw series from: a single station or a
/// whole river with its stations. Series are keyed by the display name.
pub trait ObservationSource {
    fn observations(&self) -> Vec<&Observation>;
    fn display_name(&self) -> String;
    fn seconds_fished(&self) -> f64;
}

impl ObservationSource for Station {
    fn observations(&self) -> Vec<&Observation> {
        self.observations.iter().collect()
    }

    fn display_name(&self) -> String {
        self.station_label()
    }

    fn seconds_fished(&self) -> f64 {
        self.sec_fished
    }
}

/// River-level view: observations concatenated and time fished summed over
/// the river's resolved stations.
#[derive(Debug)]
pub struct RiverStations<'a> {
    pub river: &'a River,
    pub stations: Vec<&'a Station>,
}

impl<'a> RiverStations<'a> {
    pub fn collect(
        river: &'a River,
        stations: &'a BTreeMap<i64, Station>,
    ) -> Self {
        let stations = river
            .stations
            .iter()
            .filter_map(|id| stations.get(id))
            .collect();
        Self { river, stations }
    }
}

impl ObservationSource for RiverStations<'_> {
    fn observations(&self) -> Vec<&Observation> {
        self.stations
            .iter()
            .flat_map(|station| station.observations.iter())
            .collect()
    }

    fn display_name(&self) -> String {
        self.river.project_label()
    }

    fn seconds_fished(&self) -> f64 {
        self.stations.iter().map(|station| station.sec_fished).sum()
    }
}

#[derive(Debug, Clone)]
pub struct SeriesOptions {
    pub species: Vec<String>,
    pub include_others: bool,
    /// When false, counts are normalized to fish per minute fished.
    pub absolute: bool,
}

pub const OTHERS_LABEL: &str = "others";
pub const COMBINED_LABEL: &str = "sum";

/// Bar/pie series: total count per requested species per source, with an
/// optional bucket for everything outside the requested list. Only measured
/// fish (length > 0) are counted.
pub fn category_counts<'a, S, I>(
    sources: I,
    options: &SeriesOptions,
) -> BTreeMap<String, BTreeMap<String, f64>>
where
    S: ObservationSource + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let species = lowercased(&options.species);
    let selected: HashSet<&str> = species.iter().map(String::as_str).collect();

    let mut data = BTreeMap::new();
    for source in sources {
        let observations: Vec<&Observation> = source
            .observations()
            .into_iter()
            .filter(|observation| observation.length > 0.0)
            .collect();

        let mut series = BTreeMap::new();
        for name in &species {
            let total: u32 = observations
                .iter()
                .filter(|observation| observation.species == *name)
                .map(|observation| observation.count)
                .sum();
            series.insert(name.clone(), scale(total, source.seconds_fished(), options.absolute));
        }
        if options.include_others {
            let total: u32 = observations
                .iter()
                .filter(|observation| !selected.contains(observation.species.as_str()))
                .map(|observation| observation.count)
                .sum();
            series.insert(
                OTHERS_LABEL.to_string(),
                scale(total, source.seconds_fished(), options.absolute),
            );
        }
        data.insert(source.display_name(), series);
    }
    data
}

#[derive(Debug, Clone)]
pub struct HistogramOptions {
    pub species: Vec<String>,
    pub interval: u32,
    pub include_others: bool,
    /// Adds a series merging every requested species into one.
    pub combine: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub counts: Vec<u32>,
    pub midpoints: Vec<f64>,
    pub interval: u32,
}

/// Length-frequency series: per source and species, fish counts bucketed by
/// `floor(length / interval) * interval`, with contiguous buckets from the
/// lowest to the highest occupied one. Midpoints sit at bucket start plus
/// half the interval so bars render centered over their range.
pub fn length_histogram<'a, S, I>(
    sources: I,
    options: &HistogramOptions,
) -> BTreeMap<String, BTreeMap<String, Histogram>>
where
    S: ObservationSource + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let species = lowercased(&options.species);
    let selected: HashSet<&str> = species.iter().map(String::as_str).collect();

    let mut data = BTreeMap::new();
    for source in sources {
        let observations = source.observations();

        let mut series = BTreeMap::new();
        for name in &species {
            let matching: Vec<&Observation> = observations
                .iter()
                .copied()
                .filter(|observation| observation.species == *name)
                .collect();
            series.insert(name.clone(), histogram_of(&matching, options.interval));
        }
        if options.include_others {
            let matching: Vec<&Observation> = observations
                .iter()
                .copied()
                .filter(|observation| !selected.contains(observation.species.as_str()))
                .collect();
            series.insert(OTHERS_LABEL.to_string(), histogram_of(&matching, options.interval));
        }
        if options.combine {
            let matching: Vec<&Observation> = observations
                .iter()
                .copied()
                .filter(|observation| selected.contains(observation.species.as_str()))
                .collect();
            series.insert(COMBINED_LABEL.to_string(), histogram_of(&matching, options.interval));
        }
        data.insert(source.display_name(), series);
    }
    data
}

/// Box-plot samples: every observation expanded into `count` copies of its
/// length, one flat series per requested species.
pub fn length_samples<'a, S, I>(
    sources: I,
    species: &[String],
) -> BTreeMap<String, BTreeMap<String, Vec<f64>>>
where
    S: ObservationSource + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let species = lowercased(species);

    let mut data = BTreeMap::new();
    for source in sources {
        let observations = source.observations();

        let mut series = BTreeMap::new();
        for name in &species {
            let samples: Vec<f64> = observations
                .iter()
                .filter(|observation| observation.species == *name)
                .flat_map(|observation| {
                    std::iter::repeat(observation.length).take(observation.count as usize)
                })
                .collect();
            series.insert(name.clone(), samples);
        }
        data.insert(source.display_name(), series);
    }
    data
}

fn histogram_of(observations: &[&Observation], interval: u32) -> Histogram {
    if observations.is_empty() || interval == 0 {
        return Histogram {
            counts: Vec::new(),
            midpoints: Vec::new(),
            interval,
        };
    }

    let step = interval as i64;
    let mut buckets: BTreeMap<i64, u32> = BTreeMap::new();
    for observation in observations {
        let start = (observation.length / interval as f64).floor() as i64 * step;
        *buckets.entry(start).or_insert(0) += observation.count;
    }

    let first = *buckets.keys().next().unwrap_or(&0);
    let last = *buckets.keys().next_back().unwrap_or(&0);

    let mut counts = Vec::new();
    let mut midpoints = Vec::new();
    let mut start = first;
    while start <= last {
        counts.push(buckets.get(&start).copied().unwrap_or(0));
        midpoints.push(start as f64 + interval as f64 / 2.0);
        start += step;
    }

    Histogram {
        counts,
        midpoints,
        interval,
    }
}

/// Per-minute rate rounded to 2 decimals; a source with no time fished
/// reports 0 rather than an infinite rate.
fn scale(total: u32, seconds_fished: f64, absolute: bool) -> f64 {
    if absolute {
        return total as f64;
    }
    let minutes = seconds_fished / 60.0;
    if minutes <= 0.0 {
        return 0.0;
    }
    round2(total as f64 / minutes)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn lowercased(species: &[String]) -> Vec<String> {
    species.iter().map(|name| name.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawObservation, RawStation, Reconcile};

    fn station(id: i64, sec_fished: f64, observations: Vec<(u32, &str, f64)>) -> Station {
        Station::from_raw(RawStation {
            id,
            name: Some(format!("st-{id}")),
            sec_fished: Some(sec_fished),
            observations: Some(
                observations
                    .into_iter()
                    .enumerate()
                    .map(|(index, (count, species, length))| RawObservation {
                        id: index as i64 + 1,
                        station: Some(id),
                        species: Some(species.to_string()),
                        length: Some(length),
                        count: Some(count),
                        ..RawObservation::default()
                    })
                    .collect(),
            ),
            ..RawStation::default()
        })
    }

    #[test]
    fn category_counts_with_others_bucket() {
        let stations = vec![station(1, 600.0, vec![(1, "a", 10.0), (2, "b", 20.0)])];
        let data = category_counts(
            stations.iter(),
            &SeriesOptions {
                species: vec!["a".to_string()],
                include_others: true,
                absolute: true,
            },
        );

        let series = data.values().next().unwrap();
        assert_eq!(series["a"], 1.0);
        assert_eq!(series[OTHERS_LABEL], 2.0);
    }

    #[test]
    fn unmeasured_fish_are_excluded_from_counts() {
        let stations = vec![station(1, 600.0, vec![(3, "a", 0.0), (1, "a", 120.0)])];
        let data = category_counts(
            stations.iter(),
            &SeriesOptions {
                species: vec!["a".to_string()],
                include_others: false,
                absolute: true,
            },
        );
        assert_eq!(data.values().next().unwrap()["a"], 1.0);
    }

    #[test]
    fn per_minute_rate_rounds_to_two_decimals() {
        // 5 fish over 7 minutes = 0.714... per minute
        let stations = vec![station(1, 420.0, vec![(5, "a", 150.0)])];
        let data = category_counts(
            stations.iter(),
            &SeriesOptions {
                species: vec!["a".to_string()],
                include_others: false,
                absolute: false,
            },
        );
        assert_eq!(data.values().next().unwrap()["a"], 0.71);
    }

    #[test]
    fn zero_time_fished_yields_zero_rate() {
        let stations = vec![station(1, 0.0, vec![(4, "a", 150.0)])];
        let data = category_counts(
            stations.iter(),
            &SeriesOptions {
                species: vec!["a".to_string()],
                include_others: false,
                absolute: false,
            },
        );
        assert_eq!(data.values().next().unwrap()["a"], 0.0);
    }

    #[test]
    fn histogram_buckets_share_a_floor() {
        let stations = vec![station(
            1,
            600.0,
            vec![(1, "a", 10.0), (1, "a", 15.0), (1, "a", 19.0)],
        )];
        let data = length_histogram(
            stations.iter(),
            &HistogramOptions {
                species: vec!["a".to_string()],
                interval: 10,
                include_others: false,
                combine: false,
            },
        );

        let histogram = &data.values().next().unwrap()["a"];
        assert_eq!(histogram.counts, vec![3]);
        assert_eq!(histogram.midpoints, vec![15.0]);
        assert_eq!(histogram.interval, 10);
    }

    #[test]
    fn histogram_fills_gaps_between_occupied_buckets() {
        let stations = vec![station(1, 600.0, vec![(1, "a", 12.0), (2, "a", 41.0)])];
        let data = length_histogram(
            stations.iter(),
            &HistogramOptions {
                species: vec!["a".to_string()],
                interval: 10,
                include_others: false,
                combine: false,
            },
        );

        let histogram = &data.values().next().unwrap()["a"];
        assert_eq!(histogram.counts, vec![1, 0, 0, 2]);
        assert_eq!(histogram.midpoints, vec![15.0, 25.0, 35.0, 45.0]);
    }

    #[test]
    fn empty_observations_yield_empty_histogram() {
        let stations = vec![station(1, 600.0, vec![])];
        let data = length_histogram(
            stations.iter(),
            &HistogramOptions {
                species: vec!["a".to_string()],
                interval: 20,
                include_others: false,
                combine: false,
            },
        );

        let histogram = &data.values().next().unwrap()["a"];
        assert!(histogram.counts.is_empty());
        assert!(histogram.midpoints.is_empty());
        assert_eq!(histogram.interval, 20);
    }

    #[test]
    fn combined_series_merges_selected_species() {
        let stations = vec![station(
            1,
            600.0,
            vec![(1, "a", 12.0), (1, "b", 14.0), (1, "c", 16.0)],
        )];
        let data = length_histogram(
            stations.iter(),
            &HistogramOptions {
                species: vec!["a".to_string(), "b".to_string()],
                interval: 10,
                include_others: false,
                combine: true,
            },
        );

        let series = data.values().next().unwrap();
        assert_eq!(series[COMBINED_LABEL].counts, vec![2]);
    }

    #[test]
    fn samples_expand_counts() {
        let stations = vec![station(1, 600.0, vec![(3, "a", 96.0), (1, "a", 128.0)])];
        let data = length_samples(stations.iter(), &["a".to_string()]);
        let samples = &data.values().next().unwrap()["a"];
        assert_eq!(samples, &vec![96.0, 96.0, 96.0, 128.0]);
    }

    #[test]
    fn river_view_aggregates_stations() {
        use crate::domain::RawRiver;

        let mut stations = BTreeMap::new();
        stations.insert(1, station(1, 300.0, vec![(1, "a", 10.0)]));
        stations.insert(2, station(2, 300.0, vec![(2, "a", 20.0)]));

        let river = crate::domain::River::from_raw(RawRiver {
            id: 7,
            name: Some("Glomma".to_string()),
            stations: Some(vec![1, 2, 99]),
            ..RawRiver::default()
        });

        let view = RiverStations::collect(&river, &stations);
        assert_eq!(view.seconds_fished(), 600.0);
        assert_eq!(view.observations().len(), 2);

        let data = category_counts(
            std::iter::once(&view),
            &SeriesOptions {
                species: vec!["a".to_string()],
                include_others: false,
                absolute: true,
            },
        );
        assert_eq!(data[&view.display_name()]["a"], 3.0);
    }
}
