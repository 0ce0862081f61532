use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;

use crate::chart::round2;
use crate::domain::{Observation, Position, River, Station};
use crate::error::FangstError;

pub const RIVER_TABLE_HEADER: &[&str] = &[
    "Id",
    "Name",
    "Start date",
    "End date",
    "Project",
    "Species",
];

pub const STATION_TABLE_HEADER: &[&str] = &[
    "Id",
    "Name",
    "Date",
    "Time fished (min)",
    "Species",
];

pub const STATION_SUMMARY_HEADER: &[&str] = &[
    "Species",
    "Amount",
    "Amount per min",
    "Average length (mm)",
    "Median length (mm)",
    "Min length (mm)",
    "Max length (mm)",
];

pub const STATION_CONDITIONS_HEADER: &[&str] = &[
    "River type",
    "Weather",
    "Water temp (C)",
    "Air temp (C)",
    "Conductivity",
];

pub const STATION_SETTINGS_HEADER: &[&str] = &[
    "Voltage (V)",
    "Pulse (Hz)",
    "Transect length (m)",
    "Time fished (min)",
];

pub const STATION_OBSERVATIONS_HEADER: &[&str] = &[
    "Id",
    "Round",
    "Species",
    "Length (mm)",
    "Count",
    "Gender",
    "Age",
    "Released",
    "Sample type",
    "Comment",
];

pub const RIVER_EXPORT_HEADER: &[&str] = &[
    "River id",
    "River name",
    "Start date",
    "End date",
    "Project",
    "Waterflow",
    "Boat type",
    "Crew 1",
    "Crew 2",
    "Crew 3",
    "Latitude",
    "Longitude",
    "River comment",
];

pub const STATION_EXPORT_HEADER: &[&str] = &[
    "Station id",
    "Station name",
    "Date",
    "Time",
    "Description",
    "River type",
    "Weather",
    "Water temp (C)",
    "Air temp (C)",
    "Sec fished",
    "Voltage (V)",
    "Pulse (Hz)",
    "Conductivity",
    "Transect length (m)",
    "Start latitude",
    "Start longitude",
    "End latitude",
    "End longitude",
    "Station comment",
];

pub const OBSERVATION_EXPORT_HEADER: &[&str] = &[
    "Observation id",
    "Round",
    "Species",
    "Length (mm)",
    "Count",
    "Gender",
    "Age",
    "Released",
    "Sample type",
    "Observation comment",
];

pub fn river_table_row(river: &River) -> Vec<String> {
    vec![
        river.id.to_string(),
        river.name.clone(),
        opt_date(river.start_date),
        opt_date(river.end_date),
        river.project_id.clone(),
        river.species.join(", "),
    ]
}

pub fn station_table_row(station: &Station) -> Vec<String> {
    vec![
        station.id.to_string(),
        station.name.clone(),
        opt_date(station.date),
        minutes(station.sec_fished),
        station.species.join(", "),
    ]
}

pub fn station_conditions_row(station: &Station) -> Vec<String> {
    vec![
        station.river_type.clone(),
        station.weather.clone(),
        opt_num(station.water_temp),
        opt_num(station.air_temp),
        opt_num(station.conductivity),
    ]
}

pub fn station_settings_row(station: &Station) -> Vec<String> {
    vec![
        opt_num(station.voltage),
        opt_num(station.pulse),
        opt_num(station.transect_length),
        minutes(station.sec_fished),
    ]
}

pub fn observation_table_rows(station: &Station) -> Vec<Vec<String>> {
    station
        .observations
        .iter()
        .map(|observation| {
            vec![
                observation.id.to_string(),
                observation.round.to_string(),
                observation.species.clone(),
                num(observation.length),
                observation.count.to_string(),
                observation.gender.clone(),
                observation.age.clone(),
                yes_no(observation.released),
                observation.sampletype.clone(),
                observation.comment.clone(),
            ]
        })
        .collect()
}

/// One row per species present in the observations, in first-seen order,
/// followed by a trailing `Sum` row aggregating them all. Length statistics
/// are taken over the count-expanded measured lengths (length > 0).
pub fn species_summary_rows(observations: &[Observation], minutes_fished: f64) -> Vec<Vec<String>> {
    let mut order = Vec::new();
    let mut grouped: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
    for observation in observations {
        if !grouped.contains_key(observation.species.as_str()) {
            order.push(observation.species.as_str());
        }
        grouped
            .entry(observation.species.as_str())
            .or_default()
            .push(observation);
    }

    let mut rows = Vec::new();
    for name in order {
        rows.push(summary_row(name, &grouped[name], minutes_fished));
    }
    let all: Vec<&Observation> = observations.iter().collect();
    rows.push(summary_row("Sum", &all, minutes_fished));
    rows
}

fn summary_row(label: &str, observations: &[&Observation], minutes_fished: f64) -> Vec<String> {
    let amount: u32 = observations.iter().map(|observation| observation.count).sum();
    let rate = if minutes_fished > 0.0 {
        round2(amount as f64 / minutes_fished)
    } else {
        0.0
    };

    let mut lengths: Vec<f64> = observations
        .iter()
        .filter(|observation| observation.length > 0.0)
        .flat_map(|observation| {
            std::iter::repeat(observation.length).take(observation.count as usize)
        })
        .collect();
    lengths.sort_by(|a, b| a.total_cmp(b));

    let average = if lengths.is_empty() {
        String::new()
    } else {
        format!("{:.1}", lengths.iter().sum::<f64>() / lengths.len() as f64)
    };
    let median = median(&lengths)
        .map(|value| format!("{value:.1}"))
        .unwrap_or_default();
    let min = lengths.first().map(|value| num(*value)).unwrap_or_default();
    let max = lengths.last().map(|value| num(*value)).unwrap_or_default();

    vec![
        label.to_string(),
        amount.to_string(),
        format!("{rate:.2}"),
        average,
        median,
        min,
        max,
    ]
}

/// Median over an already sorted slice; the mean of the two middle elements
/// when the length is even.
pub fn median(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

pub fn river_export_row(river: &River) -> Vec<String> {
    let (lat, lon) = coordinates(river.position);
    vec![
        river.id.to_string(),
        river.name.clone(),
        opt_date(river.start_date),
        opt_date(river.end_date),
        river.project_id.clone(),
        opt_num(river.waterflow),
        river.boat_type.clone(),
        river.crew[0].clone(),
        river.crew[1].clone(),
        river.crew[2].clone(),
        lat,
        lon,
        river.comment.clone(),
    ]
}

pub fn station_export_row(station: &Station) -> Vec<String> {
    let (start_lat, start_lon) = coordinates(station.start_pos);
    let (end_lat, end_lon) = coordinates(station.end_pos);
    vec![
        station.id.to_string(),
        station.name.clone(),
        opt_date(station.date),
        station.time.clone(),
        station.description.clone(),
        station.river_type.clone(),
        station.weather.clone(),
        opt_num(station.water_temp),
        opt_num(station.air_temp),
        num(station.sec_fished),
        opt_num(station.voltage),
        opt_num(station.pulse),
        opt_num(station.conductivity),
        opt_num(station.transect_length),
        start_lat,
        start_lon,
        end_lat,
        end_lon,
        station.comment.clone(),
    ]
}

pub fn observation_export_row(observation: &Observation) -> Vec<String> {
    vec![
        observation.id.to_string(),
        observation.round.to_string(),
        observation.species.clone(),
        num(observation.length),
        observation.count.to_string(),
        observation.gender.clone(),
        observation.age.clone(),
        yes_no(observation.released),
        observation.sampletype.clone(),
        observation.comment.clone(),
    ]
}

pub fn full_export_header() -> Vec<String> {
    RIVER_EXPORT_HEADER
        .iter()
        .chain(STATION_EXPORT_HEADER)
        .chain(OBSERVATION_EXPORT_HEADER)
        .map(|column| column.to_string())
        .collect()
}

/// Full-dataset download: one wide row per observation, river columns first,
/// then station, then observation.
pub fn rivers_export(
    rivers: &BTreeMap<i64, River>,
    stations: &BTreeMap<i64, Station>,
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rows = Vec::new();
    for river in rivers.values() {
        let river_columns = river_export_row(river);
        for station_id in &river.stations {
            let Some(station) = stations.get(station_id) else {
                continue;
            };
            push_station_rows(&mut rows, &river_columns, station);
        }
    }
    (full_export_header(), rows)
}

/// Station-first variant of the full export; a station whose river is not
/// loaded gets empty river columns.
pub fn stations_export(
    stations: &BTreeMap<i64, Station>,
    rivers: &BTreeMap<i64, River>,
) -> (Vec<String>, Vec<Vec<String>>) {
    let empty_river = vec![String::new(); RIVER_EXPORT_HEADER.len()];
    let mut rows = Vec::new();
    for station in stations.values() {
        let river_columns = station
            .river_id
            .and_then(|id| rivers.get(&id))
            .map(river_export_row)
            .unwrap_or_else(|| empty_river.clone());
        push_station_rows(&mut rows, &river_columns, station);
    }
    (full_export_header(), rows)
}

fn push_station_rows(rows: &mut Vec<Vec<String>>, river_columns: &[String], station: &Station) {
    let station_columns = station_export_row(station);
    for observation in &station.observations {
        let mut row = river_columns.to_vec();
        row.extend(station_columns.iter().cloned());
        row.extend(observation_export_row(observation));
        rows.push(row);
    }
}

/// Writes through a tempfile in the destination directory and renames into
/// place, so a failed export never leaves a partial file behind.
pub fn write_csv(
    path: &Utf8Path,
    header: &[String],
    rows: &[Vec<String>],
) -> Result<(), FangstError> {
    let parent = path
        .parent()
        .ok_or_else(|| FangstError::Export("invalid export path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| FangstError::Filesystem(err.to_string()))?;

    let temp = tempfile::Builder::new()
        .prefix("fangstdata-export")
        .suffix(".csv")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| FangstError::Filesystem(err.to_string()))?;

    let mut writer = csv::Writer::from_writer(temp);
    writer
        .write_record(header)
        .map_err(|err| FangstError::Export(err.to_string()))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|err| FangstError::Export(err.to_string()))?;
    }
    let temp = writer
        .into_inner()
        .map_err(|err| FangstError::Export(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| FangstError::Filesystem(err.to_string()))?;
    Ok(())
}

fn opt_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|date| date.to_string()).unwrap_or_default()
}

fn opt_num(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

fn num(value: f64) -> String {
    value.to_string()
}

fn minutes(sec_fished: f64) -> String {
    format!("{:.1}", sec_fished / 60.0)
}

fn yes_no(value: bool) -> String {
    if value { "yes".to_string() } else { "no".to_string() }
}

fn coordinates(position: Option<Position>) -> (String, String) {
    match position {
        Some(position) => (position.lat.to_string(), position.lon.to_string()),
        None => (String::new(), String::new()),
    }
}
