use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

/// Wire form of a point: GeoJSON-style `{"coordinates": [lon, lat]}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPosition {
    pub coordinates: [f64; 2],
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        Self {
            lon: raw.coordinates[0],
            lat: raw.coordinates[1],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRiver {
    pub id: i64,
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub project_id: Option<String>,
    pub waterflow: Option<f64>,
    pub boat_type: Option<String>,
    pub crew: Option<Vec<String>>,
    pub position: Option<RawPosition>,
    pub comment: Option<String>,
    pub species: Option<Vec<String>>,
    pub stations: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct River {
    pub id: i64,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub project_id: String,
    pub waterflow: Option<f64>,
    pub boat_type: String,
    pub crew: [String; 3],
    pub position: Option<Position>,
    pub comment: String,
    pub species: Vec<String>,
    pub stations: Vec<i64>,
}

impl River {
    pub fn project_label(&self) -> String {
        format!("{} {}", self.name, date_label(self.start_date))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStation {
    pub id: i64,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_pos: Option<RawPosition>,
    pub end_pos: Option<RawPosition>,
    pub time: Option<String>,
    pub river_id: Option<i64>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub river_type: Option<String>,
    pub weather: Option<String>,
    pub water_temp: Option<f64>,
    pub air_temp: Option<f64>,
    pub sec_fished: Option<f64>,
    pub voltage: Option<f64>,
    pub pulse: Option<f64>,
    pub conductivity: Option<f64>,
    pub species: Option<Vec<String>>,
    pub observations: Option<Vec<RawObservation>>,
    pub transect_length: Option<f64>,
    pub display: Option<bool>,
    pub gpx_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: i64,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub start_pos: Option<Position>,
    pub end_pos: Option<Position>,
    pub time: String,
    pub river_id: Option<i64>,
    pub description: String,
    pub comment: String,
    pub river_type: String,
    pub weather: String,
    pub water_temp: Option<f64>,
    pub air_temp: Option<f64>,
    pub sec_fished: f64,
    pub voltage: Option<f64>,
    pub pulse: Option<f64>,
    pub conductivity: Option<f64>,
    pub species: Vec<String>,
    pub observations: Vec<Observation>,
    pub transect_length: Option<f64>,
    pub display: bool,
    pub gpx_file: Option<String>,
}

impl Station {
    pub fn minutes_fished(&self) -> f64 {
        self.sec_fished / 60.0
    }

    pub fn station_label(&self) -> String {
        format!("{} {}", self.name, date_label(self.date))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawObservation {
    pub id: i64,
    pub station: Option<i64>,
    pub round: Option<u32>,
    pub species: Option<String>,
    pub length: Option<f64>,
    pub count: Option<u32>,
    pub gender: Option<String>,
    pub age: Option<String>,
    pub released: Option<bool>,
    pub sampletype: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub id: i64,
    pub station: Option<i64>,
    pub round: u32,
    pub species: String,
    pub length: f64,
    pub count: u32,
    pub gender: String,
    pub age: String,
    pub released: bool,
    pub sampletype: String,
    pub comment: String,
}

impl Observation {
    /// Species is lowercased and a missing or zero count becomes 1.
    pub fn from_raw(raw: RawObservation) -> Self {
        Self {
            id: raw.id,
            station: raw.station,
            round: raw.round.unwrap_or(1),
            species: raw.species.unwrap_or_default().to_lowercase(),
            length: raw.length.unwrap_or(0.0),
            count: raw.count.filter(|count| *count > 0).unwrap_or(1),
            gender: raw.gender.unwrap_or_default(),
            age: raw.age.unwrap_or_default(),
            released: raw.released.unwrap_or(false),
            sampletype: raw.sampletype.unwrap_or_default(),
            comment: raw.comment.unwrap_or_default(),
        }
    }
}

/// Merge-on-fetch contract for keyed stores: a record is built from a raw wire
/// record and can be merged with a later partial record for the same id.
/// Fields present in the partial win; fields absent from it are retained.
pub trait Reconcile: Sized {
    type Raw;

    fn raw_id(raw: &Self::Raw) -> i64;
    fn from_raw(raw: Self::Raw) -> Self;
    fn merged_with(&self, raw: Self::Raw) -> Self;
}

impl Reconcile for River {
    type Raw = RawRiver;

    fn raw_id(raw: &RawRiver) -> i64 {
        raw.id
    }

    fn from_raw(raw: RawRiver) -> Self {
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            start_date: raw.start_date,
            end_date: raw.end_date,
            project_id: raw.project_id.unwrap_or_default(),
            waterflow: raw.waterflow,
            boat_type: raw.boat_type.unwrap_or_default(),
            crew: crew_triple(raw.crew.unwrap_or_default()),
            position: raw.position.map(Position::from),
            comment: raw.comment.unwrap_or_default(),
            species: normalize_species(raw.species.unwrap_or_default()),
            stations: raw.stations.unwrap_or_default(),
        }
    }

    fn merged_with(&self, raw: RawRiver) -> Self {
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_else(|| self.name.clone()),
            start_date: raw.start_date.or(self.start_date),
            end_date: raw.end_date.or(self.end_date),
            project_id: raw.project_id.unwrap_or_else(|| self.project_id.clone()),
            waterflow: raw.waterflow.or(self.waterflow),
            boat_type: raw.boat_type.unwrap_or_else(|| self.boat_type.clone()),
            crew: raw.crew.map(crew_triple).unwrap_or_else(|| self.crew.clone()),
            position: raw.position.map(Position::from).or(self.position),
            comment: raw.comment.unwrap_or_else(|| self.comment.clone()),
            species: raw
                .species
                .map(normalize_species)
                .unwrap_or_else(|| self.species.clone()),
            stations: raw.stations.unwrap_or_else(|| self.stations.clone()),
        }
    }
}

impl Reconcile for Station {
    type Raw = RawStation;

    fn raw_id(raw: &RawStation) -> i64 {
        raw.id
    }

    fn from_raw(raw: RawStation) -> Self {
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            date: raw.date,
            start_pos: raw.start_pos.map(Position::from),
            end_pos: raw.end_pos.map(Position::from),
            time: raw.time.unwrap_or_default(),
            river_id: raw.river_id,
            description: raw.description.unwrap_or_default(),
            comment: raw.comment.unwrap_or_default(),
            river_type: raw.river_type.unwrap_or_default(),
            weather: raw.weather.unwrap_or_default(),
            water_temp: raw.water_temp,
            air_temp: raw.air_temp,
            sec_fished: raw.sec_fished.unwrap_or(0.0),
            voltage: raw.voltage,
            pulse: raw.pulse,
            conductivity: raw.conductivity,
            species: normalize_species(raw.species.unwrap_or_default()),
            observations: raw
                .observations
                .unwrap_or_default()
                .into_iter()
                .map(Observation::from_raw)
                .collect(),
            transect_length: raw.transect_length,
            display: raw.display.unwrap_or(true),
            gpx_file: raw.gpx_file,
        }
    }

    fn merged_with(&self, raw: RawStation) -> Self {
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_else(|| self.name.clone()),
            date: raw.date.or(self.date),
            start_pos: raw.start_pos.map(Position::from).or(self.start_pos),
            end_pos: raw.end_pos.map(Position::from).or(self.end_pos),
            time: raw.time.unwrap_or_else(|| self.time.clone()),
            river_id: raw.river_id.or(self.river_id),
            description: raw.description.unwrap_or_else(|| self.description.clone()),
            comment: raw.comment.unwrap_or_else(|| self.comment.clone()),
            river_type: raw.river_type.unwrap_or_else(|| self.river_type.clone()),
            weather: raw.weather.unwrap_or_else(|| self.weather.clone()),
            water_temp: raw.water_temp.or(self.water_temp),
            air_temp: raw.air_temp.or(self.air_temp),
            sec_fished: raw.sec_fished.unwrap_or(self.sec_fished),
            voltage: raw.voltage.or(self.voltage),
            pulse: raw.pulse.or(self.pulse),
            conductivity: raw.conductivity.or(self.conductivity),
            species: raw
                .species
                .map(normalize_species)
                .unwrap_or_else(|| self.species.clone()),
            observations: raw
                .observations
                .map(|observations| {
                    observations.into_iter().map(Observation::from_raw).collect()
                })
                .unwrap_or_else(|| self.observations.clone()),
            transect_length: raw.transect_length.or(self.transect_length),
            display: raw.display.unwrap_or(self.display),
            gpx_file: raw.gpx_file.or_else(|| self.gpx_file.clone()),
        }
    }
}

pub fn normalize_species(species: Vec<String>) -> Vec<String> {
    species
        .into_iter()
        .map(|name| name.to_lowercase())
        .collect()
}

/// Crew is an ordered triple, padded with empty strings and truncated past
/// three members.
pub fn crew_triple(crew: Vec<String>) -> [String; 3] {
    let mut iter = crew.into_iter();
    [
        iter.next().unwrap_or_default(),
        iter.next().unwrap_or_default(),
        iter.next().unwrap_or_default(),
    ]
}

fn date_label(date: Option<NaiveDate>) -> String {
    date.map(|date| date.to_string()).unwrap_or_default()
}
