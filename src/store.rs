use std::collections::BTreeMap;

use crate::domain::{RawRiver, RawStation, Reconcile, River, Station};

/// Build a keyed collection from incoming wire records, or merge them into an
/// already populated one. An empty store is replaced wholesale; otherwise each
/// incoming record is inserted or merged over the existing entry for its id,
/// so a later partial fetch never clobbers fields loaded earlier.
pub fn reconcile_collection<T: Reconcile>(existing: &mut BTreeMap<i64, T>, incoming: Vec<T::Raw>) {
    if existing.is_empty() {
        *existing = incoming
            .into_iter()
            .map(|raw| (T::raw_id(&raw), T::from_raw(raw)))
            .collect();
        return;
    }
    for raw in incoming {
        reconcile_record(existing, raw);
    }
}

pub fn reconcile_record<T: Reconcile>(existing: &mut BTreeMap<i64, T>, raw: T::Raw) {
    let id = T::raw_id(&raw);
    let record = match existing.get(&id) {
        Some(current) => current.merged_with(raw),
        None => T::from_raw(raw),
    };
    existing.insert(id, record);
}

/// Process-wide survey data, injected into the operations that need it.
/// Records are created on fetch, updated by merge and only removed by
/// clearing the whole store.
#[derive(Debug, Default)]
pub struct Store {
    rivers: BTreeMap<i64, River>,
    stations: BTreeMap<i64, Station>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rivers(&self) -> &BTreeMap<i64, River> {
        &self.rivers
    }

    pub fn stations(&self) -> &BTreeMap<i64, Station> {
        &self.stations
    }

    pub fn river(&self, id: i64) -> Option<&River> {
        self.rivers.get(&id)
    }

    pub fn station(&self, id: i64) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn reconcile_rivers(&mut self, incoming: Vec<RawRiver>) {
        reconcile_collection(&mut self.rivers, incoming);
    }

    pub fn reconcile_stations(&mut self, incoming: Vec<RawStation>) {
        reconcile_collection(&mut self.stations, incoming);
    }

    pub fn reconcile_river(&mut self, raw: RawRiver) {
        reconcile_record(&mut self.rivers, raw);
    }

    pub fn reconcile_station(&mut self, raw: RawStation) {
        reconcile_record(&mut self.stations, raw);
    }

    /// Stations referenced by the river's station list. Ids missing from the
    /// station store are skipped.
    pub fn stations_for_river(&self, river: &River) -> BTreeMap<i64, Station> {
        river
            .stations
            .iter()
            .filter_map(|id| self.stations.get(id).map(|station| (*id, station.clone())))
            .collect()
    }

    pub fn river_of_station(&self, station: &Station) -> Option<&River> {
        station.river_id.and_then(|id| self.rivers.get(&id))
    }

    pub fn clear(&mut self) {
        self.rivers.clear();
        self.stations.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rivers.is_empty() && self.stations.is_empty()
    }
}
