use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::api::ApiClient;
use crate::chart::{
    Histogram, HistogramOptions, RiverStations, SeriesOptions, category_counts, length_histogram,
    length_samples,
};
use crate::config::ResolvedConfig;
use crate::domain::{River, Station};
use crate::error::FangstError;
use crate::export;
use crate::feedback::{Feedback, FeedbackCode, FeedbackQueue};
use crate::filter;
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub search: String,
    pub species: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub rivers: usize,
    pub stations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub rivers: Vec<ListEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub id: i64,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub project_id: String,
    pub species: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResult {
    pub river: River,
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Counts,
    Histogram,
    Samples,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartLevel {
    Rivers,
    Stations,
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub kind: ChartKind,
    pub level: ChartLevel,
    /// Empty means every species seen in the loaded records.
    pub species: Vec<String>,
    pub include_others: bool,
    pub absolute: bool,
    pub interval: Option<u32>,
    pub combine: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "data")]
pub enum ChartResult {
    Counts(BTreeMap<String, BTreeMap<String, f64>>),
    Histogram(BTreeMap<String, BTreeMap<String, Histogram>>),
    Samples(BTreeMap<String, BTreeMap<String, Vec<f64>>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    Rivers,
    Stations,
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub river_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared: bool,
}

/// Orchestrates fetch, reconcile, filter, aggregation and export over an
/// injected API client and store. Core errors are recorded on the feedback
/// queue before being returned, so the caller can print both.
pub struct App<C: ApiClient> {
    api: C,
    config: ResolvedConfig,
    store: Store,
    feedback: FeedbackQueue,
}

impl<C: ApiClient> App<C> {
    pub fn new(api: C, config: ResolvedConfig) -> Self {
        Self {
            api,
            config,
            store: Store::new(),
            feedback: FeedbackQueue::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn drain_feedback(&mut self) -> Vec<Feedback> {
        self.feedback.drain()
    }

    /// Pull the river and station lists and merge them into the store.
    pub fn sync(&mut self) -> Result<SyncResult, FangstError> {
        let rivers = match self.api.fetch_rivers() {
            Ok(records) => records,
            Err(err) => return self.fail(err),
        };
        let stations = match self.api.fetch_stations() {
            Ok(records) => records,
            Err(err) => return self.fail(err),
        };
        self.store.reconcile_rivers(rivers);
        self.store.reconcile_stations(stations);
        self.feedback.push(FeedbackCode::SyncComplete);
        Ok(SyncResult {
            rivers: self.store.rivers().len(),
            stations: self.store.stations().len(),
        })
    }

    /// Detail fetch merged over the list-view record, so fields loaded earlier
    /// survive the partial payload.
    pub fn enrich_river(&mut self, id: i64) -> Result<(), FangstError> {
        let records = match self.api.fetch_river_summary(id) {
            Ok(records) => records,
            Err(err) => return self.fail(err),
        };
        if records.is_empty() {
            return self.fail(FangstError::RiverNotFound(id));
        }
        for raw in records {
            self.store.reconcile_river(raw);
        }
        Ok(())
    }

    pub fn enrich_station(&mut self, id: i64) -> Result<(), FangstError> {
        let records = match self.api.fetch_station_summary(id) {
            Ok(records) => records,
            Err(err) => return self.fail(err),
        };
        if records.is_empty() {
            return self.fail(FangstError::StationNotFound(id));
        }
        for raw in records {
            self.store.reconcile_station(raw);
        }
        Ok(())
    }

    pub fn list(&self, options: &ListOptions) -> ListResult {
        let rivers = filter::filter_by_search(
            self.store.rivers(),
            &[
                &|river: &River| river.name.clone(),
                &|river: &River| river.project_id.clone(),
            ],
            &options.search,
        );
        let rivers = filter::filter_by_species(
            &rivers,
            |river: &River| river.species.as_slice(),
            &options.species,
        );
        let rivers = filter::filter_by_date_range(
            &rivers,
            |river: &River| {
                river
                    .start_date
                    .into_iter()
                    .chain(river.end_date)
                    .collect()
            },
            options.from,
            options.to,
        );

        ListResult {
            rivers: rivers
                .values()
                .map(|river| ListEntry {
                    id: river.id,
                    name: river.name.clone(),
                    start_date: river.start_date,
                    end_date: river.end_date,
                    project_id: river.project_id.clone(),
                    species: river.species.clone(),
                })
                .collect(),
        }
    }

    pub fn info(&mut self, river_id: i64) -> Result<InfoResult, FangstError> {
        let Some(river) = self.store.river(river_id).cloned() else {
            return self.fail(FangstError::RiverNotFound(river_id));
        };
        let stations = self
            .store
            .stations_for_river(&river)
            .into_values()
            .collect();
        Ok(InfoResult { river, stations })
    }

    pub fn chart(&mut self, options: &ChartOptions) -> Result<ChartResult, FangstError> {
        let species = self.chart_species(&options.species);
        if species.is_empty() {
            return self.fail(FangstError::Chart(
                "no species selected and none present in the loaded records".to_string(),
            ));
        }

        let result = match options.level {
            ChartLevel::Stations => {
                let stations: Vec<&Station> = self.store.stations().values().collect();
                self.build_chart(stations.into_iter(), options, species)
            }
            ChartLevel::Rivers => {
                let views: Vec<RiverStations<'_>> = self
                    .store
                    .rivers()
                    .values()
                    .map(|river| RiverStations::collect(river, self.store.stations()))
                    .collect();
                self.build_chart(views.iter(), options, species)
            }
        };
        Ok(result)
    }

    fn build_chart<'a, S, I>(&self, sources: I, options: &ChartOptions, species: Vec<String>) -> ChartResult
    where
        S: crate::chart::ObservationSource + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        match options.kind {
            ChartKind::Counts => ChartResult::Counts(category_counts(
                sources,
                &SeriesOptions {
                    species,
                    include_others: options.include_others,
                    absolute: options.absolute,
                },
            )),
            ChartKind::Histogram => ChartResult::Histogram(length_histogram(
                sources,
                &HistogramOptions {
                    species,
                    interval: options.interval.unwrap_or(self.config.interval),
                    include_others: options.include_others,
                    combine: options.combine,
                },
            )),
            ChartKind::Samples => ChartResult::Samples(length_samples(sources, &species)),
        }
    }

    fn chart_species(&self, requested: &[String]) -> Vec<String> {
        if !requested.is_empty() {
            return requested.iter().map(|name| name.to_lowercase()).collect();
        }
        if !self.config.species.is_empty() {
            return self.config.species.clone();
        }
        filter::selectable_species(
            self.store
                .stations()
                .values()
                .map(|station| station.species.as_slice()),
        )
    }

    /// Full-dataset download. Observation-bearing detail records are fetched
    /// for every station in scope before the wide rows are formatted, then a
    /// single CSV is written atomically.
    pub fn export(
        &mut self,
        target: ExportTarget,
        options: &ExportOptions,
    ) -> Result<ExportResult, FangstError> {
        let station_ids = self.export_station_ids(&options.river_ids);
        if !station_ids.is_empty() {
            let records = match self.api.fetch_station_download(&station_ids) {
                Ok(records) => records,
                Err(err) => return self.fail(err),
            };
            self.store.reconcile_stations(records);
        }

        let rivers = self.export_rivers(&options.river_ids);
        let (header, rows, path) = match target {
            ExportTarget::Rivers => {
                let (header, rows) = export::rivers_export(&rivers, self.store.stations());
                (header, rows, self.config.export_dir.join("rivers.csv"))
            }
            ExportTarget::Stations => {
                let stations = self.export_stations(&rivers);
                let (header, rows) = export::stations_export(&stations, self.store.rivers());
                (header, rows, self.config.export_dir.join("stations.csv"))
            }
        };

        if let Err(err) = export::write_csv(&path, &header, &rows) {
            return self.fail(err);
        }
        self.feedback.push(FeedbackCode::ExportComplete);
        Ok(ExportResult {
            path: path.to_string(),
            rows: rows.len(),
        })
    }

    pub fn clear(&mut self) -> ClearResult {
        self.store.clear();
        ClearResult { cleared: true }
    }

    fn export_rivers(&self, river_ids: &[i64]) -> BTreeMap<i64, River> {
        if river_ids.is_empty() {
            return self.store.rivers().clone();
        }
        river_ids
            .iter()
            .filter_map(|id| self.store.river(*id).map(|river| (*id, river.clone())))
            .collect()
    }

    fn export_stations(&self, rivers: &BTreeMap<i64, River>) -> BTreeMap<i64, Station> {
        rivers
            .values()
            .flat_map(|river| self.store.stations_for_river(river))
            .collect()
    }

    fn export_station_ids(&self, river_ids: &[i64]) -> Vec<i64> {
        let rivers = self.export_rivers(river_ids);
        let mut ids: Vec<i64> = rivers
            .values()
            .flat_map(|river| river.stations.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn fail<T>(&mut self, err: FangstError) -> Result<T, FangstError> {
        self.feedback.push_error(&err);
        Err(err)
    }
}
