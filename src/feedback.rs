use serde::Serialize;

use crate::error::FangstError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCode {
    ServiceUnavailable,
    AuthFailed,
    RiverNotFound,
    StationNotFound,
    ChartFailed,
    ExportFailed,
    SyncComplete,
    ExportComplete,
}

impl FeedbackCode {
    pub fn kind(self) -> FeedbackKind {
        match self {
            FeedbackCode::SyncComplete | FeedbackCode::ExportComplete => FeedbackKind::Success,
            _ => FeedbackKind::Error,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FeedbackCode::ServiceUnavailable => "the data service is unavailable, try again later",
            FeedbackCode::AuthFailed => "sign-in failed, check your credentials",
            FeedbackCode::RiverNotFound => "the requested river is not loaded",
            FeedbackCode::StationNotFound => "the requested station is not loaded",
            FeedbackCode::ChartFailed => "could not build chart data from the loaded records",
            FeedbackCode::ExportFailed => "could not generate the export file",
            FeedbackCode::SyncComplete => "survey data is up to date",
            FeedbackCode::ExportComplete => "export file written",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub code: FeedbackCode,
    pub message: String,
}

impl Feedback {
    pub fn new(code: FeedbackCode) -> Self {
        Self {
            kind: code.kind(),
            code,
            message: code.message().to_string(),
        }
    }
}

/// Queue of user-facing messages. A code already waiting in the queue is not
/// queued a second time.
#[derive(Debug, Default)]
pub struct FeedbackQueue {
    entries: Vec<Feedback>,
}

impl FeedbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, code: FeedbackCode) {
        if self.entries.iter().any(|entry| entry.code == code) {
            return;
        }
        self.entries.push(Feedback::new(code));
    }

    pub fn push_error(&mut self, error: &FangstError) {
        self.push(feedback_code_for(error));
    }

    pub fn drain(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub fn feedback_code_for(error: &FangstError) -> FeedbackCode {
    match error {
        FangstError::ApiHttp(_) | FangstError::ApiStatus { .. } => {
            FeedbackCode::ServiceUnavailable
        }
        FangstError::Auth(_) => FeedbackCode::AuthFailed,
        FangstError::RiverNotFound(_) => FeedbackCode::RiverNotFound,
        FangstError::StationNotFound(_) => FeedbackCode::StationNotFound,
        FangstError::Chart(_) => FeedbackCode::ChartFailed,
        FangstError::Export(_) | FangstError::Filesystem(_) => FeedbackCode::ExportFailed,
        FangstError::MissingConfig
        | FangstError::ConfigRead(_)
        | FangstError::ConfigParse(_) => FeedbackCode::ServiceUnavailable,
    }
}
