use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a whole page: the data file could not be read.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("data file not found at `{}`", .0.display())]
    DataFileMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

/// Why a single section of a page was withheld.
///
/// None of these are fatal; the remaining sections still render.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    #[error("requires {} column(s)", quote_list(.0))]
    MissingColumns(Vec<&'static str>),

    #[error("no data available for the selected filters")]
    NoData,

    #[error("select a single agent to view key metrics")]
    SingleAgentRequired,

    #[error("platform usage is available only when all {0} platforms are selected")]
    AllPlatformsRequired(usize),
}

fn quote_list(cols: &[&'static str]) -> String {
    cols.iter()
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of one dashboard section.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ready(T),
    Withheld(Notice),
}

impl<T> Section<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(v) => Some(v),
            Section::Withheld(_) => None,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Section::Ready(_) => None,
            Section::Withheld(n) => Some(n),
        }
    }
}
