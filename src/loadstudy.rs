use crate::bus::BusRecord;
use crate::line::SegmentRecord;
use crate::relay::RelayRatios;
use crate::transformer::TransformerSpec;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Inputs of one short-circuit study: the source bus, the line trace from
/// the bus to the fault and, optionally, a transformer at the end of it.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyCase {
    #[serde(default)]
    pub name: String,

    pub bus: BusRecord,

    #[serde(default)]
    pub line: Vec<SegmentRecord>,

    #[serde(default)]
    pub transformer: Option<TransformerSpec>,

    #[serde(default)]
    pub relay: Option<RelayRatios>,
}

pub fn load_study(study_path: &PathBuf) -> Result<StudyCase> {
    let text = fs::read_to_string(study_path)
        .with_context(|| format!("reading {}", study_path.display()))?;
    let case: StudyCase = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", study_path.display()))?;
    log::debug!(
        "{}: {} line segments, transformer: {}",
        study_path.display(),
        case.line.len(),
        case.transformer.is_some()
    );
    Ok(case)
}
