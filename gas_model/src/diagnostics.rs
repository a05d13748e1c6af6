use crate::error::PipelineError;
use log::warn;
use std::fmt;

/// Pipeline stage that reported a degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Normalize,
    Profile,
    Model,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Profile => "profile",
            Stage::Model => "model",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Diagnostic {
    pub stage: Stage,
    pub error: PipelineError,
}

/// Side channel for soft failures.
///
/// Every stage above the transport degrades to an empty table instead of
/// returning an error; the reason ends up here (and in the log) so callers
/// can tell "legitimately empty" from "degraded".
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, stage: Stage, error: PipelineError) {
        warn!("[{}] {}", stage, error);
        self.entries.push(Diagnostic { stage, error });
    }

    pub fn is_degraded(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn at_stage(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.stage == stage)
    }
}
