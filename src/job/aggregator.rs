//! Weighted multi-stage progress model.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::progress::{ProgressEvent, ProgressSnapshot};

const MAX_STORED_MESSAGES: usize = 32;
const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Starting,
    Preprocessing,
    Generation,
    Finalizing,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Starting => "starting",
            StageKind::Preprocessing => "preprocessing",
            StageKind::Generation => "generation",
            StageKind::Finalizing => "finalizing",
        }
    }

    /// Only the generator reports its own percentage.
    pub fn reports_progress(self) -> bool {
        matches!(self, StageKind::Generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub kind: StageKind,
    pub weight: f64,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn reports_progress(&self) -> bool {
        self.kind.reports_progress()
    }
}

/// Stage weights for one run. Weights must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageTable {
    pub starting: f64,
    pub preprocessing: f64,
    pub generation: f64,
    pub finalizing: f64,
}

impl Default for StageTable {
    fn default() -> Self {
        Self {
            starting: 0.1,
            preprocessing: 0.1,
            generation: 0.7,
            finalizing: 0.1,
        }
    }
}

impl StageTable {
    pub fn stage(&self, kind: StageKind) -> Stage {
        let weight = match kind {
            StageKind::Starting => self.starting,
            StageKind::Preprocessing => self.preprocessing,
            StageKind::Generation => self.generation,
            StageKind::Finalizing => self.finalizing,
        };
        Stage { kind, weight }
    }

    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("starting", self.starting),
            ("preprocessing", self.preprocessing),
            ("generation", self.generation),
            ("finalizing", self.finalizing),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("stage weight '{}' must be a non-negative number", name));
            }
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if (total - 1.0).abs() > WEIGHT_EPSILON {
            return Err(format!("stage weights must sum to 1.0, got {}", total));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    stage: Option<StageKind>,
    cumulative_before_current: f64,
    current_weight: f64,
    current_fraction: f64,
    description: Option<String>,
}

/// Maps stage-local child percentages onto overall [0, 1] progress.
///
/// Entering a stage always commits the previous stage's full weight, so the
/// overall value never drops when crossing a stage boundary even if the child
/// never printed a final 100%.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    state: ProgressState,
    messages: VecDeque<String>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_stage(&mut self, stage: &Stage, description: Option<String>) {
        let state = &mut self.state;
        state.cumulative_before_current =
            (state.cumulative_before_current + state.current_weight).min(1.0);
        state.current_weight = stage.weight.clamp(0.0, 1.0);
        state.current_fraction = 0.0;
        state.stage = Some(stage.kind);
        if description.is_some() {
            state.description = description;
        }
        tracing::debug!(
            stage = stage.name(),
            committed = state.cumulative_before_current,
            "entered stage"
        );
    }

    pub fn consume(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Progress(percent) => {
                self.state.current_fraction = (f64::from(percent) / 100.0).clamp(0.0, 1.0);
            }
            ProgressEvent::Message(text) => {
                tracing::debug!(target: "memo_runner::child", "{}", text);
                if self.messages.len() >= MAX_STORED_MESSAGES {
                    self.messages.pop_front();
                }
                self.messages.push_back(text);
            }
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.state.description = Some(description.into());
    }

    /// Commit the current stage in full. Overall progress becomes 1.0 once
    /// every stage has been entered.
    pub fn complete(&mut self, description: Option<String>) {
        let state = &mut self.state;
        let committed = state.cumulative_before_current + state.current_weight;
        // Summed float weights land a hair short of 1.0.
        state.cumulative_before_current = if (1.0 - committed).abs() <= WEIGHT_EPSILON {
            1.0
        } else {
            committed.min(1.0)
        };
        state.current_weight = 0.0;
        state.current_fraction = 0.0;
        if description.is_some() {
            state.description = description;
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = &self.state;
        let fraction = state.cumulative_before_current + state.current_weight * state.current_fraction;
        ProgressSnapshot {
            fraction: fraction.clamp(0.0, 1.0),
            description: state.description.clone(),
            stage: state.stage.map(StageKind::name),
        }
    }

    /// Most recent non-progress lines from the child, oldest first.
    pub fn recent_messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}
