//! Static task catalog.
//!
//! The only place maximum scores live. Module maxima and the global maximum
//! are derived from the task entries below.

use serde::Serialize;

use crate::error::EvalError;
use crate::model::ScoringStrategy::{Deterministic, Examiner};
use crate::model::{Module, ScoringStrategy, TaskId};
use crate::rubric;

/// Immutable descriptor of one task.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub id: TaskId,
    pub module: Module,
    pub max_score: u32,
    pub strategy: ScoringStrategy,
    /// Task-specific rubric section for model-assisted tasks.
    #[serde(skip)]
    pub rubric: Option<&'static str>,
    /// Names of the per-criterion checks the model must return.
    pub checks: &'static [&'static str],
}

const fn task(id: TaskId, module: Module, max_score: u32, strategy: ScoringStrategy) -> TaskDefinition {
    TaskDefinition {
        id,
        module,
        max_score,
        strategy,
        rubric: None,
        checks: &[],
    }
}

const fn assisted(
    id: TaskId,
    module: Module,
    max_score: u32,
    rubric: &'static str,
    checks: &'static [&'static str],
) -> TaskDefinition {
    TaskDefinition {
        id,
        module,
        max_score,
        strategy: ScoringStrategy::ModelAssisted,
        rubric: Some(rubric),
        checks,
    }
}

// Entries are in `TaskId` declaration order; `definition` indexes by discriminant.
static CATALOG: [TaskDefinition; 19] = [
    assisted(TaskId::ATrail, Module::Visuospatial, 1, rubric::TRAIL, &["sequenceCorrect"]),
    assisted(
        TaskId::BCube,
        Module::Visuospatial,
        1,
        rubric::CUBE,
        &["cube3D", "cubeLines", "cubeParallelism"],
    ),
    assisted(
        TaskId::CClock,
        Module::Visuospatial,
        3,
        rubric::CLOCK,
        &["contour", "numbers", "hands"],
    ),
    task(TaskId::NamingLion, Module::Naming, 1, Deterministic),
    task(TaskId::NamingRhino, Module::Naming, 1, Deterministic),
    task(TaskId::NamingCamel, Module::Naming, 1, Deterministic),
    task(TaskId::MemoryTrial1, Module::Memory, 0, Deterministic),
    task(TaskId::MemoryTrial2, Module::Memory, 0, Deterministic),
    task(TaskId::AttentionDigitsForward, Module::Attention, 1, Examiner),
    task(TaskId::AttentionDigitsBackward, Module::Attention, 1, Examiner),
    task(TaskId::AttentionLetterTap, Module::Attention, 1, Examiner),
    task(TaskId::AttentionSerialSevens, Module::Attention, 3, Examiner),
    task(TaskId::LanguageSentence1, Module::Language, 1, Examiner),
    task(TaskId::LanguageSentence2, Module::Language, 1, Examiner),
    task(TaskId::LanguageFluency, Module::Language, 1, Examiner),
    assisted(TaskId::AbstractionTrain, Module::Abstraction, 1, rubric::ABSTRACTION_TRAIN, &[]),
    assisted(TaskId::AbstractionWatch, Module::Abstraction, 1, rubric::ABSTRACTION_WATCH, &[]),
    task(TaskId::DelayedRecall, Module::DelayedRecall, 5, Deterministic),
    task(TaskId::Orientation, Module::Orientation, 6, Deterministic),
];

/// Definition for a known task.
pub fn definition(id: TaskId) -> &'static TaskDefinition {
    &CATALOG[id as usize]
}

/// Resolve a wire task id. Fails with `UnknownTask` for ids outside the catalog.
pub fn lookup(id: &str) -> Result<&'static TaskDefinition, EvalError> {
    let task: TaskId = id.parse()?;
    Ok(definition(task))
}

/// All definitions, in administration order.
pub fn all() -> &'static [TaskDefinition] {
    &CATALOG
}

/// Definitions belonging to `module`.
pub fn tasks_for(module: Module) -> impl Iterator<Item = &'static TaskDefinition> {
    CATALOG.iter().filter(move |d| d.module == module)
}

/// Maximum achievable score for a module.
pub fn module_max(module: Module) -> u32 {
    tasks_for(module).map(|d| d.max_score).sum()
}

/// Strategy shared by every task of a module.
pub fn module_strategy(module: Module) -> ScoringStrategy {
    tasks_for(module)
        .map(|d| d.strategy)
        .next()
        .unwrap_or(ScoringStrategy::Deterministic)
}

/// Whether a module contributes to the total.
pub fn module_is_scored(module: Module) -> bool {
    module_max(module) > 0
}

/// Maximum achievable total before adjustments.
pub fn total_max() -> u32 {
    CATALOG.iter().map(|d| d.max_score).sum()
}
