//! Rubric prompts for model-assisted tasks.
//!
//! Each prompt is deterministic for a given task: shared strict-judging rules
//! followed by the task criteria and the exact JSON shape expected back.

use crate::catalog::TaskDefinition;
use crate::model::ScoringStrategy;

const DRAWING_RULES: &str = "\
Role: MoCA examiner, visuospatial section. Strict mode.
Rules:
- When in doubt, do NOT award the point.
- If a criterion cannot be verified clearly, set pass=false and say why in a few words.
- Scribbles, abstract or illegible drawings: score=0 and unscorable=false.
- unscorable=true ONLY if the image is completely blank or a single solid colour.
Output: ONLY valid JSON, exactly the schema given. Keep notes very short.";

const ABSTRACTION_RULES: &str = "\
Role: MoCA examiner, abstraction section. Strict mode.
The patient was asked in what way the two items are alike.
Rules:
- Award 1 ONLY for an abstract category answer. Concrete features score 0.
- When in doubt, score 0.
Output: ONLY valid JSON, exactly the schema given. Notes at most 5 words.";

pub(crate) const TRAIL: &str = r#"TASK: Trail making (alternation).
Goal: connect EXACTLY 1-A-2-B-3-C-4-D-5-E.

CRITERIA [A_TRAIL] (max 1):
- score=1 ONLY if the sequence is perfect and no line crosses incorrectly.
- Any ordering error, omission, disconnection or incorrect crossing: score=0.

OUTPUT SCHEMA (strict):
{
  "taskId": "A_TRAIL",
  "unscorable": boolean,
  "score": number,
  "maxScore": 1,
  "confidence": number,
  "checks": {
    "sequenceCorrect": { "pass": boolean, "notes": string }
  },
  "overallNotes": string
}"#;

pub(crate) const CUBE: &str = r#"TASK: Cube copy.

CRITERIA [B_CUBE] (max 1), controlled clinical tolerance:
- There must be a CLEAR attempt at a three-dimensional cube.
- At least 3 connected faces forming a volume must be identifiable.
- Slight distortion of proportion or parallelism is allowed IF the volume is recognisable.
- score=0 if the figure is flat (square or rectangle without depth), the lines are chaotic
  or abstract, extra lines alter the structure, or open vertices prevent identifying a volume.

OUTPUT SCHEMA (strict):
{
  "taskId": "B_CUBE",
  "unscorable": boolean,
  "score": number,
  "maxScore": 1,
  "confidence": number,
  "checks": {
    "cube3D": { "pass": boolean, "notes": string },
    "cubeLines": { "pass": boolean, "notes": string },
    "cubeParallelism": { "pass": boolean, "notes": string }
  },
  "overallNotes": string
}"#;

pub(crate) const CLOCK: &str = r#"TASK: Clock drawing (ten past eleven).

OBJECT CHECK:
- If the drawing is NOT a clock (heart, face, spiral, other object): score=0 and unscorable=false.

CRITERIA [C_CLOCK] (max 3, 1 point each):
1) contour: acceptable closed circle. Open contour: 0.
2) numbers: 1 to 12 present, legible, in order and inside the contour. Otherwise 0.
3) hands: show about 11:10. Minute hand towards 2, hour hand towards 11 (or between 11 and 12),
   two hands joined at the centre, hour hand shorter than minute hand.
   Indistinguishable hands or another time: 0.

OUTPUT SCHEMA (strict):
{
  "taskId": "C_CLOCK",
  "unscorable": boolean,
  "score": number,
  "maxScore": 3,
  "confidence": number,
  "checks": {
    "contour": { "pass": boolean, "notes": string },
    "numbers": { "pass": boolean, "notes": string },
    "hands": { "pass": boolean, "notes": string }
  },
  "overallNotes": string
}"#;

pub(crate) const ABSTRACTION_TRAIN: &str = r#"TASK: ABSTRACTION_TRAIN (train / bicycle).
Required: "transport", "vehicle", "means of travel" or equivalent. Concrete answers such as "wheels" score 0.

OUTPUT SCHEMA (strict):
{ "taskId": "ABSTRACTION_TRAIN", "score": 0 | 1, "notes": string }"#;

pub(crate) const ABSTRACTION_WATCH: &str = r#"TASK: ABSTRACTION_WATCH (watch / ruler).
Required: "measuring instruments", "used to measure" or equivalent. Concrete answers such as "numbers" score 0.

OUTPUT SCHEMA (strict):
{ "taskId": "ABSTRACTION_WATCH", "score": 0 | 1, "notes": string }"#;

/// Full system prompt for a model-assisted task, or `None` for other strategies.
pub fn system_prompt(definition: &TaskDefinition) -> Option<String> {
    if definition.strategy != ScoringStrategy::ModelAssisted {
        return None;
    }
    let criteria = definition.rubric?;
    let rules = if definition.checks.is_empty() {
        ABSTRACTION_RULES
    } else {
        DRAWING_RULES
    };
    Some(format!("{rules}\n\n{criteria}"))
}

/// Text part of the user message accompanying an image.
pub fn drawing_user_text(definition: &TaskDefinition) -> String {
    format!("Task: {}", definition.id)
}

/// User message carrying a patient's abstraction answer.
pub fn abstraction_user_text(response: &str) -> String {
    format!("Input: \"{}\"", response.replace('"', "'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{all, definition};
    use crate::model::TaskId;

    #[test]
    fn prompts_are_deterministic() {
        let def = definition(TaskId::CClock);
        assert_eq!(system_prompt(def), system_prompt(def));
    }

    #[test]
    fn drawing_prompts_name_every_check() {
        for def in all().iter().filter(|d| !d.checks.is_empty()) {
            let prompt = system_prompt(def).unwrap();
            assert!(prompt.contains(def.id.as_str()));
            assert!(prompt.contains("When in doubt, do NOT award"));
            for check in def.checks {
                assert!(prompt.contains(check), "{} missing {check}", def.id);
            }
        }
    }

    #[test]
    fn abstraction_prompt_uses_abstraction_rules() {
        let prompt = system_prompt(definition(TaskId::AbstractionWatch)).unwrap();
        assert!(prompt.contains("abstraction section"));
        assert!(prompt.contains("\"taskId\": \"ABSTRACTION_WATCH\""));
    }

    #[test]
    fn no_prompt_for_rule_based_tasks() {
        assert!(system_prompt(definition(TaskId::Orientation)).is_none());
        assert!(system_prompt(definition(TaskId::AttentionSerialSevens)).is_none());
    }

    #[test]
    fn user_text_quotes_response() {
        assert_eq!(
            abstraction_user_text("they \"move\" people"),
            "Input: \"they 'move' people\""
        );
    }
}
