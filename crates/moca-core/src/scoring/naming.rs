//! Animal naming: three pictures, one point each.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::normalize_answer;
use crate::model::{EvaluationResult, ResultDetails, TaskId};

/// Accepted answers per picture, already normalised.
const ACCEPTED: [(TaskId, &[&str]); 3] = [
    (TaskId::NamingLion, &["leon", "lion"]),
    (TaskId::NamingRhino, &["rinoceronte", "rhino", "rhinoceros"]),
    (TaskId::NamingCamel, &["camello", "camel", "dromedario"]),
];

/// What the patient wrote or said for each picture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingAnswers {
    #[serde(alias = "NAMING_LION")]
    pub lion: String,
    #[serde(alias = "NAMING_RHINO")]
    pub rhino: String,
    #[serde(alias = "NAMING_CAMEL")]
    pub camel: String,
}

impl NamingAnswers {
    fn answer(&self, task: TaskId) -> &str {
        match task {
            TaskId::NamingLion => &self.lion,
            TaskId::NamingRhino => &self.rhino,
            _ => &self.camel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingItem {
    pub correct: bool,
    pub user_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingOutcome {
    pub total_score: u32,
    pub results: BTreeMap<TaskId, NamingItem>,
}

impl NamingOutcome {
    /// One result per picture.
    pub fn evaluations(&self) -> Vec<EvaluationResult> {
        self.results
            .iter()
            .map(|(task, item)| {
                EvaluationResult::scored(
                    *task,
                    i64::from(item.correct),
                    ResultDetails::Naming {
                        user_answer: item.user_answer.clone(),
                        correct: item.correct,
                    },
                )
            })
            .collect()
    }
}

/// Whether `answer` names the animal shown for `task`.
pub fn is_correct(task: TaskId, answer: &str) -> bool {
    let answer = normalize_answer(answer);
    if answer.is_empty() {
        return false;
    }
    ACCEPTED
        .iter()
        .find(|(t, _)| *t == task)
        .is_some_and(|(_, synonyms)| synonyms.iter().any(|s| answer.contains(s)))
}

/// Score all three pictures.
pub fn score(answers: &NamingAnswers) -> NamingOutcome {
    let results: BTreeMap<TaskId, NamingItem> = ACCEPTED
        .iter()
        .map(|(task, _)| {
            let user_answer = answers.answer(*task).to_string();
            let correct = is_correct(*task, &user_answer);
            (
                *task,
                NamingItem {
                    correct,
                    user_answer,
                },
            )
        })
        .collect();
    let total_score = results.values().filter(|i| i.correct).count() as u32;
    NamingOutcome {
        total_score,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(lion: &str, rhino: &str, camel: &str) -> NamingAnswers {
        NamingAnswers {
            lion: lion.into(),
            rhino: rhino.into(),
            camel: camel.into(),
        }
    }

    #[test]
    fn accepts_synonyms_regardless_of_case_and_accents() {
        for lion in ["león", "LEON", " Lion ", "un León"] {
            assert!(is_correct(TaskId::NamingLion, lion), "{lion}");
        }
        for rhino in ["Rinoceronte", "rhinoceros", "RHINO"] {
            assert!(is_correct(TaskId::NamingRhino, rhino), "{rhino}");
        }
        for camel in ["camello", "Dromedario", "CAMEL"] {
            assert!(is_correct(TaskId::NamingCamel, camel), "{camel}");
        }
    }

    #[test]
    fn rejects_other_animals_and_blanks() {
        assert!(!is_correct(TaskId::NamingLion, "tigre"));
        assert!(!is_correct(TaskId::NamingRhino, "hipopótamo"));
        assert!(!is_correct(TaskId::NamingCamel, "caballo"));
        assert!(!is_correct(TaskId::NamingCamel, "   "));
        // A lion is not a camel.
        assert!(!is_correct(TaskId::NamingCamel, "león"));
    }

    #[test]
    fn total_counts_correct_items() {
        let outcome = score(&answers("León", "elefante", "camello"));
        assert_eq!(outcome.total_score, 2);
        assert!(outcome.results[&TaskId::NamingLion].correct);
        assert!(!outcome.results[&TaskId::NamingRhino].correct);
        assert_eq!(outcome.results[&TaskId::NamingRhino].user_answer, "elefante");

        let evals = outcome.evaluations();
        assert_eq!(evals.len(), 3);
        assert_eq!(evals.iter().map(|e| e.score).sum::<u32>(), 2);
    }

    #[test]
    fn answers_accept_task_id_keys() {
        let json = r#"{"NAMING_LION":"leon","NAMING_RHINO":"rino","NAMING_CAMEL":"camello"}"#;
        let parsed: NamingAnswers = serde_json::from_str(json).unwrap();
        assert_eq!(score(&parsed).total_score, 2);
    }

    #[test]
    fn outcome_shape() {
        let json = serde_json::to_value(score(&answers("leon", "", ""))).unwrap();
        assert_eq!(json["totalScore"], 1);
        assert_eq!(json["results"]["NAMING_LION"]["userAnswer"], "leon");
    }
}
