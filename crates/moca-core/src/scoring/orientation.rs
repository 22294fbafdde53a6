//! Orientation: four date parts checked against today, place and city
//! marked by the examiner.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{EvaluationResult, OrientationDetails, ResultDetails, TaskId};
use crate::stimuli::WEEKDAYS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateAnswer {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub day_of_week: String,
}

/// A free-text answer the examiner judged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaminerMarked {
    #[serde(default)]
    pub value: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationSubmission {
    pub date: DateAnswer,
    pub place: ExaminerMarked,
    pub city: ExaminerMarked,
}

/// Expected weekday name for `date`.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

/// Score against `today`.
pub fn score(submission: &OrientationSubmission, today: NaiveDate) -> EvaluationResult {
    let date = &submission.date;
    let checks = [
        date.day == today.day(),
        date.month == today.month(),
        date.year == today.year(),
        date.day_of_week.trim().to_lowercase() == weekday_name(today).to_lowercase(),
    ];
    let date_score = checks.iter().filter(|ok| **ok).count() as u32;
    let place_score = u32::from(submission.place.is_correct);
    let city_score = u32::from(submission.city.is_correct);

    EvaluationResult::scored(
        TaskId::Orientation,
        i64::from(date_score + place_score + city_score),
        ResultDetails::Orientation(OrientationDetails {
            date_score,
            place_score,
            city_score,
            place: submission.place.value.clone(),
            city: submission.city.value.clone(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn submission(day: u32, weekday: &str) -> OrientationSubmission {
        OrientationSubmission {
            date: DateAnswer {
                day,
                month: 5,
                year: 2024,
                day_of_week: weekday.into(),
            },
            place: ExaminerMarked {
                value: "Hospital".into(),
                is_correct: true,
            },
            city: ExaminerMarked {
                value: "Santiago".into(),
                is_correct: true,
            },
        }
    }

    #[test]
    fn full_marks_on_the_right_day() {
        let result = score(&submission(15, "Miércoles"), wednesday());
        assert_eq!(result.score, 6);
        assert_eq!(result.max_score, 6);
    }

    #[test]
    fn wrong_day_of_month_loses_one_point() {
        let result = score(&submission(16, "Miércoles"), wednesday());
        assert_eq!(result.score, 5);
        match result.details {
            ResultDetails::Orientation(d) => {
                assert_eq!(d.date_score, 3);
                assert_eq!(d.place_score, 1);
                assert_eq!(d.city_score, 1);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn weekday_is_case_insensitive() {
        assert_eq!(score(&submission(15, " miércoles "), wednesday()).score, 6);
        assert_eq!(score(&submission(15, "Jueves"), wednesday()).score, 5);
    }

    #[test]
    fn examiner_marks_count() {
        let mut sub = submission(15, "Miércoles");
        sub.place.is_correct = false;
        sub.city.is_correct = false;
        assert_eq!(score(&sub, wednesday()).score, 4);
    }

    #[test]
    fn weekday_names() {
        assert_eq!(weekday_name(wednesday()), "Miércoles");
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        assert_eq!(weekday_name(sunday), "Domingo");
    }

    #[test]
    fn submission_wire_shape() {
        let json = r#"{
            "date": {"day": 15, "month": 5, "year": 2024, "dayOfWeek": "Miércoles"},
            "place": {"value": "clínica", "isCorrect": true},
            "city": {"isCorrect": false}
        }"#;
        let sub: OrientationSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(score(&sub, wednesday()).score, 5);
    }
}
