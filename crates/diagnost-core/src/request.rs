//! Prediction requests: classifier mode selection and prompt composition
//! from appointment fields.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Age assumed when the patient or their birth date is unknown.
pub const DEFAULT_AGE: u32 = 20;

/// Which classifier answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierMode {
    /// One encoder + its own label encoder, raw label out.
    Single,
    /// Two encoders fused by the learned head, canonical label out.
    Ensemble,
}

impl ClassifierMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierMode {
    type Err = InferenceError;

    /// Accepts `single` (also `bert`, the legacy route name) and `ensemble`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" | "bert" => Ok(Self::Single),
            "ensemble" => Ok(Self::Ensemble),
            other => Err(InferenceError::UnsupportedMode(other.to_string())),
        }
    }
}

/// Text to classify plus the classifier that should handle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub text: String,
    pub mode: ClassifierMode,
}

impl PredictionRequest {
    pub fn new(text: impl Into<String>, mode: ClassifierMode) -> Self {
        Self {
            text: text.into(),
            mode,
        }
    }
}

/// Final label returned to the caller. Intermediate scores are never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub result: String,
}

/// Demographics folded into single-mode prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl PatientContext {
    fn gender_word(&self) -> &'static str {
        match self.gender.as_deref() {
            None | Some("male") => "Мужчина",
            Some(_) => "Женщина",
        }
    }

    fn age_on(&self, today: NaiveDate) -> u32 {
        self.birth_date
            .map(|b| age_on(b, today))
            .unwrap_or(DEFAULT_AGE)
    }
}

/// Clinical free text captured during an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentNote {
    #[serde(default)]
    pub complaints: Option<String>,
    #[serde(default)]
    pub anamnesis: Option<String>,
    #[serde(default)]
    pub objective_status: Option<String>,
    #[serde(default)]
    pub patient: Option<PatientContext>,
}

impl AppointmentNote {
    /// Compose the classifier prompt for `mode`.
    ///
    /// Single mode prefixes gender and age and trims; ensemble mode uses the
    /// clinical fields only. Both are lower-cased.
    pub fn to_request(
        &self,
        mode: ClassifierMode,
        today: NaiveDate,
    ) -> Result<PredictionRequest, InferenceError> {
        let field = |f: &Option<String>| f.as_deref().unwrap_or("").to_string();
        let (complaints, anamnesis, status) = (
            field(&self.complaints),
            field(&self.anamnesis),
            field(&self.objective_status),
        );

        if [&complaints, &anamnesis, &status]
            .iter()
            .all(|s| s.trim().is_empty())
        {
            return Err(InferenceError::InvalidRequest(
                "complaints, anamnesis and objective_status are all empty".into(),
            ));
        }

        let body = format!("{complaints} {anamnesis} {status}");
        let text = match mode {
            ClassifierMode::Single => {
                let patient = self.patient.clone().unwrap_or_default();
                let prompt = format!(
                    "{}, {} лет, {body}",
                    patient.gender_word(),
                    patient.age_on(today)
                );
                prompt.to_lowercase().trim().to_string()
            }
            ClassifierMode::Ensemble => body.to_lowercase(),
        };

        Ok(PredictionRequest::new(text, mode))
    }
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn note(complaints: &str) -> AppointmentNote {
        AppointmentNote {
            complaints: Some(complaints.into()),
            anamnesis: Some("Болеет 3 дня".into()),
            objective_status: Some("T 38.2".into()),
            patient: None,
        }
    }

    #[test]
    fn parses_modes() {
        assert_eq!("single".parse::<ClassifierMode>().unwrap(), ClassifierMode::Single);
        assert_eq!("bert".parse::<ClassifierMode>().unwrap(), ClassifierMode::Single);
        assert_eq!(
            "ensemble".parse::<ClassifierMode>().unwrap(),
            ClassifierMode::Ensemble
        );
    }

    #[test]
    fn unsupported_mode_is_client_error() {
        let err = "unsupported".parse::<ClassifierMode>().unwrap_err();
        assert!(matches!(err, InferenceError::UnsupportedMode(ref m) if m == "unsupported"));
        assert!(err.is_client_error());
    }

    #[test]
    fn age_before_and_after_birthday() {
        let birth = date(1990, 6, 15);
        assert_eq!(age_on(birth, date(2024, 6, 14)), 33);
        assert_eq!(age_on(birth, date(2024, 6, 15)), 34);
        assert_eq!(age_on(birth, date(2024, 12, 1)), 34);
    }

    #[test]
    fn age_never_negative() {
        assert_eq!(age_on(date(2030, 1, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn single_prompt_defaults_to_male_twenty() {
        let req = note("Кашель")
            .to_request(ClassifierMode::Single, date(2024, 1, 1))
            .unwrap();
        assert_eq!(req.mode, ClassifierMode::Single);
        assert_eq!(req.text, "мужчина, 20 лет, кашель болеет 3 дня t 38.2");
    }

    #[test]
    fn single_prompt_uses_patient_context() {
        let mut n = note("Кашель");
        n.patient = Some(PatientContext {
            gender: Some("female".into()),
            birth_date: Some(date(1980, 3, 10)),
        });
        let req = n
            .to_request(ClassifierMode::Single, date(2024, 3, 9))
            .unwrap();
        assert!(req.text.starts_with("женщина, 43 лет, "), "{}", req.text);
    }

    #[test]
    fn single_prompt_missing_birth_date_uses_default_age() {
        let mut n = note("Кашель");
        n.patient = Some(PatientContext {
            gender: Some("male".into()),
            birth_date: None,
        });
        let req = n
            .to_request(ClassifierMode::Single, date(2024, 3, 9))
            .unwrap();
        assert!(req.text.starts_with("мужчина, 20 лет, "), "{}", req.text);
    }

    #[test]
    fn ensemble_prompt_is_clinical_fields_only() {
        let mut n = note("Кашель");
        n.objective_status = None;
        let req = n
            .to_request(ClassifierMode::Ensemble, date(2024, 1, 1))
            .unwrap();
        // Not trimmed: the missing field leaves a trailing separator.
        assert_eq!(req.text, "кашель болеет 3 дня ");
    }

    #[test]
    fn empty_note_is_rejected() {
        let n = AppointmentNote {
            complaints: Some("  ".into()),
            ..Default::default()
        };
        let err = n
            .to_request(ClassifierMode::Ensemble, date(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidRequest(_)));
    }

    #[test]
    fn note_deserializes_from_json() {
        let n: AppointmentNote = serde_json::from_str(
            r#"{"complaints": "Кашель", "patient": {"gender": "female", "birth_date": "2001-02-03"}}"#,
        )
        .unwrap();
        assert_eq!(n.complaints.as_deref(), Some("Кашель"));
        assert_eq!(n.patient.unwrap().birth_date, Some(date(2001, 2, 3)));
    }
}
