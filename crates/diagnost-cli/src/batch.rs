//! Batch prediction: JSON-lines requests in, JSON-lines results out.
//!
//! Every request runs on a blocking worker thread against the same shared
//! registry. Results are written in input order; one failed request yields
//! an error line and leaves the rest untouched.

use std::io::Write;
use std::time::Instant;

use chrono::NaiveDate;
use diagnost_ai::InferenceService;
use diagnost_core::{AppointmentNote, InferenceError, PredictionResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// One input line: the classifier mode plus the appointment fields.
#[derive(Debug, Deserialize)]
struct BatchRequest {
    mode: String,
    #[serde(flatten)]
    note: AppointmentNote,
}

/// One output line.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct BatchOutcome {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl BatchOutcome {
    fn from_result(line: usize, outcome: Result<PredictionResult, InferenceError>) -> Self {
        match outcome {
            Ok(r) => Self {
                line,
                result: Some(r.result),
                error: None,
                status: None,
            },
            Err(e) => Self {
                line,
                result: None,
                error: Some(e.to_string()),
                status: Some(e.status_code()),
            },
        }
    }
}

pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub elapsed_secs: f64,
}

/// Classify every non-blank line of `input`, writing one JSON object per line to `out`.
pub async fn run_batch<W: Write>(
    service: &InferenceService,
    input: &str,
    today: NaiveDate,
    concurrency: usize,
    out: &mut W,
) -> anyhow::Result<BatchStats> {
    let start = Instant::now();

    let lines: Vec<(usize, String)> = input
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l.to_string()))
        .collect();

    let outcomes: Vec<BatchOutcome> = futures::stream::iter(lines)
        .map(|(line, raw)| {
            let service = service.clone();
            async move {
                let joined =
                    tokio::task::spawn_blocking(move || classify_line(&service, &raw, today)).await;
                match joined {
                    Ok(outcome) => BatchOutcome::from_result(line, outcome),
                    Err(e) => BatchOutcome {
                        line,
                        result: None,
                        error: Some(format!("worker failed: {e}")),
                        status: Some(500),
                    },
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for outcome in &outcomes {
        serde_json::to_writer(&mut *out, outcome)?;
        writeln!(out)?;
    }

    Ok(BatchStats {
        total: outcomes.len(),
        succeeded: outcomes.iter().filter(|o| o.result.is_some()).count(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

fn classify_line(
    service: &InferenceService,
    raw: &str,
    today: NaiveDate,
) -> Result<PredictionResult, InferenceError> {
    let request: BatchRequest = serde_json::from_str(raw)
        .map_err(|e| InferenceError::InvalidRequest(format!("malformed request: {e}")))?;
    service.predict_note(&request.mode, &request.note, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use diagnost_ai::{
        ComputeDevice, EncoderUnit, EnsembleClassifier, FusionClassifier, LabelEncoder,
        LabelResolver, ModelRegistry, SingleModelClassifier, SynonymTable, TextEncoder,
    };
    use diagnost_core::LogitVector;

    /// Scores class `i` by how often letter `i` of the alphabet appears.
    struct LetterCounter {
        classes: usize,
    }

    impl TextEncoder for LetterCounter {
        fn name(&self) -> &str {
            "letters"
        }

        fn num_classes(&self) -> usize {
            self.classes
        }

        fn encode(&self, text: &str) -> Result<LogitVector, InferenceError> {
            let scores = (0..self.classes)
                .map(|i| {
                    let letter = (b'a' + i as u8) as char;
                    text.chars().filter(|&c| c == letter).count() as f32
                })
                .collect();
            Ok(LogitVector::new(scores))
        }
    }

    fn labels(names: &[&str]) -> LabelEncoder {
        LabelEncoder::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn service() -> InferenceService {
        let synonyms = Arc::new(SynonymTable::parse("A00$Cholera\nB00$Herpes"));
        let single = SingleModelClassifier::new(
            EncoderUnit::new(Arc::new(LetterCounter { classes: 2 })),
            labels(&["A00", "B00"]),
        )
        .unwrap();
        // Sums the two encoders class-by-class.
        let head = FusionClassifier::new(
            4,
            2,
            vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0],
            vec![0.0, 0.0],
            0.2,
        )
        .unwrap();
        let ensemble = EnsembleClassifier::new(
            EncoderUnit::new(Arc::new(LetterCounter { classes: 2 })),
            EncoderUnit::new(Arc::new(LetterCounter { classes: 2 })),
            head,
            LabelResolver::new(labels(&["A00", "B00"]), Arc::clone(&synonyms)),
        )
        .unwrap();
        let registry = ModelRegistry::new(single, ensemble, synonyms, ComputeDevice::Cpu);
        InferenceService::new(Arc::new(registry))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn parse_output(out: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let input = r#"{"mode": "ensemble", "complaints": "bbb"}
{"mode": "ensemble", "complaints": "aaa"}

{"mode": "single", "complaints": "BBBB"}
"#;
        let mut out = Vec::new();
        let stats = run_batch(&service(), input, today(), 2, &mut out)
            .await
            .unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.succeeded, 3);

        let rows = parse_output(&out);
        assert_eq!(rows[0]["line"], 1);
        assert_eq!(rows[0]["result"], "Herpes");
        assert_eq!(rows[1]["line"], 2);
        assert_eq!(rows[1]["result"], "Cholera");
        // Blank line 3 is skipped; single mode returns the raw label.
        assert_eq!(rows[2]["line"], 4);
        assert_eq!(rows[2]["result"], "B00");
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let input = r#"{"mode": "unsupported", "complaints": "aaa"}
not json
{"mode": "ensemble"}
{"mode": "ensemble", "complaints": "bb"}
"#;
        let mut out = Vec::new();
        let stats = run_batch(&service(), input, today(), 4, &mut out)
            .await
            .unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 1);

        let rows = parse_output(&out);
        assert_eq!(rows[0]["status"], 400);
        assert!(rows[0]["error"].as_str().unwrap().contains("unsupported"));
        assert_eq!(rows[1]["status"], 400);
        assert_eq!(rows[2]["status"], 400);
        assert_eq!(rows[3]["result"], "Herpes");
    }

    #[tokio::test]
    async fn repeated_batches_agree() {
        let input = r#"{"mode": "ensemble", "complaints": "abab b"}
{"mode": "single", "complaints": "aab"}
"#
        .repeat(8);
        let service = service();

        let mut first = Vec::new();
        run_batch(&service, &input, today(), 8, &mut first).await.unwrap();
        let mut second = Vec::new();
        run_batch(&service, &input, today(), 3, &mut second).await.unwrap();
        assert_eq!(first, second);
    }
}
