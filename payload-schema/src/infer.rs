//! Payload type inference for unlabelled payloads.
//!
//! Scores a payload against every registered schema and picks a winner.
//! A schema is only a candidate once *all* of its required fields are
//! present; candidates are then ranked by total matched field count, so
//! a more specific schema beats a subset schema it overlaps with.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::schema::{SchemaRegistry, UNCLASSIFIED};
use crate::validate::field_present;

// ------------------------------------------------------------------ //
//  Result type                                                        //
// ------------------------------------------------------------------ //

/// Outcome of inferring the payload type of an unlabelled payload.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResult {
    /// Winning payload type, or [`UNCLASSIFIED`].
    pub payload_type: String,
    /// Match confidence in `[0, 1]`. Zero iff unclassified.
    pub confidence: f64,
    /// True when two candidates could not be separated cleanly.
    pub is_ambiguous: bool,
    /// Human-readable notes on how the decision was reached.
    pub reasons: Vec<String>,
}

impl InferenceResult {
    fn unclassified(reason: String) -> Self {
        Self {
            payload_type: UNCLASSIFIED.to_string(),
            confidence: 0.0,
            is_ambiguous: false,
            reasons: vec![reason],
        }
    }
}

/// A schema whose required fields are all present in the payload.
struct Candidate<'a> {
    payload_type: &'a str,
    /// Required + optional fields present in the payload.
    matched: usize,
    required: usize,
    total_fields: usize,
}

// ------------------------------------------------------------------ //
//  Inference                                                          //
// ------------------------------------------------------------------ //

impl SchemaRegistry {
    /// Infer the payload type of an unlabelled payload.
    pub fn infer(&self, payload: &Value) -> InferenceResult {
        if payload.is_null() {
            return InferenceResult::unclassified("No payload data available".to_string());
        }
        let object = match payload.as_object() {
            Some(o) => o,
            None => {
                return InferenceResult::unclassified(
                    "Payload is not a JSON object".to_string(),
                );
            }
        };
        if object.is_empty() {
            return InferenceResult::unclassified("Payload object is empty".to_string());
        }

        // All-required gate: partial required presence scores zero.
        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for schema in self.iter() {
            let all_required = schema
                .required_fields
                .iter()
                .all(|f| field_present(object, f));
            if !all_required {
                continue;
            }
            let optional_matched = schema
                .optional_fields
                .iter()
                .filter(|f| field_present(object, f))
                .count();
            candidates.push(Candidate {
                payload_type: &schema.payload_type,
                matched: schema.required_fields.len() + optional_matched,
                required: schema.required_fields.len(),
                total_fields: schema.field_count(),
            });
        }

        if candidates.is_empty() {
            return InferenceResult::unclassified(format!(
                "No schema matched the {} field(s) present",
                object.len()
            ));
        }

        // Rank: most matched fields, then largest required set (most
        // specific), then payload type for determinism.
        candidates.sort_by(|a, b| {
            b.matched
                .cmp(&a.matched)
                .then(b.required.cmp(&a.required))
                .then(a.payload_type.cmp(b.payload_type))
        });

        let winner = &candidates[0];
        let is_ambiguous = candidates
            .get(1)
            .is_some_and(|c| c.matched == winner.matched && c.required == winner.required);

        // Unexpected fields do not count towards matched, so extra keys
        // never raise confidence.
        let coverage = winner.matched as f64 / winner.total_fields as f64;
        let confidence = 0.5 + 0.5 * coverage;

        let mut reasons = vec![format!(
            "Matched {}/{} schema fields of {}",
            winner.matched, winner.total_fields, winner.payload_type
        )];
        if is_ambiguous {
            reasons.push(format!(
                "Tie with {} could not be broken",
                candidates[1].payload_type
            ));
        }

        debug!(
            payload_type = winner.payload_type,
            confidence,
            is_ambiguous,
            candidates = candidates.len(),
            "payload type inferred"
        );

        InferenceResult {
            payload_type: winner.payload_type.to_string(),
            confidence,
            is_ambiguous,
            reasons,
        }
    }
}
