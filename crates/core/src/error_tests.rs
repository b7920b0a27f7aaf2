// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn error_code_round_trips_through_serde() {
    let json = serde_json::to_string(&ErrorCode::MatrixArtifactMissing).unwrap();
    assert_eq!(json, "\"MATRIX_ARTIFACT_MISSING\"");
    let parsed: ErrorCode = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ErrorCode::MatrixArtifactMissing);
}

#[test]
fn display_matches_as_str() {
    assert_eq!(
        ErrorCode::StepExecutionFailed.to_string(),
        "STEP_EXECUTION_FAILED"
    );
}

#[test]
fn detail_truncates() {
    let detail = ErrorDetail::text("x".repeat(5000));
    assert_eq!(detail.as_str().len(), ErrorDetail::MAX_LEN);
}

#[test]
fn structured_detail_is_json() {
    let detail = ErrorDetail::structured(&serde_json::json!({"attempts": ["a", "b"]}));
    assert!(detail.as_str().contains("attempts"));
}
