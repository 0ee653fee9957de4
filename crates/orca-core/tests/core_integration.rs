#![allow(clippy::unwrap_used, clippy::expect_used)]

use orca_core::*;

// ---------------------------------------------------------------------------
// 1. Error Display and From impls
// ---------------------------------------------------------------------------

#[test]
fn error_display_and_from_impls() {
    let validation = OrcaError::Validation("target_keywords is empty".to_string());
    assert_eq!(
        validation.to_string(),
        "Validation error: target_keywords is empty"
    );

    let state = OrcaError::InvalidState("task already running".to_string());
    assert_eq!(state.to_string(), "Invalid state: task already running");

    let invocation = OrcaError::AgentInvocation("model refused".to_string());
    assert_eq!(
        invocation.to_string(),
        "Agent invocation error: model refused"
    );

    let capacity = OrcaError::CapacityExhausted("51 queued".to_string());
    assert_eq!(capacity.to_string(), "Capacity exhausted: 51 queued");

    let store = OrcaError::Store("disk full".to_string());
    assert_eq!(store.to_string(), "Store error: disk full");

    let bad_json = serde_json::from_str::<serde_json::Value>("not json");
    let err: OrcaError = bad_json.unwrap_err().into();
    assert!(err.to_string().starts_with("JSON error:"));

    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: OrcaError = io_err.into();
    assert!(err.to_string().starts_with("IO error:"));
}

// ---------------------------------------------------------------------------
// 2. Connectivity classification
// ---------------------------------------------------------------------------

#[test]
fn connectivity_classification() {
    assert!(OrcaError::Connectivity("refused".into()).is_connectivity());
    assert!(OrcaError::Timeout("30s".into()).is_connectivity());
    assert!(!OrcaError::AgentInvocation("bad output".into()).is_connectivity());
    assert!(!OrcaError::Validation("empty".into()).is_connectivity());
}

// ---------------------------------------------------------------------------
// 3. Priority ordering and parsing
// ---------------------------------------------------------------------------

#[test]
fn priority_ordering() {
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert_eq!(Priority::default(), Priority::Medium);

    let mut bands = vec![Priority::Medium, Priority::High, Priority::Low];
    bands.sort();
    assert_eq!(bands, Priority::ALL.to_vec());
}

#[test]
fn priority_parse_and_display() {
    assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
    assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
    assert!("urgent".parse::<Priority>().is_err());
    assert_eq!(Priority::Medium.to_string(), "medium");
    assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
}

// ---------------------------------------------------------------------------
// 4. TaskType wire names
// ---------------------------------------------------------------------------

#[test]
fn task_type_wire_names() {
    for task_type in TaskType::ALL {
        let json = serde_json::to_string(&task_type).unwrap();
        assert_eq!(json, format!("\"{task_type}\""));
        assert_eq!(task_type.as_str().parse::<TaskType>().unwrap(), task_type);
    }
    assert!("page_render".parse::<TaskType>().is_err());
}
