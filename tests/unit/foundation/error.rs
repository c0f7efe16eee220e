use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReeltimeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReeltimeError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(ReeltimeError::io("x").to_string().contains("io error:"));
    assert!(
        ReeltimeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        ReeltimeError::scheduler("x")
            .to_string()
            .contains("scheduler error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReeltimeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde() {
    let err: ReeltimeError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, ReeltimeError::Serde(_)));
}
