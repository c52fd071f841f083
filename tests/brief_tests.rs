use marketscout::brief::{BriefError, Depth, ResearchBrief};
use serde_json::json;
use std::io::Write;

fn write_brief(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_load_brief_file() {
    let file = write_brief(
        r#"{
            "offering_what": " Solar kits ",
            "offering_problem": "Unreliable grid power",
            "target_customer": "Small shop owners",
            "geography": "Accra, Ghana",
            "primary_question": "What would they pay upfront?",
            "known_competitors": ["SunKing", "d.light"],
            "kill_criteria": "   ",
            "depth": "deep_dive"
        }"#,
    );

    let brief = ResearchBrief::load(file.path()).await.unwrap();

    assert_eq!(brief.offering_what(), "Solar kits");
    assert_eq!(brief.known_competitors(), ["SunKing", "d.light"]);
    assert_eq!(brief.kill_criteria(), None);
    assert_eq!(brief.depth(), Depth::DeepDive);
}

#[tokio::test]
async fn test_load_rejects_blank_required_field() {
    let file = write_brief(
        r#"{
            "offering_what": "Solar kits",
            "offering_problem": "Unreliable grid power",
            "target_customer": "",
            "geography": "Accra, Ghana",
            "primary_question": "What would they pay upfront?"
        }"#,
    );

    let err = ResearchBrief::load(file.path()).await.unwrap_err();

    match err {
        BriefError::Parse(msg) => assert!(msg.contains("Target customer cannot be empty"), "{}", msg),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ResearchBrief::load(dir.path().join("absent.json")).await.unwrap_err();
    assert!(matches!(err, BriefError::Io(_)));
}

#[test]
fn test_unknown_depth_is_rejected_on_deserialize() {
    let result: Result<ResearchBrief, _> = serde_json::from_value(json!({
        "offering_what": "a",
        "offering_problem": "b",
        "target_customer": "c",
        "geography": "d",
        "primary_question": "e",
        "depth": "exhaustive"
    }));
    assert!(result.is_err());
}

#[test]
fn test_json_round_trip_preserves_brief() {
    let brief = ResearchBrief::builder("App", "Problem", "Customer", "Peru", "Question?")
        .known_competitors(vec!["Rival".to_string()])
        .opportunity_thesis("Nobody serves rural users")
        .depth(Depth::Overview)
        .build()
        .unwrap();

    let value = brief.to_json();
    assert_eq!(value["depth"], "overview");
    assert_eq!(value["stage"], serde_json::Value::Null);

    let back: ResearchBrief = serde_json::from_value(value).unwrap();
    assert_eq!(back, brief);
}

#[test]
fn test_markdown_lists_present_optionals() {
    let md = ResearchBrief::builder("App", "Problem", "Customer", "Peru", "Question?")
        .known_competitors(vec!["Rival".to_string(), "Other".to_string()])
        .stage("exploring")
        .build()
        .unwrap()
        .to_markdown();

    assert!(md.contains("## The Offering"));
    assert!(md.contains("- **Known Competitors:** Rival, Other"));
    assert!(md.contains("- **Stage:** exploring"));
    assert!(!md.contains("Resources"));
}
