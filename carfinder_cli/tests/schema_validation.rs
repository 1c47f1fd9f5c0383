use carfinder_lib::{NormalizedListing, RawCandidate};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("CLI crate should be inside workspace")
        .to_path_buf()
}

fn load_schema(name: &str) -> Value {
    let path = workspace_root().join("schema").join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read schema {}: {}", path.display(), e));
    serde_json::from_str(&text).expect("schema is valid JSON")
}

fn sample_listings() -> Value {
    let inserted = Utc.with_ymd_and_hms(2024, 5, 2, 1, 0, 0).unwrap();
    let full = NormalizedListing::from_candidate(
        RawCandidate {
            id: "7801000001".into(),
            title: "2021 Mazda CX-30 Premium AWD".into(),
            url: "https://sandiego.craigslist.org/cto/d/x/7801000001.html".into(),
            price: Some(21500),
            location: Some("north park".into()),
            posted_at: Some("2024-05-01T10:15:00-07:00".into()),
            region: "sandiego".into(),
        },
        inserted,
    );
    let bare = NormalizedListing::from_candidate(
        RawCandidate {
            id: String::new(),
            title: "2020 Mazda CX 30".into(),
            url: "https://sfbay.craigslist.org/eby/cto/d/x/7711111111.html".into(),
            price: None,
            location: None,
            posted_at: None,
            region: "sfbay".into(),
        },
        inserted,
    );
    serde_json::to_value(vec![full, bare]).expect("listings serialize")
}

fn validator() -> jsonschema::Validator {
    let schema = load_schema("listing.schema.json");
    jsonschema::draft202012::new(&schema).expect("listing schema compiles")
}

// ---------------------------------------------------------------------------
// Positive validation: serialized listings conform to the schema
// ---------------------------------------------------------------------------

#[test]
fn test_listings_conform_to_schema() {
    let data = sample_listings();
    if let Err(e) = validator().validate(&data) {
        panic!("listings failed validation: {e}");
    }
}

#[test]
fn test_empty_array_conforms() {
    assert!(validator().validate(&serde_json::json!([])).is_ok());
}

// ---------------------------------------------------------------------------
// Negative validation: schema rejects invalid data
// ---------------------------------------------------------------------------

#[test]
fn test_schema_rejects_missing_id() {
    let mut data = sample_listings();
    data[0]
        .as_object_mut()
        .expect("listing is an object")
        .remove("id");
    assert!(
        validator().validate(&data).is_err(),
        "schema should reject listing missing id"
    );
}

#[test]
fn test_schema_rejects_string_price() {
    let mut data = sample_listings();
    data[0]
        .as_object_mut()
        .expect("listing is an object")
        .insert("price".to_string(), Value::String("$21,500".to_string()));
    assert!(
        validator().validate(&data).is_err(),
        "schema should reject a formatted price"
    );
}

#[test]
fn test_schema_rejects_additional_properties() {
    let mut data = sample_listings();
    data[1]
        .as_object_mut()
        .expect("listing is an object")
        .insert("bogusField".to_string(), Value::Number(123.into()));
    assert!(
        validator().validate(&data).is_err(),
        "schema should reject additional properties"
    );
}
