use crowdreel::{load_document, parse_trace, save_document};

const SAMPLE_TRACE: &str = concat!(
    "Frame rate: 24.0\n",
    "Frame 1: Batch 43014179575\n",
    "Total count: 2\n",
    "a:100  :200  :1  :10  :20  :50  :60  \n",
    "b:300  :400  :2  :30  :40  :70  :80  \n",
    "frameend\n",
    "Frame rate: 30.0\n",
    "Frame 2: Batch 43014179575\n",
    "Total count: 1\n",
    "c:500  :600  :3  :90  :100  :110  :120  \n",
    "frameend\n",
);

#[test]
fn parse_then_save_then_load_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("position.json");

    let doc = parse_trace(SAMPLE_TRACE).unwrap();
    assert_eq!(doc.frame_indices(), vec![1, 2]);

    save_document(&doc, &path).unwrap();
    let loaded = load_document(&path).unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn persisted_json_keeps_legacy_field_names_and_string_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("position.json");

    let doc = parse_trace(SAMPLE_TRACE).unwrap();
    save_document(&doc, &path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let frame1 = &value["1"];
    assert_eq!(frame1["Number of people"], 2);
    assert_eq!(frame1["Frame rate"], 24.0);

    let people = frame1["People position"].as_array().unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(people[0]["id"], 1);
    assert_eq!(people[0]["x"], 100);
    assert_eq!(people[0]["y"], 200);
    assert_eq!(people[0]["bounding box top"], 20);
    assert_eq!(people[0]["bounding box left"], 10);
    assert_eq!(people[0]["bounding box bottom"], 60);
    assert_eq!(people[0]["bounding box right"], 50);
}

#[test]
fn people_order_survives_the_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("position.json");

    let doc = parse_trace(SAMPLE_TRACE).unwrap();
    save_document(&doc, &path).unwrap();
    let loaded = load_document(&path).unwrap();

    let ids: Vec<i64> = loaded.get(1).unwrap().people.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2]);
}
