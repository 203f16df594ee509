use super::*;

fn sample_batch() -> MetricBatch {
    serde_json::from_str(
        r#"{"host_id":42,"protocol":1,"data":[
            {"time":"2020-01-01T00:00:00Z",
             "float_metrics":[{"metric":"cpu","subtype":"core0","value":0.5}],
             "int_metrics":[{"metric":"mem","subtype":"","value":1024}],
             "string_metrics":[{"metric":"os","subtype":"","value":"linux"}]}]}"#,
    )
    .unwrap()
}

#[test]
fn test_from_batch_one_doc_per_value() {
    let docs = MetricElastic::from_batch(&sample_batch());
    assert_eq!(docs.len(), 3);

    assert_eq!(docs[0].host_id, 42);
    assert_eq!(docs[0].metric, "cpu");
    assert_eq!(docs[0].subtype, "core0");
    assert_eq!(docs[0].value_type, "real");
    assert_eq!(docs[0].value, ElasticValue::Float(0.5));

    assert_eq!(docs[1].metric, "mem");
    assert_eq!(docs[1].value_type, "integer");
    assert_eq!(docs[1].value, ElasticValue::Int(1024));

    assert_eq!(docs[2].metric, "os");
    assert_eq!(docs[2].value_type, "string");
    assert_eq!(docs[2].value, ElasticValue::String("linux".to_string()));
}

#[test]
fn test_from_batch_empty() {
    let batch = MetricBatch::new(7, 1);
    assert!(MetricElastic::from_batch(&batch).is_empty());
}

#[test]
fn test_stripped_batch_has_no_string_documents() {
    let mut batch = sample_batch();
    batch.strip_string_metrics();

    let docs = MetricElastic::from_batch(&batch);
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d.value_type != "string"));
}

#[test]
fn test_document_encoding() {
    let docs = MetricElastic::from_batch(&sample_batch());
    let encoded = serde_json::to_string(&docs[0]).unwrap();

    assert!(encoded.contains("\"host_id\":42"));
    assert!(encoded.contains("\"time\":\"2020-01-01T00:00:00Z\""));
    assert!(encoded.contains("\"type\":\"real\""));
    assert!(encoded.contains("\"value\":0.5"));
}

#[test]
fn test_value_untagged_encoding() {
    assert_eq!(
        serde_json::to_string(&ElasticValue::Int(9)).unwrap(),
        "9"
    );
    assert_eq!(
        serde_json::to_string(&ElasticValue::String("hi".into())).unwrap(),
        "\"hi\""
    );
}
