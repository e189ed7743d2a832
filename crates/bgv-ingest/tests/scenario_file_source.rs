use std::io::Write;

use bgv_ingest::{FileSource, RecordSource, SourceError, TimeRange};

fn write_log(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn reads_both_logs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let producer = write_log(
        &dir,
        "producer.log",
        concat!(
            "{\"seq\": 2, \"timestamp\": \"2026-02-20T10:00:02Z\", \"partition\": 1, \"offset\": 5}\n",
            "{\"seq\": 1, \"timestamp\": \"2026-02-20T10:00:01Z\", \"partition\": 0, \"offset\": 4}\n",
        ),
    );
    let consumer = write_log(
        &dir,
        "consumer.log",
        concat!(
            "{\"seq\": 1, \"timestamp\": \"2026-02-20T10:00:01Z\", \"group_id\": \"bg-blue\"}\n",
            "garbage\n",
            "{\"seq\": 1, \"timestamp\": \"2026-02-20T10:00:03Z\", \"group_id\": \"bg-green\"}\n",
        ),
    );

    let src = FileSource::new(&producer, &consumer);
    assert_eq!(src.name(), "file");

    let produced = src.fetch_produced(&TimeRange::unbounded()).await.unwrap();
    let consumed = src.fetch_consumed(&TimeRange::unbounded()).await.unwrap();

    assert_eq!(produced.records.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![1, 2]);
    assert!(produced.skipped.is_empty());

    assert_eq!(consumed.records.len(), 2);
    assert_eq!(consumed.records[0].group_id, "bg-blue");
    assert_eq!(consumed.records[1].group_id, "bg-green");
    assert_eq!(consumed.skipped.len(), 1);
    assert!(consumed.skipped[0].location.ends_with("consumer.log:2"));
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let consumer = write_log(&dir, "consumer.log", "");
    let src = FileSource::new(dir.path().join("nope.log"), &consumer);

    let err = src.fetch_produced(&TimeRange::unbounded()).await.unwrap_err();
    assert!(matches!(err, SourceError::NotFound { .. }), "{err:?}");

    let consumed = src.fetch_consumed(&TimeRange::unbounded()).await.unwrap();
    assert!(consumed.records.is_empty());
}

#[tokio::test]
async fn directory_path_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let src = FileSource::new(dir.path(), dir.path());
    let err = src.fetch_consumed(&TimeRange::unbounded()).await.unwrap_err();
    assert!(matches!(err, SourceError::Io { .. }), "{err:?}");
}
