//! Integration tests for the HTTP surface.
//!
//! Fixtures (an indexed FASTA and a BED file) are written to a temp dir.

use axum::http::StatusCode;
use axum_test::TestServer;
use clap::Parser;
use materializr::{Config, handlers::create_router};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

struct Fixture {
    _dir: tempfile::TempDir,
    reference: PathBuf,
    features: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let reference = dir.path().join("ref.fa");
        let mut fasta = std::fs::File::create(&reference).unwrap();
        write!(fasta, ">chr1\nACGTACGT\nTTTTGGGG\nCC\n>chr2\nacgt\n").unwrap();
        let mut fai = std::fs::File::create(dir.path().join("ref.fa.fai")).unwrap();
        writeln!(fai, "chr1\t18\t6\t8\t9").unwrap();
        writeln!(fai, "chr2\t4\t33\t4\t5").unwrap();

        let features = dir.path().join("genes.bed");
        write_bed(&features, "chr1\t0\t5\tgeneA\t1\t+\nchr1\t10\t15\tgeneB\t2\t-\nchr2\t0\t4\tgeneC\n");

        Self {
            _dir: dir,
            reference,
            features,
        }
    }

    fn server(&self, extra: &[&str]) -> TestServer {
        let mut argv = vec![
            "materializr".to_string(),
            "--reference".to_string(),
            self.reference.display().to_string(),
            "--features".to_string(),
            self.features.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));

        let config = Config::try_parse_from(argv).unwrap();
        let state = config.app_state().unwrap();
        TestServer::new(create_router(state)).unwrap()
    }
}

/// Three reads on `chr1` of the reference fixture, plus a `.bai`:
/// `r1` carries a mismatch at 3, `r2` a one-base deletion at 8, `r3` matches.
fn write_bam(dir: &Path) -> PathBuf {
    use noodles::bam;
    use noodles::core::Position;
    use noodles::csi::binning_index::{Indexer, index::reference_sequence::bin::Chunk};
    use noodles::sam::{
        self,
        alignment::{
            RecordBuf,
            io::Write as _,
            record::{
                Flags, MappingQuality,
                cigar::{Op, op::Kind},
            },
        },
        header::record::value::{Map, map::ReferenceSequence},
    };
    use std::num::NonZeroUsize;

    let reads = [
        ("r1", 0usize, vec![Op::new(Kind::Match, 4)], "ACGA", 4usize),
        (
            "r2",
            6,
            vec![
                Op::new(Kind::Match, 2),
                Op::new(Kind::Deletion, 1),
                Op::new(Kind::Match, 3),
            ],
            "GTTTT",
            6,
        ),
        ("r3", 12, vec![Op::new(Kind::Match, 4)], "GGGG", 4),
    ];

    let path = dir.join("sample.bam");
    let header = sam::Header::builder()
        .add_reference_sequence(
            "chr1",
            Map::<ReferenceSequence>::new(NonZeroUsize::try_from(18).unwrap()),
        )
        .build();

    let mut writer = bam::io::Writer::new(std::fs::File::create(&path).unwrap());
    writer.write_header(&header).unwrap();
    for (name, start, cigar, sequence, _) in &reads {
        let record = RecordBuf::builder()
            .set_name(*name)
            .set_flags(Flags::empty())
            .set_reference_sequence_id(0)
            .set_alignment_start(Position::try_from(start + 1).unwrap())
            .set_mapping_quality(MappingQuality::new(60).unwrap())
            .set_cigar(cigar.iter().copied().collect())
            .set_sequence(sequence.as_bytes().into())
            .build();
        writer.write_alignment_record(&header, &record).unwrap();
    }
    writer.try_finish().unwrap();
    drop(writer);

    let mut reader = bam::io::reader::Builder.build_from_path(&path).unwrap();
    reader.read_header().unwrap();
    let mut indexer = Indexer::default();
    let mut record = bam::Record::default();
    let mut chunk_start = reader.get_ref().virtual_position();
    for (_, start, _, _, span) in &reads {
        assert_ne!(reader.read_record(&mut record).unwrap(), 0);
        let chunk_end = reader.get_ref().virtual_position();
        let first = Position::try_from(start + 1).unwrap();
        let last = Position::try_from(start + span).unwrap();
        indexer
            .add_record(Some((0, first, last, true)), Chunk::new(chunk_start, chunk_end))
            .unwrap();
        chunk_start = chunk_end;
    }
    let index = indexer.build(header.reference_sequences().len());
    bam::bai::write(dir.join("sample.bam.bai"), &index).unwrap();

    path
}

fn write_bed(path: &Path, contents: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}

fn names(body: &Value) -> Vec<String> {
    body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_service_info() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server.get("/service-info").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["name"], "materializr");
    assert_eq!(body["reference"], true);
    assert_eq!(body["datasets"][0]["datatype"], "features");
    assert_eq!(body["datasets"][0]["keys"][0], "genes");
}

#[tokio::test]
async fn test_sequence_dictionary() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server.get("/sequence-dictionary").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["convention"], "prefixed");
    assert_eq!(body["sequences"][0]["name"], "chr1");
    assert_eq!(body["sequences"][0]["length"], 18);
    assert_eq!(body["sequences"][1]["name"], "chr2");
}

#[tokio::test]
async fn test_reference_bases() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server.get("/reference/chr1?start=6&end=12").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["sequence"], "GTTTTT");

    let response = server.get("/reference/2").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["sequence"], "ACGT");
    assert_eq!(body["region"]["referenceName"], "2");
}

#[tokio::test]
async fn test_reads_carry_mismatches() {
    let fixture = Fixture::new();
    let bam = write_bam(fixture._dir.path());
    let server = fixture.server(&["--reads", &bam.display().to_string()]);

    let response = server.get("/reads/sample/chr1").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(names(&body), vec!["r1", "r2", "r3"]);

    let r1 = &body["records"][0];
    assert_eq!(r1["cigar"], "4M");
    assert_eq!(r1["mismatches"][0]["op"], "M");
    assert_eq!(r1["mismatches"][0]["refPosition"], 3);
    assert_eq!(r1["mismatches"][0]["sequence"], "A");
    assert_eq!(r1["mismatches"][0]["refBase"], "T");

    let r2 = &body["records"][1];
    assert_eq!(r2["mismatches"].as_array().unwrap().len(), 1);
    assert_eq!(r2["mismatches"][0]["op"], "D");
    assert_eq!(r2["mismatches"][0]["refPosition"], 8);
    assert_eq!(r2["mismatches"][0]["refBase"], "T");

    assert!(body["records"][2]["mismatches"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reads_follow_caller_naming() {
    let fixture = Fixture::new();
    let bam = write_bam(fixture._dir.path());
    let server = fixture.server(&["--reads", &bam.display().to_string()]);

    let body: Value = server.get("/reads/sample/1?start=5&end=10").await.json();
    assert_eq!(names(&body), vec!["r2"]);
    assert_eq!(body["records"][0]["referenceName"], "1");
    assert_eq!(body["region"]["referenceName"], "1");
}

#[tokio::test]
async fn test_features_in_region() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server.get("/features/genes/chr1?start=3&end=12").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(names(&body), vec!["geneA", "geneB"]);
    assert_eq!(body["records"][1]["strand"], "-");
}

#[tokio::test]
async fn test_features_follow_caller_naming() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let body: Value = server.get("/features/genes/1").await.json();
    assert_eq!(body["records"][0]["referenceName"], "1");

    let body: Value = server.get("/features/genes/chr1").await.json();
    assert_eq!(body["records"][0]["referenceName"], "chr1");
}

#[tokio::test]
async fn test_cached_region_not_reloaded() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let body: Value = server.get("/features/genes/chr1?start=0&end=8").await.json();
    assert_eq!(names(&body), vec!["geneA"]);

    // Changes on disk are invisible for ranges already materialized...
    write_bed(&fixture.features, "chr1\t0\t5\tgeneZ\nchr1\t10\t15\tgeneB\n");
    let body: Value = server.get("/features/genes/chr1?start=0&end=8").await.json();
    assert_eq!(names(&body), vec!["geneA"]);

    // ...but the uncovered remainder is read fresh.
    let body: Value = server.get("/features/genes/chr1?start=0&end=18").await.json();
    assert_eq!(names(&body), vec!["geneA", "geneB"]);
}

#[tokio::test]
async fn test_unknown_sequence() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server.get("/features/genes/chr9").await;
    response.assert_status_bad_request();

    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "InvalidRegion");
}

#[tokio::test]
async fn test_inverted_region() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server.get("/features/genes/chr1?start=10&end=2").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_start_past_sequence_end() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server
        .get("/features/genes/chr1?start=18446744073709551615&end=18446744073709551615")
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "InvalidRegion");

    server
        .get("/features/genes/chr1?start=19")
        .await
        .assert_status_bad_request();
    server
        .get("/features/genes/chr1?start=18&end=18")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_unknown_key() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    let response = server.get("/features/nope/chr1").await;
    response.assert_status_not_found();

    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "NotFound");
}

#[tokio::test]
async fn test_datatype_not_configured() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);

    server.get("/reads/sample/chr1").await.assert_status_not_found();
    server.get("/variants/calls/chr1").await.assert_status_not_found();
}

#[tokio::test]
async fn test_region_too_large() {
    let fixture = Fixture::new();
    let server = fixture.server(&["--max-region-length", "5"]);

    let response = server.get("/features/genes/chr1?start=0&end=10").await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    server
        .get("/features/genes/chr1?start=0&end=5")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_malformed_source_is_load_failure() {
    let fixture = Fixture::new();
    let server = fixture.server(&[]);
    write_bed(&fixture.features, "chr1\tzero\t5\n");

    let response = server.get("/features/genes/chr1").await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "LoadFailure");

    // Nothing was marked covered, so a fixed file is picked up on retry.
    write_bed(&fixture.features, "chr1\t0\t5\tgeneA\n");
    let body: Value = server.get("/features/genes/chr1").await.json();
    assert_eq!(names(&body), vec!["geneA"]);
}
