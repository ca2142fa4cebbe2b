//! Golden tests for the conversion and scoring pipeline.
//!
//! These tests run the file-level stages end to end against a small dump
//! and compare the artifacts byte for byte.

use std::fs;
use std::path::Path;

use wiki_mstat::pipeline::{self, Target};
use wiki_mstat::{
    MStatRow, PageTraceReader, PipelineConfig, ProcessParams, TimeSeriesPoint, TraceStore,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Revisions are deliberately out of chronological order.
const DUMP: &str = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/" version="0.10" xml:lang="en">
  <siteinfo>
    <sitename>Wikipedia</sitename>
    <dbname>enwiki</dbname>
  </siteinfo>
  <page>
    <title>Anarchism</title>
    <ns>0</ns>
    <id>12</id>
    <revision>
      <id>103</id>
      <parentid>102</parentid>
      <timestamp>2001-01-03T00:00:00Z</timestamp>
      <contributor><username>Bob Smith</username><id>2</id></contributor>
      <comment>rv</comment>
      <model>wikitext</model>
      <format>text/x-wiki</format>
      <text bytes="2" xml:space="preserve">v1</text>
      <sha1>aaa</sha1>
    </revision>
    <revision>
      <id>101</id>
      <timestamp>2001-01-01T00:00:00Z</timestamp>
      <contributor><username>Alice</username><id>1</id></contributor>
      <text bytes="2" xml:space="preserve">v1</text>
    </revision>
    <revision>
      <id>102</id>
      <parentid>101</parentid>
      <timestamp>2001-01-02T00:00:00Z</timestamp>
      <contributor><ip>10.0.0.1</ip></contributor>
      <text bytes="2" xml:space="preserve">v2</text>
    </revision>
    <revision>
      <id>104</id>
      <parentid>103</parentid>
      <timestamp>2001-01-04T00:00:00Z</timestamp>
      <contributor><username>Alice</username><id>1</id></contributor>
      <text bytes="2" xml:space="preserve">v2</text>
    </revision>
  </page>
  <page>
    <title>Edit War</title>
    <ns>0</ns>
    <id>13</id>
    <revision><id>201</id><timestamp>2002-01-01T00:00:00Z</timestamp>
      <contributor><username>A</username></contributor><text>a</text></revision>
    <revision><id>205</id><timestamp>2002-01-05T00:00:00Z</timestamp>
      <contributor><username>C</username></contributor><text>c</text></revision>
    <revision><id>202</id><timestamp>2002-01-02T00:00:00Z</timestamp>
      <contributor><username>B</username></contributor><text>b</text></revision>
    <revision><id>203</id><timestamp>2002-01-03T00:00:00Z</timestamp>
      <contributor><username>A</username></contributor><text>a</text></revision>
    <revision><id>207</id><timestamp>2002-01-07T00:00:00Z</timestamp>
      <contributor><username>A</username></contributor><text>c</text></revision>
    <revision><id>204</id><timestamp>2002-01-04T00:00:00Z</timestamp>
      <contributor><username>B</username></contributor><text>b</text></revision>
    <revision><id>206</id><timestamp>2002-01-06T00:00:00Z</timestamp>
      <contributor><username>D</username></contributor><text>d</text></revision>
  </page>
  <page>
    <title>Stub</title>
    <ns>0</ns>
    <id>14</id>
  </page>
</mediawiki>
"#;

const EXPECTED_TRACE: &str = "Anarchism
^^^_2001-01-04T00:00:00Z 1 2 Alice
^^^_2001-01-03T00:00:00Z 1 1 Bob_Smith
^^^_2001-01-02T00:00:00Z 0 2 10.0.0.1
^^^_2001-01-01T00:00:00Z 0 1 Alice
Edit War
^^^_2002-01-07T00:00:00Z 1 3 A
^^^_2002-01-06T00:00:00Z 0 4 D
^^^_2002-01-05T00:00:00Z 0 3 C
^^^_2002-01-04T00:00:00Z 1 2 B
^^^_2002-01-03T00:00:00Z 1 1 A
^^^_2002-01-02T00:00:00Z 0 2 B
^^^_2002-01-01T00:00:00Z 0 1 A
Stub
";

fn setup(data_dir: &Path) -> PipelineConfig {
    fs::create_dir_all(data_dir.join("temp")).unwrap();
    fs::write(data_dir.join("temp").join("dump.xml"), DUMP).unwrap();

    let json = format!(
        r#"{{
            "data_dir": {:?},
            "process": {{ "fps": ["dump.xml"], "page_chunk": 2 }},
            "m_stat": {{ "fps": ["light-dump-dump-xml.txt"], "extra_stats": true }},
            "extract": {{ "fps": ["light-dump-dump-xml.txt"], "desired_articles": ["Edit War"] }},
            "over_time": {{ "fps": ["light-dump-Edit-War.txt"] }}
        }}"#,
        data_dir.display().to_string()
    );
    PipelineConfig::from_json(&json).unwrap()
}

fn convert_with_chunk(page_chunk: usize) -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.txt");
    let params = ProcessParams { page_chunk, ..ProcessParams::default() };

    let mut store = TraceStore::create(&path).unwrap();
    pipeline::convert_dump(DUMP.as_bytes(), &mut store, &params).unwrap();
    store.finish().unwrap();
    fs::read_to_string(&path).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// CONVERSION TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_trace_matches_golden() {
    assert_eq!(convert_with_chunk(10), EXPECTED_TRACE);
}

#[test]
fn test_chunk_size_does_not_change_output() {
    for page_chunk in [1, 2, 3, 1000] {
        assert_eq!(
            convert_with_chunk(page_chunk),
            EXPECTED_TRACE,
            "page_chunk {} changed the trace",
            page_chunk
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PIPELINE TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_process_and_score() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());

    let converted = pipeline::process_data(&config).unwrap();
    assert_eq!(converted.len(), 1);
    assert_eq!(converted[0].output, dir.path().join("out/light-dump-dump-xml.txt"));
    assert_eq!(converted[0].stats.pages, 3);
    assert_eq!(converted[0].stats.revisions, 11);
    assert_eq!(fs::read_to_string(&converted[0].output).unwrap(), EXPECTED_TRACE);

    let scored = pipeline::m_stat_data(&config).unwrap();
    assert_eq!(scored[0].pages, 3);
    assert_eq!(scored[0].conflicted_pages, 1);

    let table = fs::read_to_string(dir.path().join("out_m_stat/m-stat-dump-xml.jsonl")).unwrap();
    let rows: Vec<MStatRow> = table.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].title, "Anarchism");
    assert_eq!(rows[0].m_statistic, 0);
    assert_eq!(rows[0].revert_count, Some(2));
    assert_eq!(rows[0].editor_count, Some(3));

    assert_eq!(rows[1].page_index, 1);
    assert_eq!(rows[1].title, "Edit War");
    assert_eq!(rows[1].m_statistic, 2);
    assert_eq!(rows[1].edit_count, Some(7));
    assert_eq!(rows[1].revert_count, Some(3));
    assert_eq!(rows[1].editor_count, Some(4));
    assert_eq!(rows[1].mutual_editor_count, Some(2));

    assert_eq!(rows[2].title, "Stub");
    assert_eq!(rows[2].m_statistic, 0);
    assert_eq!(rows[2].edit_count, Some(0));
}

#[test]
fn test_extract_then_time_series() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());

    pipeline::run(&config, &[Target::OverTime, Target::Extract, Target::Process]).unwrap();

    let article = dir.path().join("out/light-dump-Edit-War.txt");
    let page = PageTraceReader::open(&article).unwrap().single_page().unwrap();
    assert_eq!(page.title, "Edit War");
    assert_eq!(page.len(), 7);

    let series = fs::read_to_string(dir.path().join("out_m_stat/overtime-Edit-War.jsonl")).unwrap();
    let points: Vec<TimeSeriesPoint> = series.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    let scores: Vec<u64> = points.iter().map(|p| p.m_statistic).collect();
    assert_eq!(scores, vec![0, 0, 0, 0, 0, 0, 2]);
    assert_eq!(points[0].timestamp, "2002-01-01T00:00:00Z");
    assert_eq!(points[6].timestamp, "2002-01-07T00:00:00Z");
}

#[test]
fn test_rerun_overwrites_trace() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());

    pipeline::process_data(&config).unwrap();
    pipeline::process_data(&config).unwrap();

    let trace = fs::read_to_string(dir.path().join("out/light-dump-dump-xml.txt")).unwrap();
    assert_eq!(trace, EXPECTED_TRACE);
}

#[test]
fn test_scores_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    pipeline::process_data(&config).unwrap();

    pipeline::m_stat_data(&config).unwrap();
    let first = fs::read_to_string(dir.path().join("out_m_stat/m-stat-dump-xml.jsonl")).unwrap();
    pipeline::m_stat_data(&config).unwrap();
    let second = fs::read_to_string(dir.path().join("out_m_stat/m-stat-dump-xml.jsonl")).unwrap();
    assert_eq!(first, second);
}
