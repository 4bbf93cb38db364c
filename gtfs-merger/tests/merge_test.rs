//! Integration tests for the gtfs-merger crate.
//!
//! Every test writes real ZIP archives to a temporary directory, merges them and inspects the
//! resulting archive and the recorded events.

use std::fs;
use std::path::{Path, PathBuf};

use gtfs_config::load_config_from;
use gtfs_config::shared::{DedupPolicy, MergeSettings, OutputCompression};
use gtfs_merger::key::KeyTable;
use gtfs_merger::{
    DuplicateKind, MemoryEventSink, MergeSummary, Merger, MergerConfig, MergerError, SkipReason,
};
use gtfs_telemetry::tracing::init_test_tracing;
use insta::assert_json_snapshot;
use zip::CompressionMethod;

mod support;

use support::feeds::{Feeds, member_bytes, member_compression, member_names, member_text};

fn merge(
    config: MergerConfig,
    inputs: &[&PathBuf],
    output: &Path,
) -> (Result<MergeSummary, MergerError>, MemoryEventSink) {
    init_test_tracing();

    let mut events = MemoryEventSink::new();
    let result = Merger::new(config).merge(inputs, output, &mut events);
    (result, events)
}

fn merge_ok(inputs: &[&PathBuf], output: &Path) -> (MergeSummary, MemoryEventSink) {
    let (result, events) = merge(MergerConfig::default(), inputs, output);
    (result.expect("merge failed"), events)
}

#[test]
fn test_stops_are_deduplicated_by_key() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("stops.txt", "stop_id,stop_name\nA,Alpha\nB,Beta\n")]);
    let b = feeds.archive("b.zip", &[("stops.txt", "stop_id,stop_name\nB,Beta\nC,Gamma\n")]);
    let output = feeds.path("merged.zip");

    let (summary, events) = merge_ok(&[&a, &b], &output);

    assert_eq!(
        member_text(&output, "stops.txt"),
        "stop_id,stop_name\nA,Alpha\nB,Beta\nC,Gamma\n"
    );
    assert_eq!(summary.rows_written, 3);
    assert_eq!(
        events.duplicates("stops.txt"),
        vec![(DuplicateKind::ExactDuplicate, "B,Beta".to_string())]
    );
}

#[test]
fn test_header_mismatch_excludes_archive_rows() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("stops.txt", "stop_id,stop_name\nA,Alpha\n")]);
    let b = feeds.archive(
        "b.zip",
        &[("stops.txt", "stop_id,stop_name,stop_code\nC,Gamma,7\n")],
    );
    let output = feeds.path("merged.zip");

    let (summary, events) = merge_ok(&[&a, &b], &output);

    assert_eq!(member_text(&output, "stops.txt"), "stop_id,stop_name\nA,Alpha\n");
    assert_eq!(events.skips("stops.txt"), vec![(b, SkipReason::HeaderMismatch)]);
    assert_eq!(summary.member("stops.txt").unwrap().header_mismatches, 1);
}

#[test]
fn test_header_comparison_is_byte_exact() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("stops.txt", "stop_id,stop_name\nA,Alpha\n")]);
    let b = feeds.archive("b.zip", &[("stops.txt", "stop_id,stop_name\r\nB,Beta\r\n")]);
    let c = feeds.archive("c.zip", &[("stops.txt", "stop_id, stop_name\nC,Gamma\n")]);
    let output = feeds.path("merged.zip");

    let (_, events) = merge_ok(&[&a, &b, &c], &output);

    assert_eq!(member_text(&output, "stops.txt"), "stop_id,stop_name\nA,Alpha\n");
    assert_eq!(
        events.skips("stops.txt"),
        vec![(b, SkipReason::HeaderMismatch), (c, SkipReason::HeaderMismatch)]
    );
}

#[test]
fn test_pass_all_keeps_repeated_keys() {
    let feeds = Feeds::new();
    let header = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n";
    let a = feeds.archive(
        "a.zip",
        &[(
            "stop_times.txt",
            format!("{header}T1,08:00:00,08:00:00,S1,1\n").as_str(),
        )],
    );
    let b = feeds.archive(
        "b.zip",
        &[(
            "stop_times.txt",
            format!("{header}T1,08:05:00,08:05:00,S2,1\nT1,08:00:00,08:00:00,S1,1\n").as_str(),
        )],
    );
    let output = feeds.path("merged.zip");
    let settings = MergeSettings {
        pass_all_files: vec!["stop_times.txt".to_string()],
        ..Default::default()
    };

    let (result, events) = merge(
        MergerConfig::from_settings(&settings).unwrap(),
        &[&a, &b],
        &output,
    );
    let summary = result.unwrap();

    assert_eq!(
        member_text(&output, "stop_times.txt"),
        format!(
            "{header}T1,08:00:00,08:00:00,S1,1\nT1,08:05:00,08:05:00,S2,1\nT1,08:00:00,08:00:00,S1,1\n"
        )
    );
    assert_eq!(
        summary.member("stop_times.txt").unwrap().policy,
        DedupPolicy::NoDedupPassAll
    );
    assert!(events.duplicates("stop_times.txt").is_empty());
}

#[test]
fn test_pass_all_keeps_blank_lines() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("stop_times.txt", "trip_id,stop_sequence\nT1,1\n\nT1,1\n")]);
    let b = feeds.archive("b.zip", &[("stop_times.txt", "trip_id,stop_sequence\n\nT2,1\n")]);
    let output = feeds.path("merged.zip");
    let settings = MergeSettings {
        pass_all_files: vec!["stop_times.txt".to_string()],
        ..Default::default()
    };

    let (result, events) = merge(
        MergerConfig::from_settings(&settings).unwrap(),
        &[&a, &b],
        &output,
    );
    let summary = result.unwrap();

    assert_eq!(
        member_text(&output, "stop_times.txt"),
        "trip_id,stop_sequence\nT1,1\n\nT1,1\n\nT2,1\n"
    );
    assert_eq!(summary.member("stop_times.txt").unwrap().rows_written, 5);
    assert!(events.duplicates("stop_times.txt").is_empty());
}

#[test]
fn test_seen_rows_do_not_cross_members() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[
            ("agency.txt", "agency_id,agency_name\nX,North\n"),
            ("routes.txt", "route_id,route_short_name\nX,1\n"),
            ("vehicles.txt", "vehicle_id\n1\n"),
            ("depots.txt", "depot_id\n1\n"),
        ],
    );
    let b = feeds.archive(
        "b.zip",
        &[
            ("routes.txt", "route_id,route_short_name\nY,2\n"),
            ("depots.txt", "depot_id\n2\n"),
        ],
    );
    let output = feeds.path("merged.zip");

    let (summary, events) = merge_ok(&[&a, &b], &output);

    assert_eq!(member_text(&output, "agency.txt"), "agency_id,agency_name\nX,North\n");
    assert_eq!(member_text(&output, "routes.txt"), "route_id,route_short_name\nX,1\nY,2\n");
    assert_eq!(member_text(&output, "vehicles.txt"), "vehicle_id\n1\n");
    assert_eq!(member_text(&output, "depots.txt"), "depot_id\n1\n2\n");
    for member in ["agency.txt", "routes.txt", "vehicles.txt", "depots.txt"] {
        assert!(events.duplicates(member).is_empty(), "{member} dropped a row");
    }
    assert_eq!(summary.rows_written, 6);
}

#[test]
fn test_composite_key_drops_conflicting_rows() {
    let feeds = Feeds::new();
    let header = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n";
    let a = feeds.archive(
        "a.zip",
        &[(
            "stop_times.txt",
            format!("{header}T1,08:00:00,08:00:00,S1,1\nT1,08:10:00,08:10:00,S2,2\n").as_str(),
        )],
    );
    let b = feeds.archive(
        "b.zip",
        &[(
            "stop_times.txt",
            format!("{header}T1,08:05:00,08:05:00,S9,1\nT2,08:00:00,08:00:00,S1,1\n").as_str(),
        )],
    );
    let output = feeds.path("merged.zip");

    let (summary, events) = merge_ok(&[&a, &b], &output);

    assert_eq!(
        member_text(&output, "stop_times.txt"),
        format!(
            "{header}T1,08:00:00,08:00:00,S1,1\nT1,08:10:00,08:10:00,S2,2\nT2,08:00:00,08:00:00,S1,1\n"
        )
    );
    assert_eq!(summary.key_conflicts, 1);
    assert_eq!(
        events.duplicates("stop_times.txt"),
        vec![(
            DuplicateKind::KeyConflict,
            "T1,08:05:00,08:05:00,S9,1".to_string()
        )]
    );
}

#[test]
fn test_exact_only_member_keeps_distinct_rows() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[("feed_info.txt", "feed_publisher_name,feed_lang\nNorth,en\n")],
    );
    let b = feeds.archive(
        "b.zip",
        &[(
            "feed_info.txt",
            "feed_publisher_name,feed_lang\nNorth,en\nNorth,fr\n",
        )],
    );
    let output = feeds.path("merged.zip");

    let (summary, _) = merge_ok(&[&a, &b], &output);

    assert_eq!(
        member_text(&output, "feed_info.txt"),
        "feed_publisher_name,feed_lang\nNorth,en\nNorth,fr\n"
    );
    let result = summary.member("feed_info.txt").unwrap();
    assert_eq!(result.policy, DedupPolicy::NoDedupPassExactOnly);
    assert_eq!(result.exact_duplicates, 1);
}

#[test]
fn test_unknown_member_falls_back_to_first_column_once() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[("vehicles.txt", "vehicle_id,capacity\nV1,40\nV2,60\n")],
    );
    let b = feeds.archive("b.zip", &[("vehicles.txt", "vehicle_id,capacity\nV1,45\nV3,80\n")]);
    let c = feeds.archive("c.zip", &[("vehicles.txt", "vehicle_id,capacity\nV4,20\n")]);
    let output = feeds.path("merged.zip");

    let (summary, events) = merge_ok(&[&a, &b, &c], &output);

    assert_eq!(
        member_text(&output, "vehicles.txt"),
        "vehicle_id,capacity\nV1,40\nV2,60\nV3,80\nV4,20\n"
    );
    assert_eq!(events.fallbacks("vehicles.txt"), 1);
    assert!(summary.member("vehicles.txt").unwrap().key_fallback);
}

#[test]
fn test_merging_archive_with_itself_is_idempotent() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[
            ("agency.txt", "agency_id,agency_name\nA1,North Transit\n"),
            ("stops.txt", "stop_id,stop_name\nA,Alpha\nB,Beta\nA,Alpha again\n"),
            ("notes.txt", "note_id,text\nN1,hello\nN1,hello\n"),
        ],
    );
    let alone = feeds.path("alone.zip");
    let twice = feeds.path("twice.zip");

    merge_ok(&[&a], &alone);
    merge_ok(&[&a, &a], &twice);

    assert_eq!(member_names(&alone), member_names(&twice));
    for member in member_names(&alone) {
        assert_eq!(
            member_bytes(&alone, &member),
            member_bytes(&twice, &member),
            "member {member}"
        );
    }
}

#[test]
fn test_members_follow_reference_archive() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[
            ("stops.txt", "stop_id\nA\n"),
            ("agency.txt", "agency_id\nA1\n"),
        ],
    );
    let b = feeds.archive(
        "b.zip",
        &[
            ("routes.txt", "route_id\nR1\n"),
            ("agency.txt", "agency_id\nA2\n"),
            ("stops.txt", "stop_id\nB\n"),
        ],
    );
    let output = feeds.path("merged.zip");

    merge_ok(&[&a, &b], &output);

    assert_eq!(member_names(&output), vec!["stops.txt", "agency.txt"]);
    assert_eq!(member_text(&output, "agency.txt"), "agency_id\nA1\nA2\n");
}

#[test]
fn test_missing_member_is_reported_and_tolerated() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[("stops.txt", "stop_id\nA\n"), ("routes.txt", "route_id\nR1\n")],
    );
    let b = feeds.archive("b.zip", &[("stops.txt", "stop_id\nB\n")]);
    let c = feeds.archive(
        "c.zip",
        &[("stops.txt", "stop_id\nC\n"), ("routes.txt", "route_id\nR2\n")],
    );
    let output = feeds.path("merged.zip");

    let (summary, events) = merge_ok(&[&a, &b, &c], &output);

    assert_eq!(member_text(&output, "routes.txt"), "route_id\nR1\nR2\n");
    assert_eq!(
        events.skips("routes.txt"),
        vec![(b, SkipReason::MemberMissingInArchive)]
    );
    assert!(events.skips("stops.txt").is_empty());
    assert_eq!(summary.skipped_archives, 1);
}

#[test]
fn test_missing_key_column_fails_without_output() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[
            ("agency.txt", "agency_id\nA1\n"),
            ("stops.txt", "stop_code,stop_name\n1,Alpha\n"),
        ],
    );
    let output = feeds.path("merged.zip");

    let (result, _) = merge(MergerConfig::default(), &[&a], &output);

    let err = result.unwrap_err();
    assert!(matches!(
        &err,
        MergerError::KeyColumnNotFound { member, column, archive, .. }
            if member == "stops.txt" && column == "stop_id" && archive == &a
    ));
    assert!(err.to_string().contains("stop_code, stop_name"));
    assert_eq!(feeds.file_names(), vec!["a.zip"]);
}

#[test]
fn test_unreadable_archive_fails_without_output() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("stops.txt", "stop_id\nA\n")]);
    let b = feeds.garbage("b.zip");
    let output = feeds.path("merged.zip");

    let (result, _) = merge(MergerConfig::default(), &[&a, &b], &output);

    assert!(matches!(
        result,
        Err(MergerError::ArchiveUnreadable { path, .. }) if path == b
    ));
    assert_eq!(feeds.file_names(), vec!["a.zip", "b.zip"]);
}

#[test]
fn test_missing_arguments() {
    let feeds = Feeds::new();

    let (result, events) = merge(MergerConfig::default(), &[], &feeds.path("merged.zip"));

    assert!(matches!(result, Err(MergerError::MissingArguments)));
    assert!(events.events().is_empty());
}

#[test]
fn test_bom_and_crlf_are_preserved() {
    let feeds = Feeds::new();
    let header: &[u8] = b"\xEF\xBB\xBFstop_id,stop_name\r\n";
    let a = feeds.archive_bytes(
        "a.zip",
        &[("stops.txt", [header, b"A,Alpha\r\nB,Beta\r\n"].concat().as_slice())],
    );
    let b = feeds.archive_bytes(
        "b.zip",
        &[(
            "stops.txt",
            [header, b"B,Beta\r\nC,\"Gamma, Central\""].concat().as_slice(),
        )],
    );
    let output = feeds.path("merged.zip");

    merge_ok(&[&a, &b], &output);

    assert_eq!(
        member_bytes(&output, "stops.txt"),
        [header, b"A,Alpha\r\nB,Beta\r\nC,\"Gamma, Central\"\r\n"].concat()
    );
}

#[test]
fn test_last_line_without_terminator_does_not_join_next_archive() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("routes.txt", "route_id,route_type\nR1,3")]);
    let b = feeds.archive("b.zip", &[("routes.txt", "route_id,route_type\nR2,3\n")]);
    let output = feeds.path("merged.zip");

    merge_ok(&[&a, &b], &output);

    assert_eq!(
        member_text(&output, "routes.txt"),
        "route_id,route_type\nR1,3\nR2,3\n"
    );
}

#[test]
fn test_directory_entries_are_reproduced() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[("extra/", ""), ("stops.txt", "stop_id\nA\n")],
    );
    let output = feeds.path("merged.zip");

    let (summary, _) = merge_ok(&[&a], &output);

    assert_eq!(member_names(&output), vec!["extra/", "stops.txt"]);
    assert_eq!(summary.directories, vec!["extra/"]);
}

#[test]
fn test_output_compression() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("stops.txt", "stop_id\nA\n")]);
    let stored = feeds.path("stored.zip");
    let deflated = feeds.path("deflated.zip");

    merge_ok(&[&a], &stored);
    let (result, _) = merge(
        MergerConfig::default().with_compression(OutputCompression::Deflated),
        &[&a],
        &deflated,
    );
    result.unwrap();

    assert_eq!(member_compression(&stored, "stops.txt"), CompressionMethod::Stored);
    assert_eq!(
        member_compression(&deflated, "stops.txt"),
        CompressionMethod::Deflated
    );
    assert_eq!(member_text(&deflated, "stops.txt"), "stop_id\nA\n");
}

#[test]
fn test_rules_from_settings_file() {
    let feeds = Feeds::new();
    let settings_path = feeds.path("settings.yaml");
    fs::write(
        &settings_path,
        "files:\n  - name: vehicles.txt\n    key_columns: [fleet, vehicle_id]\nexact_only_files:\n  - stops.txt\n",
    )
    .unwrap();
    let a = feeds.archive(
        "a.zip",
        &[
            ("vehicles.txt", "vehicle_id,fleet,capacity\nV1,north,40\n"),
            ("stops.txt", "stop_id,stop_name\nA,Alpha\n"),
        ],
    );
    let b = feeds.archive(
        "b.zip",
        &[
            ("vehicles.txt", "vehicle_id,fleet,capacity\nV1,south,45\nV1,north,50\n"),
            ("stops.txt", "stop_id,stop_name\nA,Alpha\nA,Alpha Square\n"),
        ],
    );
    let output = feeds.path("merged.zip");

    let settings: MergeSettings = load_config_from(Some(settings_path.as_path())).unwrap();
    let (result, events) = merge(
        MergerConfig::from_settings(&settings).unwrap(),
        &[&a, &b],
        &output,
    );
    result.unwrap();

    assert_eq!(
        member_text(&output, "vehicles.txt"),
        "vehicle_id,fleet,capacity\nV1,north,40\nV1,south,45\n"
    );
    assert_eq!(
        member_text(&output, "stops.txt"),
        "stop_id,stop_name\nA,Alpha\nA,Alpha Square\n"
    );
    assert_eq!(events.fallbacks("vehicles.txt"), 0);
}

#[test]
fn test_custom_key_table_without_fallback_keys() {
    let feeds = Feeds::new();
    let a = feeds.archive("a.zip", &[("vehicles.txt", "vehicle_id\nV1\n")]);
    let b = feeds.archive("b.zip", &[("vehicles.txt", "vehicle_id\nV1\n")]);
    let output = feeds.path("merged.zip");
    let config = MergerConfig::new(KeyTable::new(DedupPolicy::NoDedupPassAll));

    let (result, events) = merge(config, &[&a, &b], &output);
    result.unwrap();

    assert_eq!(member_text(&output, "vehicles.txt"), "vehicle_id\nV1\nV1\n");
    assert_eq!(events.fallbacks("vehicles.txt"), 1);
}

#[test]
fn test_summary_snapshot() {
    let feeds = Feeds::new();
    let a = feeds.archive(
        "a.zip",
        &[
            ("gtfs/", ""),
            ("stops.txt", "stop_id,stop_name\nA,Alpha\nB,Beta\n"),
            ("shapes.txt", "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nSH1,1.0,2.0,1\n"),
        ],
    );
    let b = feeds.archive(
        "b.zip",
        &[
            ("stops.txt", "stop_id,stop_name\nB,Beta\nA,Other\n"),
            ("shapes.txt", "shape_id,shape_pt_sequence\nSH2,1\n"),
        ],
    );
    let output = feeds.path("merged.zip");

    let (summary, _) = merge_ok(&[&a, &b], &output);

    assert_json_snapshot!(summary, @r#"
    {
      "archives": 2,
      "members": [
        {
          "member": "stops.txt",
          "policy": "key-dedup",
          "key_fallback": false,
          "rows_written": 2,
          "exact_duplicates": 1,
          "key_conflicts": 1,
          "archives_merged": 2,
          "header_mismatches": 0,
          "archives_missing_member": 0
        },
        {
          "member": "shapes.txt",
          "policy": "key-dedup",
          "key_fallback": false,
          "rows_written": 1,
          "exact_duplicates": 0,
          "key_conflicts": 0,
          "archives_merged": 1,
          "header_mismatches": 1,
          "archives_missing_member": 0
        }
      ],
      "directories": [
        "gtfs/"
      ],
      "rows_written": 3,
      "exact_duplicates": 1,
      "key_conflicts": 1,
      "skipped_archives": 1
    }
    "#);
}
