//! Integration tests for the `run` command.
use powerplan::cli::{RunOpts, handle_run_command};
use powerplan::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

mod common;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

fn run_opts(output_dir: &Path) -> RunOpts {
    RunOpts {
        output_dir: Some(output_dir.to_path_buf()),
        debug_model: true,
        solver: Some("highs".into()),
        time_limit: Some(60.0),
        ..RunOpts::default()
    }
}

/// Read a CSV output file into its header and rows
fn read_output(output_dir: &Path, file_name: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(output_dir.join(file_name)).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    common::quiet();

    {
        // Save results to non-existent directory to check that directory creation works
        let tempdir = tempdir().unwrap();
        let output_dir = tempdir.path().join("results");
        handle_run_command(
            &get_model_dir(),
            &run_opts(&output_dir),
            Some(Settings::default()),
        )
        .unwrap();

        for file_name in [
            "metadata.toml",
            "deployment.csv",
            "coverage.csv",
            "emissions.csv",
            "gas_usage.csv",
            "demand_response.csv",
            "summary.csv",
            "debug_dispatch.csv",
            "debug_constraints.csv",
        ] {
            assert!(output_dir.join(file_name).is_file(), "{file_name} missing");
        }

        // One summary row per scenario, ranked
        let (header, rows) = read_output(&output_dir, "summary.csv");
        let rank = header.iter().position(|name| name == "rank").unwrap();
        let ranks: Vec<_> = rows.iter().map(|row| row[rank].as_str()).collect();
        assert_eq!(ranks, ["1", "2", "3"]);

        // Four planning years for each of three scenarios
        let (_, rows) = read_output(&output_dir, "deployment.csv");
        assert_eq!(rows.len(), 12);

        assert!(fs::read_to_string(output_dir.join("powerplan_info.log")).is_ok());
    }

    // Second time will fail because the logging is already initialised
    let tempdir = tempdir().unwrap();
    assert_eq!(
        handle_run_command(
            &get_model_dir(),
            &run_opts(tempdir.path()),
            Some(Settings::default())
        )
        .unwrap_err()
        .chain()
        .next()
        .unwrap()
        .to_string(),
        "Failed to initialise logging."
    );
}
