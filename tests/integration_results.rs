use anyhow::Result;
use nest_bench_analysis::{
    metrics::SIM_FACTOR, Aggregator, AnalysisConfig, LoadError, ResultsManager, Role,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = "num_nodes,threads_per_task,tasks_per_node,model_time_sim,rng_seed,\
time_construction_create,time_construction_connect,time_simulate,time_update";

fn write_timers(dir: &Path, name: &str, rows: &[&str]) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    let mut text = format!("{}\n", HEADER);
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(&path, text)?;
    Ok(path)
}

fn unscaled() -> AnalysisConfig {
    AnalysisConfig {
        time_scaling: 1.0,
        ..Default::default()
    }
}

/// A primary and a control run share one configuration; the summary compares
/// only that one.
#[test]
fn finalize_with_control_writes_all_outputs() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let primary = write_timers(
        input.path(),
        "primary.csv",
        &["1,4,2,5,1,1,1,10,6", "1,4,2,5,2,1,1,12,6", "2,4,2,5,1,1,1,20,6"],
    )?;
    let control = write_timers(
        input.path(),
        "control.csv",
        &["1,4,2,5,1,1,1,22,6", "1,4,2,5,2,1,1,22,6", "4,4,2,5,1,1,1,30,6"],
    )?;

    let mut aggregator = Aggregator::new(unscaled());
    aggregator.load_file(&primary, Role::Primary)?;
    aggregator.load_file(&control, Role::Control)?;

    let manager = ResultsManager::new(output.path(), "study")?;
    let summary = manager.finalize(&aggregator)?;

    assert!(output.path().join("study.csv").exists());
    assert!(output.path().join("study_ctrl.csv").exists());
    assert!(output.path().join("study.json").exists());
    assert_eq!(summary.tables.len(), 2);
    assert_eq!(
        summary.relative_difference_file,
        Some(output.path().join("study_rel_diff.csv"))
    );

    let text = fs::read_to_string(manager.rel_diff_path())?;
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let rows: Vec<Vec<&str>> = lines.map(|l| l.split(',').collect()).collect();
    let column = |name: &str| header.iter().position(|h| *h == name).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column("num_nodes")], "1.000");
    assert_eq!(rows[0][column("time_simulate")], "-0.500");
    assert_eq!(rows[0][column(SIM_FACTOR)], "-0.500");
    assert_eq!(rows[0][column("time_update")], "0.000");

    let comparison = summary.comparison.expect("both tables loaded");
    assert_eq!(comparison.len(), 1);
    assert_eq!(comparison[0].configuration.num_nodes, 1.0);
    assert!((comparison[0].primary - 2.2).abs() < 1e-9);
    assert!((comparison[0].control - 4.4).abs() < 1e-9);
    assert!((comparison[0].ratio.unwrap() - 0.5).abs() < 1e-9);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(manager.summary_path())?)?;
    assert_eq!(json["metadata"]["run_id"], "study");
    assert_eq!(json["metadata"]["config"]["time_scaling"], 1.0);
    assert_eq!(json["tables"][0]["role"], "primary");
    assert_eq!(json["tables"][1]["role"], "control");
    Ok(())
}

/// The aggregated CSV has one row per configuration and writes a single
/// trial's standard deviation as an empty cell.
#[test]
fn aggregated_csv_layout() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let primary = write_timers(
        input.path(),
        "primary.csv",
        &["1,4,2,5,1,1,1,10,6", "1,4,2,5,2,1,1,12,6", "2,4,2,5,1,1,1,20,6"],
    )?;

    let mut aggregator = Aggregator::new(unscaled());
    aggregator.load_file(&primary, Role::Primary)?;
    let manager = ResultsManager::new(output.path(), "layout")?;
    manager.finalize(&aggregator)?;

    let text = fs::read_to_string(manager.csv_path(Role::Primary))?;
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let rows: Vec<Vec<&str>> = lines.map(|l| l.split(',').collect()).collect();
    assert_eq!(rows.len(), 2);
    assert!(!header.contains(&"rng_seed"));

    let column = |name: &str| header.iter().position(|h| *h == name).unwrap();
    assert_eq!(rows[0][column(SIM_FACTOR)], "2.200");
    assert_eq!(rows[1][column(SIM_FACTOR)], "4.000");
    assert_eq!(rows[0][column("num_vp")], "8.000");
    assert_eq!(rows[1][column("time_simulate_std")], "");
    assert_eq!(rows[0][column("time_update_frac")], "54.545");
    Ok(())
}

#[test]
fn missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut aggregator = Aggregator::new(unscaled());

    let result = aggregator.load_file(&dir.path().join("absent.csv"), Role::Primary);

    assert!(matches!(result, Err(LoadError::Io { .. })));
    assert!(aggregator.table(Role::Primary).is_none());
}

#[test]
fn missing_required_column_is_reported() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("no_simulate.csv");
    fs::write(
        &path,
        "num_nodes,threads_per_task,tasks_per_node,model_time_sim,rng_seed,\
time_construction_create,time_construction_connect\n1,1,1,5,1,1,1\n",
    )?;

    let mut aggregator = Aggregator::new(unscaled());
    match aggregator.load_file(&path, Role::Primary) {
        Err(LoadError::MissingColumn { column }) => assert_eq!(column, "time_simulate"),
        other => panic!("expected missing column, got {:?}", other.map(|t| t.rows())),
    }
    Ok(())
}

/// A failing control load leaves the primary analysis intact.
#[test]
fn failed_control_keeps_primary() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let primary = write_timers(input.path(), "primary.csv", &["1,4,2,5,1,1,1,10,6"])?;

    let mut aggregator = Aggregator::new(unscaled());
    aggregator.load_file(&primary, Role::Primary)?;
    assert!(aggregator
        .load_file(&input.path().join("absent.csv"), Role::Control)
        .is_err());

    let manager = ResultsManager::new(output.path(), "partial")?;
    let summary = manager.finalize(&aggregator)?;

    assert_eq!(summary.tables.len(), 1);
    assert!(summary.comparison.is_none());
    assert!(!manager.csv_path(Role::Control).exists());
    assert!(!manager.rel_diff_path().exists());
    Ok(())
}
