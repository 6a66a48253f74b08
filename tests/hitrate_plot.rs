use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const HEADER: &str = "job.start, job.end, job.computetime, infiles.transfertime, outfiles.transfertime, machine.name, hitrate";

fn write_jobs(dir: &Path, name: &str, machine: &str, hitrate: f64, jobs: &[(f64, f64, f64)]) {
    let mut csv = format!("{}\n", HEADER);
    for (start, end, compute) in jobs {
        csv.push_str(&format!(
            "{}, {}, {}, 12.5, 3.5, {}, {}\n",
            start, end, compute, machine, hitrate
        ));
    }
    fs::write(dir.join(name), csv).unwrap();
}

/// a.csv: two jobs on M1 at hitrate 0, b.csv: two jobs on M2 at hitrate 1
fn scan_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_jobs(dir.path(), "a.csv", "M1", 0.0, &[(0., 1800., 1500.), (60., 2100., 1700.)]);
    write_jobs(dir.path(), "b.csv", "M2", 1.0, &[(0., 1200., 1100.), (30., 1290., 1150.)]);
    dir
}

fn outputs(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with("hitrate"))
        .collect();
    names.sort();
    names
}

#[test]
fn help_lists_the_options() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("hitrate_plot")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--scenario"))
        .stdout(predicate::str::contains("--style"))
        .stdout(predicate::str::contains("--suffix"));
    Ok(())
}

#[test]
fn scan_writes_pdf_and_png_per_quantity() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scan_dir();
    let mut cmd = Command::cargo_bin("hitrate_plot")?;
    cmd.current_dir(dir.path())
        .args(&["--scenario", "copy", "--suffix", "test", "a.csv", "b.csv"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("[4 rows x 7 columns]"));

    assert_eq!(
        outputs(dir.path()),
        vec![
            "hitrateEfficiency_copyjobs_test.pdf",
            "hitrateEfficiency_copyjobs_test.png",
            "hitrateIOtime_copyjobs_test.pdf",
            "hitrateIOtime_copyjobs_test.png",
            "hitrateWalltime_copyjobs_test.pdf",
            "hitrateWalltime_copyjobs_test.png",
        ]
    );
    let png = fs::read(dir.path().join("hitrateWalltime_copyjobs_test.png"))?;
    assert_eq!(&png[..4], b"\x89PNG");
    let pdf = fs::read(dir.path().join("hitrateWalltime_copyjobs_test.pdf"))?;
    assert_eq!(&pdf[..4], b"%PDF");
    Ok(())
}

#[test]
fn every_style_renders() -> Result<(), Box<dyn std::error::Error>> {
    for style in &[
        "scatterplot",
        "pointplot",
        "boxplot",
        "boxenplot",
        "violinplot",
        "jointplot",
    ] {
        let dir = scan_dir();
        // a second hitrate per machine so the densities have some spread
        write_jobs(dir.path(), "c.csv", "M1", 0.5, &[(0., 900., 800.), (0., 1000., 820.)]);
        write_jobs(dir.path(), "d.csv", "M2", 0.5, &[(0., 950., 900.), (0., 930., 700.)]);
        let mut cmd = Command::cargo_bin("hitrate_plot")?;
        cmd.current_dir(dir.path()).args(&[
            "--scenario",
            "SGBatch_fullstream_10G",
            "--style",
            *style,
            "--suffix",
            *style,
            "a.csv",
            "b.csv",
            "c.csv",
            "d.csv",
        ]);
        cmd.assert().success();
        assert_eq!(outputs(dir.path()).len(), 6, "style {}", style);
    }
    Ok(())
}

#[test]
fn zero_length_jobs_still_plot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scan_dir();
    write_jobs(dir.path(), "c.csv", "M1", 0.5, &[(100., 100., 10.), (0., 600., 300.)]);
    let mut cmd = Command::cargo_bin("hitrate_plot")?;
    cmd.current_dir(dir.path())
        .args(&["--scenario", "fullstream", "--style", "boxplot", "a.csv", "b.csv", "c.csv"]);
    cmd.assert().success();
    assert!(dir.path().join("hitrateEfficiency_fullstreamjobs.png").exists());
    Ok(())
}

#[test]
fn missing_input_fails_without_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scan_dir();
    let mut cmd = Command::cargo_bin("hitrate_plot")?;
    cmd.current_dir(dir.path())
        .args(&["--scenario", "copy", "a.csv", "missing.csv"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No such file"));
    assert!(outputs(dir.path()).is_empty());
    Ok(())
}

#[test]
fn non_csv_input_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scan_dir();
    fs::write(dir.path().join("a.json"), "{}")?;
    let mut cmd = Command::cargo_bin("hitrate_plot")?;
    cmd.current_dir(dir.path())
        .args(&["--scenario", "copy", "a.json"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("csv extension"));
    assert!(outputs(dir.path()).is_empty());
    Ok(())
}

#[test]
fn unknown_style_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = scan_dir();
    let mut cmd = Command::cargo_bin("hitrate_plot")?;
    cmd.current_dir(dir.path())
        .args(&["--scenario", "copy", "--style", "unknownvalue", "a.csv"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknownvalue"));
    assert!(outputs(dir.path()).is_empty());
    Ok(())
}

#[test]
fn missing_columns_exit_with_status_one() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("a.csv"), "machine.name, hitrate\nM1, 0.1\n")?;
    let mut cmd = Command::cargo_bin("hitrate_plot")?;
    cmd.current_dir(dir.path())
        .args(&["--scenario", "copy", "a.csv"]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("job.start"));
    assert!(outputs(dir.path()).is_empty());
    Ok(())
}
