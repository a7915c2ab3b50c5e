use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn point_hex(x: f64, y: f64) -> String {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(1u32 | 0x2000_0000).to_le_bytes());
    bytes.extend_from_slice(&4326u32.to_le_bytes());
    bytes.extend_from_slice(&x.to_le_bytes());
    bytes.extend_from_slice(&y.to_le_bytes());
    hex::encode(bytes)
}

fn write_grid(csv_root: &Path, grid_id: &str) {
    let dir = csv_root.join(grid_id);
    fs::create_dir_all(&dir).unwrap();
    let buses = format!(
        "name,v_nom,geom\nA,20.0,{}\nB,0.4,{}\n",
        point_hex(7.5, 51.5),
        point_hex(7.6, 51.6)
    );
    let tables = [
        ("buses", buses.as_str()),
        ("transformers", "name,bus0,bus1,s_nom\nT1,A,B,630\n"),
        ("generators", "name,bus,p_nom\nG1,A,0.5\n"),
        ("lines", "name,bus0,bus1,length\nL1,A,B,1.5\n"),
        ("loads", "name,bus,peak_load\nD1,B,3.5\n"),
    ];
    for (table, body) in tables {
        fs::write(dir.join(format!("{table}_{grid_id}.csv")), body).unwrap();
    }
}

fn gridviz() -> Command {
    Command::cargo_bin("gridviz").unwrap()
}

#[test]
fn help_lists_subcommands() {
    gridviz()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn list_prints_ids_and_writes_listing() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_grid(csv.path(), "655");
    write_grid(csv.path(), "645");

    gridviz()
        .args(["list", "--csv-root"])
        .arg(csv.path())
        .arg("--geojson-root")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::eq("645\n655\n"));

    let listing = fs::read_to_string(out.path().join("available_grid_data.txt")).unwrap();
    assert_eq!(listing, "gridids\n645\n655\n");
}

#[test]
fn unreachable_registry_fails_grid_but_keeps_table_layers() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_grid(csv.path(), "645");

    gridviz()
        .args(["process", "--grid-ids", "645", "--base-url", "http://127.0.0.1:9"])
        .args(["--timeout-secs", "2", "--csv-root"])
        .arg(csv.path())
        .arg("--geojson-root")
        .arg(out.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("0 ok, 1 failed"))
        .stdout(predicate::str::contains("RemoteFetchError"));

    let grid_dir = out.path().join("645");
    for name in [
        "mv_visualization_transformer_data_645.geojson",
        "mv_visualization_generator_data_645.geojson",
        "mv_visualization_line_data_645.geojson",
        "mv_visualization_load_data_645.geojson",
    ] {
        assert!(grid_dir.join(name).exists(), "{name}");
    }
    assert!(!grid_dir.join("mv_grid_district_645.geojson").exists());

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.path().join("batch_manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["failure"], 1);
    assert_eq!(manifest["grids"][0]["error_kind"], "RemoteFetchError");
    assert!(out.path().join("available_grid_data.txt").exists());
}

#[test]
fn invalid_selector_is_reported() {
    gridviz()
        .args(["process", "--grid-ids", "655..645"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("655..645 is empty"));
}

#[test]
fn huge_range_is_rejected_up_front() {
    gridviz()
        .args(["process", "--grid-ids", "0..4294967295"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("more than 100000 grid ids"));
}

#[test]
fn conf_file_with_unknown_key_is_rejected() {
    let dir = tempdir().unwrap();
    let conf = dir.path().join("gridviz.toml");
    fs::write(&conf, "[data]\ngridids = \"645\"\n").unwrap();

    gridviz()
        .arg("--conf")
        .arg(&conf)
        .args(["process", "--no-listing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gridids"));
}

#[test]
fn conf_file_supplies_paths() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_grid(csv.path(), "12");
    let conf = out.path().join("gridviz.toml");
    fs::write(
        &conf,
        format!(
            "[data]\ncsv_root = {:?}\ngeojson_root = {:?}\n",
            csv.path().display().to_string(),
            out.path().display().to_string()
        ),
    )
    .unwrap();

    gridviz()
        .arg("--conf")
        .arg(&conf)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::eq("12\n"));
}
