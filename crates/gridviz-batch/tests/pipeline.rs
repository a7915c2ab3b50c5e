use std::fs;
use std::path::Path;

use gridviz_batch::{
    layer_path, load_batch_manifest, process_grid, run_batch, BatchRunnerConfig, JobStatus,
    PipelineSettings,
};
use gridviz_core::{DistrictPolygon, GridVizError, GridVizResult};
use gridviz_io::{OutputLayer, PolygonSource};
use serde_json::Value;
use tempfile::tempdir;

fn point_hex(x: f64, y: f64) -> String {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(1u32 | 0x2000_0000).to_le_bytes());
    bytes.extend_from_slice(&4326u32.to_le_bytes());
    bytes.extend_from_slice(&x.to_le_bytes());
    bytes.extend_from_slice(&y.to_le_bytes());
    hex::encode(bytes)
}

struct FixedSource;

impl PolygonSource for FixedSource {
    fn fetch_district(&self, subst_id: &str) -> GridVizResult<DistrictPolygon> {
        let ring = vec![[7.0, 51.0], [8.0, 51.0], [8.0, 52.0], [7.0, 51.0]];
        Ok(DistrictPolygon::from_hectares(subst_id, 12_345.0, vec![ring]))
    }
}

struct FailingSource;

impl PolygonSource for FailingSource {
    fn fetch_district(&self, _subst_id: &str) -> GridVizResult<DistrictPolygon> {
        Err(GridVizError::RemoteFetch("status 503".into()))
    }
}

struct Grid<'a> {
    buses: &'a str,
    transformers: &'a str,
    generators: &'a str,
    lines: &'a str,
    loads: &'a str,
}

fn write_grid(csv_root: &Path, grid_id: &str, grid: &Grid) {
    let dir = csv_root.join(grid_id);
    fs::create_dir_all(&dir).unwrap();
    for (table, body) in [
        ("buses", grid.buses),
        ("transformers", grid.transformers),
        ("generators", grid.generators),
        ("lines", grid.lines),
        ("loads", grid.loads),
    ] {
        fs::write(dir.join(format!("{table}_{grid_id}.csv")), body).unwrap();
    }
}

fn standard_buses() -> String {
    format!(
        "name,v_nom,geom\nA,20.0,{}\nB,0.4,\nC,0.4,{}\n",
        point_hex(7.5, 51.5),
        point_hex(7.6, 51.6)
    )
}

fn standard_grid(buses: &str) -> Grid<'_> {
    Grid {
        buses,
        transformers: "name,bus0,bus1,s_nom\nT1,A,C,630.4\nT2,B,C,400\n",
        generators: "name,bus,p_nom,type\nG1,A,0.5,solar\nG2,C,0.25,wind\n",
        lines: "name,bus0,bus1,s_nom,length\nL1,A,C,10.0,1.23456\nL2,A,B,10.0,0.5\n",
        loads: "name,bus,peak_load,annual_consumption,sector\nD1,C,12.34,30000,residential\nD2,B,5.0,100,retail\n",
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn transformer_on_bus_without_geometry_is_dropped() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "645", &standard_grid(&buses));

    let settings = PipelineSettings::new(csv.path(), out.path());
    let report = process_grid("645", &settings, &FixedSource);
    assert!(report.is_ok(), "{:?}", report.result);

    let transformers = read_json(&layer_path(out.path(), "645", OutputLayer::Transformers));
    let features = transformers["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["name"], "T1");
    assert_eq!(features[0]["geometry"]["coordinates"][0], 7.5);
    assert_eq!(features[0]["properties"]["Nominal apparent power in kVA"], 630.0);
    assert_eq!(features[0]["properties"]["Latitude"], 51.5);
}

#[test]
fn line_with_unresolved_endpoint_is_dropped() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "645", &standard_grid(&buses));

    let report = process_grid("645", &PipelineSettings::new(csv.path(), out.path()), &FixedSource);
    assert!(report.is_ok());

    let lines = read_json(&layer_path(out.path(), "645", OutputLayer::Lines));
    let features = lines["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["geometry"]["type"], "LineString");
    assert_eq!(
        features[0]["geometry"]["coordinates"],
        serde_json::json!([[7.5, 51.5], [7.6, 51.6]])
    );
    assert_eq!(features[0]["properties"]["Length in km"], 1.235);
    // Bus B itself plus T2, L2 and D2 which reference it.
    assert_eq!(report.diagnostics.dropped_rows(), 4);
    assert_eq!(report.diagnostics.table("lines").unwrap().dropped, 1);
}

#[test]
fn successful_grid_writes_five_layers_with_district_totals() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "645", &standard_grid(&buses));

    let report = process_grid("645", &PipelineSettings::new(csv.path(), out.path()), &FixedSource);
    assert!(report.is_ok());
    assert_eq!(report.written.len(), 5);

    let district = read_json(&layer_path(out.path(), "645", OutputLayer::District));
    let features = district["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    let feature = &features[0];
    assert_eq!(feature["geometry"]["type"], "MultiPolygon");
    let props = &feature["properties"];
    assert_eq!(props["Substation id"], 645);
    assert_eq!(props["MV generation capacity in kW"], 500.0);
    assert_eq!(props["LV generation capacity in kW"], 250.0);
    assert_eq!(props["Peak load in kW"], 12.3);
    assert_eq!(props["Annual consumption in kWh"], 30000.0);
    assert_eq!(props["Area in km²"], 123.0);
}

#[test]
fn remote_failure_keeps_table_layers_and_skips_district() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "645", &standard_grid(&buses));

    let report = process_grid("645", &PipelineSettings::new(csv.path(), out.path()), &FailingSource);

    let err = report.result.as_ref().unwrap_err();
    assert_eq!(gridviz_batch::failure_kind(err), "RemoteFetchError");
    for layer in OutputLayer::TABLE_LAYERS {
        assert!(layer_path(out.path(), "645", layer).exists(), "{layer:?}");
    }
    assert!(!layer_path(out.path(), "645", OutputLayer::District).exists());
    assert_eq!(report.written.len(), 4);
}

#[test]
fn duplicate_bus_aborts_before_any_file_is_written() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = format!(
        "name,v_nom,geom\nA,20.0,{0}\nA,20.0,{0}\n",
        point_hex(7.5, 51.5)
    );
    write_grid(csv.path(), "645", &standard_grid(&buses));

    let report = process_grid("645", &PipelineSettings::new(csv.path(), out.path()), &FixedSource);
    let err = report.result.as_ref().unwrap_err();
    assert_eq!(gridviz_batch::failure_kind(err), "SchemaViolation");
    assert!(report.written.is_empty());
    assert!(!out.path().join("645").exists());
}

#[test]
fn failed_lookup_removes_district_from_earlier_run() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "7", &standard_grid(&buses));
    let settings = PipelineSettings::new(csv.path(), out.path());

    assert!(process_grid("7", &settings, &FixedSource).is_ok());
    assert!(layer_path(out.path(), "7", OutputLayer::District).exists());

    let report = process_grid("7", &settings, &FailingSource);
    assert_eq!(
        gridviz_batch::failure_kind(report.result.as_ref().unwrap_err()),
        "RemoteFetchError"
    );
    assert!(!layer_path(out.path(), "7", OutputLayer::District).exists());
    for layer in OutputLayer::TABLE_LAYERS {
        assert!(layer_path(out.path(), "7", layer).exists(), "{layer:?}");
    }
    assert_eq!(report.written.len(), 4);
}

#[test]
fn schema_failure_removes_layers_from_earlier_run() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "645", &standard_grid(&buses));
    let settings = PipelineSettings::new(csv.path(), out.path());
    assert!(process_grid("645", &settings, &FixedSource).is_ok());

    let duplicated = format!("name,v_nom,geom\nA,20.0,{0}\nA,20.0,{0}\n", point_hex(7.5, 51.5));
    fs::write(csv.path().join("645").join("buses_645.csv"), duplicated).unwrap();

    let report = process_grid("645", &settings, &FixedSource);
    assert_eq!(
        gridviz_batch::failure_kind(report.result.as_ref().unwrap_err()),
        "SchemaViolation"
    );
    for layer in OutputLayer::ALL {
        assert!(!layer_path(out.path(), "645", layer).exists(), "{layer:?}");
    }
}

#[test]
fn write_failure_rolls_back_layers_written_so_far() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "645", &standard_grid(&buses));
    // A directory where the line layer should go makes its rename fail.
    fs::create_dir_all(layer_path(out.path(), "645", OutputLayer::Lines)).unwrap();

    let report = process_grid("645", &PipelineSettings::new(csv.path(), out.path()), &FixedSource);
    assert_eq!(
        gridviz_batch::failure_kind(report.result.as_ref().unwrap_err()),
        "IoError"
    );
    assert!(report.written.is_empty());
    for layer in [OutputLayer::Transformers, OutputLayer::Generators, OutputLayer::District] {
        assert!(!layer_path(out.path(), "645", layer).exists(), "{layer:?}");
    }
}

#[test]
fn high_voltage_generators_are_counted_but_not_drawn() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = format!(
        "name,v_nom,geom\nA,20.0,{}\nH,110.0,{}\n",
        point_hex(7.5, 51.5),
        point_hex(7.7, 51.7)
    );
    let grid = Grid {
        buses: &buses,
        transformers: "name,bus0\n",
        generators: "name,bus,p_nom\nG1,A,0.5\nG2,H,2.0\n",
        lines: "name,bus0,bus1\n",
        loads: "name,bus,peak_load\n",
    };
    write_grid(csv.path(), "7", &grid);

    let report = process_grid("7", &PipelineSettings::new(csv.path(), out.path()), &FixedSource);
    assert!(report.is_ok(), "{:?}", report.result);

    let generators = read_json(&layer_path(out.path(), "7", OutputLayer::Generators));
    assert_eq!(generators["features"].as_array().unwrap().len(), 1);
    let district = read_json(&layer_path(out.path(), "7", OutputLayer::District));
    assert_eq!(
        district["features"][0]["properties"]["MV generation capacity in kW"],
        2500.0
    );
}

#[test]
fn batch_isolates_failures_and_writes_manifest_and_listing() {
    let csv = tempdir().unwrap();
    let out = tempdir().unwrap();
    let buses = standard_buses();
    write_grid(csv.path(), "645", &standard_grid(&buses));
    write_grid(csv.path(), "655", &standard_grid(&buses));
    fs::write(csv.path().join("655").join("buses_655.csv"), "name,v_nom\nA,20\n").unwrap();

    let config = BatchRunnerConfig {
        grid_ids: vec!["645".into(), "655".into(), "700".into()],
        settings: PipelineSettings::new(csv.path(), out.path()),
        dataset_version: "v0.4.5".into(),
        threads: 2,
        write_listing: true,
    };
    let summary = run_batch(&config, &FixedSource).unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 2);

    let manifest = load_batch_manifest(&summary.manifest_path).unwrap();
    assert_eq!(manifest.num_grids, 3);
    let ids: Vec<&str> = manifest.grids.iter().map(|g| g.grid_id.as_str()).collect();
    assert_eq!(ids, ["645", "655", "700"]);
    assert_eq!(manifest.grids[0].status, JobStatus::Ok);
    assert_eq!(manifest.grids[0].outputs.len(), 5);
    assert_eq!(manifest.grids[1].error_kind.as_deref(), Some("SchemaViolation"));
    assert_eq!(manifest.grids[2].error_kind.as_deref(), Some("IoError"));

    let listing = fs::read_to_string(summary.listing_path.unwrap()).unwrap();
    assert_eq!(listing, "gridids\n645\n655\n");
}
