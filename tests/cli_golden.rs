// Copyright 2026 Savor Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use jsonschema::JSONSchema;
use predicates::prelude::*;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

const CATALOG_CSV: &str = "\
,name,City,rating,rating_count,cost,cuisine,Area
0,Trattoria Roma,Metro,4.5,120,400,Italian,Downtown
1,Golden Wok,Metro,4.2,80,300,Chinese,Harbor
2,Pasta Place,metro,4.0,40,500,italian,Downtown
3,Budget Bites,Metro,3.9,15,450,Italian,Uptown
4,Harbor Pizza,METRO,4.8,210,250,Italian,Harbor
5,River Grill,Riverside,4.9,300,200,Italian,Old Town
6,Fancy Fork,Metro,4.6,95,900,Italian,Downtown
7,Mystery Diner,Metro,3.0,5,150,American,Unknown
";

const ENCODINGS_CSV: &str = "\
,f0,f1,f2
0,1.0,0.2,0.0
1,0.0,1.0,0.3
2,0.9,0.3,0.1
3,0.5,0.5,0.5
4,0.2,0.1,1.0
5,1.0,1.0,1.0
6,0.7,0.7,0.0
7,0.1,0.1,0.1
";

struct Fixture {
    _config: TempDir,
    _data: TempDir,
    config_root: PathBuf,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let config = TempDir::new().expect("config tempdir");
        let data = TempDir::new().expect("data tempdir");
        fs::write(data.path().join("cleaned_data.csv"), CATALOG_CSV).expect("write catalog");
        fs::write(data.path().join("encoder_data.csv"), ENCODINGS_CSV).expect("write encodings");
        Self {
            config_root: config.path().to_path_buf(),
            root: data.path().to_path_buf(),
            _config: config,
            _data: data,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("savor"));
        cmd.env("XDG_CONFIG_HOME", &self.config_root);
        cmd.env("HOME", &self.config_root);
        cmd.env("APPDATA", &self.config_root);
        cmd.env_remove("SAVOR_LOG");
        cmd.current_dir(&self.root);
        cmd
    }
}

fn global_config_path(config_root: &Path) -> PathBuf {
    let base = if cfg!(target_os = "macos") {
        config_root.join("Library").join("Application Support")
    } else {
        config_root.to_path_buf()
    };
    base.join("savor").join("savor.toml")
}

fn load_schema() -> JSONSchema {
    let schema_text = include_str!("../schemas/response.schema.json");
    let schema_json: Value = serde_json::from_str(schema_text).expect("schema json");
    JSONSchema::options()
        .compile(&schema_json)
        .expect("compile schema")
}

fn normalize_json(mut value: Value) -> Value {
    if let Some(stats) = value.get_mut("stats")
        && let Some(obj) = stats.as_object_mut()
    {
        obj.insert("took_ms".to_string(), json!(0));
        if obj.contains_key("timings") {
            obj.insert("timings".to_string(), json!({}));
        }
    }
    value
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("parse json")
}

fn run_text(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_schema(schema: &JSONSchema, value: &Value) {
    if let Err(errors) = schema.validate(value) {
        let msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
        panic!("schema validation failed:\n{}", msgs.join("\n"));
    }
}

fn result_ids(value: &Value) -> Vec<String> {
    value["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|r| r["id"].as_str().expect("id").to_string())
        .collect()
}

#[test]
fn recommend_metro_italian() {
    let schema = load_schema();
    let fx = Fixture::new();

    let mut cmd = fx.cmd();
    cmd.args([
        "recommend",
        "--city",
        "Metro",
        "--area",
        "All Areas",
        "--cuisine",
        "Italian",
        "--min-rating",
        "4.0",
        "--max-cost",
        "500",
        "--top-n",
        "10",
        "--json",
        "--explain",
    ]);
    let value = normalize_json(run_json(&mut cmd));
    assert_schema(&schema, &value);

    assert_eq!(value["ok"], true);
    assert_eq!(result_ids(&value), vec!["2", "0", "4"]);
    let scores: Vec<f64> = value["results"]
        .as_array()
        .expect("results")
        .iter()
        .map(|r| r["similarity_score"].as_f64().expect("score"))
        .collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "scores not sorted: {scores:?}");
    }
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));

    assert_eq!(
        value["query"],
        json!({
            "city": "Metro",
            "area": "All Areas",
            "cuisines": ["Italian"],
            "min_rating": 4.0,
            "max_cost": 500.0,
            "top_n": 10,
        })
    );
    assert_eq!(value["stats"]["total_hits"], 3);
    assert_eq!(value["stats"]["pool_size"], 3);
    assert_eq!(value["stats"]["catalog_count"], 7);
    assert_eq!(value["stats"]["fingerprint"].as_str().map(str::len), Some(64));
    assert_eq!(value["explain"]["mode"], "mean_pairwise_cosine");
    assert_eq!(value["explain"]["stages"]["city"], 6);
    assert_eq!(value["explain"]["stages"]["cuisine"], 5);
    assert_eq!(value["explain"]["stages"]["rating_cost"], 3);
    assert_eq!(value["explain"]["truncated"], false);
}

#[test]
fn recommend_text_output() {
    let fx = Fixture::new();
    let mut cmd = fx.cmd();
    cmd.args([
        "recommend",
        "--city",
        "metro",
        "--area",
        "downtown",
        "--cuisine",
        "italian",
        "--min-rating",
        "4.0",
        "--max-cost",
        "500",
    ]);
    let stdout = run_text(&mut cmd);
    insta::assert_snapshot!(stdout.trim_end(), @r"
    Top 2 recommended restaurants in metro (downtown)
    1	Trattoria Roma	4.5 (120 reviews)	400	Italian	Downtown
    2	Pasta Place	4.0 (40 reviews)	500	italian	Downtown
    ");
}

#[test]
fn facets_list_filter_vocabulary() {
    let schema = load_schema();
    let fx = Fixture::new();

    let stdout = run_text(fx.cmd().args(["cities"]));
    insta::assert_snapshot!(stdout.trim_end(), @r"
    Metro
    Riverside
    ");

    let stdout = run_text(fx.cmd().args(["areas", "--city", "Metro"]));
    insta::assert_snapshot!(stdout.trim_end(), @r"
    All Areas
    Downtown
    Harbor
    Uptown
    ");

    let value = run_json(fx.cmd().args(["areas", "--city", "Riverside", "--json"]));
    assert_schema(&schema, &value);
    assert_eq!(value["facets"], json!(["Old Town"]));

    let value = run_json(fx.cmd().args([
        "cuisines", "--city", "metro", "--area", "Harbor", "--json",
    ]));
    assert_schema(&schema, &value);
    assert_eq!(value["facets"], json!(["Chinese", "Italian"]));

    let value = run_json(fx.cmd().args(["cuisines", "--city", "Metro", "--json"]));
    assert_eq!(value["facets"], json!(["Chinese", "Italian"]));
}

#[test]
fn stats_and_doctor() {
    let schema = load_schema();
    let fx = Fixture::new();

    let value = normalize_json(run_json(fx.cmd().args(["stats", "--json"])));
    assert_schema(&schema, &value);
    assert_eq!(value["stats"]["catalog_count"], 7);
    assert_eq!(value["stats"]["dropped_unknown_area"], 1);
    assert_eq!(value["stats"]["encoding_count"], 8);
    assert_eq!(value["stats"]["encoding_dim"], 3);
    assert_eq!(value["stats"]["city_count"], 2);

    let value = run_json(fx.cmd().args(["doctor", "--json"]));
    assert_schema(&schema, &value);
    assert_eq!(
        value["diagnostics"],
        json!({
            "status": "ok",
            "missing_encodings": [],
            "orphan_encodings": 1,
        })
    );
}

#[test]
fn no_match_is_an_empty_result() {
    let schema = load_schema();
    let fx = Fixture::new();

    let value = run_json(fx.cmd().args(["recommend", "--city", "Atlantis", "--json"]));
    assert_schema(&schema, &value);
    assert_eq!(value["ok"], true);
    assert_eq!(value["results"], json!([]));
    assert_eq!(value["stats"]["pool_size"], 0);

    fx.cmd()
        .args(["recommend", "--city", "Metro", "--max-cost", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No matching restaurants found for your selection.",
        ));
}

#[test]
fn invalid_criteria_are_reported() {
    let schema = load_schema();
    let fx = Fixture::new();

    let value = run_json(fx.cmd().args(["recommend", "--city", "Metro", "--top-n", "0", "--json"]));
    assert_schema(&schema, &value);
    assert_eq!(value["ok"], false);
    assert_eq!(value["error"]["code"], "invalid_criteria");

    fx.cmd()
        .args(["recommend", "--city", "Metro", "--min-rating", "6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid criteria"));
}

#[test]
fn missing_encoding_is_a_data_integrity_error() {
    let schema = load_schema();
    let fx = Fixture::new();
    let trimmed: String = ENCODINGS_CSV
        .lines()
        .filter(|line| !line.starts_with("2,"))
        .map(|line| format!("{line}\n"))
        .collect();
    fs::write(fx.root.join("encoder_data.csv"), trimmed).expect("rewrite encodings");

    let value = run_json(fx.cmd().args([
        "recommend",
        "--city",
        "Metro",
        "--cuisine",
        "Italian",
        "--min-rating",
        "4.0",
        "--max-cost",
        "500",
        "--json",
    ]));
    assert_schema(&schema, &value);
    assert_eq!(value["ok"], false);
    assert_eq!(value["error"]["code"], "data_integrity");
    assert!(value["error"]["message"].as_str().expect("message").contains("'2'"));
    assert!(value["error"]["hint"].as_str().is_some());

    // Candidate "2" is filtered out here, so its missing row does not matter.
    let value = run_json(fx.cmd().args([
        "recommend", "--city", "Metro", "--area", "Harbor", "--json",
    ]));
    assert_eq!(value["ok"], true);
    assert_eq!(result_ids(&value), vec!["1", "4"]);

    let value = run_json(fx.cmd().args(["doctor", "--json"]));
    assert_eq!(value["diagnostics"]["status"], "misaligned");
    assert_eq!(value["diagnostics"]["missing_encodings"], json!(["2"]));
}

#[test]
fn missing_catalog_fails() {
    let config = TempDir::new().expect("config tempdir");
    let empty = TempDir::new().expect("empty tempdir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("savor"));
    cmd.env("XDG_CONFIG_HOME", config.path())
        .env("HOME", config.path())
        .env("APPDATA", config.path())
        .current_dir(empty.path())
        .args(["recommend", "--city", "Metro"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn init_writes_config_once() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));
    let path = global_config_path(&fx.config_root);
    let text = fs::read_to_string(&path).expect("read config");
    assert!(text.contains("all_areas_label = \"All Areas\""));

    fx.cmd()
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn config_supplies_defaults() {
    let fx = Fixture::new();
    let path = global_config_path(&fx.config_root);
    fs::create_dir_all(path.parent().expect("config parent")).expect("config dir");
    fs::write(
        &path,
        "all_areas_label = \"Everywhere\"\ndefault_top_n = 1\ndefault_min_rating = 4.0\ndefault_max_cost = 500\nmax_top_n = 2\n",
    )
    .expect("write config");

    let value = run_json(fx.cmd().args([
        "recommend", "--city", "Metro", "--area", "everywhere", "--cuisine", "Italian", "--json",
    ]));
    assert_eq!(value["query"]["area"], "Everywhere");
    assert_eq!(result_ids(&value), vec!["2"]);

    let value = run_json(fx.cmd().args([
        "recommend", "--city", "Metro", "--top-n", "5", "--json",
    ]));
    assert_eq!(value["query"]["top_n"], 2);
    assert_eq!(
        value["warnings"],
        json!(["top_n 5 exceeds max_top_n 2; clamped"])
    );

    let stdout = run_text(fx.cmd().args(["areas", "--city", "Metro"]));
    assert!(stdout.starts_with("Everywhere\n"));
}

#[test]
fn jsonl_tables_via_overrides() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.root.join("alt")).expect("alt dir");
    fs::write(
        fx.root.join("alt/catalog.jsonl"),
        concat!(
            "{\"id\": \"a\", \"name\": \"Noodle Bar\", \"city\": \"Lakeside\", \"area\": \"Pier\", \"cuisine\": \"Thai\", \"rating\": 4.3, \"rating_count\": 50, \"cost\": 350}\n",
            "{\"id\": \"b\", \"name\": \"Curry Hut\", \"city\": \"Lakeside\", \"area\": \"Pier\", \"cuisine\": \"Thai\", \"rating\": 4.1, \"rating_count\": 20, \"cost\": 300}\n",
        ),
    )
    .expect("write catalog");
    fs::write(
        fx.root.join("alt/encodings.jsonl"),
        "{\"id\": \"a\", \"vector\": [1.0, 0.0]}\n{\"id\": \"b\", \"vector\": [1.0, 0.0]}\n",
    )
    .expect("write encodings");

    let value = run_json(fx.cmd().args([
        "--catalog",
        "alt/catalog.jsonl",
        "--encodings",
        "alt/encodings.jsonl",
        "recommend",
        "--city",
        "Lakeside",
        "--json",
    ]));
    assert_eq!(result_ids(&value), vec!["a", "b"]);
    let scores: Vec<f64> = value["results"]
        .as_array()
        .expect("results")
        .iter()
        .map(|r| r["similarity_score"].as_f64().expect("score"))
        .collect();
    assert_eq!(scores[0], scores[1]);
}

#[test]
fn cuisine_facets_with_commas_round_trip() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.root.join("alt")).expect("alt dir");
    fs::write(
        fx.root.join("alt/catalog.csv"),
        concat!(
            "id,name,city,area,cuisine,rating,rating_count,cost\n",
            "a,Spice Route,Metro,Central,\"North Indian,Chinese\",4.4,90,500\n",
            "b,Thai Garden,Metro,Central,Thai,4.2,30,400\n",
            "c,Dragon House,Metro,Central,Chinese,4.0,10,300\n",
        ),
    )
    .expect("write catalog");
    fs::write(
        fx.root.join("alt/encodings.csv"),
        "id,f0,f1\na,1.0,0.0\nb,0.0,1.0\nc,1.0,1.0\n",
    )
    .expect("write encodings");
    let data = [
        "--catalog",
        "alt/catalog.csv",
        "--encodings",
        "alt/encodings.csv",
    ];

    let value = run_json(fx.cmd().args(data).args(["cuisines", "--city", "Metro", "--json"]));
    assert_eq!(
        value["facets"],
        json!(["Chinese", "North Indian,Chinese", "Thai"])
    );
    let combined = value["facets"][1].as_str().expect("facet").to_string();

    let value = run_json(fx.cmd().args(data).args([
        "recommend",
        "--city",
        "Metro",
        "--cuisine",
        combined.as_str(),
        "--cuisine",
        "Thai",
        "--json",
    ]));
    assert_eq!(
        value["query"]["cuisines"],
        json!(["North Indian,Chinese", "Thai"])
    );
    assert_eq!(result_ids(&value), vec!["a", "b"]);

    let value = run_json(fx.cmd().args(data).args([
        "recommend",
        "--city",
        "Metro",
        "--cuisine",
        "chinese",
        "--json",
    ]));
    assert_eq!(result_ids(&value), vec!["c"]);
}

#[test]
fn completions_are_generated() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("savor"));
}
