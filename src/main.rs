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

mod cli;

use std::time::Instant;

use anyhow::Result;
use clap::CommandFactory;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use savor::RecommendError;
use savor::config;
use savor::config::Config;
use savor::config::ConfigCtx;
use savor::config::DataOverrides;
use savor::dataset::Dataset;
use savor::engine;
use savor::model::AreaFilter;
use savor::model::FilterCriteria;
use savor::output::JsonResponse;
use savor::output::QueryOut;
use savor::output::StatsOut;
use savor::output::print_json;
use savor::output::print_results;
use savor::output::results_to_json;

use crate::cli::AreasArgs;
use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::CuisinesArgs;
use crate::cli::RecommendArgs;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SAVOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let data = DataOverrides {
        catalog: cli.data.catalog,
        encodings: cli.data.encodings,
    };
    match cli.command {
        Commands::Init => cmd_init(),
        Commands::Recommend(args) => {
            let json = args.json;
            handle_result(cmd_recommend(&data, args), json)
        }
        Commands::Cities { json } => handle_result(cmd_cities(&data, json), json),
        Commands::Areas(args) => {
            let json = args.json;
            handle_result(cmd_areas(&data, args), json)
        }
        Commands::Cuisines(args) => {
            let json = args.json;
            handle_result(cmd_cuisines(&data, args), json)
        }
        Commands::Stats { json } => handle_result(cmd_stats(&data, json), json),
        Commands::Doctor { json } => handle_result(cmd_doctor(&data, json), json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "savor", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let resp = match err.downcast_ref::<RecommendError>() {
                    Some(engine_err) => {
                        let resp = JsonResponse::error(engine_err.code(), &engine_err.to_string());
                        if matches!(engine_err, RecommendError::InvalidCriteria(_)) {
                            resp
                        } else {
                            resp.with_error_hint("run `savor doctor` to list misaligned rows")
                        }
                    }
                    None => JsonResponse::error("error", &format!("{err:#}")),
                };
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn cmd_init() -> Result<()> {
    let Some(path) = config::global_config_path() else {
        anyhow::bail!("no config directory available on this platform");
    };
    if path.exists() {
        anyhow::bail!("savor.toml already exists at {}", path.display());
    }
    config::write_config(&path, &Config::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn load_dataset(data: &DataOverrides) -> Result<(ConfigCtx, Dataset)> {
    let ctx = ConfigCtx::load_from_cwd(data)?;
    let dataset = Dataset::load(&ctx.catalog_path(), &ctx.encodings_path(), &ctx.config)?;
    Ok((ctx, dataset))
}

fn build_criteria(config: &Config, args: &RecommendArgs) -> (FilterCriteria, Vec<String>) {
    let mut warnings = Vec::new();
    let mut top_n = args.top_n.unwrap_or(config.default_top_n);
    if top_n > config.max_top_n {
        warnings.push(format!(
            "top_n {top_n} exceeds max_top_n {}; clamped",
            config.max_top_n
        ));
        top_n = config.max_top_n;
    }
    let criteria = FilterCriteria {
        city: args.city.clone(),
        area: AreaFilter::from_label(args.area.as_deref(), &config.all_areas_label),
        cuisines: args.cuisines.clone(),
        min_rating: args.min_rating.unwrap_or(config.default_min_rating),
        max_cost: args.max_cost.unwrap_or(config.default_max_cost),
        top_n,
    };
    (criteria, warnings)
}

fn cmd_recommend(data: &DataOverrides, args: RecommendArgs) -> Result<()> {
    let started = Instant::now();
    let (ctx, dataset) = load_dataset(data)?;
    let load_ms = started.elapsed().as_millis() as i64;

    let (criteria, warnings) = build_criteria(&ctx.config, &args);
    let report =
        engine::recommend_with_report(&dataset.catalog, &dataset.encodings, &criteria)?;
    let all_areas = ctx.config.all_areas_label.as_str();

    if args.json {
        let mut timings = report.timings.clone();
        timings.load_ms = Some(load_ms);
        let stats = StatsOut {
            took_ms: started.elapsed().as_millis() as i64,
            total_hits: report.items.len() as i64,
            pool_size: Some(report.pool_size as i64),
            catalog_count: Some(dataset.catalog.len() as i64),
            fingerprint: dataset.fingerprint.clone(),
            timings: Some(timings),
            ..Default::default()
        };
        let mut resp = JsonResponse::ok()
            .with_query(QueryOut {
                city: criteria.city.clone(),
                area: criteria.area.label(all_areas).to_string(),
                cuisines: criteria.cuisines.clone(),
                min_rating: criteria.min_rating,
                max_cost: criteria.max_cost,
                top_n: criteria.top_n as i64,
            })
            .with_results(results_to_json(&report.items)?)
            .with_stats(stats)
            .with_warnings(warnings);
        if args.explain {
            resp = resp.with_explain(engine::build_explain_payload(
                &report, &criteria, all_areas,
            ));
        }
        print_json(&resp)?;
    } else {
        for warn in warnings {
            eprintln!("warning: {warn}");
        }
        if report.items.is_empty() {
            println!("No matching restaurants found for your selection.");
            return Ok(());
        }
        println!(
            "Top {} recommended restaurants in {} ({})",
            report.items.len(),
            criteria.city,
            criteria.area.label(all_areas)
        );
        print_results(&report.items, args.explain);
    }
    Ok(())
}

fn print_facets(facets: Vec<String>, json: bool) -> Result<()> {
    if json {
        print_json(&JsonResponse::ok().with_facets(facets))?;
    } else {
        for facet in facets {
            println!("{facet}");
        }
    }
    Ok(())
}

fn cmd_cities(data: &DataOverrides, json: bool) -> Result<()> {
    let (_, dataset) = load_dataset(data)?;
    print_facets(dataset.cities(), json)
}

fn cmd_areas(data: &DataOverrides, args: AreasArgs) -> Result<()> {
    let (ctx, dataset) = load_dataset(data)?;
    print_facets(
        dataset.areas(&args.city, &ctx.config.all_areas_label),
        args.json,
    )
}

fn cmd_cuisines(data: &DataOverrides, args: CuisinesArgs) -> Result<()> {
    let (ctx, dataset) = load_dataset(data)?;
    let area = AreaFilter::from_label(args.area.as_deref(), &ctx.config.all_areas_label);
    print_facets(dataset.cuisines(&args.city, &area), args.json)
}

fn cmd_stats(data: &DataOverrides, json: bool) -> Result<()> {
    let started = Instant::now();
    let (ctx, dataset) = load_dataset(data)?;
    let stats = dataset.stats();

    if json {
        let resp = JsonResponse::ok().with_stats(StatsOut {
            took_ms: started.elapsed().as_millis() as i64,
            total_hits: 0,
            catalog_count: Some(stats.catalog_count as i64),
            dropped_unknown_area: Some(stats.dropped_unknown_area as i64),
            encoding_count: Some(stats.encoding_count as i64),
            encoding_dim: Some(stats.encoding_dim as i64),
            city_count: Some(stats.city_count as i64),
            fingerprint: dataset.fingerprint.clone(),
            ..Default::default()
        });
        print_json(&resp)?;
    } else {
        println!("Catalog: {}", ctx.catalog_path().display());
        println!("Encodings: {}", ctx.encodings_path().display());
        println!("Restaurants: {}", stats.catalog_count);
        println!("Dropped (unknown area): {}", stats.dropped_unknown_area);
        println!("Encodings: {} x {}", stats.encoding_count, stats.encoding_dim);
        println!("Cities: {}", stats.city_count);
    }
    Ok(())
}

fn cmd_doctor(data: &DataOverrides, json: bool) -> Result<()> {
    let (_, dataset) = load_dataset(data)?;
    let report = dataset.integrity_check();

    if json {
        let resp = JsonResponse::ok().with_diagnostics(json!({
            "status": report.status,
            "missing_encodings": report.missing_encodings,
            "orphan_encodings": report.orphan_encodings,
        }));
        print_json(&resp)?;
    } else {
        println!("Integrity: {}", report.status);
        for id in &report.missing_encodings {
            println!("missing encoding: {id}");
        }
        if report.orphan_encodings > 0 {
            println!("Encodings without catalog rows: {}", report.orphan_encodings);
        }
    }
    Ok(())
}
