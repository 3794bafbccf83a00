use anyhow::{bail, Context, Result};
use clap::Parser;
use osm_multipolygon::prelude::*;
use std::path::PathBuf;

mod output;
mod pbf;

use output::{write_areas_geojson, write_errors_json, AreaSink};
use pbf::{read_members, read_relations};

#[derive(Parser, Debug)]
#[command(
    name = "osm-areas",
    author,
    version,
    about = "Build area polygons from OpenStreetMap multipolygon relations",
    long_about = "Reads an OSM PBF file in two passes: first the multipolygon and boundary \
                  relations, then the nodes and member ways they need. Each relation is \
                  assembled into a multipolygon and written out as a GeoJSON feature.\n\n\
                  With --repair, gaps between dangling way ends are bridged and \
                  self-intersecting rings are cut back to a valid shape."
)]
struct Args {
    /// Input OSM PBF file
    #[arg(short, long)]
    input: PathBuf,

    /// Output GeoJSON file for built areas
    #[arg(short, long)]
    output: PathBuf,

    /// Also write failed and incomplete relations to this JSON file
    #[arg(long)]
    errors: Option<PathBuf>,

    /// Try to repair broken relations (close gaps, cut self-intersections)
    #[arg(long)]
    repair: bool,

    /// Measure gaps between dangling ends with the haversine distance
    #[arg(long)]
    haversine: bool,

    /// Also build areas from tagged closed ways that are not relation members
    #[arg(long)]
    closed_ways: bool,

    /// Use the GEOS geometry backend instead of the built-in planar one
    #[cfg(feature = "geos")]
    #[arg(long)]
    geos: bool,

    /// Log time spent in each assembly phase
    #[arg(long)]
    timings: bool,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn build_config(&self) -> BuildConfig {
        BuildConfig {
            attempt_repair: self.repair,
            gap_metric: if self.haversine {
                GapMetric::Haversine
            } else {
                GapMetric::Planar
            },
            areas_from_closed_ways: self.closed_ways,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    log::info!("=== OSM Area Builder ===");
    log::info!("Input: {}", args.input.display());
    log::info!("Output: {}", args.output.display());

    if !args.input.exists() {
        bail!("Input file does not exist: {}", args.input.display());
    }

    let config = args.build_config();
    log::info!(
        "Repair: {}, gap metric: {:?}, closed ways: {}",
        config.attempt_repair,
        config.gap_metric,
        config.areas_from_closed_ways
    );

    #[cfg(feature = "geos")]
    if args.geos {
        log::info!("Geometry backend: GEOS");
        let builder = MultipolygonBuilder::with_kernel(GeosKernel, config);
        return run(&args, RelationCollector::with_builder(builder));
    }

    run(&args, RelationCollector::new(config))
}

fn run<K: GeometryKernel>(args: &Args, mut collector: RelationCollector<K>) -> Result<()> {
    // Phase 1: relations
    log::info!("");
    log::info!("Phase 1: Collecting relations...");
    let relation_count =
        read_relations(&args.input, &mut collector).context("Failed to read relations from PBF")?;
    collector.end_pass1();
    log::info!(
        "  Retained {} of {} relations",
        collector.stats().relations_retained,
        relation_count
    );

    // Phase 2: nodes and member ways
    log::info!("");
    log::info!("Phase 2: Assembling areas...");
    let mut sink = AreaSink::default();
    let mut timings = PhaseTimings::new();
    let mut untimed = ();
    let observer: &mut dyn PhaseObserver = if args.timings {
        &mut timings
    } else {
        &mut untimed
    };
    let pass = read_members(&args.input, &mut collector, &mut sink, observer)
        .context("Failed to read nodes and ways from PBF")?;
    log::info!(
        "  Resolved {} ways ({} unresolved)",
        pass.ways_resolved,
        pass.ways_unresolved
    );

    let stats = collector.finish(&mut sink);
    stats.log_summary();
    if args.timings {
        timings.log_summary();
    }

    // Phase 3: output
    log::info!("");
    log::info!("Phase 3: Writing output...");
    write_areas_geojson(&sink.areas, &args.output).context("Failed to write areas")?;
    if let Some(errors_path) = &args.errors {
        write_errors_json(&sink.errors, errors_path).context("Failed to write errors")?;
    }

    log::info!("");
    log::info!("=== Summary ===");
    log::info!("Areas written: {}", sink.areas.len());
    log::info!("Relations without area: {}", sink.errors.len());

    Ok(())
}
