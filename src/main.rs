use std::path::Path;
use std::time::Instant;

use anyhow::bail;
use log::{info, warn};

use cohort_etl::{EtlPipeline, SchemaRegistry};

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    // A leading .json argument selects a registry config file; the
    // remaining arguments select dataset keys (default: all of them)
    let (registry, selected) = match args.split_first() {
        Some((first, rest)) if first.ends_with(".json") => (
            SchemaRegistry::from_json_file(Path::new(first))?,
            rest.to_vec(),
        ),
        _ => (SchemaRegistry::cohort(), args),
    };

    let keys: Vec<String> = if selected.is_empty() {
        registry.keys().map(str::to_string).collect()
    } else {
        selected
    };

    let pipeline = EtlPipeline::new(&registry);
    let mut failures = 0usize;

    for key in &keys {
        let start = Instant::now();
        match pipeline.run(key) {
            Ok(cleaned) => info!(
                "'{key}': cleaned {} rows x {} columns in {:?}",
                cleaned.num_rows(),
                cleaned.num_columns(),
                start.elapsed()
            ),
            Err(e) => {
                warn!("'{key}': pipeline failed: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} dataset(s) failed", keys.len());
    }

    info!("All {} dataset(s) processed successfully", keys.len());
    Ok(())
}
