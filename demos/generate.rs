use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wfc3d::{BoxMap, Catalog, Collapser, EngineConfig, NullObserver, Position};

/// Collapse a bounded box over a YAML module catalog and print the result.
#[derive(Parser)]
struct Args {
    /// Path to a catalog YAML file (see `Catalog::load`).
    catalog: PathBuf,
    /// Box size as `XxYxZ`, e.g. `8x8x4`.
    size: String,
    /// PRNG seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn parse_size(text: &str) -> (i64, i64, i64) {
    let parts: Vec<i64> = text
        .split('x')
        .map(|s| s.parse().expect("size must be XxYxZ"))
        .collect();
    match parts.as_slice() {
        [x, y, z] => (*x, *y, *z),
        _ => panic!("size must be XxYxZ"),
    }
}

fn main() {
    let args = Args::parse();
    let catalog = Catalog::load(&args.catalog).expect("failed to load catalog");
    println!("Loaded catalog with {} modules.", catalog.num_modules());

    let catalog = Arc::new(catalog);
    let size = parse_size(&args.size);
    let map = BoxMap::new(Position::origin(), size, &catalog);
    let rng = StdRng::seed_from_u64(args.seed);
    let mut collapser = Collapser::new(map, catalog, rng, EngineConfig::default());

    let mut observer = NullObserver;
    collapser
        .collapse_box(Position::origin(), size, &mut observer)
        .expect("collapse failed");

    let (sx, sy, sz) = size;
    for z in 0..sz {
        println!("layer z={z}");
        for y in 0..sy {
            let row: Vec<String> = (0..sx)
                .map(|x| {
                    collapser
                        .map()
                        .get_slot(Position::new(x, y, z))
                        .and_then(wfc3d::Slot::chosen)
                        .map_or_else(|| "?".to_string(), |m| m.to_string())
                })
                .collect();
            println!("{}", row.join(" "));
        }
    }
}
