//! # Seed Data Generator
//!
//! Fills an empty catalog with sample products and stock for development.
//!
//! ## Usage
//! ```bash
//! # 200 products into $SHOPCART_DATABASE_PATH (or ./shopcart.db)
//! cargo run -p shopcart-db --bin seed
//!
//! # Custom amount and database
//! cargo run -p shopcart-db --bin seed -- --count 1000 --db ./data/shop.db
//! ```
//!
//! Each product gets a name from one of the collections below, a price
//! between $4.99 and $59.99, and a stock level between 0 and 50.

use std::env;
use std::process::ExitCode;

use shopcart_core::{Money, NewProduct};
use shopcart_db::{AppConfig, Database};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const COLLECTIONS: &[(&str, &[&str])] = &[
    (
        "Coffee",
        &[
            "Ethiopia Yirgacheffe",
            "Colombia Huila",
            "Guatemala Antigua",
            "Kenya AA",
            "Brazil Cerrado",
            "House Espresso Blend",
            "Decaf Swiss Water",
            "Sumatra Mandheling",
        ],
    ),
    (
        "Brewing",
        &[
            "Pour-over Dripper",
            "Paper Filters",
            "French Press",
            "Gooseneck Kettle",
            "Hand Grinder",
            "Digital Scale",
            "Cold Brew Jar",
            "Moka Pot",
        ],
    ),
    (
        "Tea",
        &[
            "Sencha",
            "Assam Breakfast",
            "Earl Grey",
            "Jasmine Pearls",
            "Rooibos",
            "Chamomile",
            "Oolong",
            "Matcha",
        ],
    ),
    (
        "Tableware",
        &[
            "Ceramic Mug",
            "Espresso Cup Set",
            "Glass Teapot",
            "Travel Tumbler",
            "Latte Bowl",
            "Serving Tray",
        ],
    ),
];

const VARIANTS: &[(&str, i64)] = &[("", 0), ("Large", 400), ("Gift Edition", 1500)];

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Seed failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let app_config = AppConfig::from_env()?;

    let mut count: usize = 200;
    let mut db_path = app_config.database_path.clone();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--count" | "-c" => {
                let value = args.next().ok_or("--count needs a value")?;
                count = value.parse().map_err(|_| format!("invalid count: {value}"))?;
            }
            "--db" | "-d" => {
                db_path = args.next().ok_or("--db needs a value")?;
            }
            "--help" | "-h" => {
                println!("Shopcart Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: $SHOPCART_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
    }

    info!(database = %db_path, count = count, "Seeding catalog");

    let config = AppConfig {
        database_path: db_path,
        ..app_config
    };
    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(
            existing = existing,
            "Catalog already has products, skipping seed (delete the database to regenerate)"
        );
        return Ok(());
    }

    let start = std::time::Instant::now();
    let products = db.products();
    let mut generated = 0usize;
    let mut units = 0i64;

    for (seed, product) in catalog().take(count).enumerate() {
        let product = with_numbers(product, seed);
        match products.create(&product).await {
            Ok(_) => {
                generated += 1;
                units += product.quantity;
            }
            Err(e) => error!(name = %product.name, error = %e, "Failed to create product"),
        }

        if generated > 0 && generated % 100 == 0 {
            info!(generated = generated, "Progress");
        }
    }

    info!(
        generated = generated,
        units = units,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Catalog seeded"
    );

    let stocked = db.stock().total_quantity().await?;
    info!(total_stock = stocked, "Stock ledger verified");

    db.close().await;
    Ok(())
}

/// Every collection × item × variant, with a running number appended once
/// the combinations run out.
fn catalog() -> impl Iterator<Item = String> {
    let names: Vec<String> = COLLECTIONS
        .iter()
        .flat_map(|(collection, items)| {
            items.iter().flat_map(move |item| {
                VARIANTS.iter().map(move |(variant, _)| {
                    if variant.is_empty() {
                        format!("{collection}: {item}")
                    } else {
                        format!("{collection}: {item} ({variant})")
                    }
                })
            })
        })
        .collect();
    let per_round = names.len();

    (0..).map(move |n| {
        let name = &names[n % per_round];
        match n / per_round {
            0 => name.clone(),
            round => format!("{name} #{}", round + 1),
        }
    })
}

fn with_numbers(name: String, seed: usize) -> NewProduct {
    let variant_addon = VARIANTS
        .iter()
        .find(|(variant, _)| !variant.is_empty() && name.contains(variant))
        .map(|(_, addon)| *addon)
        .unwrap_or(0);

    // $4.99 - $44.99 base, plus the variant addon
    let price_cents = 499 + ((seed * 37) % 4000) as i64 + variant_addon;

    NewProduct {
        description: format!("Sample product #{}", seed + 1),
        image: format!("https://img.shopcart.local/products/{}.jpg", seed + 1),
        price: Money::from_cents(price_cents),
        quantity: (seed % 51) as i64,
        name,
    }
}
