//! # Seed Data Generator
//!
//! Populates the database with a demo restaurant menu for development.
//!
//! ## Usage
//! ```bash
//! # Generate the full menu (default: 300 items)
//! cargo run -p mezze-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p mezze-db --bin seed -- --count 50
//!
//! # Specify database path
//! cargo run -p mezze-db --bin seed -- --db ./data/mezze.db
//! ```
//!
//! ## Generated Items
//! Menu sections:
//! - Cold mezze (hummus, tabbouleh ...)
//! - Hot mezze (falafel, halloumi ...)
//! - Grill (kofta, shish taouk ...)
//! - Bakery (manakish, fatayer ...)
//! - Drinks (ayran, mint lemonade ...)
//!
//! Each item has:
//! - Unique code: `{SECTION}-{DISH}-{SEED}`
//! - Sell price: 3.50 - 11.49 plus a portion add-on
//! - Cost price at 30-45% of the sell price
//! - Opening stock 0 - 60 (recorded as an INITIAL ledger row)
//! - Reorder level 5

use std::env;

use mezze_core::NewProduct;
use mezze_db::{Database, DbConfig};

/// Menu sections for realistic demo data
const SECTIONS: &[(&str, &[&str])] = &[
    (
        "CLD",
        &[
            "Hummus",
            "Moutabal",
            "Baba Ghanoush",
            "Tabbouleh",
            "Fattoush",
            "Labneh",
            "Muhammara",
            "Warak Enab",
            "Shanklish",
            "Olives",
        ],
    ),
    (
        "HOT",
        &[
            "Falafel",
            "Halloumi",
            "Kibbeh",
            "Sambousek",
            "Batata Harra",
            "Foul Medames",
            "Arayes",
            "Sujuk",
            "Makanek",
            "Hummus Lahme",
        ],
    ),
    (
        "GRL",
        &[
            "Lamb Kofta",
            "Shish Taouk",
            "Lamb Chops",
            "Mixed Grill",
            "Chicken Wings",
            "Beef Kebab",
            "Grilled Halloumi",
            "Grilled Prawns",
            "Sea Bass",
            "Vegetable Skewer",
        ],
    ),
    (
        "BAK",
        &[
            "Zaatar Manakish",
            "Cheese Manakish",
            "Lahm Bi Ajeen",
            "Spinach Fatayer",
            "Pita Basket",
            "Kaak",
            "Baklava",
            "Knafeh",
            "Maamoul",
            "Halawet El Jibn",
        ],
    ),
    (
        "DRK",
        &[
            "Ayran",
            "Mint Lemonade",
            "Jallab",
            "Arabic Coffee",
            "Mint Tea",
            "Fresh Orange",
            "Pomegranate Juice",
            "Sparkling Water",
            "Still Water",
            "Tamarind",
        ],
    ),
];

/// Portion variants with their price add-on in cents
const PORTIONS: &[(&str, i64)] = &[
    ("Small", 0),
    ("Regular", 150),
    ("Large", 300),
    ("Sharing", 550),
    ("Family", 900),
    ("Takeaway Box", 200),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 300;
    let mut db_path = String::from("./mezze_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(300);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mezze POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of menu items to generate (default: 300)");
                println!("  -d, --db <PATH>    Database file path (default: ./mezze_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mezze POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Items:    {}", count);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating menu...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'menu: for (section_idx, (section_code, dishes)) in SECTIONS.iter().enumerate() {
        for (dish_idx, dish) in dishes.iter().enumerate() {
            for (portion_idx, (portion, price_addon)) in PORTIONS.iter().enumerate() {
                if generated >= count {
                    break 'menu;
                }

                let item = generate_item(
                    section_code,
                    dish,
                    portion,
                    *price_addon,
                    section_idx * 1000 + dish_idx * 20 + portion_idx,
                );

                if let Err(e) = db.products().insert(&item).await {
                    eprintln!("Failed to insert {}: {}", item.code, e);
                    continue;
                }

                generated += 1;

                if generated % 50 == 0 {
                    println!("  Generated {} items...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);

    println!();
    println!("Checking reorder list...");
    let low = db.inventory().low_stock().await?;
    println!("  At or below reorder level: {} items", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single menu item.
fn generate_item(section: &str, dish: &str, portion: &str, price_addon: i64, seed: usize) -> NewProduct {
    let dish_code: String = dish
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    let code = format!("{}-{}-{:04}", section, dish_code, seed);

    // 3.50 - 11.49 + portion add-on
    let base_price = 350 + ((seed * 37) % 800) as i64;
    let sell_price_cents = base_price + price_addon;

    // Food cost 30-45%
    let cost_pct = 30 + (seed % 16) as i64;
    let cost_price_cents = sell_price_cents * cost_pct / 100;

    NewProduct {
        code,
        name: format!("{} ({})", dish, portion),
        initial_stock: (seed % 61) as i64,
        reorder_level: 5,
        cost_price_cents,
        sell_price_cents,
    }
}
