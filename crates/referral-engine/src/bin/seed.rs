//! # Seed Data Generator
//!
//! Populates the database with customers and referral activity for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed 20 customers (default)
//! cargo run -p referral-engine --bin seed
//!
//! # Seed a custom amount
//! cargo run -p referral-engine --bin seed -- --count 50
//!
//! # Specify database path
//! cargo run -p referral-engine --bin seed -- --db ./data/referrals.db
//! ```
//!
//! The first few customers act as referrers: later customers register
//! through their codes, so the seeded data contains pending transactions
//! at every staged level plus a referrer past the bonus threshold.

use std::env;
use std::process;

use tracing::{error, info};

use referral_engine::service::RegisterCustomerRequest;
use referral_engine::DiscountEngine;
use referral_db::{Database, DbConfig};

const FIRST_NAMES: &[&str] = &[
    "Anna", "Bob", "Carla", "David", "Elena", "Farid", "Grace", "Hassan", "Ines", "Jonas",
    "Karin", "Leo", "Mara", "Nadia", "Omar", "Paula", "Quinn", "Rosa", "Sami", "Tara",
];

const BASE_PRICE_CENTS: i64 = 10000;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut count: usize = 20;
    let mut db_path = "./referrals.db".to_string();

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" => {
                i += 1;
                count = args
                    .get(i)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| {
                        error!("--count needs a number");
                        process::exit(1);
                    });
            }
            "--db" => {
                i += 1;
                db_path = args.get(i).cloned().unwrap_or_else(|| {
                    error!("--db needs a path");
                    process::exit(1);
                });
            }
            other => {
                error!(arg = other, "unknown argument");
                process::exit(1);
            }
        }
        i += 1;
    }

    info!(count, db = %db_path, "seeding referral data");

    let db = match Database::new(DbConfig::new(&db_path)).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "failed to open database");
            process::exit(1);
        }
    };
    let engine = DiscountEngine::new(db);

    let mut created = 0usize;
    for i in 0..count {
        let name = FIRST_NAMES[i % FIRST_NAMES.len()];
        let code = format!("{}-{}", name.to_uppercase(), i + 1);

        // the first four customers collect referrals from everyone after
        // the fifth, round-robin; at the default count each of them ends
        // up with 3-4 referrals, so the bonus threshold is exercised
        let reference = if i >= 5 {
            let j = (i - 5) % 4;
            Some(format!("{}-{}", FIRST_NAMES[j].to_uppercase(), j + 1))
        } else {
            None
        };

        let request = RegisterCustomerRequest {
            email: format!("{}.{}@example.com", name.to_lowercase(), i + 1),
            name: Some(name.to_string()),
            referral_code: code,
            base_price_cents: BASE_PRICE_CENTS,
            reference,
        };

        match engine.register_customer(request).await {
            Ok(customer) => {
                created += 1;
                if created % 10 == 0 {
                    info!(created, last = %customer.referral_code, "progress");
                }
            }
            Err(e) => {
                error!(index = i, error = %e, "failed to register customer");
                process::exit(1);
            }
        }
    }

    let listed = engine.list_discounts(None).await.unwrap_or_else(|e| {
        error!(error = %e, "failed to list seeded transactions");
        process::exit(1);
    });

    info!(
        customers = created,
        transactions = listed.total,
        "seed complete"
    );
}
