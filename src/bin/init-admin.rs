//! Create the first admin account from ADMIN_EMAIL / ADMIN_PASSWORD.
//! Exits successfully when an admin with that email already exists.

use std::process::ExitCode;

use blog_backend::auth::hash_password;
use blog_backend::config::ConfigError;
use blog_backend::db::{self, models::NewAdmin, AdminStore, DbConfig, PgStore};

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

async fn init_admin() -> Result<&'static str, Box<dyn std::error::Error>> {
    let email = env_required("ADMIN_EMAIL")?.trim().to_string();
    let password = env_required("ADMIN_PASSWORD")?;

    let store = PgStore::new(db::init_pool(&DbConfig::from_env()?)?);
    store.migrate().await?;
    println!("Connected to database");

    let outcome = if store.find_admin_by_email(&email).await?.is_some() {
        "Admin user already exists"
    } else {
        let password_hash = hash_password(password).await?;
        store
            .create_admin(NewAdmin {
                email,
                password_hash,
            })
            .await?;
        "Admin user created successfully"
    };

    store.close().await;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match init_admin().await {
        Ok(outcome) => {
            println!("{}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
