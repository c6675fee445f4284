mod config;

use std::sync::Arc;

use anyhow::Context;
use profile_database::{InnerDatabase, ProfileStore};
use profile_net::{AppState, JwtDecoder};
use profile_service::parser::profile::User;
use profile_storage::{LocalStorage, ObjectStorage, S3Config, S3Storage};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AddUserArgs, Command, Config, ServeArgs, StorageBackend};

/// Console logging, JSON or human-readable. `RUST_LOG` overrides the level.
fn setup_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn build_storage(args: &ServeArgs) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    match args.storage {
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(
            &args.local_storage_root,
            &args.local_storage_url,
        ))),
        StorageBackend::S3 => {
            // presence checked by config validation
            let s3_config = S3Config::from_url(
                args.s3_url.as_deref().unwrap_or_default(),
                args.s3_access_key_id.clone().unwrap_or_default(),
                args.s3_secret_access_key.clone().unwrap_or_default(),
            )?;
            Ok(Arc::new(S3Storage::new(s3_config)))
        }
    }
}

async fn serve(database: InnerDatabase, args: ServeArgs) -> anyhow::Result<()> {
    let state = AppState {
        database,
        storage: build_storage(&args)?,
        tokens: Arc::new(JwtDecoder::new(&args.jwt_secret_key)),
        max_avatar_bytes: args.max_avatar_bytes,
    };

    profile_net::serve(&args.address, state, &args.cors_allow_origins)
        .await
        .context("HTTP server failed")
}

fn add_user(database: InnerDatabase, args: AddUserArgs) -> anyhow::Result<()> {
    let user = User {
        id: args.id,
        is_active: !args.inactive,
        group_id: args.group_id,
    };
    database.put_user(&user)?;
    info!(user_id = user.id, group_id = user.group_id, is_active = user.is_active, "User saved");

    if let Some(secret) = args.token_secret {
        let token = JwtDecoder::new(&secret).issue(user.id, args.token_ttl_minutes)?;
        println!("{token}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init()?;
    setup_logging(&config);

    std::fs::create_dir_all(&config.db_path)
        .with_context(|| format!("creating {}", config.db_path.display()))?;
    let database = InnerDatabase::new(&config.db_path).context("opening profile database")?;

    match config.command {
        Command::Serve(args) => serve(database, args).await,
        Command::AddUser(args) => add_user(database, args),
    }
}
