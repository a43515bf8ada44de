mod api;
mod chart;
mod dataset;
mod form;
mod record;
mod session;
mod settings;
mod view;
mod web;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    dataset::Storage,
    session::SessionStore,
    settings::{Args, Settings},
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings =
        Settings::from_file(args.config.as_deref()).context("failed to load the configuration")?;
    let storage = Storage::open(
        settings.storage.data_dir,
        settings.storage.modified_dir,
        settings.storage.added_dir,
    )?;
    info!("Serving datasets from {:?}", storage.files()?);

    let store = SessionStore::default();
    let schema = api::schema(store.clone(), storage.clone());
    let tls = args.cert.zip(args.key);
    web::serve(schema, store, storage, settings.web.address, tls).await;
    Ok(())
}
