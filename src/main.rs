mod app;
mod config;
mod controller;
mod engine;
mod topology;
mod util;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use log::info;

use config::{AppConfig, Args};
use topology::HttpTopologyApi;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from(Args::parse());
    let api = HttpTopologyApi::new(&config.api_url, config.request_timeout)?;
    info!("using topology API at {}", api.base_url());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 920.0])
            .with_title("Network Topology"),
        ..Default::default()
    };

    eframe::run_native(
        "router-topology",
        options,
        Box::new(move |cc| Ok(Box::new(app::TopologyApp::new(cc, config, Arc::new(api))))),
    )
    .map_err(|error| anyhow!("failed to run the topology window: {error}"))
}
