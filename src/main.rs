//! tagwm
//!
//! A dynamic tiling window manager for X11: tag-based views, per-monitor
//! layouts, status bars and terminal swallowing.

mod config;
mod shared;
mod wm;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::wm::WindowManager;
use crate::wm::x11::X11Conn;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => {}
        [flag] if flag == "-v" => {
            println!("tagwm-{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {
            eprintln!("usage: tagwm [-v]");
            std::process::exit(1);
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tagwm=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tagwm {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let conn = X11Conn::connect(&config)?;
    let mut wm = WindowManager::new(conn, config);
    wm.setup()?;
    wm.scan()?;
    let result = wm.run();
    if let Err(e) = &result {
        error!("Event loop failed: {:#}", e);
    }
    wm.cleanup()?;
    info!("tagwm exited");
    result
}
