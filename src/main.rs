use log::{error, info};
use simple_logger::SimpleLogger;

use gn_rust::{run_simulation, write_report, SimConfig, SimError, REPORT_PATH};

fn main() {
    SimpleLogger::new().init().unwrap();

    info!("starting");

    if let Err(err) = run_model() {
        error!("simulation failed: {}", err);
        std::process::exit(1);
    }
}

fn run_model() -> Result<(), SimError> {
    let config = SimConfig::default();
    let world = run_simulation(&config, None)?;

    write_report(&world.data)?;

    info!(
        "done. {} nodes, {} blocks mined, max height {}, report at {}",
        world.nodes.len(),
        world.blocks_mined(),
        world.max_height(),
        REPORT_PATH
    );
    Ok(())
}
