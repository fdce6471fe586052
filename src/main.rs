/*!
 * NPU Container Hook - Main Entry Point
 *
 * Prestart hook invoked by the container runtime after the container's
 * namespaces exist and before its main process runs. Exits 0 on full
 * success, nonzero on any validation or setup failure.
 */

use clap::Parser;
use log::{error, info};
use npu_hook::{CmdArgs, HookController};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CmdArgs::parse();

    info!("npu prestart hook starting");
    let mut controller = HookController::new();
    if let Err(err) = controller.run(&args) {
        error!("container setup failed: {}", err);
        std::process::exit(1);
    }
    info!("npu prestart hook finished");
}
