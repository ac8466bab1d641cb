// Write boot records for the stage-2 loader into a disk image
//
// Usage: bootprep disk.img < config.json

use bootprep_core::{compile_disk, logger, BootConfig};
use std::path::Path;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <disk>", args[0]);
        eprintln!("Reads the boot configuration JSON from stdin");
        std::process::exit(1);
    }

    logger::init_from_env();

    if let Err(e) = run(Path::new(&args[1])) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(disk: &Path) -> bootprep_core::Result<()> {
    let config = BootConfig::from_reader(std::io::stdin().lock())?;
    compile_disk(disk, config)?;
    log::info!("Boot records written to {}", disk.display());
    Ok(())
}
