// Print the partitions and installed boot records of a disk image
//
// Usage: bootprep-dump disk.img

use bootprep_core::disk::gpt_ops::read_partition_table;
use bootprep_core::{logger, read_installed_records, Error};
use std::fs::File;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <disk>", args[0]);
        std::process::exit(1);
    }

    logger::init_from_env();

    if let Err(e) = run(&args[1]) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(path: &str) -> bootprep_core::Result<()> {
    let mut disk = File::open(path).map_err(|source| Error::DiskOpen {
        path: path.to_string(),
        source,
    })?;

    match read_partition_table(&mut disk) {
        Ok(table) => {
            for (i, p) in table.iter().enumerate() {
                println!(
                    "Partition {}: {:<10} LBA {:>10}..{:<10} ({} sectors)",
                    i,
                    p.type_name(),
                    p.start_lba,
                    p.end_lba,
                    p.size_lba()
                );
            }
        }
        Err(e) => log::warn!("{}", Error::from(e)),
    }

    let installed = read_installed_records(&mut disk)?;
    for (i, (record, mmap)) in installed
        .config
        .records
        .iter()
        .zip(&installed.mmaps)
        .enumerate()
    {
        println!();
        println!("Boot entry {}", i);
        println!("  boot count:  {}", record.boot_count);
        println!("  UKI path:    {}", record.uki_path);
        println!("  mmap sector: {:#x}", record.mmap_sector);
        println!("  initrd size: {} bytes", mmap.initrd_size);
        for entry in &mmap.entries {
            println!("  {}", entry);
        }
    }

    Ok(())
}
