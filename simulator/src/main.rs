#[macro_use]
extern crate log;

mod args;

use args::{ArgsError, Command, Options};
use linkfs::{parse_pairs, FileBlockEmulator, FileBlockEmulatorBuilder, LinkedDisk};
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};

fn main() {
    env_logger::init();

    let opts = match args::parse(std::env::args_os()) {
        Ok(opts) => opts,
        // Prints help or version to stdout with status 0, usage errors to stderr.
        Err(ArgsError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = run(opts, &mut std::io::stdout()) {
        eprintln!("error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run<W: Write>(opts: Options, out: &mut W) -> Result<(), Box<dyn Error>> {
    let mut disk = format_disk(&opts)?;

    if let Some(path) = &opts.input {
        let pairs = parse_pairs(BufReader::new(File::open(path)?))?;
        let summary = disk.bulk_load(pairs)?;
        writeln!(out, "{} files loaded successfully.", summary.loaded.len())?;
        if summary.skipped > 0 {
            let usage = disk.disk_usage();
            writeln!(
                out,
                "Cannot load more files, low disk space. {} blocks (about {} chars) remaining.",
                usage.free_blocks,
                usage.free_blocks * usage.payload_capacity
            )?;
        }
    }

    match &opts.command {
        Command::Usage => {
            let usage = disk.disk_usage();
            writeln!(
                out,
                "{} of {} blocks free, {} bytes per block",
                usage.free_blocks, usage.total_blocks, usage.payload_capacity
            )?;
        }
        Command::Ls => {
            for entry in disk.list_files()? {
                writeln!(
                    out,
                    "{:<24} {:>6} bytes {:>4} blocks  head {}",
                    entry.id, entry.bytes, entry.blocks, entry.head
                )?;
            }
        }
        Command::Cat(id) => {
            out.write_all(&disk.read_file(id)?)?;
            writeln!(out)?;
        }
        Command::Rm(id) => {
            disk.delete_file(id)?;
            writeln!(out, "removed {}", id)?;
        }
        Command::New(id, content) => {
            let head = disk.write_file(id, content.as_bytes())?;
            writeln!(out, "wrote {} starting at block {}", id, head)?;
        }
    }

    disk.sync()?;
    Ok(())
}

fn format_disk(opts: &Options) -> Result<LinkedDisk<FileBlockEmulator>, Box<dyn Error>> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&opts.disk_path)?;
    let dev = FileBlockEmulatorBuilder::from(file)
        .with_block_count(opts.config.total_blocks)
        .with_block_bytes(opts.config.record_bytes())
        .build()?;
    debug!("formatting {}", opts.disk_path.display());
    Ok(LinkedDisk::format(dev, opts.config)?)
}
