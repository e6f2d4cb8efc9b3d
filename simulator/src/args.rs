use clap::{App, Arg, ArgMatches, SubCommand};
use linkfs::{AllocationPolicy, DiskConfig, LinkFsError, DEFAULT_PAYLOAD_CAPACITY, DEFAULT_TOTAL_BLOCKS};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArgsError {
    /// Bad command line, or a help or version request clap answers itself.
    #[error("{}", .0.message)]
    Cli(#[from] clap::Error),
    #[error(transparent)]
    Config(#[from] LinkFsError),
}

/// What to do once the input files are on disk.
#[derive(Debug, PartialEq)]
pub enum Command {
    Usage,
    Ls,
    Cat(String),
    Rm(String),
    New(String, String),
}

#[derive(Debug)]
pub struct Options {
    pub disk_path: PathBuf,
    pub input: Option<PathBuf>,
    pub config: DiskConfig,
    pub command: Command,
}

fn app() -> App<'static, 'static> {
    App::new("linkfs-sim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Linked file allocation simulator")
        .arg(
            Arg::with_name("disk")
                .short("d")
                .long("disk")
                .takes_value(true)
                .default_value("disk.img")
                .help("Disk image to format"),
        )
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .help(
                    "File list to load: an identifier line followed by a content line per file \
                     (see simulator/input.txt)",
                ),
        )
        .arg(
            Arg::with_name("blocks")
                .short("b")
                .long("blocks")
                .takes_value(true)
                .help("Total blocks on the disk, including the header block"),
        )
        .arg(
            Arg::with_name("payload")
                .short("p")
                .long("payload")
                .takes_value(true)
                .help("Payload bytes per block"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .conflicts_with("sequential")
                .help("Seed for random block placement"),
        )
        .arg(
            Arg::with_name("sequential")
                .long("sequential")
                .help("Place blocks deterministically instead of at random"),
        )
        .subcommand(SubCommand::with_name("usage").about("Show disk usage (default)"))
        .subcommand(SubCommand::with_name("ls").about("List files on disk"))
        .subcommand(
            SubCommand::with_name("cat")
                .about("Print a file")
                .arg(Arg::with_name("id").required(true)),
        )
        .subcommand(
            SubCommand::with_name("rm")
                .about("Delete a file")
                .arg(Arg::with_name("id").required(true)),
        )
        .subcommand(
            SubCommand::with_name("new")
                .about("Write a new file")
                .arg(Arg::with_name("id").required(true))
                .arg(Arg::with_name("content").required(true).multiple(true)),
        )
}

pub fn parse<I, T>(args: I) -> Result<Options, ArgsError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = app().get_matches_from_safe(args)?;
    Ok(options(&matches)?)
}

fn options(matches: &ArgMatches) -> Result<Options, LinkFsError> {
    let policy = if matches.is_present("sequential") {
        AllocationPolicy::Sequential
    } else {
        AllocationPolicy::Random {
            seed: number(matches, "seed")?,
        }
    };
    let config = DiskConfig::builder()
        .with_total_blocks(number(matches, "blocks")?.unwrap_or(DEFAULT_TOTAL_BLOCKS))
        .with_payload_capacity(number(matches, "payload")?.unwrap_or(DEFAULT_PAYLOAD_CAPACITY))
        .with_policy(policy)
        .build()?;

    let command = match matches.subcommand() {
        ("ls", _) => Command::Ls,
        ("cat", Some(sub)) => Command::Cat(value(sub, "id")),
        ("rm", Some(sub)) => Command::Rm(value(sub, "id")),
        ("new", Some(sub)) => {
            let content: Vec<&str> = sub
                .values_of("content")
                .map(|words| words.collect())
                .unwrap_or_default();
            Command::New(value(sub, "id"), content.join(" "))
        }
        _ => Command::Usage,
    };

    Ok(Options {
        disk_path: PathBuf::from(matches.value_of("disk").unwrap_or("disk.img")),
        input: matches.value_of("input").map(PathBuf::from),
        config,
        command,
    })
}

fn value(matches: &ArgMatches, name: &str) -> String {
    matches.value_of(name).unwrap_or_default().to_string()
}

fn number<N: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<N>, LinkFsError> {
    match matches.value_of(name) {
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            LinkFsError::InvalidConfig(format!("--{} expects a number, got \"{}\"", name, raw))
        }),
        None => Ok(None),
    }
}
