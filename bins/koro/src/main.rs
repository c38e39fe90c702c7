//! koro command - route and address changes inside container namespaces.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use koro::{Config, Dispatcher, Error};

const EXAMPLE: &str = "\
Examples:
  koro docker web route add 10.1.1.0/24 via 10.1.1.1
  koro netns blue route del default dev eth0
  koro pid 1234 address add 10.0.0.2/24 dev eth0
  koro address add 127.0.0.3/24 dev lo";

#[derive(Parser)]
#[command(
    name = "koro",
    version,
    about = "Route and address configuration inside container namespaces",
    after_help = EXAMPLE
)]
struct Cli {
    /// Directory holding named network namespaces.
    #[arg(long, value_name = "DIR", default_value = koro::namespace::NETNS_RUN_DIR)]
    netns_dir: PathBuf,

    /// procfs mount point.
    #[arg(long, value_name = "DIR", default_value = "/proc")]
    proc_dir: PathBuf,

    /// Docker CLI binary.
    #[arg(long, value_name = "PATH", default_value = "docker")]
    docker: PathBuf,

    /// More logging (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// The command, e.g. `docker web route add 10.1.1.0/24 via 10.1.1.1`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config::new()
            .with_netns_dir(&self.netns_dir)
            .with_proc_dir(&self.proc_dir)
            .with_docker(&self.docker)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let input = cli.command.join(" ");
    if input.trim().is_empty() {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    let dispatcher = Dispatcher::new(&cli.config());
    match dispatcher.dispatch(&input).await {
        Ok(applied) => {
            tracing::info!(%applied, "applied");
            println!("Succeed!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e.error);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &Error) {
    if let Error::Parse(parse) = err {
        eprintln!("{}", parse.render());
    }
    eprint!("err:{err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprint!(": {cause}");
        source = cause.source();
    }
    eprintln!();
}
