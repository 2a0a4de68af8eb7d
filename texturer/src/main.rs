use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use structopt::StructOpt;

use texturer::replay::ReplayCommand;

#[derive(StructOpt)]
#[structopt(about = "Multi-view scan texturer")]
struct Opts {
    #[structopt(help = "Log debug messages", long, short = "v")]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    Replay(ReplayCommand),
}

fn main() {
    let opts = Opts::from_args();

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("failed to initialize logger: {}", err);
    }

    let res = match opts.command {
        Command::Replay(cmd) => cmd.run(),
    };

    if let Err(err) = res {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
