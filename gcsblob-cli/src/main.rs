mod cli;
mod command;
mod duration;
mod exitcode;
mod utils;

use std::process;

type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            eprintln!("{}", e.message);
            process::exit(exitcode::USAGE);
        }
        Err(e) => {
            println!("{}", e.message);
            process::exit(exitcode::OK);
        }
    };

    match command::execute(cli) {
        Ok(outcome) => process::exit(outcome.exit_code()),
        Err(e) => {
            log::error!("{:#}", e);
            process::exit(exitcode::FAILURE);
        }
    }
}
