//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
    if let Err(err) = teamroute_cli::run() {
        eprintln!("teamroute: {err}");
        std::process::exit(1);
    }
}
