use anyhow::Result;
use compiler_sets::cli::config;

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(config::get().verbosity.into())
        .init();

    compiler_sets::run()
}
