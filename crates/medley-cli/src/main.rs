use anyhow::Result;

mod cli;
mod session;

fn main() -> Result<()> {
    cli::run()
}
