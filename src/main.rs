use anyhow::Result;

fn main() -> Result<()> {
    loopvault::cli::run()
}
