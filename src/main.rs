use anyhow::Context;

fn main() -> anyhow::Result<()> {
    swik::run().context("swik exited with an error")
}
