fn main() -> anyhow::Result<()> {
    notekeep::cli::run()
}
