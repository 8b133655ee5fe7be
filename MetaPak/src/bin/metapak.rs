fn main() -> anyhow::Result<()> {
    metapak::cli::run_cli()
}
