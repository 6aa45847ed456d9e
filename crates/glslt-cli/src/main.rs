use clap::Parser;

fn main() -> miette::Result<()> {
    glslt_cli::Cli::parse().run()
}
