use clap::Parser;

fn main() -> miette::Result<()> {
    chartme::App::parse().run()
}
