fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = chapterscrape::cli::Args::parse();
    chapterscrape::cli::init_logging(&args);
    if let Err(e) = chapterscrape::cli::run(&args) {
        tracing::error!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                tracing::error!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
