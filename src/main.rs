fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = match farms_epub::cli::Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(farms_epub::cli::usage_exit_code(&e));
        }
    };
    farms_epub::cli::init_logging(args.verbose);
    if let Err(e) = farms_epub::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
