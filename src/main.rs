use clap::Parser;
use std::process;
use tenderdocs::{logging, Cli, OutputFormatter, OutputMode, ParseError, TenderDocs};

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let tenderdocs = match TenderDocs::from_cli(&cli) {
        Ok(tenderdocs) => tenderdocs,
        Err(e) => {
            print_startup_error(&e);
            return e.exit_code();
        }
    };

    logging::init_logging(&tenderdocs.config().logging);

    if cli.list {
        return match tenderdocs.list(&cli.inputs) {
            Ok(()) => 0,
            Err(e) => {
                tenderdocs.handle_error(&e);
                e.exit_code()
            }
        };
    }

    let report = match tenderdocs.run_batch(&cli.inputs) {
        Ok(report) => report,
        Err(e) => {
            tenderdocs.handle_error(&e);
            return e.exit_code();
        }
    };

    if let Some(ref report_path) = cli.report {
        if let Err(e) = report.save_json(report_path) {
            tenderdocs.handle_error(&e);
            return e.exit_code();
        }
        tenderdocs
            .output_formatter()
            .info(&format!("Report written to {}", report_path.display()));
    }

    report.exit_code()
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let formatter = OutputFormatter::new(OutputMode::Human, cli.verbose, cli.quiet);
    let config_path = cli.config_output_path();

    if config_path.exists() {
        let error = ParseError::Config {
            message: format!("Configuration file already exists: {}", config_path.display()),
        };
        formatter.print_user_friendly_error(&error);
        return error.exit_code();
    }

    match TenderDocs::generate_sample_config(&config_path) {
        Ok(()) => {
            formatter.success(&format!(
                "Sample configuration written to {}",
                config_path.display()
            ));
            0
        }
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            e.exit_code()
        }
    }
}

fn print_startup_error(error: &ParseError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
