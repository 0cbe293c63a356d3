mod quant;

use anyhow::Result;
use clap::Command;
use env_logger::Env;

use rpkmtools_counting::RunMode;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "rpkmtools";
    pub const BIN_NAME: &str = "rpkmtools";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Count aligned reads over gene models, BED intervals or repeats and report RPKM, coverage and alt-splice indexes.")
        .subcommand_required(true)
        .subcommand(quant::cli::create_rpkm_cli())
        .subcommand(quant::cli::create_bed_cli())
        .subcommand(quant::cli::create_repeat_cli())
        .subcommand(quant::cli::create_alt_cli())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // GENE MODEL RPKM
        //
        Some((quant::cli::RPKM_CMD, matches)) => {
            quant::handlers::run_quant(RunMode::Rpkm, matches)?;
        }

        //
        // BED INTERVALS
        //
        Some((quant::cli::BED_CMD, matches)) => {
            quant::handlers::run_quant(RunMode::Bed, matches)?;
        }

        //
        // REPEATMASKER FAMILIES
        //
        Some((quant::cli::REPEAT_CMD, matches)) => {
            quant::handlers::run_quant(RunMode::Repeat, matches)?;
        }

        //
        // ALT-SPLICE INDEX
        //
        Some((quant::cli::ALT_CMD, matches)) => {
            quant::handlers::run_quant(RunMode::Alt, matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_is_valid() {
        build_parser().debug_assert();
    }

    #[test]
    fn test_help_names_no_author() {
        let parser = build_parser();
        assert_eq!(parser.get_author(), None);
        for sub in parser.get_subcommands() {
            assert_eq!(sub.get_author(), None, "{}", sub.get_name());
        }
    }
}
