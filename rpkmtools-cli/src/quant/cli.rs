use clap::{Arg, Command, arg, value_parser};

pub const RPKM_CMD: &str = "rpkm";
pub const BED_CMD: &str = "bed";
pub const REPEAT_CMD: &str = "repeat";
pub const ALT_CMD: &str = "alt";

fn with_shared_args(cmd: Command, annotation_help: &'static str) -> Command {
    cmd.arg_required_else_help(true)
        .arg(Arg::new("annotation").required(true).help(annotation_help))
        .arg(
            Arg::new("bam")
                .required(true)
                .help("Indexed BAM file (a .bai index must sit next to it)"),
        )
        .arg(arg!(--nostrand "Count reads regardless of their orientation"))
        .arg(arg!(--multiple <multiple> "Multi-mapped reads: complete, partial or ignore [default: complete]"))
        .arg(arg!(--whitelist <whitelist> "Only count reads named in this file (one per line)"))
        .arg(arg!(--blacklist <blacklist> "Never count reads named in this file (one per line)"))
        .arg(arg!(--tag <tag> "Aux tag holding the number of hits for a read [default: IH]"))
        .arg(
            arg!(-t --threads <threads> "Number of worker threads [default: 1]")
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(-c --config <config> "TOML file with default settings; flags override it"))
        .arg(arg!(-o --output <output> "Write the report to this file instead of stdout"))
        .arg(arg!(-q --quiet "Don't draw progress bars"))
}

pub fn create_rpkm_cli() -> Command {
    with_shared_args(
        Command::new(RPKM_CMD).about("Count reads and RPKM per gene from a refFlat gene model"),
        "refFlat gene model (optionally gzipped)",
    )
    .arg(arg!(--norm <norm> "Normalization: genes, total, quartile or none [default: genes]"))
    .arg(arg!(--coverage "Also report mean and stdev of per-base coverage"))
}

pub fn create_bed_cli() -> Command {
    with_shared_args(
        Command::new(BED_CMD).about("Count reads and RPKM per BED6 interval"),
        "BED6 file (optionally gzipped)",
    )
    .arg(arg!(--norm <norm> "Normalization: genes, total, quartile or none [default: genes]"))
    .arg(arg!(--coverage "Also report mean and stdev of per-base coverage"))
    .arg(arg!(--uniq "Only count one read per 5' start position"))
}

pub fn create_repeat_cli() -> Command {
    with_shared_args(
        Command::new(REPEAT_CMD)
            .about("Count reads and RPKM per repeat family and member from RepeatMasker output"),
        "RepeatMasker .out file (optionally gzipped)",
    )
    .arg(arg!(--norm <norm> "Normalization: genes, total or none [default: genes]"))
}

pub fn create_alt_cli() -> Command {
    with_shared_args(
        Command::new(ALT_CMD)
            .about("Per-region counts and alt-splice index relative to constitutive regions"),
        "refFlat gene model (optionally gzipped)",
    )
}
