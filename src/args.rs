use clap::Parser;

/// This is a ballot tallying program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The snapshot of the ballot: its components and its cast votes, in JSON format.
    /// For more information about the file format, read the manual of the ballot_components crate.
    #[clap(short, long, value_parser)]
    pub snapshot: Option<String>,

    /// (file path) A reference file containing the summary of a previous tally in JSON format. If provided,
    /// tally will check that the calculated summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the tally will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified in the snapshot.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the cast votes will be written as a CSV table to the given location.
    /// Setting this option overrides the path that may be specified in the snapshot.
    #[clap(long, value_parser)]
    pub csv: Option<String>,

    /// (default 'Vote ID') The label of the first column of the CSV table.
    #[clap(long, value_parser)]
    pub vote_id_label: Option<String>,

    /// If passed as an argument, prints the available voting methods with their options and exits.
    #[clap(long, takes_value = false)]
    pub list_methods: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
