use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the backend answers
    Ping,

    /// List indices with the aliases pointing at them
    Aliases {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the mapped fields of one or more indices
    Fields {
        #[arg(required = true, help = "Index names or patterns")]
        indices: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Count the documents matching a query
    Count {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Dump every match, unordered, through the scan helper
    Scan {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Page through the matches with a keep-alive scroll
    Scroll {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        page: PageArgs,

        #[arg(long, help = "Continue a scroll id left by an interrupted run")]
        resume: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Page through the matches in a stable sort order with search-after
    Sorted {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        page: PageArgs,

        #[arg(
            long,
            help = "Sort as JSON, e.g. '{\"date\":\"desc\"}' (the tiebreaker is appended)"
        )]
        sort: Option<String>,

        #[arg(long, help = "JSON array of sort values to resume after")]
        after: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    #[arg(required = true, help = "Index names or patterns")]
    pub indices: Vec<String>,

    #[arg(short, long, help = "Query clause as JSON, match_all when omitted")]
    pub query: Option<String>,
}

#[derive(Args)]
pub struct PageArgs {
    #[arg(short, long, value_delimiter = ',', help = "Fields to project, '*' for all")]
    pub fields: Vec<String>,

    #[arg(short, long, help = "Rows per round-trip")]
    pub size: Option<usize>,

    #[arg(long, help = "Per-request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Disable the progress bar")]
    pub no_progress: bool,
}

#[derive(Args)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(
        short,
        long,
        help = "If specified, writes the table to this file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}
