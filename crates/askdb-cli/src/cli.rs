use clap::{Parser, ValueEnum};

/// How progress is written to stdout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Stream thinking text, SQL and results as they arrive.
    #[default]
    Human,
    /// Print only the final snapshot as JSON.
    Json,
}

/// Ask the askdb service a question and follow its progress.
#[derive(Parser, Debug)]
#[command(name = "askdb", version)]
pub(crate) struct Cli {
    /// Natural-language question to send.
    #[arg(value_name = "QUESTION", required = true, num_args = 1..)]
    pub(crate) question: Vec<String>,
    /// Service base URL (overrides `ASKDB_BASE_URL`).
    #[arg(long)]
    pub(crate) base_url: Option<String>,
    /// Skip the health probe and always use the fallback endpoint.
    #[arg(long)]
    pub(crate) fallback_only: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub(crate) output: OutputFormat,
    /// Maximum number of result rows printed in human output.
    #[arg(long, default_value_t = 20)]
    pub(crate) max_rows: usize,
}

impl Cli {
    pub(crate) fn question(&self) -> String {
        self.question.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_question_words() {
        let cli = Cli::parse_from(["askdb", "top", "selling", "products"]);
        assert_eq!(cli.question(), "top selling products");
        assert_eq!(cli.output, OutputFormat::Human);
        assert!(!cli.fallback_only);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "askdb",
            "--base-url",
            "http://svc:8000",
            "--fallback-only",
            "--output",
            "json",
            "订单状态",
        ]);
        assert_eq!(cli.base_url.as_deref(), Some("http://svc:8000"));
        assert!(cli.fallback_only);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn question_is_required() {
        assert!(Cli::try_parse_from(["askdb"]).is_err());
    }
}
