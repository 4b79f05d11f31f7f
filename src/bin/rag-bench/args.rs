use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rag-bench",
    about = "Benchmark RAG chat backends against a question set with multiple evaluators"
)]
pub struct CliArgs {
    /// TOML run configuration; `${VAR}` references are read from the environment.
    #[arg(long, short = 'c', default_value = "rag-bench.toml")]
    pub config: PathBuf,
    /// JSON or YAML list of {question, ground_truth} test cases.
    #[arg(long, short = 't', default_value = "data/test_cases.json")]
    pub test_cases: PathBuf,
    /// Directory receiving the results file.
    #[arg(long, short = 'o', default_value = "results")]
    pub output: PathBuf,
    /// Evaluator types to run, overriding the config.
    #[arg(long, value_delimiter = ',')]
    pub evaluators: Option<Vec<String>>,
    /// Print the registered evaluator types and exit.
    #[arg(long)]
    pub list_evaluators: bool,
    /// Log level filter, e.g. `debug` or `rag_bench=trace`.
    #[arg(long)]
    pub log_level: Option<String>,
}
