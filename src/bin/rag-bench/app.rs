use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use rag_bench::config::RunConfig;
use rag_bench::evaluation::EvaluationManager;
use rag_bench::evaluator::{EvaluatorManager, EvaluatorRegistry};
use rag_bench::question::QuestionSet;
use rag_bench::report::{JsonFileSink, ReportSink, RunReport};

use crate::args::CliArgs;
use crate::logging::init_logging;

pub async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let registry = EvaluatorRegistry::builtin();

    if args.list_evaluators {
        print_evaluators(&registry);
        return Ok(());
    }

    let config = RunConfig::load_with(&args.config, |name| std::env::var(name).ok())
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    init_logging(args.log_level.as_deref(), &config.logging.level);

    let problems = config.validate();
    if !problems.is_empty() {
        bail!("invalid configuration: {}", problems.join("; "));
    }

    let questions = QuestionSet::load(&args.test_cases)
        .with_context(|| format!("failed to load test cases {}", args.test_cases.display()))?;
    if questions.is_empty() {
        bail!("no test cases in {}", args.test_cases.display());
    }
    log::info!("Loaded {} test case(s)", questions.len());

    let library = config.template_library();
    let RunConfig {
        backends,
        evaluator,
        evaluators,
        run: settings,
        ..
    } = config;
    let evaluator_timeout = settings.evaluator_timeout();

    let evaluation = EvaluationManager::connect(backends, &library, settings).await?;
    for excluded in evaluation.excluded() {
        log::warn!("{} excluded from the run: {}", excluded.name, excluded.reason);
    }

    let types = args.evaluators.or(evaluators);
    let mut scorers =
        EvaluatorManager::from_registry(&registry, Arc::new(evaluator), types.as_deref()).await?;
    if let Some(timeout) = evaluator_timeout {
        scorers = scorers.with_timeout(timeout);
    }

    let outcome = evaluation.run(&questions, &scorers).await?;
    let report = RunReport::new(
        &questions,
        &outcome,
        scorers.summary(),
        evaluation.excluded().to_vec(),
    );
    let path = JsonFileSink::new(&args.output).write(&report)?;

    print!("{}", report.summary);
    println!("Results saved to {}", path.display());
    Ok(())
}

fn print_evaluators(registry: &EvaluatorRegistry) {
    println!("Available evaluators:");
    for entry in registry.descriptions() {
        let marker = if registry.priority().contains(&entry.name) {
            " (default)"
        } else {
            ""
        };
        println!("  {:<14}{}{}", entry.name, entry.description, marker);
    }
}
