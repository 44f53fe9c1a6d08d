//! Simulate command - drives an in-memory experiment with synthetic traffic

use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::domain::evaluation::{BusinessMetrics, EvaluationInput, SuccessMetric, TokenUsage};
use crate::domain::experiment::{ABTestResult, ExperimentConfig, ExperimentDashboard, Variant};
use crate::domain::feedback::HumanFeedback;
use crate::infrastructure::services::{
    CreateExperimentRequest, EvaluationService, EvaluationSubmission,
};

const PROMPTS: [(&str, &str, &str); 4] = [
    (
        "What is the capital of France?",
        "Paris is the capital of France.",
        "The capital of France is Paris.",
    ),
    (
        "How do I reset my password?",
        "Open settings and choose reset password to get a reset link.",
        "Use the reset password option in settings.",
    ),
    (
        "Summarize the refund policy",
        "Refunds are accepted within 30 days of purchase with a receipt.",
        "Purchases can be refunded within 30 days.",
    ),
    (
        "Which plan includes priority support?",
        "The enterprise plan includes priority support.",
        "Priority support comes with the enterprise plan.",
    ),
];

/// Arguments for the simulate command
#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Number of synthetic sessions
    #[arg(long, default_value_t = 200)]
    pub sessions: usize,

    /// Probability that a session is routed to variant B
    #[arg(long, default_value_t = 0.5)]
    pub traffic_split: f64,

    /// Mean user satisfaction of variant A, on the 1-5 scale
    #[arg(long, default_value_t = 3.6)]
    pub baseline: f64,

    /// Added to variant B's mean user satisfaction
    #[arg(long, default_value_t = 0.3)]
    pub lift: f64,

    /// Share of sessions that also leave human feedback
    #[arg(long, default_value_t = 0.2)]
    pub feedback_rate: f64,

    /// Seed for reproducible traffic
    #[arg(long)]
    pub seed: Option<u64>,

    /// Complete the experiment once traffic has been replayed
    #[arg(long)]
    pub complete: bool,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            sessions: 200,
            traffic_split: 0.5,
            baseline: 3.6,
            lift: 0.3,
            feedback_rate: 0.2,
            seed: None,
            complete: false,
        }
    }
}

/// Everything the simulation produced
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub result: ABTestResult,
    pub dashboard: ExperimentDashboard,
    pub feedback_count: usize,
}

/// Replay synthetic traffic through the service and collect the verdict
pub async fn run_simulation(
    service: &EvaluationService,
    args: &SimulateArgs,
) -> anyhow::Result<SimulationReport> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.feedback_rate),
        "--feedback-rate must be within [0, 1]"
    );

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let config = ExperimentConfig::default()
        .with_traffic_split(args.traffic_split)
        .with_success_metric(SuccessMetric::UserSatisfaction)
        .with_minimum_sample_size(args.sessions.max(1).min(u32::MAX as usize) as u32);

    let experiment = service
        .create_experiment(
            CreateExperimentRequest::new("Synthetic traffic", "flow-a", "flow-b")
                .with_description("Generated by flow-eval simulate")
                .with_config(config),
        )
        .await?;
    let id = experiment.id().clone();

    info!(experiment_id = %id, sessions = args.sessions, "Replaying synthetic traffic");

    let mut feedback_count = 0;

    for i in 0..args.sessions {
        let session = format!("session-{}", i);
        let variant = service.assign_variant(&id, &session).await?;

        let (prompt, response, expected) = PROMPTS[rng.gen_range(0..PROMPTS.len())];
        let mean = match variant {
            Variant::A => args.baseline,
            Variant::B => args.baseline + args.lift,
        };
        let satisfaction = (mean + rng.gen_range(-1.0..1.0)).clamp(1.0, 5.0);
        let response_id = format!("resp-{}", i);

        let input = EvaluationInput::new(prompt, response)
            .with_expected_output(expected)
            .with_execution_time_ms(rng.gen_range(80.0..600.0))
            .with_token_usage(TokenUsage::new(
                rng.gen_range(10..60),
                rng.gen_range(20..200),
            ));

        service
            .submit_evaluation(
                &id,
                variant,
                EvaluationSubmission::new(input)
                    .with_response_id(&response_id)
                    .with_business(
                        BusinessMetrics::new()
                            .with_user_satisfaction(satisfaction)
                            .with_task_completion_rate(if rng.gen_bool(0.8) { 1.0 } else { 0.0 }),
                    ),
            )
            .await?;

        if rng.gen_bool(args.feedback_rate) {
            let rating = satisfaction.round().clamp(1.0, 5.0);
            service
                .submit_feedback(
                    &id,
                    &response_id,
                    HumanFeedback::new(&response_id, rating, rating, rating, rating),
                )
                .await?;
            feedback_count += 1;
        }
    }

    if args.complete {
        service.complete_experiment(&id).await?;
    }

    let result = service.get_results(&id).await?;
    let dashboard = service.dashboard(&id).await?;

    info!(
        experiment_id = %id,
        winner = %result.winner,
        significance = result.significance,
        "Simulation finished"
    );

    Ok(SimulationReport {
        result,
        dashboard,
        feedback_count,
    })
}

/// Run the simulate command
pub async fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let config = super::prepare()?;
    let service = crate::create_evaluation_service(&config)?;

    let report = run_simulation(&service, &args).await?;

    super::print_json(&report)
}
