mod auth;
mod errors;
mod handlers;
mod providers;
mod state;
mod templates;

use anyhow::Result;
use clap::Parser;
use gateway_collaborators::{
    ActionSource, BusinessFoundationSource, FakeBusinessFoundationClient, FakeKeyedClient,
    FakeListClient, FakeWebsiteClient, GoalsSource, HttpActionsClient,
    HttpBusinessFoundationClient, HttpGoalsClient, HttpIssuesClient, HttpMeasuresClient,
    HttpStrategiesClient, HttpWebsiteClient, IssueSource, MeasuresSource, StrategiesSource,
    WebsiteSource,
};
use gateway_core::enrichment::EnrichmentSources;
use gateway_core::job::Stage as JobStage;
use gateway_core::topic::ParameterSource;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "AI orchestration gateway")]
struct Args {
    /// Address to bind the service to
    #[arg(long, env = "GATEWAY_ADDR", default_value = "0.0.0.0:8080")]
    addr: String,

    /// Deployment stage stamped onto published job events
    #[arg(long, env = "GATEWAY_STAGE", default_value = "dev")]
    stage: Stage,

    /// Soft per-tenant concurrency limit enforced by the async job queue
    #[arg(long, env = "GATEWAY_TENANT_CONCURRENCY_LIMIT", default_value_t = 4)]
    tenant_concurrency_limit: u32,

    /// Use in-memory collaborator fakes instead of HTTP clients; for local
    /// development and demos only
    #[arg(long, env = "GATEWAY_USE_FAKE_COLLABORATORS")]
    use_fake_collaborators: bool,

    /// Base URL shared by the Business/Goals/Strategies/Measures/Actions/
    /// Issues collaborator services (out of scope per spec §1: contracts
    /// only, not their internals)
    #[arg(long, env = "GATEWAY_COLLABORATORS_BASE_URL", default_value = "http://localhost:9000")]
    collaborators_base_url: String,

    /// Interval, in seconds, between session-expiry and job-timeout sweeps
    #[arg(long, env = "GATEWAY_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    sweep_interval_secs: u64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Stage {
    Dev,
    Staging,
    Prod,
}

impl From<Stage> for JobStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Dev => JobStage::Dev,
            Stage::Staging => JobStage::Staging,
            Stage::Prod => JobStage::Prod,
        }
    }
}

fn build_sources(args: &Args) -> EnrichmentSources {
    let mut sources = EnrichmentSources::new();

    if args.use_fake_collaborators {
        tracing::warn!("using in-memory collaborator fakes, not suitable for production");
        sources.register(
            ParameterSource::Onboarding,
            Arc::new(BusinessFoundationSource(Arc::new(FakeBusinessFoundationClient::new()))),
        );
        sources.register(
            ParameterSource::Goal,
            Arc::new(GoalsSource(Arc::new(FakeListClient::new("goal_id")))),
        );
        sources.register(
            ParameterSource::Goals,
            Arc::new(GoalsSource(Arc::new(FakeListClient::new("goal_id")))),
        );
        sources.register(
            ParameterSource::Strategies,
            Arc::new(StrategiesSource(Arc::new(FakeListClient::new("strategy_id")))),
        );
        sources.register(
            ParameterSource::Measure,
            Arc::new(MeasuresSource(Arc::new(FakeListClient::new("measure_id")))),
        );
        sources.register(
            ParameterSource::Measures,
            Arc::new(MeasuresSource(Arc::new(FakeListClient::new("measure_id")))),
        );
        sources.register(ParameterSource::Action, Arc::new(ActionSource(Arc::new(FakeKeyedClient::new()))));
        sources.register(ParameterSource::Issue, Arc::new(IssueSource(Arc::new(FakeKeyedClient::new()))));
        sources.register(ParameterSource::Website, Arc::new(WebsiteSource(Arc::new(FakeWebsiteClient::new()))));
        return sources;
    }

    let base_url = args.collaborators_base_url.clone();
    sources.register(
        ParameterSource::Onboarding,
        Arc::new(BusinessFoundationSource(Arc::new(HttpBusinessFoundationClient { base_url: base_url.clone() }))),
    );
    sources.register(
        ParameterSource::Goal,
        Arc::new(GoalsSource(Arc::new(HttpGoalsClient { base_url: base_url.clone() }))),
    );
    sources.register(
        ParameterSource::Goals,
        Arc::new(GoalsSource(Arc::new(HttpGoalsClient { base_url: base_url.clone() }))),
    );
    sources.register(
        ParameterSource::Strategies,
        Arc::new(StrategiesSource(Arc::new(HttpStrategiesClient { base_url: base_url.clone() }))),
    );
    sources.register(
        ParameterSource::Measure,
        Arc::new(MeasuresSource(Arc::new(HttpMeasuresClient { base_url: base_url.clone() }))),
    );
    sources.register(
        ParameterSource::Measures,
        Arc::new(MeasuresSource(Arc::new(HttpMeasuresClient { base_url: base_url.clone() }))),
    );
    sources.register(
        ParameterSource::Action,
        Arc::new(ActionSource(Arc::new(HttpActionsClient { base_url: base_url.clone() }))),
    );
    sources.register(
        ParameterSource::Issue,
        Arc::new(IssueSource(Arc::new(HttpIssuesClient { base_url: base_url.clone() }))),
    );
    sources.register(ParameterSource::Website, Arc::new(WebsiteSource(Arc::new(HttpWebsiteClient))));
    sources
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gateway_service=info,tower_http=info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let args = Args::parse();
    tracing::info!(
        addr = %args.addr,
        stage = ?args.stage,
        tenant_concurrency_limit = args.tenant_concurrency_limit,
        fakes = args.use_fake_collaborators,
        "starting gateway-service"
    );

    let sources = build_sources(&args);
    let app_state = state::build(args.stage.into(), args.tenant_concurrency_limit, sources);

    tokio::spawn(app_state.jobs.clone().run());

    let sweep_state = app_state.clone();
    let sweep_interval = std::time::Duration::from_secs(args.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(cause) = sweep_state.sessions.sweep_expired().await {
                tracing::warn!(error = ?cause, "session sweep failed");
            }
            if let Err(cause) = sweep_state.jobs.sweep_processing_timeouts().await {
                tracing::warn!(error = ?cause, "job processing-timeout sweep failed");
            }
        }
    });

    let app = handlers::router(app_state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
