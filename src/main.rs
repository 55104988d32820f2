use anyhow::Result;
use catalog_insights::config::Config;
use catalog_insights::db;
use catalog_insights::executor::PgQueryStore;
use catalog_insights::history::QueryHistoryRepository;
use catalog_insights::llm::LlmClient;
use catalog_insights::pipeline::{user_facing_message, InsightPipeline, InsightRequest};
use catalog_insights::tenant::TenantContext;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "insights")]
#[command(about = "Ad-hoc analytics: ask a question, get rows and a chart")]
struct Args {
    /// The question in natural language
    question: String,

    /// Entity to query (Contracts, Isrc, Virgin, Releases, Distribution, TuStreams)
    #[arg(short, long, default_value = "Contracts")]
    entity: String,

    /// Calling user id
    #[arg(short, long)]
    user_id: i64,

    /// Calling team id, if any
    #[arg(long)]
    team_id: Option<i64>,

    /// Selected folder id, if any
    #[arg(long)]
    folder_id: Option<String>,

    /// Also synthesize a chart config for the rows
    #[arg(long)]
    chart: bool,

    /// Also explain the generated statement segment by segment
    #[arg(long)]
    explain: bool,

    /// Record the run in the query history table
    #[arg(long)]
    history: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let mut tenant = TenantContext::new(args.user_id);
    if let Some(team_id) = args.team_id {
        tenant = tenant.with_team(team_id);
    }
    if let Some(folder_id) = args.folder_id {
        tenant = tenant.with_folder(folder_id);
    }

    info!("Connecting to database...");
    let pool = db::connect(&config.database_url).await?;

    let model = Arc::new(LlmClient::new(
        config.api_key.clone(),
        config.base_url.clone(),
        config.model.clone(),
        config.model_timeout,
    ));
    let store = Arc::new(PgQueryStore::new(pool.clone(), config.query_timeout));

    let mut pipeline = InsightPipeline::new(model, store);
    if args.history {
        pipeline = pipeline.with_history(QueryHistoryRepository::new(pool));
    }

    let request = InsightRequest {
        question: args.question.clone(),
        entity: args.entity,
        tenant,
        with_chart: args.chart,
    };

    let response = match pipeline.ask(request).await {
        Ok(response) => response,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            println!("{}", user_facing_message(&e));
            std::process::exit(1);
        }
    };

    println!("-- query --------------------------------------------------");
    println!("{}", response.query.text);
    println!("-- rows ({}) ----------------------------------------------", response.result.row_count);
    println!("{}", serde_json::to_string_pretty(&response.result.rows)?);

    if let Some(chart) = &response.chart {
        println!("-- chart --------------------------------------------------");
        println!("{}", serde_json::to_string_pretty(chart)?);
    }

    if args.explain {
        match pipeline.explain(&args.question, &response.query.text).await {
            Ok(segments) => {
                println!("-- explanation --------------------------------------------");
                for segment in segments {
                    println!("{:<40} {}", segment.text, segment.explanation);
                }
            }
            Err(e) => error!("Explanation unavailable: {}", e),
        }
    }

    Ok(())
}
