//! Operator entrypoints for the domain-intel pipeline: run one catalog
//! stage to completion, seed/inspect the graph, and drain or replay a
//! topic for reprocessing.
//!
//! Grounded on `domain_intel/pipeline/__init__.py`'s module-level
//! `main()` functions (one per stage, dispatched by CLI arg) and its
//! `topic_dump`/`reload_topic` helpers, collapsed here into one binary
//! with subcommands the way `stupid_cli` dispatches one binary's worth of
//! operator actions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rdkafka::Message as _;
use rdkafka::consumer::{CommitMode, Consumer};
use rdkafka::producer::FutureRecord;

use domain_intel_broker::{open_consumer, open_producer, wait_until_ready};
use domain_intel_catalog::{self as catalog, LabelWorker, WorkerKind};
use domain_intel_core::config::Config;
use domain_intel_graph::GraphStore;
use domain_intel_parsers::{DnsParseWorker, RankFlattenWorker, TrafficFlattenWorker};
use domain_intel_persist::{ParserFamily, PersistWorker};
use domain_intel_reporter::{ReportWorker, TraverseWorker};
use domain_intel_stage::{run, StageConfig};

#[derive(Parser)]
#[command(name = "domain-intel", about = "Domain Intel pipeline operator CLI")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one named catalog stage to completion (or forever, absent
    /// `--max-read-count`).
    RunStage {
        /// Stage name from the catalog (e.g. `persist-rank`).
        stage: String,
        #[arg(long)]
        dry: bool,
        #[arg(long)]
        dump_dir: Option<PathBuf>,
        #[arg(long)]
        max_read_count: Option<u64>,
        /// Hop count for `traverse-domains` (default matches `traverse`'s
        /// own default of 1).
        #[arg(long, default_value_t = 1)]
        max_depth: u32,
    },
    /// Drain a topic to newline-delimited hex-encoded payloads on disk.
    DumpTopic {
        topic: String,
        out: PathBuf,
        #[arg(long)]
        max_count: Option<u64>,
    },
    /// Republish a dump file's lines back onto a topic.
    ReplayTopic {
        topic: String,
        #[arg(long = "in")]
        input: PathBuf,
    },
    /// Build graph collections/indexes and seed the country-code vertices.
    InitGraph {
        #[arg(long)]
        drop_first: bool,
    },
    /// Print the wide-column CSV header (§6).
    ReportHeader,
}

#[tokio::main]
async fn main() -> Result<()> {
    domain_intel_core::logging::init();
    domain_intel_core::config::load_dotenv();
    let args = Args::parse();
    let cfg = Config::from_env();

    match args.command {
        Command::RunStage { stage, dry, dump_dir, max_read_count, max_depth } => {
            run_stage(&cfg, &stage, dry, dump_dir, max_read_count, max_depth).await
        }
        Command::DumpTopic { topic, out, max_count } => dump_topic(&cfg, &topic, &out, max_count).await,
        Command::ReplayTopic { topic, input } => replay_topic(&cfg, &topic, &input).await,
        Command::InitGraph { drop_first } => init_graph(&cfg, drop_first).await,
        Command::ReportHeader => {
            println!("{}", domain_intel_reporter::header());
            Ok(())
        }
    }
}

async fn run_stage(
    cfg: &Config,
    stage_name: &str,
    dry: bool,
    dump_dir: Option<PathBuf>,
    max_read_count: Option<u64>,
    max_depth: u32,
) -> Result<()> {
    let def = catalog::find(stage_name)
        .with_context(|| format!("unknown stage '{stage_name}'"))?;

    let expected: Vec<String> = def.input_topics.iter().map(|s| s.to_string()).collect();
    wait_until_ready(&cfg.broker.bootstrap_servers, &expected, 10).await?;

    let mut stage_cfg = StageConfig::new(def.name, format!("domain-intel-{}", def.name));
    stage_cfg.input_topics = def.input_topics.iter().map(|s| s.to_string()).collect();
    stage_cfg.output_topics = def.output_topics.iter().map(|s| s.to_string()).collect();
    stage_cfg.timeout_secs = def.timeout_secs;
    stage_cfg.retry_count = def.retry_class.retry_count();
    stage_cfg.dump_dir = dump_dir;
    stage_cfg.dry = dry;
    stage_cfg.max_read_count = max_read_count;

    let bootstrap = cfg.broker.bootstrap_servers.clone();

    match def.worker {
        WorkerKind::Persist => {
            let family = def
                .input_topics
                .first()
                .and_then(|t| ParserFamily::from_topic(t))
                .with_context(|| format!("stage '{stage_name}' has no known persist family"))?;
            let store = GraphStore::new(&cfg.graph);
            let worker = PersistWorker::new(store, family, dry);
            run(stage_cfg, &bootstrap, worker).await?;
        }
        WorkerKind::Parser("rank_info") => {
            run(stage_cfg, &bootstrap, RankFlattenWorker).await?;
        }
        WorkerKind::Parser("traffic_history") => {
            run(stage_cfg, &bootstrap, TrafficFlattenWorker).await?;
        }
        WorkerKind::Parser("geodns") => {
            run(stage_cfg, &bootstrap, DnsParseWorker).await?;
        }
        WorkerKind::Parser(other) => bail!("unrecognized parser worker '{other}' for stage '{stage_name}'"),
        WorkerKind::Projection("domain-label") => {
            run(stage_cfg, &bootstrap, LabelWorker::new()).await?;
        }
        WorkerKind::Projection("graph-traverse") => {
            let store = GraphStore::new(&cfg.graph);
            run(stage_cfg, &bootstrap, TraverseWorker::new(store, max_depth)).await?;
        }
        WorkerKind::Projection("wide-csv-report") => {
            run(stage_cfg, &bootstrap, ReportWorker).await?;
        }
        WorkerKind::Projection(other) => bail!("unrecognized projection worker '{other}' for stage '{stage_name}'"),
        WorkerKind::ExternalResolver(name) => {
            bail!(
                "stage '{stage_name}' calls external resolver '{name}'; that integration is out of \
                 scope here and must be run as a separate process implementing the Worker trait"
            )
        }
    }

    Ok(())
}

async fn dump_topic(cfg: &Config, topic: &str, out: &PathBuf, max_count: Option<u64>) -> Result<()> {
    use std::io::Write;

    let consumer = open_consumer(
        &cfg.broker.bootstrap_servers,
        &[topic.to_string()],
        &format!("domain-intel-dump-{topic}"),
        cfg.broker.timeout_ms,
    )
    .await?;

    let mut file = std::fs::File::create(out).with_context(|| format!("creating {}", out.display()))?;
    let mut count: u64 = 0;

    loop {
        if let Some(max) = max_count {
            if count >= max {
                break;
            }
        }
        let borrowed = match tokio::time::timeout(Duration::from_secs(10), consumer.inner().recv()).await {
            Ok(Ok(msg)) => msg,
            Ok(Err(e)) => bail!("consumer recv failed: {e}"),
            Err(_) => {
                tracing::info!(topic, count, "no more messages within timeout, stopping dump");
                break;
            }
        };
        let payload = borrowed.payload().unwrap_or_default();
        writeln!(file, "{}", hex::encode(payload))?;
        consumer.inner().commit_message(&borrowed, CommitMode::Sync)?;
        count += 1;
    }

    tracing::info!(topic, count, path = %out.display(), "topic dump complete");
    Ok(())
}

async fn replay_topic(cfg: &Config, topic: &str, input: &PathBuf) -> Result<()> {
    let contents = std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let producer = open_producer(&cfg.broker.bootstrap_servers).await?;

    let mut count: u64 = 0;
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        let payload = hex::decode(line.trim()).with_context(|| format!("decoding line {}", count + 1))?;
        let record: FutureRecord<'_, (), Vec<u8>> = FutureRecord::to(topic).payload(&payload);
        producer
            .inner()
            .send(record, Duration::from_secs(0))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("publish failed: {e}"))?;
        count += 1;
    }
    producer.flush(Duration::from_secs(30))?;

    tracing::info!(topic, count, "topic replay complete");
    Ok(())
}

async fn init_graph(cfg: &Config, drop_first: bool) -> Result<()> {
    let store = GraphStore::new(&cfg.graph);
    if drop_first {
        store.drop_database().await?;
    }
    let created = store.build_graph().await?;
    let seeded = store.seed_country_codes(cfg.graph.dry).await?;
    tracing::info!(?created, seeded, "graph initialised");
    Ok(())
}
