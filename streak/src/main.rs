mod cli;
mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use common::logger::init_tracing;
use common::time::local_now;
use executor::CommitGuard;
use executor::github::GithubCommitClient;
use scheduler::command::Envelope;
use scheduler::{Command, Controller, Reply, Scheduler};
use serde::Serialize;
use store::db::Db;
use store::memory::MemoryRepository;
use store::repository::KeyValueRepository;
use store::repository_sqlx::SqlxRepository;
use store::{Configuration, StateStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use cli::{Action, Cli};
use config::AppConfig;

/// Opens the database (or an in-memory map) and wraps it in the state store.
async fn init_store(cfg: &AppConfig, memory: bool) -> anyhow::Result<Arc<StateStore>> {
    let repo: Arc<dyn KeyValueRepository> = if memory {
        warn!("using in-memory state; nothing will be persisted");
        Arc::new(MemoryRepository::new())
    } else {
        let db = Db::connect(&cfg.database_url).await?;
        db.migrate().await?;
        Arc::new(SqlxRepository::new(db.pool.clone()))
    };

    Ok(Arc::new(StateStore::new(repo)))
}

fn build_scheduler(cfg: &AppConfig, store: Arc<StateStore>) -> anyhow::Result<Arc<Scheduler>> {
    let client = GithubCommitClient::new(cfg.github_api_url.clone(), cfg.http_timeout)?;
    let guard = Arc::new(CommitGuard::new(Arc::new(client)));

    Ok(Arc::new(Scheduler::new(store, guard, cfg.schedule_settings())))
}

async fn load_configuration(store: &StateStore, path: &Path) -> anyhow::Result<Configuration> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Configuration = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid configuration", path.display()))?;
    parsed.validate()?;

    store.save_configuration(&parsed).await?;
    Ok(parsed)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn request(tx: &mpsc::Sender<Envelope>, command: Command) -> anyhow::Result<Reply> {
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(Envelope { command, reply_tx })
        .await
        .map_err(|_| anyhow!("controller stopped"))?;
    reply_rx.await.context("controller dropped the reply")
}

/// Serves one command per input line until `shutdown` resolves.
///
/// EOF on the input does not stop the daemon. Shutdown also interrupts a
/// command still in flight; the controller task is aborted, which releases
/// the commit lock and the timer.
async fn serve<R, S>(controller: Controller, input: R, shutdown: S) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = anyhow::Result<()>>,
{
    let (tx, rx) = mpsc::channel::<Envelope>(16);
    let server = tokio::spawn(controller.run(rx));
    tokio::pin!(shutdown);

    // Registers the tick only when the stored configuration is enabled.
    print_json(&request(&tx, Command::ScheduleUpdated).await?)?;

    let mut lines = input.lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line.context("failed to read stdin")? else {
                    info!("stdin closed; running until interrupted");
                    input_open = false;
                    continue;
                };

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let reply = match line.parse::<Command>() {
                    Ok(command) => tokio::select! {
                        reply = request(&tx, command) => reply?,
                        signal = &mut shutdown => {
                            signal?;
                            break;
                        }
                    },
                    Err(e) => Reply::Error { message: e.to_string() },
                };
                print_json(&reply)?;
            }
            signal = &mut shutdown => {
                signal?;
                break;
            }
        }
    }

    info!("shutdown signal received");
    server.abort();
    let _ = server.await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let memory = cli.memory;
    let action = cli.into_action();

    let cfg = AppConfig::from_env()?;
    init_tracing("streak", cfg.production);

    let store = init_store(&cfg, memory).await?;
    let scheduler = build_scheduler(&cfg, Arc::clone(&store))?;
    let controller = Controller::new(
        Arc::clone(&scheduler),
        cfg.tick_intervals(),
        cfg.initial_delay,
    );

    match action {
        Action::Run { config } => {
            if let Some(path) = config {
                load_configuration(&store, &path).await?;
            }
            info!("starting streak scheduler");
            let ctrl_c = async {
                tokio::signal::ctrl_c()
                    .await
                    .context("failed to listen for ctrl-c")
            };
            serve(controller, BufReader::new(tokio::io::stdin()), ctrl_c).await?;
        }
        Action::Tick => {
            if let Some(c) = store.configuration().await? {
                scheduler.set_tick_interval(cfg.tick_intervals().for_mode(c.schedule_mode));
            }
            print_json(&scheduler.tick(local_now()).await)?;
        }
        Action::Force => print_json(&controller.handle(Command::ForceCommit).await)?,
        Action::Configure { path } => {
            let saved = load_configuration(&store, &path).await?;
            info!(
                mode = ?saved.schedule_mode,
                enabled = saved.enabled,
                "configuration stored; send `reload` to a running scheduler to apply it"
            );
        }
        Action::Status => print_json(&controller.handle(Command::Status).await)?,
        Action::Errors => print_json(&store.error_log().await?)?,
    }

    Ok(())
}
