//! Operator CLI over `hylo_core`.
//!
//! Usage:
//!   hylo ping
//!   hylo migrate
//!   hylo unread <user_id>
//!   hylo unsent [limit]
//!   hylo relay
//!
//! Configuration is read from the JSON file named by `HYLO_CONFIG`; without
//! it defaults apply. Commands that touch storage need `database_path`.

use hylo_core::db::{migrations::latest_version, open_db};
use hylo_core::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use hylo_core::{
    init_from_config, now_epoch_ms, ActivityService, CoreConfig, JobQueue, JobRequest,
    OutboxRelay, QueueError, SqliteActivityRepository,
};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::process::ExitCode;

const CONFIG_ENV: &str = "HYLO_CONFIG";
const DEFAULT_UNSENT_LIMIT: u32 = 50;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Writes relayed jobs as JSON lines for an external queue producer.
struct StdoutJobQueue;

impl JobQueue for StdoutJobQueue {
    fn enqueue(&self, job: &JobRequest) -> Result<(), QueueError> {
        let line =
            serde_json::to_string(job).map_err(|err| QueueError::Rejected(err.to_string()))?;
        println!("{line}");
        Ok(())
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("hylo: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> CliResult<()> {
    let config = load_config()?;
    init_from_config(&config)?;

    let command = args.first().map(String::as_str).unwrap_or("ping");
    info!("event=cli_command module=cli status=start command={command}");

    match command {
        "ping" => {
            println!("hylo_core ping={}", hylo_core::ping());
            println!("hylo_core version={}", hylo_core::core_version());
        }
        "migrate" => {
            open_database(&config)?;
            println!("schema_version={}", latest_version());
        }
        "unread" => {
            let user_id: i64 = required_arg(args, 1, "user_id")?.parse()?;
            let conn = open_database(&config)?;
            let service = ActivityService::new(SqliteActivityRepository::try_new(&conn)?);
            println!("unread={}", service.unread_count(user_id)?);
        }
        "unsent" => {
            let limit = match args.get(1) {
                Some(value) => value.parse()?,
                None => DEFAULT_UNSENT_LIMIT,
            };
            let conn = open_database(&config)?;
            let repo = SqliteNotificationRepository::try_new(&conn)?;
            for notification in repo.list_unsent(limit)? {
                println!(
                    "{} activity={} medium={}",
                    notification.id, notification.activity_id, notification.medium
                );
            }
        }
        "relay" => {
            let conn = open_database(&config)?;
            let relay = OutboxRelay::new(StdoutJobQueue, config.outbox.clone());
            let report = relay.relay_pending(&conn, now_epoch_ms())?;
            relay.prune(&conn, now_epoch_ms())?;
            if let Some(err) = report.failure {
                return Err(err.into());
            }
            eprintln!("relayed={}", report.relayed);
        }
        other => return Err(format!("unknown command `{other}`").into()),
    }

    Ok(())
}

fn load_config() -> CliResult<CoreConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => Ok(CoreConfig::load(path)?),
        Err(_) => Ok(CoreConfig::default()),
    }
}

fn open_database(config: &CoreConfig) -> CliResult<Connection> {
    let path = config
        .database_path
        .as_ref()
        .ok_or("database_path is not configured")?;
    Ok(open_db(path)?)
}

fn required_arg<'a>(args: &'a [String], index: usize, name: &str) -> CliResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument <{name}>").into())
}
