//! `allbuild-executor`: the worker daemon. Pulls compile tasks off the
//! broker and runs them inside disposable sandboxes, `concurrency` at a
//! time.

extern crate allbuild;
extern crate clap;
extern crate env_logger;
extern crate log;

use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{App, Arg};
use log::{error, info, warn};

use allbuild::broker::{RedisBroker, WorkerBroker};
use allbuild::client::RESULT_RETENTION;
use allbuild::config::{self, WorkerOverrides};
use allbuild::errors::*;
use allbuild::worker::{self, ToolTable};

const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        error!("{}", err);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = App::new("allbuild-executor")
        .arg(Arg::with_name("task-database").long("task-database").takes_value(true))
        .arg(Arg::with_name("concurrency").long("concurrency").takes_value(true))
        .get_matches();

    let overrides = WorkerOverrides {
        task_database: matches.value_of("task-database").map(str::to_owned),
        concurrency: matches.value_of("concurrency").and_then(|v| v.parse().ok()),
    };
    let cfg = config::load_worker_config(overrides)?;

    if cfg.tools.is_empty() {
        warn!("no tools configured; this worker will reject every task");
    }
    for (tag, priority) in config::queue_priorities(&cfg.tools) {
        info!("registered tag '{}' at priority {}", tag, priority);
    }

    let broker = Arc::new(RedisBroker::connect(&cfg.task_database)?);
    let tools = Arc::new(ToolTable::new(&cfg.tools));
    let queues: Vec<String> = cfg.tools.iter().map(|t| t.tag.clone()).collect();

    info!("listening with concurrency {}", cfg.concurrency);
    let mut handles = Vec::with_capacity(cfg.concurrency);
    for worker_id in 0..cfg.concurrency {
        let broker = Arc::clone(&broker);
        let tools = Arc::clone(&tools);
        let queues = queues.clone();
        handles.push(thread::spawn(move || worker_loop(worker_id, broker, tools, queues)));
    }
    for handle in handles {
        let _ = handle.join();
    }
    Ok(())
}

fn worker_loop(worker_id: usize, broker: Arc<RedisBroker>, tools: Arc<ToolTable>, queues: Vec<String>) {
    loop {
        let task = match broker.dequeue(&queues, DEQUEUE_TIMEOUT) {
            Ok(Some(task)) => task,
            Ok(None) => continue,
            Err(err) => {
                error!("worker {}: dequeue failed: {}", worker_id, err);
                thread::sleep(Duration::from_secs(1));
                continue;
            }
        };
        let (id, payload) = task;
        let request = match ::serde_json::from_slice(&payload) {
            Ok(request) => request,
            Err(err) => {
                error!("worker {}: could not decode task payload: {}", worker_id, err);
                continue;
            }
        };
        info!("worker {}: running task for tag '{}'", worker_id, request_tag(&request));
        let response = worker::handle(&request, &tools);
        let encoded = match ::serde_json::to_vec(&response) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("worker {}: could not encode response: {}", worker_id, err);
                continue;
            }
        };
        if let Err(err) = broker.write_result(&id, RESULT_RETENTION, encoded) {
            error!("worker {}: could not write result: {}", worker_id, err);
        }
    }
}

fn request_tag(request: &::allbuild::protocol::CompileRequest) -> &str {
    &request.tag
}
