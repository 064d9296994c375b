use std::{sync::mpsc::channel, thread, time::Duration};

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use thenable::{
    outcome::Outcome,
    task::{AsyncTask, ChainedTask},
};

/// A thenable chaining example.
///
/// Starts from a number, runs it through a chain of increment steps on the
/// shared thread pool, and reports the outcome through callbacks.
#[derive(Parser, Debug, Clone)]
struct Args {
    /// The value the first task produces.
    #[arg(short, long, default_value_t = 0)]
    start: i64,

    /// How many increment steps to chain after the first task.
    #[arg(short = 'n', long, default_value_t = 3)]
    steps: usize,

    /// Make the step with this (1-based) index fail.
    #[arg(short, long)]
    fail_at: Option<usize>,

    /// How long each step sleeps before producing its value.
    #[arg(short, long, default_value_t = 100)]
    delay_ms: u64,
}

fn step(value: i64, index: usize, args: &Args) -> anyhow::Result<i64> {
    thread::sleep(Duration::from_millis(args.delay_ms));

    if args.fail_at == Some(index) {
        bail!("step {index} failed on purpose");
    }

    info!("step {index}: {value} -> {}", value + 1);

    Ok(value + 1)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let start = args.start;
    let delay = Duration::from_millis(args.delay_ms);

    let first = AsyncTask::run(move || {
        thread::sleep(delay);
        Ok(start)
    });

    let mut last: Option<ChainedTask<i64, i64>> = None;
    for index in 1..=args.steps {
        let step_args = args.clone();
        let transform = move |x: &i64| step(*x, index, &step_args);
        last = Some(match &last {
            Some(prev) => prev.then(transform)?,
            None => first.then(transform)?,
        });
    }

    let (tx, rx) = channel();
    let tx2 = tx.clone();
    let tail: &AsyncTask<i64> = match &last {
        Some(chained) => &**chained,
        None => &first,
    };

    tail.on_success(move |x| tx.send(Ok(*x)).unwrap())?
        .on_failure(move |cause| tx2.send(Err(cause.to_string())).unwrap())?;

    match rx.recv().context("chain never completed")? {
        Ok(value) => println!("result: {value}"),
        Err(cause) => println!("failed: {cause}"),
    }

    if let Outcome::Failure(cause) = &*tail.outcome() {
        info!("outcome carries cause: {cause}");
    }

    Ok(())
}
