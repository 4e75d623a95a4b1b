//! Random-walk demo: N worker threads share one trainer.
//!
//! Each worker builds its own chain environment and drives a random agent
//! until the step budget is spent. Per-worker statistics are sent back over a
//! channel once a worker stops.
//!
//! ```bash
//! cargo run --release --bin random_walk -- [workers] [total_timesteps] [directory]
//! RUST_LOG=training_session=debug cargo run --bin random_walk -- 4 20000 runs/walk
//! ```

use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use training_session::logging::DEFAULT_FILTER;
use training_session::{
    clip_reward, init_logging, time_limit, Agent, BoxedEnvironment, EnvHandle, Environment,
    EnvironmentContext, EpisodeOutcome, StepOutcome, Trainer, TrainerConfig,
};

const CHAIN_LENGTH: i64 = 10;
const MAX_EPISODE_STEPS: usize = 200;

/// Walk left or right on `[-length, length]`; the right end pays 1, the left
/// end pays -1, every other step costs a little.
struct ChainWalk {
    length: i64,
    position: i64,
    ctx: EnvironmentContext,
}

impl Environment for ChainWalk {
    type State = i64;
    type Action = bool;

    fn reset(&mut self) -> anyhow::Result<i64> {
        if self.ctx.should_record_video() {
            debug!(
                instance = self.ctx.instance_id(),
                episode = self.ctx.current_episode(),
                "recording episode"
            );
        }
        self.position = 0;
        Ok(0)
    }

    fn step(&mut self, right: &bool) -> anyhow::Result<StepOutcome<i64>> {
        self.position += if *right { 1 } else { -1 };
        let outcome = if self.position >= self.length {
            StepOutcome::terminal(self.position, 1.0)
        } else if self.position <= -self.length {
            StepOutcome::terminal(self.position, -1.0)
        } else {
            StepOutcome::running(self.position, -0.01)
        };
        Ok(outcome)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        debug!(instance = self.ctx.instance_id(), "chain closed");
        Ok(())
    }
}

fn make_chain(ctx: &EnvironmentContext) -> anyhow::Result<BoxedEnvironment<i64, bool>> {
    Ok(Box::new(ChainWalk {
        length: CHAIN_LENGTH,
        position: 0,
        ctx: ctx.clone(),
    }))
}

/// Moves right with probability `bias`.
struct RandomAgent {
    rng: StdRng,
    bias: f64,
}

impl Agent<i64, bool> for RandomAgent {
    fn step(&mut self, _: &i64) -> anyhow::Result<bool> {
        Ok(self.rng.gen_bool(self.bias))
    }
}

/// What one worker did before stopping.
#[derive(Debug)]
struct WorkerStats {
    worker: usize,
    episodes: usize,
    steps: u64,
    best_score: f64,
}

fn run_worker(
    worker: usize,
    trainer: &Trainer<i64, bool>,
    env: &EnvHandle<i64, bool>,
) -> training_session::Result<WorkerStats> {
    let mut agent = RandomAgent {
        rng: StdRng::seed_from_u64(worker as u64),
        bias: 0.55,
    };
    let mut stats = WorkerStats {
        worker,
        episodes: 0,
        steps: 0,
        best_score: f64::NEG_INFINITY,
    };

    loop {
        let outcome = trainer.run_episode(&mut agent, env)?;
        if let Some(record) = outcome.record() {
            stats.episodes += 1;
            stats.steps += record.steps;
            stats.best_score = stats.best_score.max(record.score);
        }
        if outcome.should_stop() {
            if let EpisodeOutcome::Discarded(record) = &outcome {
                debug!(worker, episode = record.episode, "last episode finished after shutdown");
            }
            return Ok(stats);
        }
    }
}

fn print_usage() {
    println!("Usage: random_walk [workers] [total_timesteps] [directory]");
    println!();
    println!("  workers           worker threads (default 4)");
    println!("  total_timesteps   step budget shared by all workers (default 20000)");
    println!("  directory         where to write scores.json (default: dry run)");
}

fn main() -> anyhow::Result<()> {
    init_logging(DEFAULT_FILTER);

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }
    let workers: usize = match args.get(1) {
        Some(arg) => arg.parse()?,
        None => 4,
    };
    let total_timesteps: u64 = match args.get(2) {
        Some(arg) => arg.parse()?,
        None => 20_000,
    };

    let mut config = TrainerConfig::new("chain-walk", total_timesteps).with_video_period(100);
    if let Some(dir) = args.get(3) {
        config = config.with_directory(dir).with_experience(MAX_EPISODE_STEPS);
    }

    let trainer = Arc::new(Trainer::new(config, make_chain)?);
    trainer.add_preprocessor("time_limit", time_limit::<i64, bool>(MAX_EPISODE_STEPS))?;
    trainer.add_preprocessor("clip_reward", clip_reward::<i64, bool>(-1.0, 1.0))?;

    let envs = (0..workers)
        .map(|_| trainer.build_environment())
        .collect::<training_session::Result<Vec<_>>>()?;
    info!(workers, total_timesteps, "starting workers");

    let (tx, rx) = unbounded();
    let handles: Vec<_> = envs
        .into_iter()
        .enumerate()
        .map(|(worker, env)| {
            let trainer = Arc::clone(&trainer);
            let tx = tx.clone();
            thread::spawn(move || {
                let result = run_worker(worker, &trainer, &env);
                if tx.send(result).is_err() {
                    debug!(worker, "stats receiver dropped");
                }
            })
        })
        .collect();
    drop(tx);

    for result in rx {
        let stats = result?;
        info!(
            worker = stats.worker,
            episodes = stats.episodes,
            steps = stats.steps,
            best_score = stats.best_score,
            "worker finished"
        );
    }
    for handle in handles {
        if handle.join().is_err() {
            anyhow::bail!("worker thread panicked");
        }
    }

    if let Some(summary) = trainer.summary() {
        println!(
            "{} episodes, {} timesteps, {} epochs, mean score {:.3}",
            summary.episodes, summary.timesteps, summary.epochs, summary.mean_score
        );
    }
    Ok(())
}
