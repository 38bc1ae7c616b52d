use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::as_graph::ASGraph;
use crate::engine::SimulationEngine;

use super::scenario::{Scenario, Trial};

type TrialMessage = Option<(usize, Trial)>;

/// Fixed-size pool of worker threads, each owning a private copy of the graph
pub struct WorkerPool {
    pub parallelism: usize,
    pub seed: u64,
    progress: ProgressBar,
}

impl WorkerPool {
    pub fn new(parallelism: usize, seed: u64) -> Self {
        WorkerPool {
            parallelism: parallelism.max(1),
            seed,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run every trial and return the success rates in trial order.
    ///
    /// Trial `i` draws its randomness from `seed + i`, so results do not
    /// depend on which worker picked it up. A panic in a worker is re-raised
    /// here.
    pub fn run(&self, as_graph: &ASGraph, scenario: &Scenario, trials: &[Trial]) -> Vec<f64> {
        let (trial_tx, trial_rx) = mpsc::channel::<TrialMessage>();
        let trial_rx = Arc::new(Mutex::new(trial_rx));
        let (result_tx, result_rx) = mpsc::channel::<(usize, f64)>();
        let stopped = Arc::new(AtomicBool::new(false));

        let workers: Vec<JoinHandle<()>> = (0..self.parallelism.min(trials.len().max(1)))
            .map(|worker_id| {
                let trial_rx = Arc::clone(&trial_rx);
                let result_tx = result_tx.clone();
                let stopped = Arc::clone(&stopped);
                let engine = SimulationEngine::new(as_graph.clone());
                let scenario = scenario.clone();
                let seed = self.seed;
                thread::spawn(move || {
                    worker_loop(worker_id, engine, &scenario, seed, &trial_rx, &result_tx, &stopped)
                })
            })
            .collect();
        drop(result_tx);

        for (index, trial) in trials.iter().enumerate() {
            if trial_tx.send(Some((index, *trial))).is_err() {
                break;
            }
        }

        let mut results = vec![0.0; trials.len()];
        let mut received = 0;
        while received < trials.len() {
            match result_rx.recv_timeout(Duration::from_millis(200)) {
                Ok((index, success_rate)) => {
                    results[index] = success_rate;
                    received += 1;
                    self.progress.inc(1);
                }
                // Workers only exit early by panicking
                Err(RecvTimeoutError::Timeout) => {
                    if workers.iter().any(|worker| worker.is_finished()) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        stopped.store(true, Ordering::SeqCst);
        for _ in &workers {
            // Wake workers blocked on the queue so they see the stop flag
            let _ = trial_tx.send(None);
        }
        drop(trial_tx);

        for worker in workers {
            if let Err(panic) = worker.join() {
                std::panic::resume_unwind(panic);
            }
        }
        results
    }
}

fn worker_loop(
    worker_id: usize,
    mut engine: SimulationEngine,
    scenario: &Scenario,
    seed: u64,
    trial_rx: &Mutex<mpsc::Receiver<TrialMessage>>,
    result_tx: &mpsc::Sender<(usize, f64)>,
    stopped: &AtomicBool,
) {
    while !stopped.load(Ordering::SeqCst) {
        let message = match trial_rx.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => break,
        };
        let Ok(message) = message else { break };
        let Some((index, trial)) = message else { continue };

        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
        let success_rate = run_one(&mut engine, scenario, trial, &mut rng);
        log::debug!("Worker {} finished trial {} {:?}: {:.2}%", worker_id, index, trial, success_rate);

        if result_tx.send((index, success_rate)).is_err() {
            break;
        }
    }
}

/// A trial that cannot run counts as zero success rather than failing the
/// batch.
fn run_one(engine: &mut SimulationEngine, scenario: &Scenario, trial: Trial, rng: &mut StdRng) -> f64 {
    match scenario.run_trial(engine, trial, rng) {
        Ok(success_rate) => success_rate,
        Err(err) => {
            log::warn!("Trial {:?} failed: {}", trial, err);
            0.0
        }
    }
}
