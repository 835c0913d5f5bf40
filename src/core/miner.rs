// Worker-pool nonce search. One job per candidate block: N threads scan
// disjoint regions of the nonce space until one finds a hash that passes the
// difficulty check, the job is race-lost, or it is cancelled from outside.

use crate::core::pow::{block_hash, check_proof_of_work};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cadence at which the supervising loop re-checks the race condition
const SUPERVISOR_POLL: Duration = Duration::from_secs(1);

/// Immutable description of one hash-search job
#[derive(Debug, Clone)]
pub struct HashJob {
    /// Header preimage without the trailing nonce
    pub preimage: String,
    pub difficulty: u16,
    /// Height the block under search would occupy
    pub height: u32,
}

/// A winning nonce and the hash it produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundNonce {
    pub nonce: i64,
    pub hash: String,
}

/// Cooperative cancellation shared between the supervisor, the workers, and
/// external callers (shutdown).
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Run the nonce search across `worker_count` threads.
///
/// `race_lost` is polled once per second by the supervising loop; returning
/// true aborts the whole job with `None`, as does an external `cancel`.
/// The first worker to find a valid nonce wins and the siblings stop.
pub fn search_nonce(
    job: &HashJob,
    worker_count: usize,
    cancel: &CancelToken,
    race_lost: impl Fn() -> bool,
) -> Option<FoundNonce> {
    let worker_count = worker_count.max(1);
    let (result_tx, result_rx) = mpsc::channel::<FoundNonce>();

    // Each worker stops as soon as this trips, whether because a sibling
    // found the nonce or because the job was aborted.
    let stop = CancelToken::new();
    let preimage = Arc::new(job.preimage.clone());

    let mut handles = Vec::with_capacity(worker_count);
    let stride = u64::MAX / worker_count as u64;
    for worker_index in 0..worker_count {
        let preimage = Arc::clone(&preimage);
        let stop = stop.clone();
        let result_tx = result_tx.clone();
        let difficulty = job.difficulty;
        let start = (stride.wrapping_mul(worker_index as u64)) as i64;

        handles.push(thread::spawn(move || {
            let mut nonce = start;
            while !stop.is_cancelled() {
                let hash = block_hash(&preimage, nonce);
                if check_proof_of_work(&hash, difficulty) {
                    stop.cancel();
                    // The receiver may already be gone if another worker won
                    let _ = result_tx.send(FoundNonce { nonce, hash });
                    return;
                }
                nonce = nonce.wrapping_add(1);
            }
        }));
    }
    drop(result_tx);

    // Supervising loop: wait for a result, re-checking the race and the
    // external cancel at a fixed cadence.
    let outcome = loop {
        match result_rx.recv_timeout(SUPERVISOR_POLL) {
            Ok(found) => break Some(found),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() || race_lost() {
                    info!(
                        "Abandoning hash job for height {}: cancelled or others completed first",
                        job.height
                    );
                    stop.cancel();
                    break None;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break None,
        }
    };

    for handle in handles {
        let _ = handle.join();
    }
    outcome
}
