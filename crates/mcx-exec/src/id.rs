use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence for run identifiers.
static RUN_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    RUN_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Build a run id for one checker invocation.
///
/// Format: `{verifier}-{input}-{seq:x}`. Also used to name temp input files, so two
/// concurrent checks of the same input never collide.
pub fn make_run_id(verifier: &str, input: &str) -> String {
    format!("{verifier}-{input}-{seq:x}", seq = next_seq())
}
