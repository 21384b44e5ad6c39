//! Prompt helpers.

use sha2::{Digest, Sha256};

/// Instruction message synthesized at the top of every transcript.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Nudge, a friendly assistant that helps the user \
keep distracting apps in check. You can read the current blocking status with `get_status` and \
change it with `set_status` (blocked = 1 to block, 0 to unblock). Only change the status when the \
user clearly asks for it, confirm what you did in one short sentence, and keep replies brief.";

/// Compute a stable SHA-256 fingerprint for a prompt string.
pub fn hash_prompt(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}
