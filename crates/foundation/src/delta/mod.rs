//! # Murmur Delta Encoding
//!
//! The partial-update half of the token-cost optimization layer. When
//! previously-transmitted content changes a little, resending all of it
//! wastes tokens; this module picks the cheapest encoding the consumer can
//! still reconstruct from.
//!
//! ## Method selection
//!
//! ```text
//! encode(old, new, class)
//!   │
//!   ├─ old empty, or change ratio >= threshold ──▶ Full (resend new)
//!   │
//!   └─ by content class:
//!        Code           ──▶ LineDiff         (unified diff, 3 ctx lines)
//!        StructuredData ──▶ StructuralPatch  (add/remove/replace by path)
//!        Prose          ──▶ ChunkDiff        (changed paragraphs only)
//!        Opaque         ──▶ ContextReuse     (word-level change summary)
//! ```
//!
//! Every payload carries a human-readable `instruction` telling the
//! consumer how to apply it. Reconstruction itself is the consumer's job.

mod chunk;
mod context_reuse;
mod line_diff;
pub mod structural;

pub use structural::{diff_values, PatchKind, PatchOp};

use crate::cache::context::ContextCache;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Lines of context around each change in a code diff
const DIFF_CONTEXT_LINES: usize = 3;

/// Fixed nominal reuse estimate reported by ContextReuse payloads; the
/// consumer holds the baseline, so this is a hint, not a measurement.
const CONTEXT_REUSE_RATIO: f64 = 0.8;

/// Cap on the character-level LCS table; larger middles fall back to a
/// line-weighted approximation.
const LCS_DP_CELL_LIMIT: usize = 1_000_000;

/// What kind of content is being re-described
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentClass {
    /// Source code: line-oriented, diff-friendly
    Code,
    /// JSON-shaped state: maps, lists, scalars
    StructuredData,
    /// Natural-language text: paragraph-oriented
    Prose,
    /// No exploitable structure
    Opaque,
}

/// How an update is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    Full,
    LineDiff,
    StructuralPatch,
    ChunkDiff,
    ContextReuse,
}

/// The encoded update handed back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResult {
    pub method: UpdateMethod,
    /// The payload to transmit: the full text for `Full`, a structured
    /// delta object for everything else
    pub content: Value,
    /// Fraction of tokens saved versus a full resend, in `[0, 1]`
    pub token_savings: f64,
    pub original_tokens: u64,
    pub updated_tokens: u64,
}

/// Delta encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaConfig {
    /// Change ratio at or above which a full resend wins
    #[serde(default = "default_change_ratio_threshold")]
    pub change_ratio_threshold: f64,

    /// Size cap for prose chunks, characters
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Entry bound for remembered context baselines
    #[serde(default = "default_context_capacity")]
    pub context_capacity: usize,
}

fn default_change_ratio_threshold() -> f64 {
    0.3
}
fn default_max_chunk_size() -> usize {
    500
}
fn default_context_capacity() -> usize {
    64
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            change_ratio_threshold: default_change_ratio_threshold(),
            max_chunk_size: default_max_chunk_size(),
            context_capacity: default_context_capacity(),
        }
    }
}

/// Rough token estimate: four characters per token. Not model-accurate;
/// only used to rank encodings against each other.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() / 4) as u64
}

/// Content-delta encoder
///
/// Owns the remembered baselines for [`UpdateMethod::ContextReuse`];
/// constructed once by the host next to its [`crate::cache::TieredCache`].
#[derive(Debug)]
pub struct DeltaEncoder {
    config: DeltaConfig,
    /// Baselines for context reuse, bounded LRU keyed by caller id
    context: ContextCache<String, String>,
}

impl DeltaEncoder {
    /// Create an encoder with default settings
    pub fn new() -> Self {
        Self::with_config(DeltaConfig::default())
    }

    /// Create an encoder with custom configuration
    pub fn with_config(config: DeltaConfig) -> Self {
        Self {
            context: ContextCache::new(config.context_capacity),
            config,
        }
    }

    /// Whether a partial update is worth attempting.
    ///
    /// False when there is no baseline to diff against, or when the inputs
    /// differ so much that a delta would cost more than it saves.
    pub fn should_partial_update(&self, old: &str, new: &str) -> bool {
        if old.is_empty() {
            return false;
        }
        let change_ratio = 1.0 - similarity_ratio(old, new);
        change_ratio < self.config.change_ratio_threshold
    }

    /// Encode the cheapest update that turns `old` into `new`.
    ///
    /// `context_id`, when given with [`ContentClass::Opaque`], remembers
    /// `old` so a later turn can refer back to it.
    pub fn encode(
        &mut self,
        old: &str,
        new: &str,
        class: ContentClass,
        context_id: Option<&str>,
    ) -> UpdateResult {
        let original_tokens = estimate_tokens(old) + estimate_tokens(new);

        if !self.should_partial_update(old, new) {
            debug!(?class, original_tokens, "full resend");
            return Self::full(new, original_tokens);
        }

        let result = match class {
            ContentClass::Code => Self::encode_code(old, new, original_tokens),
            ContentClass::StructuredData => Self::encode_structured(old, new, original_tokens),
            ContentClass::Prose => self.encode_prose(old, new, original_tokens),
            ContentClass::Opaque => self.encode_opaque(old, new, context_id, original_tokens),
        };

        debug!(
            ?class,
            method = ?result.method,
            savings = result.token_savings,
            "delta encoded"
        );
        result
    }

    /// Recall the baseline last remembered under `id`, if still held
    pub fn recall_context(&mut self, id: &str) -> Option<&str> {
        self.context.get(&id.to_string()).map(String::as_str)
    }

    // =========================================================================
    // Per-class strategies
    // =========================================================================

    fn encode_code(old: &str, new: &str, original_tokens: u64) -> UpdateResult {
        match line_diff::unified_diff(old, new, DIFF_CONTEXT_LINES) {
            Some(diff) => {
                let payload = json!({
                    "instruction": "Apply this unified diff to the previous version of the content.",
                    "diff": diff,
                    "context_lines": DIFF_CONTEXT_LINES,
                });
                Self::package(UpdateMethod::LineDiff, payload, original_tokens)
            }
            // No actual change lines: nothing to transmit, nothing saved.
            None => {
                let payload = json!({
                    "instruction": "No line-level changes; previous content is current.",
                    "diff": "",
                    "context_lines": DIFF_CONTEXT_LINES,
                });
                Self::unchanged(UpdateMethod::LineDiff, payload, original_tokens)
            }
        }
    }

    fn encode_structured(old: &str, new: &str, original_tokens: u64) -> UpdateResult {
        let new_value = match serde_json::from_str::<Value>(new) {
            Ok(value) => value,
            // The target cannot be expressed structurally; resend it whole.
            Err(_) => return Self::full(new, original_tokens),
        };

        let patches = match serde_json::from_str::<Value>(old) {
            Ok(old_value) => diff_values(&old_value, &new_value),
            // No comparable baseline: one replace at the root.
            Err(_) => vec![PatchOp {
                op: PatchKind::Replace,
                path: String::new(),
                value: Some(new_value),
            }],
        };

        if patches.is_empty() {
            let payload = json!({
                "instruction": "No structural changes; previous content is current.",
                "patches": [],
            });
            return Self::unchanged(UpdateMethod::StructuralPatch, payload, original_tokens);
        }

        let payload = json!({
            "instruction": "Apply these patch operations to the previous structure, in order.",
            "patches": patches,
        });
        Self::package(UpdateMethod::StructuralPatch, payload, original_tokens)
    }

    fn encode_prose(&self, old: &str, new: &str, original_tokens: u64) -> UpdateResult {
        let old_chunks = chunk::split_chunks(old, self.config.max_chunk_size);
        let new_chunks = chunk::split_chunks(new, self.config.max_chunk_size);
        let changes = chunk::chunk_changes(&old_chunks, &new_chunks);

        if changes.is_empty() {
            let payload = json!({
                "instruction": "No chunk-level changes; previous content is current.",
                "total_chunks": new_chunks.len(),
                "changes": [],
            });
            return Self::unchanged(UpdateMethod::ChunkDiff, payload, original_tokens);
        }

        let payload = json!({
            "instruction": "Replace the chunks at the listed positions in the previous text; null old means append.",
            "total_chunks": new_chunks.len(),
            "changes": changes,
        });
        Self::package(UpdateMethod::ChunkDiff, payload, original_tokens)
    }

    fn encode_opaque(
        &mut self,
        old: &str,
        new: &str,
        context_id: Option<&str>,
        original_tokens: u64,
    ) -> UpdateResult {
        // Remember the baseline so later turns can reference it. Entries
        // never expire on their own; the LRU bound caps what we hold.
        if let Some(id) = context_id {
            self.context.put(id.to_string(), old.to_string(), None);
        }

        let summary = context_reuse::word_delta(old, new);
        let unchanged = context_reuse::is_empty_delta(&summary);
        let payload = json!({
            "instruction": "Reuse the content previously sent under context_id, adjusted by the word-level changes.",
            "context_id": context_id,
            "changes": summary,
            "reuse_percentage": CONTEXT_REUSE_RATIO,
        });

        if unchanged {
            Self::unchanged(UpdateMethod::ContextReuse, payload, original_tokens)
        } else {
            Self::package(UpdateMethod::ContextReuse, payload, original_tokens)
        }
    }

    // =========================================================================
    // Result assembly
    // =========================================================================

    fn full(new: &str, original_tokens: u64) -> UpdateResult {
        UpdateResult {
            method: UpdateMethod::Full,
            content: Value::String(new.to_string()),
            token_savings: 0.0,
            original_tokens,
            updated_tokens: original_tokens,
        }
    }

    /// Delta carrying no actual change: keep the method tag, report zero
    /// savings.
    fn unchanged(method: UpdateMethod, payload: Value, original_tokens: u64) -> UpdateResult {
        UpdateResult {
            method,
            content: payload,
            token_savings: 0.0,
            original_tokens,
            updated_tokens: original_tokens,
        }
    }

    fn package(method: UpdateMethod, payload: Value, original_tokens: u64) -> UpdateResult {
        let updated_tokens = estimate_tokens(&payload.to_string());
        let token_savings = if original_tokens == 0 {
            0.0
        } else {
            (1.0 - updated_tokens as f64 / original_tokens as f64).max(0.0)
        };

        UpdateResult {
            method,
            content: payload,
            token_savings,
            original_tokens,
            updated_tokens,
        }
    }
}

impl Default for DeltaEncoder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Similarity
// ============================================================================

/// Normalized similarity of two strings in `[0, 1]`: `2·common / (|a|+|b|)`
/// over characters, with `common` from an LCS walk. 1.0 means identical.
pub(crate) fn similarity_ratio(old: &str, new: &str) -> f64 {
    if old == new {
        return 1.0;
    }

    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();
    let total = old_chars.len() + new_chars.len();
    if total == 0 {
        return 1.0;
    }

    // Peel the common prefix and suffix before the quadratic part.
    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_chars[prefix..]
        .iter()
        .rev()
        .zip(new_chars[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mid_old = &old_chars[prefix..old_chars.len() - suffix];
    let mid_new = &new_chars[prefix..new_chars.len() - suffix];

    let common = prefix
        + suffix
        + if mid_old.len().saturating_mul(mid_new.len()) <= LCS_DP_CELL_LIMIT {
            char_lcs(mid_old, mid_new)
        } else {
            line_weighted_lcs(mid_old, mid_new)
        };

    (2.0 * common as f64) / total as f64
}

/// Character LCS length, two-row DP
fn char_lcs(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ch_a in a {
        for (j, &ch_b) in b.iter().enumerate() {
            cur[j + 1] = if ch_a == ch_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Coarse fallback for very large middles: LCS over lines, each match
/// weighted by its character count. Overestimates difference slightly,
/// which only errs toward a full resend.
fn line_weighted_lcs(a: &[char], b: &[char]) -> usize {
    let a_text: String = a.iter().collect();
    let b_text: String = b.iter().collect();
    let a_lines: Vec<&str> = a_text.lines().collect();
    let b_lines: Vec<&str> = b_text.lines().collect();

    if a_lines.len().saturating_mul(b_lines.len()) > LCS_DP_CELL_LIMIT {
        return 0;
    }

    let mut prev = vec![0usize; b_lines.len() + 1];
    let mut cur = vec![0usize; b_lines.len() + 1];
    for line_a in &a_lines {
        for (j, line_b) in b_lines.iter().enumerate() {
            cur[j + 1] = if line_a == line_b {
                prev[j] + line_a.chars().count()
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b_lines.len()]
}
