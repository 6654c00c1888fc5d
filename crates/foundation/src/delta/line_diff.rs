//! Line-based diff for code content
//!
//! Hand-rolled LCS diff grouped into unified-style hunks. The payload is a
//! plain text diff a downstream consumer (or human) can apply to the
//! previous version.

/// Cap on the LCS table; beyond it the diff degrades to a whole-file
/// replacement hunk rather than a quadratic walk.
const MAX_DP_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DiffOp<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

/// Produce a unified-style diff with `context` lines around each change.
///
/// Returns `None` when the inputs have no line-level changes.
pub(crate) fn unified_diff(old: &str, new: &str, context: usize) -> Option<String> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    if old_lines == new_lines {
        return None;
    }

    let ops = if old_lines.len().saturating_mul(new_lines.len()) > MAX_DP_CELLS {
        let mut ops: Vec<DiffOp> = old_lines.iter().map(|l| DiffOp::Delete(l)).collect();
        ops.extend(new_lines.iter().map(|l| DiffOp::Insert(l)));
        ops
    } else {
        diff_ops(&old_lines, &new_lines)
    };

    Some(render_hunks(&ops, context))
}

/// LCS walk over lines
fn diff_ops<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<DiffOp<'a>> {
    let n = old.len();
    let m = new.len();

    // table[i][j] = LCS length of old[i..] and new[j..]
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(DiffOp::Equal(old[i]));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            ops.push(DiffOp::Delete(old[i]));
            i += 1;
        } else {
            ops.push(DiffOp::Insert(new[j]));
            j += 1;
        }
    }
    ops.extend(old[i..].iter().map(|l| DiffOp::Delete(l)));
    ops.extend(new[j..].iter().map(|l| DiffOp::Insert(l)));
    ops
}

fn render_hunks(ops: &[DiffOp], context: usize) -> String {
    // Keep every change plus `context` ops on either side; consecutive kept
    // regions merge into one hunk.
    let mut keep = vec![false; ops.len()];
    for (idx, op) in ops.iter().enumerate() {
        if !matches!(op, DiffOp::Equal(_)) {
            let lo = idx.saturating_sub(context);
            let hi = (idx + context).min(ops.len() - 1);
            for slot in &mut keep[lo..=hi] {
                *slot = true;
            }
        }
    }

    // Line numbers (1-based) at the start of each op
    let mut positions = Vec::with_capacity(ops.len());
    let (mut old_no, mut new_no) = (1usize, 1usize);
    for op in ops {
        positions.push((old_no, new_no));
        match op {
            DiffOp::Equal(_) => {
                old_no += 1;
                new_no += 1;
            }
            DiffOp::Delete(_) => old_no += 1,
            DiffOp::Insert(_) => new_no += 1,
        }
    }

    let mut out = String::new();
    let mut idx = 0;
    while idx < ops.len() {
        if !keep[idx] {
            idx += 1;
            continue;
        }
        let start = idx;
        let mut end = idx;
        while end + 1 < ops.len() && keep[end + 1] {
            end += 1;
        }

        let (old_start, new_start) = positions[start];
        let (mut old_count, mut new_count) = (0usize, 0usize);
        for op in &ops[start..=end] {
            match op {
                DiffOp::Equal(_) => {
                    old_count += 1;
                    new_count += 1;
                }
                DiffOp::Delete(_) => old_count += 1,
                DiffOp::Insert(_) => new_count += 1,
            }
        }

        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start, old_count, new_start, new_count
        ));
        for op in &ops[start..=end] {
            let (prefix, line) = match op {
                DiffOp::Equal(line) => (' ', line),
                DiffOp::Delete(line) => ('-', line),
                DiffOp::Insert(line) => ('+', line),
            };
            out.push(prefix);
            out.push_str(line);
            out.push('\n');
        }

        idx = end + 1;
    }
    out
}
