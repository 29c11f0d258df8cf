use serde::{Deserialize, Serialize};

/// One diff hunk of a patch set.
///
/// Mirrors the diff-match-patch object shape clients put on the wire:
/// `diffs` is a list of `[op, text]` pairs where op is -1 (delete),
/// 0 (equal, i.e. surrounding context) or 1 (insert). `start1`/`length1`
/// address the hunk in the sender's base text, `start2`/`length2` in the
/// sender's patched text. Character offsets, not bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchHunk {
    pub diffs: Vec<(i8, String)>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

pub const DIFF_DELETE: i8 = -1;
pub const DIFF_EQUAL: i8 = 0;
pub const DIFF_INSERT: i8 = 1;

impl PatchHunk {
    /// The slice of the sender's base text this hunk expects to find
    /// (context plus deletions).
    pub fn source_text(&self) -> String {
        self.diffs
            .iter()
            .filter(|(op, _)| *op != DIFF_INSERT)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    /// The replacement for the matched slice (context plus insertions).
    pub fn target_text(&self) -> String {
        self.diffs
            .iter()
            .filter(|(op, _)| *op != DIFF_DELETE)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

/// Result of applying a patch set against an authoritative text.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Candidate text with every located hunk applied.
    pub text: String,
    /// Per-hunk success, in patch-set order.
    pub applied: Vec<bool>,
}

impl ApplyOutcome {
    /// Overall success requires every hunk of a non-empty set to apply.
    pub fn all_applied(&self) -> bool {
        !self.applied.is_empty() && self.applied.iter().all(|&a| a)
    }
}

/// How far from the expected position a hunk's source slice may be found.
const MATCH_WINDOW: usize = 1000;

/// Apply `hunks` in order against `text`.
///
/// Hunk offsets (`start2`) are coordinates in the sender's fully patched
/// text, so they already account for the size changes of earlier hunks.
/// Each hunk is located by exact match at its expected position first,
/// then by scanning outward up to [`MATCH_WINDOW`] characters, enough
/// slack for an authoritative text that drifted slightly since the
/// sender's base snapshot. The observed drift is carried forward to the
/// next hunk's expected position; a failed hunk instead shifts it back
/// by the size change that never happened. Failed hunks are recorded and
/// the remaining ones still attempted, so callers get a complete
/// success vector.
pub fn apply_hunks(text: &str, hunks: &[PatchHunk]) -> ApplyOutcome {
    let mut chars: Vec<char> = text.chars().collect();
    let mut applied = Vec::with_capacity(hunks.len());
    let mut delta: isize = 0;

    for hunk in hunks {
        let source: Vec<char> = hunk.source_text().chars().collect();
        let target: Vec<char> = hunk.target_text().chars().collect();
        let expected = (hunk.start2 as isize + delta).clamp(0, chars.len() as isize) as usize;

        match locate(&chars, &source, expected) {
            Some(pos) => {
                chars.splice(pos..pos + source.len(), target.iter().copied());
                delta = pos as isize - hunk.start2 as isize;
                applied.push(true);
            }
            None => {
                delta -= hunk.length2 as isize - hunk.length1 as isize;
                applied.push(false);
            }
        }
    }

    ApplyOutcome {
        text: chars.into_iter().collect(),
        applied,
    }
}

fn locate(haystack: &[char], needle: &[char], expected: usize) -> Option<usize> {
    if needle.is_empty() {
        // Pure insertion, anchored at the expected offset.
        return Some(expected.min(haystack.len()));
    }
    if matches_at(haystack, needle, expected) {
        return Some(expected);
    }
    for offset in 1..=MATCH_WINDOW {
        let left_exhausted = offset > expected;
        let right_exhausted = expected + offset + needle.len() > haystack.len();
        if left_exhausted && right_exhausted {
            break;
        }
        if !left_exhausted && matches_at(haystack, needle, expected - offset) {
            return Some(expected - offset);
        }
        if !right_exhausted && matches_at(haystack, needle, expected + offset) {
            return Some(expected + offset);
        }
    }
    None
}

fn matches_at(haystack: &[char], needle: &[char], pos: usize) -> bool {
    pos + needle.len() <= haystack.len() && &haystack[pos..pos + needle.len()] == needle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_hunk(start: usize, text: &str) -> PatchHunk {
        PatchHunk {
            diffs: vec![(DIFF_INSERT, text.to_string())],
            start1: start,
            start2: start,
            length1: 0,
            length2: text.chars().count(),
        }
    }

    #[test]
    fn insert_into_empty_text() {
        let outcome = apply_hunks("", &[insert_hunk(0, "print(1)")]);
        assert!(outcome.all_applied());
        assert_eq!(outcome.text, "print(1)");
    }

    #[test]
    fn replace_with_context() {
        // "let x = 1;" -> "let x = 2;"
        let hunk = PatchHunk {
            diffs: vec![
                (DIFF_EQUAL, "let x = ".to_string()),
                (DIFF_DELETE, "1".to_string()),
                (DIFF_INSERT, "2".to_string()),
                (DIFF_EQUAL, ";".to_string()),
            ],
            start1: 0,
            start2: 0,
            length1: 10,
            length2: 10,
        };
        let outcome = apply_hunks("let x = 1;", &[hunk]);
        assert!(outcome.all_applied());
        assert_eq!(outcome.text, "let x = 2;");
    }

    #[test]
    fn fuzzy_match_survives_drifted_prefix() {
        // Same hunk as above, but the authoritative text gained an
        // unrelated comment line since the sender's base snapshot.
        let hunk = PatchHunk {
            diffs: vec![
                (DIFF_EQUAL, "let x = ".to_string()),
                (DIFF_DELETE, "1".to_string()),
                (DIFF_INSERT, "2".to_string()),
                (DIFF_EQUAL, ";".to_string()),
            ],
            start1: 0,
            start2: 0,
            length1: 10,
            length2: 10,
        };
        let outcome = apply_hunks("// note\nlet x = 1;", &[hunk]);
        assert!(outcome.all_applied());
        assert_eq!(outcome.text, "// note\nlet x = 2;");
    }

    #[test]
    fn unmatched_context_fails_the_hunk() {
        let hunk = PatchHunk {
            diffs: vec![
                (DIFF_EQUAL, "nothing like this".to_string()),
                (DIFF_INSERT, "!".to_string()),
            ],
            start1: 0,
            start2: 0,
            length1: 17,
            length2: 18,
        };
        let outcome = apply_hunks("completely different", &[hunk]);
        assert_eq!(outcome.applied, vec![false]);
        assert!(!outcome.all_applied());
        // Candidate text untouched by the failed hunk.
        assert_eq!(outcome.text, "completely different");
    }

    #[test]
    fn hunk_offsets_are_patched_text_coordinates() {
        let first = insert_hunk(0, "aaa ");
        let second = PatchHunk {
            diffs: vec![
                (DIFF_EQUAL, "world".to_string()),
                (DIFF_INSERT, "!".to_string()),
            ],
            start1: 6,
            start2: 10,
            length1: 5,
            length2: 6,
        };
        let outcome = apply_hunks("hello world", &[first, second]);
        assert!(outcome.all_applied());
        assert_eq!(outcome.text, "aaa hello world!");
    }

    #[test]
    fn empty_patch_set_is_not_a_success() {
        let outcome = apply_hunks("text", &[]);
        assert!(!outcome.all_applied());
        assert_eq!(outcome.text, "text");
    }

    #[test]
    fn hunks_round_trip_through_json() {
        let hunk = PatchHunk {
            diffs: vec![
                (DIFF_EQUAL, "ab".to_string()),
                (DIFF_DELETE, "c".to_string()),
                (DIFF_INSERT, "d".to_string()),
            ],
            start1: 0,
            start2: 0,
            length1: 3,
            length2: 3,
        };
        let json = serde_json::to_string(&hunk).unwrap();
        assert!(json.contains("[0,\"ab\"]"));
        let back: PatchHunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hunk);
    }
}
