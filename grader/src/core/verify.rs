//! Per-occurrence verification of a keyword transformation.
//!
//! Compares an original text against the student-modified copy. Candidate
//! tokens (tokens containing the keyword) are paired by position, and every
//! keyword occurrence in a pair is scored on its own: `apPLEapple` needs two
//! updates, not one.
//!
//! Pairs whose occurrence offsets differ are alignment errors and do not count
//! toward either total. Unequal candidate counts are surfaced as a
//! [`CountMismatch`]; what happens next depends on [`CountPolicy`].

use serde::{Deserialize, Serialize};

use crate::core::keyword::{Keyword, is_uppercase};
use crate::core::tokens::candidate_tokens;

/// How to treat files whose candidate-token counts differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    /// Compare the shared prefix; trailing tokens on the longer side are ignored.
    #[default]
    Truncate,
    /// Evaluate no pairs when the counts differ.
    Strict,
}

/// Candidate-token counts of the two sides when they differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMismatch {
    pub original: usize,
    pub modified: usize,
}

/// A pair whose occurrence offsets do not line up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentError {
    /// Position of the pair in the candidate sequence.
    pub pair_index: usize,
    pub original_token: String,
    pub modified_token: String,
    pub original_offsets: Vec<usize>,
    pub modified_offsets: Vec<usize>,
}

/// An occurrence that was left (partly) lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedUpdate {
    pub pair_index: usize,
    /// Character offset inside the modified token.
    pub offset: usize,
    pub span: String,
}

/// Overall classification of one verified file pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileVerdict {
    Clean,
    MissedUpdates,
    Misaligned,
    CountMismatch,
}

/// Outcome of verifying one (original, modified) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub policy: CountPolicy,
    pub correct_updates: usize,
    pub missed_updates: usize,
    pub original_candidates: usize,
    pub modified_candidates: usize,
    pub pairs_compared: usize,
    pub count_mismatch: Option<CountMismatch>,
    pub alignment_errors: Vec<AlignmentError>,
    pub missed: Vec<MissedUpdate>,
}

impl Verification {
    /// Occurrences that were scored (correct + missed).
    pub fn scored_occurrences(&self) -> usize {
        self.correct_updates + self.missed_updates
    }

    pub fn verdict(&self) -> FileVerdict {
        if self.count_mismatch.is_some() && self.policy == CountPolicy::Strict {
            return FileVerdict::CountMismatch;
        }
        if !self.alignment_errors.is_empty() {
            return FileVerdict::Misaligned;
        }
        if self.missed_updates > 0 {
            return FileVerdict::MissedUpdates;
        }
        if self.count_mismatch.is_some() {
            return FileVerdict::CountMismatch;
        }
        FileVerdict::Clean
    }
}

/// Verify that every keyword occurrence in `original` became uppercase in `modified`.
pub fn verify(
    original: &str,
    modified: &str,
    keyword: &Keyword,
    policy: CountPolicy,
) -> Verification {
    let original_tokens = candidate_tokens(original, keyword);
    let modified_tokens = candidate_tokens(modified, keyword);

    let count_mismatch = (original_tokens.len() != modified_tokens.len()).then_some(CountMismatch {
        original: original_tokens.len(),
        modified: modified_tokens.len(),
    });

    let mut verification = Verification {
        policy,
        correct_updates: 0,
        missed_updates: 0,
        original_candidates: original_tokens.len(),
        modified_candidates: modified_tokens.len(),
        pairs_compared: 0,
        count_mismatch,
        alignment_errors: Vec::new(),
        missed: Vec::new(),
    };

    if count_mismatch.is_some() && policy == CountPolicy::Strict {
        return verification;
    }

    for (pair_index, (before, after)) in original_tokens.iter().zip(&modified_tokens).enumerate() {
        verification.pairs_compared += 1;
        let original_offsets = keyword.find_occurrences(before.text);
        let modified_offsets = keyword.find_occurrences(after.text);
        if original_offsets != modified_offsets {
            verification.alignment_errors.push(AlignmentError {
                pair_index,
                original_token: before.text.to_string(),
                modified_token: after.text.to_string(),
                original_offsets,
                modified_offsets,
            });
            continue;
        }
        for offset in modified_offsets {
            let span = keyword.span(after.text, offset);
            if is_uppercase(span) {
                verification.correct_updates += 1;
            } else {
                verification.missed_updates += 1;
                verification.missed.push(MissedUpdate {
                    pair_index,
                    offset,
                    span: span.to_string(),
                });
            }
        }
    }

    verification
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(original: &str, modified: &str) -> Verification {
        let keyword = Keyword::new("apple").expect("keyword");
        verify(original, modified, &keyword, CountPolicy::Truncate)
    }

    #[test]
    fn uppercased_token_is_correct() {
        let result = check("apple", "APPLE");
        assert_eq!(result.correct_updates, 1);
        assert_eq!(result.missed_updates, 0);
        assert_eq!(result.verdict(), FileVerdict::Clean);
    }

    #[test]
    fn unchanged_mixed_case_token_is_missed() {
        let result = check("ApplePie", "ApplePie");
        assert_eq!(result.correct_updates, 0);
        assert_eq!(result.missed_updates, 1);
        assert_eq!(
            result.missed,
            vec![MissedUpdate {
                pair_index: 0,
                offset: 0,
                span: "Apple".to_string(),
            }]
        );
        assert_eq!(result.verdict(), FileVerdict::MissedUpdates);
    }

    #[test]
    fn each_occurrence_in_a_token_is_scored() {
        let result = check("appleapple", "APPLEAPPLE");
        assert_eq!(result.correct_updates, 2);
        assert_eq!(result.missed_updates, 0);

        let partial = check("apPLEapple", "APPLEapple");
        assert_eq!(partial.correct_updates, 1);
        assert_eq!(partial.missed_updates, 1);
        assert_eq!(partial.missed[0].offset, 5);
    }

    #[test]
    fn shifted_offsets_are_alignment_errors() {
        let result = check("apple", "pineapple");
        assert_eq!(result.scored_occurrences(), 0);
        assert_eq!(result.pairs_compared, 1);
        assert_eq!(result.alignment_errors.len(), 1);
        let error = &result.alignment_errors[0];
        assert_eq!(error.original_offsets, vec![0]);
        assert_eq!(error.modified_offsets, vec![4]);
        assert_eq!(result.verdict(), FileVerdict::Misaligned);
    }

    #[test]
    fn truncates_to_shorter_candidate_list() {
        let result = check("apple apple apple", "APPLE APPLE");
        assert_eq!(result.pairs_compared, 2);
        assert_eq!(result.correct_updates, 2);
        assert_eq!(result.original_candidates, 3);
        assert_eq!(result.modified_candidates, 2);
        assert_eq!(
            result.count_mismatch,
            Some(CountMismatch {
                original: 3,
                modified: 2,
            })
        );
        assert_eq!(result.verdict(), FileVerdict::CountMismatch);
    }

    #[test]
    fn strict_policy_skips_pairs_on_count_mismatch() {
        let keyword = Keyword::new("apple").expect("keyword");
        let result = verify("apple apple", "APPLE", &keyword, CountPolicy::Strict);
        assert_eq!(result.pairs_compared, 0);
        assert_eq!(result.scored_occurrences(), 0);
        assert_eq!(result.verdict(), FileVerdict::CountMismatch);

        let equal = verify("apple pear", "APPLE pear", &keyword, CountPolicy::Strict);
        assert_eq!(equal.correct_updates, 1);
        assert_eq!(equal.verdict(), FileVerdict::Clean);
    }

    #[test]
    fn misalignment_outranks_missed_updates() {
        let result = check("apple apple", "apple pineapple");
        assert_eq!(result.missed_updates, 1);
        assert_eq!(result.alignment_errors.len(), 1);
        assert_eq!(result.verdict(), FileVerdict::Misaligned);
    }

    #[test]
    fn non_candidate_text_is_ignored() {
        let result = check("pear and plum\napple", "PEAR and plum\nAPPLE");
        assert_eq!(result.original_candidates, 1);
        assert_eq!(result.correct_updates, 1);
        assert_eq!(result.verdict(), FileVerdict::Clean);
    }

    #[test]
    fn keyword_parameter_is_respected() {
        let keyword = Keyword::new("Pear").expect("keyword");
        let result = verify("pear apple", "PEAR apple", &keyword, CountPolicy::Truncate);
        assert_eq!(result.original_candidates, 1);
        assert_eq!(result.correct_updates, 1);
    }
}
