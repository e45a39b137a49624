//! Fuzzy best-match selection over known question phrasings.
//!
//! Similarity is the classic matching-blocks ratio `2·M / T`, where `M` is the
//! total size of the matching blocks found by recursively taking the longest
//! common contiguous run and `T` is the combined length of both strings.

use std::collections::HashMap;

use super::normalize::normalize;
use super::store::KnowledgeBase;

/// Minimum similarity for a phrasing to count as a match.
pub const MATCH_CUTOFF: f64 = 0.6;

/// Sequences at least this long get the popular-element heuristic.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A phrasing selected by [`find_best_match`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    /// The stored phrasing, exactly as it appears in the knowledge base.
    pub phrasing: &'a str,
    /// Similarity between the normalized input and the phrasing.
    pub score: f64,
}

/// Scores candidate strings against one fixed input.
///
/// The input is indexed once so scoring many candidates stays cheap.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    b: Vec<char>,
    /// Positions of each non-popular element of `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
    /// Element counts of `b`, used for the multiset upper bound.
    counts: HashMap<char, usize>,
}

impl SequenceMatcher {
    /// Index `input` as the fixed side of every comparison.
    #[must_use]
    pub fn new(input: &str) -> Self {
        let b: Vec<char> = input.chars().collect();

        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }
        let counts = b2j.iter().map(|(&c, js)| (c, js.len())).collect();

        if b.len() >= AUTOJUNK_MIN_LEN {
            let threshold = b.len() / 100 + 1;
            b2j.retain(|_, js| js.len() <= threshold);
        }

        Self { b, b2j, counts }
    }

    /// Similarity ratio in `[0, 1]`; `1.0` when both sides are empty.
    #[must_use]
    pub fn ratio(&self, candidate: &str) -> f64 {
        let a: Vec<char> = candidate.chars().collect();
        let matched = self.matched_len(&a);
        ratio_of(matched, a.len() + self.b.len())
    }

    /// Upper bound on [`ratio`](Self::ratio) from shared element counts.
    #[must_use]
    pub fn quick_ratio(&self, candidate: &str) -> f64 {
        let mut available = self.counts.clone();
        let mut matched = 0;
        let mut len = 0;
        for c in candidate.chars() {
            len += 1;
            if let Some(n) = available.get_mut(&c) {
                if *n > 0 {
                    *n -= 1;
                    matched += 1;
                }
            }
        }
        ratio_of(matched, len + self.b.len())
    }

    /// Upper bound on [`ratio`](Self::ratio) from lengths alone.
    #[must_use]
    pub fn real_quick_ratio(&self, candidate: &str) -> f64 {
        let la = candidate.chars().count();
        ratio_of(la.min(self.b.len()), la + self.b.len())
    }

    /// Total size of all matching blocks between `a` and the indexed input.
    fn matched_len(&self, a: &[char]) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(a, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }

    /// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Returns `(i, j, size)`; among equally long runs the one starting
    /// earliest in `a`, then earliest in `b`, wins.
    fn longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        // Length of the run ending at (i - 1, j), keyed by j.
        let mut run_len: HashMap<usize, usize> = HashMap::new();
        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next_run_len = HashMap::new();
            if let Some(positions) = self.b2j.get(c) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run_len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            run_len = next_run_len;
        }

        // Popular elements never seed a run but may still extend one.
        while best_i > alo && best_j > blo && a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio_of(matched: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        2.0 * matched as f64 / total as f64
    }
}

/// Similarity ratio between two strings.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(b).ratio(a)
}

/// Find the known phrasing closest to `raw_input`.
///
/// The input is normalized, every phrasing is scored against it (compared in
/// normalized form), and the best one is returned if it reaches
/// [`MATCH_CUTOFF`]. Ties go to the phrasing that comes first.
#[must_use]
pub fn find_best_match<'a>(raw_input: &str, base: &'a KnowledgeBase) -> Option<Match<'a>> {
    let input = normalize(raw_input);
    tracing::debug!(input = %input, "Normalized user input");

    let matcher = SequenceMatcher::new(&input);
    let mut best: Option<Match<'a>> = None;

    for phrasing in base.phrasings() {
        let candidate = normalize(phrasing);
        if matcher.real_quick_ratio(&candidate) < MATCH_CUTOFF
            || matcher.quick_ratio(&candidate) < MATCH_CUTOFF
        {
            continue;
        }
        let score = matcher.ratio(&candidate);
        if score >= MATCH_CUTOFF && best.map_or(true, |b| score > b.score) {
            best = Some(Match { phrasing, score });
        }
    }

    match &best {
        Some(m) => tracing::debug!(phrasing = %m.phrasing, score = m.score, "Best match"),
        None => tracing::debug!(input = %input, "No match above cutoff"),
    }
    best
}

/// Answer of the first entry that lists `phrasing`, if any.
#[must_use]
pub fn get_answer<'a>(phrasing: &str, base: &'a KnowledgeBase) -> Option<&'a str> {
    base.entries()
        .iter()
        .find(|e| e.has_phrasing(phrasing))
        .map(|e| e.answer.as_str())
}
