// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CPU affinity expression language (spec §5 "Affinity").
//!
//! Grammar, one comma-separated term at a time:
//!
//! - `a` — all CPUs
//! - `N` — exactly CPU `N`
//! - `~N` — all CPUs except `N`
//! - `<N` — all CPUs with index less than `N`
//! - `>N` — all CPUs with index greater than `N`
//! - `~<N` — all CPUs with index greater than or equal to `N`
//! - `~>N` — all CPUs with index less than or equal to `N`
//! - `M-N` — inclusive range
//! - `~M-N` — all CPUs except the inclusive range
//!
//! This module only parses the expression into a resolved set of indices; it
//! never touches `sched_setaffinity` or any other OS primitive — applying
//! the result to a thread is the caller's job (spec: thread primitive is an
//! external collaborator).

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// A resolved, sorted set of CPU indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSet {
    indices: BTreeSet<usize>,
}

impl CpuSet {
    /// Parse a comma-separated affinity expression against `num_cpus`
    /// logical CPUs (indices `0..num_cpus`).
    pub fn parse(expr: &str, num_cpus: usize) -> Result<Self> {
        if num_cpus == 0 {
            return Err(Error::InvalidDimensions("num_cpus must be > 0".into()));
        }
        let all: BTreeSet<usize> = (0..num_cpus).collect();
        let mut indices: BTreeSet<usize> = BTreeSet::new();

        for raw_term in expr.split(',') {
            let term = raw_term.trim();
            if term.is_empty() {
                continue;
            }
            let set = parse_term(term, &all)?;
            indices.extend(set);
        }

        indices.retain(|i| *i < num_cpus);
        Ok(Self { indices })
    }

    /// Resolved CPU indices, sorted ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

fn parse_term(term: &str, all: &BTreeSet<usize>) -> Result<BTreeSet<usize>> {
    if term == "a" {
        return Ok(all.clone());
    }

    let (negate, body) = match term.strip_prefix('~') {
        Some(rest) => (true, rest),
        None => (false, term),
    };

    let positive = if let Some(n) = body.strip_prefix("<=") {
        let n = parse_usize(n, term)?;
        all.iter().copied().filter(|&i| i <= n).collect()
    } else if let Some(n) = body.strip_prefix(">=") {
        let n = parse_usize(n, term)?;
        all.iter().copied().filter(|&i| i >= n).collect()
    } else if let Some(n) = body.strip_prefix('<') {
        let n = parse_usize(n, term)?;
        all.iter().copied().filter(|&i| i < n).collect()
    } else if let Some(n) = body.strip_prefix('>') {
        let n = parse_usize(n, term)?;
        all.iter().copied().filter(|&i| i > n).collect()
    } else if let Some((lo, hi)) = body.split_once('-') {
        let lo = parse_usize(lo, term)?;
        let hi = parse_usize(hi, term)?;
        if lo > hi {
            return Err(Error::InvalidDimensions(format!(
                "affinity range {lo}-{hi} is inverted in term {term:?}"
            )));
        }
        all.iter().copied().filter(|&i| i >= lo && i <= hi).collect()
    } else {
        let n = parse_usize(body, term)?;
        let mut set = BTreeSet::new();
        set.insert(n);
        set
    };

    if negate {
        Ok(all.difference(&positive).copied().collect())
    } else {
        Ok(positive)
    }
}

fn parse_usize(s: &str, term: &str) -> Result<usize> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| Error::InvalidDimensions(format!("bad CPU index in affinity term {term:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(set: &CpuSet) -> Vec<usize> {
        set.indices().collect()
    }

    #[test]
    fn all_cpus() {
        let set = CpuSet::parse("a", 4).unwrap();
        assert_eq!(idx(&set), vec![0, 1, 2, 3]);
    }

    #[test]
    fn single_cpu() {
        let set = CpuSet::parse("2", 4).unwrap();
        assert_eq!(idx(&set), vec![2]);
    }

    #[test]
    fn exclude_single() {
        let set = CpuSet::parse("~2", 4).unwrap();
        assert_eq!(idx(&set), vec![0, 1, 3]);
    }

    #[test]
    fn less_than() {
        let set = CpuSet::parse("<2", 4).unwrap();
        assert_eq!(idx(&set), vec![0, 1]);
    }

    #[test]
    fn greater_than() {
        let set = CpuSet::parse(">1", 4).unwrap();
        assert_eq!(idx(&set), vec![2, 3]);
    }

    #[test]
    fn inverted_less_than() {
        let set = CpuSet::parse("~<2", 4).unwrap();
        assert_eq!(idx(&set), vec![2, 3]);
    }

    #[test]
    fn inverted_greater_than() {
        let set = CpuSet::parse("~>1", 4).unwrap();
        assert_eq!(idx(&set), vec![0, 1]);
    }

    #[test]
    fn range() {
        let set = CpuSet::parse("1-2", 4).unwrap();
        assert_eq!(idx(&set), vec![1, 2]);
    }

    #[test]
    fn inverted_range() {
        let set = CpuSet::parse("~1-2", 4).unwrap();
        assert_eq!(idx(&set), vec![0, 3]);
    }

    #[test]
    fn combined_terms() {
        let set = CpuSet::parse("0,2-3", 6).unwrap();
        assert_eq!(idx(&set), vec![0, 2, 3]);
    }

    #[test]
    fn inverted_range_rejects_backwards_range() {
        let err = CpuSet::parse("3-1", 4).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions(_)));
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let set = CpuSet::parse("0,9", 4).unwrap();
        assert_eq!(idx(&set), vec![0]);
    }
}
