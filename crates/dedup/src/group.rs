//! Union of duplicate-marked pairs into groups.

use std::collections::BTreeMap;

use crate::model::{DuplicateGroup, DuplicateRecord, GroupMember, JudgementMethod, PairDecision};

/// Disjoint-set forest with path halving and union by size.
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}

fn method_rank(method: JudgementMethod) -> u8 {
    match method {
        JudgementMethod::AlgorithmicHigh => 2,
        JudgementMethod::AiJudgment => 1,
        JudgementMethod::AlgorithmicLow => 0,
    }
}

/// Build groups from the duplicate decisions. Groups are ordered by their
/// earliest member; members keep input order. Singletons are not groups.
pub fn build_groups(records: &[DuplicateRecord], decisions: &[PairDecision]) -> Vec<DuplicateGroup> {
    let mut uf = UnionFind::new(records.len());
    // Best (method, confidence) per record across its duplicate links.
    let mut best: Vec<Option<(JudgementMethod, f64)>> = vec![None; records.len()];

    for decision in decisions.iter().filter(|d| d.is_duplicate) {
        let (a, b) = (decision.pair.index_a, decision.pair.index_b);
        uf.union(a, b);
        for idx in [a, b] {
            let candidate = (decision.method, decision.confidence);
            let replace = match best[idx] {
                None => true,
                Some((m, c)) => {
                    (method_rank(candidate.0), candidate.1) > (method_rank(m), c)
                }
            };
            if replace {
                best[idx] = Some(candidate);
            }
        }
    }

    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for idx in 0..records.len() {
        if best[idx].is_some() {
            by_root.entry(uf.find(idx)).or_default().push(idx);
        }
    }

    let mut groups: Vec<Vec<usize>> = by_root.into_values().filter(|m| m.len() > 1).collect();
    groups.sort_by_key(|members| members[0]);

    groups
        .into_iter()
        .enumerate()
        .map(|(group_id, members)| DuplicateGroup {
            group_id,
            members: members
                .into_iter()
                .filter_map(|idx| {
                    let (method, confidence) = best[idx]?;
                    Some(GroupMember {
                        id: records[idx].id.clone(),
                        name: records[idx].name.clone(),
                        method,
                        confidence,
                    })
                })
                .collect(),
        })
        .collect()
}
