//! Generalises a finite sample of strings into a small, ordered list of
//! anchored regular expressions that, between them, match every sample.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RunKind {
    Digit,
    Upper,
    Lower,
    Literal(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RunTag {
    Digit,
    Upper,
    Lower,
    Literal,
}

impl RunKind {
    fn tag(self) -> RunTag {
        match self {
            RunKind::Digit => RunTag::Digit,
            RunKind::Upper => RunTag::Upper,
            RunKind::Lower => RunTag::Lower,
            RunKind::Literal(_) => RunTag::Literal,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    kind: RunKind,
    len: usize,
}

fn classify(c: char) -> RunKind {
    if c.is_ascii_digit() {
        RunKind::Digit
    } else if c.is_ascii_uppercase() {
        RunKind::Upper
    } else if c.is_ascii_lowercase() {
        RunKind::Lower
    } else {
        RunKind::Literal(c)
    }
}

fn tokenize(s: &str) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for c in s.chars() {
        let kind = classify(c);
        match runs.last_mut() {
            Some(run) if run.kind == kind => run.len += 1,
            _ => runs.push(Run { kind, len: 1 }),
        }
    }
    runs
}

fn shape_key(runs: &[Run]) -> Vec<RunKind> {
    runs.iter().map(|r| r.kind).collect()
}

fn structure_key(runs: &[Run]) -> Vec<RunTag> {
    runs.iter().map(|r| r.kind.tag()).collect()
}

/// One length-ranged atom at a fixed position in a pattern.
#[derive(Debug, Clone)]
enum Atom {
    Digit { lo: usize, hi: usize },
    Upper { lo: usize, hi: usize },
    Lower { lo: usize, hi: usize },
    Literal { ch: char, lo: usize, hi: usize },
    LiteralClass { chars: Vec<char>, lo: usize, hi: usize },
}

impl Atom {
    fn render(&self) -> String {
        match self {
            Atom::Digit { lo, hi } => render_class(r"\d", *lo, *hi),
            Atom::Upper { lo, hi } => render_class("[A-Z]", *lo, *hi),
            Atom::Lower { lo, hi } => render_class("[a-z]", *lo, *hi),
            Atom::Literal { ch, lo, hi } => {
                let escaped = regex::escape(&ch.to_string());
                if *lo == 1 && *hi == 1 {
                    escaped
                } else {
                    render_class(&format!("(?:{escaped})"), *lo, *hi)
                }
            }
            Atom::LiteralClass { chars, lo, hi } => {
                let mut body: Vec<char> = chars.clone();
                body.sort();
                body.dedup();
                let class = format!("[{}]", body.iter().map(|c| regex::escape(&c.to_string())).collect::<String>());
                render_class(&class, *lo, *hi)
            }
        }
    }

    /// A rough specificity score: fixed single-char literals are most
    /// specific, character classes least.
    fn specificity(&self) -> i32 {
        match self {
            Atom::Literal { lo, hi, .. } if lo == hi => 3,
            Atom::Literal { .. } => 2,
            Atom::LiteralClass { .. } => 1,
            Atom::Digit { .. } | Atom::Upper { .. } | Atom::Lower { .. } => 0,
        }
    }
}

fn render_class(class: &str, lo: usize, hi: usize) -> String {
    if lo == 1 && hi == 1 {
        class.to_string()
    } else if lo == hi {
        format!("{class}{{{lo}}}")
    } else {
        format!("{class}{{{lo},{hi}}}")
    }
}

struct Cluster {
    shape: Vec<RunKind>,
    members: Vec<Vec<Run>>,
}

impl Cluster {
    fn atoms(&self) -> Vec<Atom> {
        let n = self.shape.len();
        (0..n)
            .map(|i| {
                let lo = self.members.iter().map(|m| m[i].len).min().unwrap();
                let hi = self.members.iter().map(|m| m[i].len).max().unwrap();
                match self.shape[i] {
                    RunKind::Digit => Atom::Digit { lo, hi },
                    RunKind::Upper => Atom::Upper { lo, hi },
                    RunKind::Lower => Atom::Lower { lo, hi },
                    RunKind::Literal(ch) => Atom::Literal { ch, lo, hi },
                }
            })
            .collect()
    }

    fn pattern(&self) -> String {
        let body: String = self.atoms().iter().map(|a| a.render()).collect();
        format!("^{body}$")
    }

    fn specificity(&self) -> i32 {
        self.atoms().iter().map(|a| a.specificity()).sum()
    }
}

/// Generalises `samples` into an ordered list of anchored regular
/// expressions covering every sample. `alternation_cap` bounds how many
/// distinct literal values may be folded into one character-class alternation
/// before two clusters are left unmerged instead.
pub fn induce(samples: &[String], alternation_cap: usize) -> Vec<String> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut by_shape: HashMap<Vec<RunKind>, Cluster> = HashMap::new();
    let mut shape_order: Vec<Vec<RunKind>> = Vec::new();
    for s in samples {
        let runs = tokenize(s);
        let key = shape_key(&runs);
        if !by_shape.contains_key(&key) {
            shape_order.push(key.clone());
            by_shape.insert(key.clone(), Cluster { shape: key.clone(), members: Vec::new() });
        }
        by_shape.get_mut(&key).unwrap().members.push(runs);
    }
    let clusters: Vec<Cluster> = shape_order.into_iter().map(|k| by_shape.remove(&k).unwrap()).collect();

    let mut by_structure: HashMap<Vec<RunTag>, Vec<usize>> = HashMap::new();
    let mut structure_order: Vec<Vec<RunTag>> = Vec::new();
    for (idx, cluster) in clusters.iter().enumerate() {
        let runs: Vec<Run> = cluster.members[0].clone();
        let key = structure_key(&runs);
        if !by_structure.contains_key(&key) {
            structure_order.push(key.clone());
        }
        by_structure.entry(key).or_default().push(idx);
    }

    let mut patterns_with_score: Vec<(i32, String)> = Vec::new();
    let mut merged_indices: Vec<bool> = vec![false; clusters.len()];

    for key in &structure_order {
        let indices = &by_structure[key];
        if indices.len() == 1 {
            continue;
        }
        if let Some(merged) = try_merge(&clusters, indices, alternation_cap) {
            patterns_with_score.push(merged);
            for &i in indices {
                merged_indices[i] = true;
            }
        }
    }

    for (i, cluster) in clusters.iter().enumerate() {
        if !merged_indices[i] {
            patterns_with_score.push((cluster.specificity(), cluster.pattern()));
        }
    }

    patterns_with_score.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.len().cmp(&a.1.len())));
    patterns_with_score.into_iter().map(|(_, p)| p).collect()
}

/// Attempts to fold every cluster named by `indices` (all sharing the same
/// run-tag structure) into a single pattern. Positions where the literal
/// character varies become a bounded character-class alternation; returns
/// `None` if any such position would need more distinct characters than
/// `alternation_cap`.
fn try_merge(clusters: &[Cluster], indices: &[usize], alternation_cap: usize) -> Option<(i32, String)> {
    let n = clusters[indices[0]].shape.len();
    let mut atoms = Vec::with_capacity(n);

    for pos in 0..n {
        let kinds: Vec<RunKind> = indices.iter().map(|&i| clusters[i].shape[pos]).collect();
        let lo = indices
            .iter()
            .flat_map(|&i| clusters[i].members.iter().map(move |m| m[pos].len))
            .min()
            .unwrap();
        let hi = indices
            .iter()
            .flat_map(|&i| clusters[i].members.iter().map(move |m| m[pos].len))
            .max()
            .unwrap();

        let atom = match kinds[0] {
            RunKind::Digit => Atom::Digit { lo, hi },
            RunKind::Upper => Atom::Upper { lo, hi },
            RunKind::Lower => Atom::Lower { lo, hi },
            RunKind::Literal(_) => {
                let mut chars: Vec<char> = kinds
                    .iter()
                    .filter_map(|k| match k {
                        RunKind::Literal(c) => Some(*c),
                        _ => None,
                    })
                    .collect();
                chars.sort();
                chars.dedup();
                if chars.len() == 1 {
                    Atom::Literal { ch: chars[0], lo, hi }
                } else if chars.len() <= alternation_cap {
                    Atom::LiteralClass { chars, lo, hi }
                } else {
                    return None;
                }
            }
        };
        atoms.push(atom);
    }

    let score = atoms.iter().map(|a| a.specificity()).sum();
    let body: String = atoms.iter().map(|a| a.render()).collect();
    Some((score, format!("^{body}$")))
}
