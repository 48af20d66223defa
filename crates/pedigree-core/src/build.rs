//! Family graph builder.
//!
//! Turns a [`ParseResult`] into an immutable [`Pedigree`]: duplicate declarations are merged by
//! normalized name, relationship statements become partnerships and parent-child edges, every
//! individual gets a generation index, and each generation row is put in a stable order.

use crate::model::{
    Generation, Individual, IndividualRecord, ParentChildEdge, ParseResult, Partnership, Pedigree,
    RelationshipKind, RelationshipRecord, Sex, Status,
};
use crate::parse::normalize_name;
use crate::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

/// Builds a pedigree from parsed records. The input is not modified.
pub fn build(parsed: &ParseResult) -> Result<Pedigree> {
    let (mut individuals, aliases) = dedupe(&parsed.individuals)?;
    let (partnerships, edges) = materialize(&parsed.relationships, &aliases)?;

    assign_generations(&mut individuals, &partnerships, &edges)?;
    let generations = order_generations(&individuals, &partnerships, &edges);

    let pedigree = Pedigree {
        individuals,
        partnerships,
        edges,
        generations,
    };
    let bad = pedigree.verify();
    if !bad.is_empty() {
        tracing::warn!(
            children = ?bad,
            "children are not one row below their shallowest parent"
        );
    }
    tracing::debug!(
        individuals = pedigree.len(),
        partnerships = pedigree.partnerships.len(),
        edges = pedigree.edges.len(),
        generations = pedigree.generations.len(),
        "pedigree built"
    );
    Ok(pedigree)
}

type Aliases = FxHashMap<String, String>;

fn dedupe(records: &[IndividualRecord]) -> Result<(IndexMap<String, Individual>, Aliases)> {
    let mut individuals: IndexMap<String, Individual> = IndexMap::new();
    let mut by_name: FxHashMap<String, String> = FxHashMap::default();
    let mut aliases: Aliases = FxHashMap::default();

    for record in records {
        if aliases.contains_key(&record.id) {
            return Err(Error::AmbiguousIndividual {
                name: record.name.clone(),
                reason: format!("id `{}` is declared more than once", record.id),
            });
        }

        let mut key = normalize_name(&record.name);
        if key.is_empty() {
            key = record.id.clone();
        }

        if let Some(existing) = by_name.get(&key).and_then(|id| individuals.get_mut(id)) {
            merge_into(existing, record)?;
            tracing::debug!(id = %existing.id, duplicate = %record.id, "merged duplicate individual");
            aliases.insert(record.id.clone(), existing.id.clone());
            continue;
        }

        by_name.insert(key, record.id.clone());
        aliases.insert(record.id.clone(), record.id.clone());
        individuals.insert(
            record.id.clone(),
            Individual {
                id: record.id.clone(),
                name: record.name.clone(),
                age: record.age,
                sex: record.sex,
                status: record.status,
                deceased: record.deceased,
                conditions: record.conditions.clone(),
                generation: None,
            },
        );
    }

    Ok((individuals, aliases))
}

fn merge_into(existing: &mut Individual, record: &IndividualRecord) -> Result<()> {
    let conflict = |reason: String| Error::AmbiguousIndividual {
        name: record.name.clone(),
        reason,
    };

    if existing.sex != Sex::Unknown && record.sex != Sex::Unknown && existing.sex != record.sex {
        return Err(conflict(format!(
            "declared as both {} and {}",
            existing.sex.as_str(),
            record.sex.as_str()
        )));
    }
    if let (Some(a), Some(b)) = (existing.age, record.age) {
        if a != b {
            return Err(conflict(format!("declared with ages {a} and {b}")));
        }
    }
    if existing.status != Status::Unknown
        && record.status != Status::Unknown
        && existing.status != record.status
    {
        return Err(conflict(format!(
            "declared as both {} and {}",
            existing.status.as_str(),
            record.status.as_str()
        )));
    }

    if existing.sex == Sex::Unknown {
        existing.sex = record.sex;
    }
    if existing.status == Status::Unknown {
        existing.status = record.status;
    }
    existing.age = existing.age.or(record.age);
    existing.deceased |= record.deceased;
    for c in &record.conditions {
        if !existing.conditions.contains(c) {
            existing.conditions.push(c.clone());
        }
    }
    Ok(())
}

fn resolve(aliases: &Aliases, id: &str) -> Result<String> {
    aliases
        .get(id)
        .cloned()
        .ok_or_else(|| Error::DanglingReference { id: id.to_string() })
}

fn find_or_add_partnership(partnerships: &mut Vec<Partnership>, a: &str, b: &str) -> usize {
    if let Some(idx) = partnerships.iter().position(|p| p.same_pair(a, b)) {
        return idx;
    }
    partnerships.push(Partnership {
        members: [a.to_string(), b.to_string()],
    });
    partnerships.len() - 1
}

fn same_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
}

fn materialize(
    relationships: &[RelationshipRecord],
    aliases: &Aliases,
) -> Result<(Vec<Partnership>, Vec<ParentChildEdge>)> {
    let mut partnerships: Vec<Partnership> = Vec::new();
    let mut edges: Vec<ParentChildEdge> = Vec::new();

    for rel in relationships {
        match rel.kind {
            RelationshipKind::Partnership => {
                let [a, b] = rel.members.as_slice() else {
                    return Err(Error::InvalidRelationship {
                        message: format!(
                            "partnership needs exactly two members, got {}",
                            rel.members.len()
                        ),
                    });
                };
                let a = resolve(aliases, a)?;
                let b = resolve(aliases, b)?;
                if a == b {
                    return Err(Error::InvalidRelationship {
                        message: format!("{a} cannot partner with themselves"),
                    });
                }
                find_or_add_partnership(&mut partnerships, &a, &b);
            }
            RelationshipKind::ParentChild => {
                if rel.parents.is_empty() || rel.parents.len() > 2 {
                    return Err(Error::InvalidRelationship {
                        message: format!(
                            "parent-child statement needs one or two parents, got {}",
                            rel.parents.len()
                        ),
                    });
                }
                let mut parents: Vec<String> = Vec::with_capacity(2);
                for p in &rel.parents {
                    let p = resolve(aliases, p)?;
                    if !parents.contains(&p) {
                        parents.push(p);
                    }
                }

                for child in &rel.members {
                    let child = resolve(aliases, child)?;
                    if parents.contains(&child) {
                        return Err(Error::CyclicPedigree {
                            involved: vec![child],
                        });
                    }
                    add_edge(&mut edges, &mut partnerships, child, parents.clone())?;
                }
            }
        }
    }

    Ok((partnerships, edges))
}

fn add_edge(
    edges: &mut Vec<ParentChildEdge>,
    partnerships: &mut Vec<Partnership>,
    child: String,
    parents: Vec<String>,
) -> Result<()> {
    let partnership = match parents.as_slice() {
        [a, b] => Some(find_or_add_partnership(partnerships, a, b)),
        _ => None,
    };

    if let Some(existing) = edges.iter_mut().find(|e| e.child == child) {
        if same_set(&existing.parents, &parents)
            || parents.iter().all(|p| existing.parents.contains(p))
        {
            return Ok(());
        }
        // A single known parent can be completed by a later two-parent statement.
        if existing.parents.iter().all(|p| parents.contains(p)) {
            existing.parents = parents;
            existing.partnership = partnership;
            return Ok(());
        }
        return Err(Error::ConflictingParents { child });
    }

    edges.push(ParentChildEdge {
        child,
        parents,
        partnership,
    });
    Ok(())
}

/// Generation assignment by repeated relaxation.
///
/// Roots start at 0. Each pass lifts every child to `min(parents) + 1` and every root partnered
/// with a non-root to its partner's row. A fixed point must be reached within
/// `individual_count + 1` passes, otherwise the edges contain a cycle.
///
/// Relaxation alone misses a cycle that also hangs off a root (the `min` settles on the root
/// side), so ancestry is checked for loops first.
fn assign_generations(
    individuals: &mut IndexMap<String, Individual>,
    partnerships: &[Partnership],
    edges: &[ParentChildEdge],
) -> Result<()> {
    let n = individuals.len();
    let index = |id: &str| individuals.get_index_of(id);

    let edge_idx: Vec<(usize, Vec<usize>)> = edges
        .iter()
        .filter_map(|e| {
            let child = index(e.child.as_str())?;
            let parents = e.parents.iter().filter_map(|p| index(p.as_str())).collect();
            Some((child, parents))
        })
        .collect();
    let pair_idx: Vec<(usize, usize)> = partnerships
        .iter()
        .filter_map(|p| Some((index(p.members[0].as_str())?, index(p.members[1].as_str())?)))
        .collect();

    let involved = cycle_members(individuals, &edge_idx);
    if !involved.is_empty() {
        return Err(Error::CyclicPedigree { involved });
    }

    let mut has_parents = vec![false; n];
    for (child, _) in &edge_idx {
        has_parents[*child] = true;
    }

    let mut generation = vec![0u32; n];
    let mut converged = false;
    for pass in 0..=n {
        let mut changed = false;
        for (child, parents) in &edge_idx {
            let Some(min_parent) = parents.iter().map(|&p| generation[p]).min() else {
                continue;
            };
            let target = min_parent + 1;
            if generation[*child] < target {
                generation[*child] = target;
                changed = true;
            }
        }
        for &(a, b) in &pair_idx {
            for (root, other) in [(a, b), (b, a)] {
                if !has_parents[root] && has_parents[other] && generation[root] < generation[other]
                {
                    generation[root] = generation[other];
                    changed = true;
                }
            }
        }
        if !changed {
            tracing::debug!(passes = pass + 1, "generation relaxation converged");
            converged = true;
            break;
        }
    }

    if !converged {
        let involved = cycle_members(individuals, &edge_idx);
        return Err(Error::CyclicPedigree { involved });
    }

    for (i, individual) in individuals.values_mut().enumerate() {
        individual.generation = Some(generation[i]);
    }
    Ok(())
}

/// Individuals that are their own ancestor, in declaration order.
fn cycle_members(
    individuals: &IndexMap<String, Individual>,
    edge_idx: &[(usize, Vec<usize>)],
) -> Vec<String> {
    let n = individuals.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (child, parents) in edge_idx {
        for &p in parents {
            children[p].push(*child);
        }
    }

    let mut involved = Vec::new();
    for start in 0..n {
        let mut seen = vec![false; n];
        let mut stack = children[start].clone();
        while let Some(node) = stack.pop() {
            if node == start {
                if let Some((id, _)) = individuals.get_index(start) {
                    involved.push(id.clone());
                }
                break;
            }
            if !std::mem::replace(&mut seen[node], true) {
                stack.extend(children[node].iter().copied());
            }
        }
    }
    involved
}

/// How many of a person's free partners go to their left, given how many there are.
type LeftCount = fn(usize) -> usize;

/// One partner on each side when there are several, so a remarried person sits between them.
fn balanced(n: usize) -> usize {
    usize::from(n >= 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

struct RowBuilder<'a> {
    row: Vec<String>,
    claimed: FxHashSet<String>,
    partners: &'a FxHashMap<String, Vec<String>>,
}

impl<'a> RowBuilder<'a> {
    fn new(partners: &'a FxHashMap<String, Vec<String>>) -> Self {
        Self {
            row: Vec::new(),
            claimed: FxHashSet::default(),
            partners,
        }
    }

    fn is_claimed(&self, id: &str) -> bool {
        self.claimed.contains(id)
    }

    fn claim(&mut self, id: &str) -> bool {
        self.claimed.insert(id.to_string())
    }

    fn free_partners(&self, id: &str, may_follow: &dyn Fn(&str) -> bool) -> Vec<String> {
        self.partners
            .get(id)
            .into_iter()
            .flatten()
            .filter(|p| !self.is_claimed(p.as_str()) && may_follow(p.as_str()))
            .cloned()
            .collect()
    }

    /// Places `id` with its free same-row partners around it: the first `left_count(n)` partners
    /// to its left, the rest to its right. Each partner's own partners continue outward.
    fn place_cluster(
        &mut self,
        id: &str,
        left_count: LeftCount,
        may_follow: &dyn Fn(&str) -> bool,
    ) {
        if !self.claim(id) {
            return;
        }
        let free = self.free_partners(id, may_follow);
        for p in &free {
            self.claim(p);
        }
        let (left, right) = free.split_at(left_count(free.len()).min(free.len()));
        for p in left {
            self.place_outward(p, Side::Left, may_follow);
        }
        self.row.push(id.to_string());
        for p in right {
            self.place_outward(p, Side::Right, may_follow);
        }
    }

    /// Places an already claimed partner, its further partners on the far side.
    fn place_outward(&mut self, id: &str, side: Side, may_follow: &dyn Fn(&str) -> bool) {
        let free = self.free_partners(id, may_follow);
        for p in &free {
            self.claim(p);
        }
        if side == Side::Right {
            self.row.push(id.to_string());
        }
        for p in &free {
            self.place_outward(p, side, may_follow);
        }
        if side == Side::Left {
            self.row.push(id.to_string());
        }
    }
}

/// A sibling group in row order. `front`/`back` are the siblings married into the previous/next
/// group, kept at the group's edges so the couple stays adjacent.
struct SiblingGroup<'a> {
    siblings: Vec<&'a str>,
    front: Option<&'a str>,
    back: Option<&'a str>,
}

fn move_to_front<'a>(siblings: &mut Vec<&'a str>, id: &'a str) {
    if let Some(pos) = siblings.iter().position(|s| *s == id) {
        let s = siblings.remove(pos);
        siblings.insert(0, s);
    }
}

fn move_to_back<'a>(siblings: &mut Vec<&'a str>, id: &'a str) {
    if let Some(pos) = siblings.iter().position(|s| *s == id) {
        let s = siblings.remove(pos);
        siblings.push(s);
    }
}

/// Reorders sorted sibling groups so that a group married into the previous one follows it
/// directly, with both spouses at the facing edges.
fn chain_linked_groups<'a>(
    sorted: Vec<Vec<&'a str>>,
    partners: &FxHashMap<String, Vec<String>>,
) -> Vec<SiblingGroup<'a>> {
    let are_partners =
        |a: &str, b: &str| partners.get(a).is_some_and(|ps| ps.iter().any(|p| p == b));

    let mut remaining = sorted;
    let mut ordered: Vec<SiblingGroup<'a>> = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let link = ordered.last().and_then(|prev| {
            remaining.iter().enumerate().find_map(|(idx, group)| {
                prev.siblings
                    .iter()
                    .filter(|a| prev.front != Some(**a))
                    .find_map(|&a| {
                        group
                            .iter()
                            .find(|&&b| are_partners(a, b))
                            .map(|&b| (idx, a, b))
                    })
            })
        });

        let (idx, pair) = match link {
            Some((idx, a, b)) => (idx, Some((a, b))),
            None => (0, None),
        };
        let mut group = SiblingGroup {
            siblings: remaining.remove(idx),
            front: None,
            back: None,
        };
        if let Some((a, b)) = pair {
            if let Some(prev) = ordered.last_mut() {
                move_to_back(&mut prev.siblings, a);
                prev.back = Some(a);
            }
            move_to_front(&mut group.siblings, b);
            group.front = Some(b);
        }
        ordered.push(group);
    }
    ordered
}

/// Orders each generation row: partners adjacent, sibling groups contiguous and sorted by their
/// parents' position in the row above, siblings in first-reference order.
fn order_generations(
    individuals: &IndexMap<String, Individual>,
    partnerships: &[Partnership],
    edges: &[ParentChildEdge],
) -> Vec<Generation> {
    let Some(max_gen) = individuals.values().filter_map(|i| i.generation).max() else {
        return Vec::new();
    };
    let gen_of = |id: &str| individuals.get(id).and_then(|i| i.generation);
    let rank = |id: &str| individuals.get_index_of(id).unwrap_or(usize::MAX);

    let mut partners: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for p in partnerships {
        let [a, b] = &p.members;
        if gen_of(a.as_str()) == gen_of(b.as_str()) {
            partners.entry(a.clone()).or_default().push(b.clone());
            partners.entry(b.clone()).or_default().push(a.clone());
        }
    }
    let parents_of: FxHashMap<&str, &[String]> = edges
        .iter()
        .map(|e| (e.child.as_str(), e.parents.as_slice()))
        .collect();
    let married_in = |id: &str| !parents_of.contains_key(id);

    let mut rows: Vec<Generation> = Vec::with_capacity(max_gen as usize + 1);
    let mut prev_pos: FxHashMap<String, usize> = FxHashMap::default();

    for g in 0..=max_gen {
        let members: Vec<&str> = individuals
            .values()
            .filter(|i| i.generation == Some(g))
            .map(|i| i.id.as_str())
            .collect();
        let mut builder = RowBuilder::new(&partners);

        if g > 0 {
            let mut groups: IndexMap<Vec<&str>, Vec<&str>> = IndexMap::new();
            for &m in &members {
                if let Some(parents) = parents_of.get(m) {
                    let mut key: Vec<&str> = parents.iter().map(String::as_str).collect();
                    key.sort_unstable();
                    groups.entry(key).or_default().push(m);
                }
            }
            let mut groups: Vec<(Vec<&str>, Vec<&str>)> = groups.into_iter().collect();
            groups.sort_by_key(|(parents, siblings)| {
                let mut pos: Vec<usize> = parents
                    .iter()
                    .filter_map(|p| prev_pos.get(*p).copied())
                    .collect();
                pos.sort_unstable();
                (pos, siblings.first().map(|s| rank(*s)).unwrap_or(usize::MAX))
            });
            let sorted: Vec<Vec<&str>> = groups.into_iter().map(|(_, siblings)| siblings).collect();

            for group in chain_linked_groups(sorted, &partners) {
                for (i, &sibling) in group.siblings.iter().enumerate() {
                    let left_count: LeftCount = if group.back == Some(sibling) {
                        |n| n
                    } else if group.front == Some(sibling) {
                        |_| 0
                    } else if i == 0 {
                        |n| n.min(1)
                    } else {
                        balanced
                    };
                    builder.place_cluster(sibling, left_count, &married_in);
                }
            }
        }

        for &m in &members {
            builder.place_cluster(m, balanced, &married_in);
        }

        prev_pos = builder
            .row
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        rows.push(Generation {
            index: g,
            members: builder.row,
        });
    }

    rows
}
