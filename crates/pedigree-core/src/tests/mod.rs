use crate::Pedigree;

mod build;
mod scenarios;

pub(crate) const NUCLEAR_COMPACT: &str =
    include_str!("../../../../fixtures/pedigree/nuclear_compact.txt");
pub(crate) const THREE_GENERATIONS: &str =
    include_str!("../../../../fixtures/pedigree/three_generations.txt");
pub(crate) const NARRATIVE: &str = include_str!("../../../../fixtures/pedigree/narrative.txt");
pub(crate) const MIXED_WITH_NOISE: &str =
    include_str!("../../../../fixtures/pedigree/mixed_with_noise.txt");
pub(crate) const REMARRIAGE: &str = include_str!("../../../../fixtures/pedigree/remarriage.txt");
pub(crate) const CROSS_FAMILY: &str =
    include_str!("../../../../fixtures/pedigree/cross_family.txt");
pub(crate) const CHILDREN_WITHOUT_DASH: &str =
    include_str!("../../../../fixtures/pedigree/children_without_dash.txt");

/// Display names of one generation row, in row order.
pub(crate) fn row_names(pedigree: &Pedigree, generation: usize) -> Vec<&str> {
    pedigree.generations[generation]
        .members
        .iter()
        .map(|id| pedigree.get(id).unwrap().name.as_str())
        .collect()
}
