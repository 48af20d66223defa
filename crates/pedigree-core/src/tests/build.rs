use super::row_names;
use crate::*;

fn person(id: &str, name: &str, sex: Sex) -> IndividualRecord {
    IndividualRecord {
        sex,
        ..IndividualRecord::new(id, name)
    }
}

fn records(individuals: Vec<IndividualRecord>, relationships: Vec<RelationshipRecord>) -> ParseResult {
    ParseResult {
        individuals,
        relationships,
        ..ParseResult::default()
    }
}

#[test]
fn mutual_parenthood_is_a_cycle() {
    let parsed = records(
        vec![person("a", "A", Sex::Male), person("b", "B", Sex::Female)],
        vec![
            RelationshipRecord::parent_child("b", vec!["a".into()]),
            RelationshipRecord::parent_child("a", vec!["b".into()]),
        ],
    );
    assert_eq!(
        build(&parsed),
        Err(Error::CyclicPedigree {
            involved: vec!["a".into(), "b".into()]
        })
    );
}

#[test]
fn longer_cycles_are_detected_too() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Male),
            person("c", "C", Sex::Male),
            person("r", "R", Sex::Female),
        ],
        vec![
            RelationshipRecord::parent_child("b", vec!["a".into()]),
            RelationshipRecord::parent_child("c", vec!["b".into()]),
            RelationshipRecord::parent_child("a", vec!["c".into(), "r".into()]),
        ],
    );
    let Err(Error::CyclicPedigree { involved }) = build(&parsed) else {
        panic!("expected a cycle");
    };
    assert_eq!(involved, ["a", "b", "c"]);
}

#[test]
fn own_parent_is_a_cycle() {
    let parsed = records(
        vec![person("a", "A", Sex::Male)],
        vec![RelationshipRecord::parent_child("a", vec!["a".into()])],
    );
    assert!(matches!(build(&parsed), Err(Error::CyclicPedigree { .. })));
}

#[test]
fn unknown_ids_are_dangling_references() {
    let parsed = records(
        vec![person("kid", "Kid", Sex::Male)],
        vec![RelationshipRecord::parent_child("kid", vec!["ghost".into()])],
    );
    assert_eq!(
        build(&parsed),
        Err(Error::DanglingReference { id: "ghost".into() })
    );
}

#[test]
fn conflicting_sex_for_one_name_is_ambiguous() {
    let parsed = records(
        vec![person("alex", "Alex", Sex::Male), person("alex-2", "alex", Sex::Female)],
        vec![],
    );
    let err = build(&parsed).unwrap_err();
    assert!(matches!(err, Error::AmbiguousIndividual { .. }));
    assert!(err.to_string().contains("male and female"), "{err}");
}

#[test]
fn compatible_duplicates_merge_and_aliases_resolve() {
    let mut first = person("ann", "Ann", Sex::Female);
    first.conditions.push("asthma".into());
    let mut second = IndividualRecord::new("ann-2", " ann ");
    second.age = Some(40);
    second.status = Status::Carrier;
    second.deceased = true;

    let parsed = records(
        vec![first, second, person("kid", "Kid", Sex::Male)],
        vec![RelationshipRecord::parent_child("kid", vec!["ann-2".into()])],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(pedigree.len(), 2);

    let ann = pedigree.get("ann").unwrap();
    assert_eq!(ann.sex, Sex::Female);
    assert_eq!(ann.age, Some(40));
    assert_eq!(ann.status, Status::Carrier);
    assert!(ann.deceased);
    assert_eq!(ann.conditions, ["asthma"]);
    assert_eq!(pedigree.edge_for_child("kid").unwrap().parents, ["ann"]);
}

#[test]
fn two_parent_edges_create_their_partnership() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("c", "C", Sex::Unknown),
        ],
        vec![RelationshipRecord::parent_child("c", vec!["a".into(), "b".into()])],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(pedigree.partnerships.len(), 1);
    assert!(pedigree.partnerships[0].same_pair("b", "a"));
    assert_eq!(pedigree.edges[0].partnership, Some(0));
}

#[test]
fn duplicate_partnerships_collapse() {
    let parsed = records(
        vec![person("a", "A", Sex::Male), person("b", "B", Sex::Female)],
        vec![
            RelationshipRecord::partnership("a", "b"),
            RelationshipRecord::partnership("b", "a"),
        ],
    );
    assert_eq!(build(&parsed).unwrap().partnerships.len(), 1);
}

#[test]
fn self_partnership_is_invalid() {
    let parsed = records(
        vec![person("a", "A", Sex::Male)],
        vec![RelationshipRecord::partnership("a", "a")],
    );
    assert!(matches!(
        build(&parsed),
        Err(Error::InvalidRelationship { .. })
    ));
}

#[test]
fn three_parents_is_invalid() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("c", "C", Sex::Female),
            person("d", "D", Sex::Male),
        ],
        vec![RelationshipRecord::parent_child(
            "d",
            vec!["a".into(), "b".into(), "c".into()],
        )],
    );
    assert!(matches!(
        build(&parsed),
        Err(Error::InvalidRelationship { .. })
    ));
}

#[test]
fn a_child_cannot_have_two_parent_sets() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("d", "D", Sex::Male),
            person("c", "C", Sex::Male),
        ],
        vec![
            RelationshipRecord::parent_child("c", vec!["a".into(), "b".into()]),
            RelationshipRecord::parent_child("c", vec!["d".into()]),
        ],
    );
    assert_eq!(
        build(&parsed),
        Err(Error::ConflictingParents { child: "c".into() })
    );
}

#[test]
fn a_known_parent_can_be_completed() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("c", "C", Sex::Male),
        ],
        vec![
            RelationshipRecord::parent_child("c", vec!["a".into()]),
            RelationshipRecord::parent_child("c", vec!["a".into(), "b".into()]),
        ],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(pedigree.edges.len(), 1);
    assert_eq!(pedigree.edges[0].parents, ["a", "b"]);
    assert_eq!(pedigree.edges[0].partnership, Some(0));
}

#[test]
fn child_generation_follows_the_shallowest_parent() {
    // d and f marry in; each takes the row of the partner they have children with.
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("c", "C", Sex::Male),
            person("d", "D", Sex::Female),
            person("e", "E", Sex::Female),
            person("f", "F", Sex::Male),
            person("kid", "Kid", Sex::Male),
        ],
        vec![
            RelationshipRecord::parent_child("c", vec!["a".into(), "b".into()]),
            RelationshipRecord::parent_child("e", vec!["c".into(), "d".into()]),
            RelationshipRecord::parent_child("kid", vec!["e".into(), "f".into()]),
        ],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(pedigree.generation_of("c"), Some(1));
    assert_eq!(pedigree.generation_of("d"), Some(1));
    assert_eq!(pedigree.generation_of("e"), Some(2));
    assert_eq!(pedigree.generation_of("f"), Some(2));
    assert_eq!(pedigree.generation_of("kid"), Some(3));
    assert!(pedigree.verify().is_empty());
}

#[test]
fn sibling_groups_follow_their_parents_row_order() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("c", "C", Sex::Male),
            person("d", "D", Sex::Female),
            person("x", "X", Sex::Male),
            person("y", "Y", Sex::Female),
            person("z", "Z", Sex::Female),
        ],
        vec![
            RelationshipRecord::partnership("a", "b"),
            RelationshipRecord::partnership("c", "d"),
            RelationshipRecord::parent_child("x", vec!["c".into(), "d".into()]),
            RelationshipRecord::parent_child("y", vec!["a".into(), "b".into()]),
            RelationshipRecord::parent_child("z", vec!["a".into(), "b".into()]),
        ],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(row_names(&pedigree, 0), ["A", "B", "C", "D"]);
    assert_eq!(row_names(&pedigree, 1), ["Y", "Z", "X"]);
}

#[test]
fn build_does_not_touch_its_input() {
    let parsed = parse(super::NUCLEAR_COMPACT).unwrap();
    let before = parsed.clone();
    let first = build(&parsed).unwrap();
    let second = build(&parsed).unwrap();
    assert_eq!(parsed, before);
    assert_eq!(first, second);
}

#[test]
fn remarried_founder_is_placed_between_partners() {
    let parsed = records(
        vec![
            person("tom", "Tom", Sex::Male),
            person("ann", "Ann", Sex::Female),
            person("beth", "Beth", Sex::Female),
            person("carl", "Carl", Sex::Male),
        ],
        vec![
            RelationshipRecord::partnership("tom", "ann"),
            RelationshipRecord::partnership("tom", "beth"),
            RelationshipRecord::partnership("beth", "carl"),
        ],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(row_names(&pedigree, 0), ["Ann", "Tom", "Beth", "Carl"]);
}

#[test]
fn sibling_married_to_another_family_sits_at_the_shared_edge() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("c", "C", Sex::Male),
            person("d", "D", Sex::Female),
            person("y", "Y", Sex::Female),
            person("x", "X", Sex::Male),
            person("w", "W", Sex::Female),
            person("z", "Z", Sex::Male),
        ],
        vec![
            RelationshipRecord::partnership("a", "b"),
            RelationshipRecord::partnership("c", "d"),
            RelationshipRecord::parent_child("y", vec!["a".into(), "b".into()]),
            RelationshipRecord::parent_child("x", vec!["a".into(), "b".into()]),
            RelationshipRecord::parent_child("w", vec!["c".into(), "d".into()]),
            RelationshipRecord::parent_child("z", vec!["c".into(), "d".into()]),
            RelationshipRecord::partnership("y", "z"),
        ],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(row_names(&pedigree, 1), ["X", "Y", "Z", "W"]);
}

#[test]
fn married_in_spouses_of_a_remarried_child_flank_them() {
    let parsed = records(
        vec![
            person("a", "A", Sex::Male),
            person("b", "B", Sex::Female),
            person("x", "X", Sex::Male),
            person("y", "Y", Sex::Male),
            person("s1", "S1", Sex::Female),
            person("s2", "S2", Sex::Female),
            person("k", "K", Sex::Male),
        ],
        vec![
            RelationshipRecord::partnership("a", "b"),
            RelationshipRecord::parent_child("x", vec!["a".into(), "b".into()]),
            RelationshipRecord::parent_child("y", vec!["a".into(), "b".into()]),
            RelationshipRecord::partnership("y", "s1"),
            RelationshipRecord::partnership("y", "s2"),
            RelationshipRecord::parent_child("k", vec!["y".into(), "s2".into()]),
        ],
    );
    let pedigree = build(&parsed).unwrap();
    assert_eq!(row_names(&pedigree, 1), ["X", "S1", "Y", "S2"]);
}
