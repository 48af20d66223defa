use super::*;
use crate::*;

#[test]
fn nuclear_family_compact_form() {
    let pedigree = Engine::new().parse_pedigree(NUCLEAR_COMPACT, None).unwrap();

    assert_eq!(pedigree.len(), 5);
    assert_eq!(pedigree.partnerships.len(), 1);
    assert!(pedigree.partnerships[0].same_pair("david", "emma"));
    assert_eq!(pedigree.edges.len(), 3);
    assert!(pedigree.edges.iter().all(|e| e.partnership == Some(0)));

    for (name, generation) in [("David", 0), ("Emma", 0), ("Noah", 1), ("Ava", 1), ("Liam", 1)] {
        assert_eq!(
            pedigree.find_by_name(name).unwrap().generation,
            Some(generation),
            "{name}"
        );
    }

    let noah = pedigree.find_by_name("Noah").unwrap();
    assert_eq!(noah.age, Some(15));
    assert_eq!(noah.sex, Sex::Male);
    assert_eq!(noah.status, Status::Affected);
    assert_eq!(pedigree.find_by_name("Ava").unwrap().status, Status::Carrier);

    assert_eq!(row_names(&pedigree, 0), ["David", "Emma"]);
    assert_eq!(row_names(&pedigree, 1), ["Noah", "Ava", "Liam"]);
}

#[test]
fn empty_text_is_rejected() {
    assert_eq!(parse(""), Err(Error::EmptyInput));
    assert_eq!(parse("  \n\t "), Err(Error::EmptyInput));
    assert_eq!(
        Engine::new().parse_pedigree("", None),
        Err(Error::EmptyInput)
    );
}

#[test]
fn three_generations_with_married_in_spouse() {
    let pedigree = Engine::new()
        .parse_pedigree(THREE_GENERATIONS, None)
        .unwrap();

    assert_eq!(pedigree.len(), 8);
    assert_eq!(pedigree.generations.len(), 3);

    let mut gen0 = row_names(&pedigree, 0);
    gen0.sort_unstable();
    assert_eq!(gen0, ["Mary", "Robert"]);
    assert_eq!(row_names(&pedigree, 1), ["Sarah", "John", "David"]);
    assert_eq!(row_names(&pedigree, 2), ["Mike", "Lisa", "Tom"]);

    let john = pedigree.find_by_name("John").unwrap();
    assert_eq!(john.generation, Some(1));
    assert_eq!(pedigree.partners_of("john").collect::<Vec<_>>(), ["sarah"]);
    assert!(pedigree.edge_for_child("john").is_some());
    assert_eq!(pedigree.partnerships.len(), 2);
}

#[test]
fn narrative_form_with_pronouns_and_conditions() {
    let pedigree = Engine::new().parse_pedigree(NARRATIVE, None).unwrap();
    assert_eq!(pedigree.len(), 4);

    let john = pedigree.find_by_name("John").unwrap();
    assert_eq!(john.sex, Sex::Male);
    assert_eq!(john.age, Some(45));
    assert_eq!(john.status, Status::Affected);
    assert_eq!(john.conditions, ["diabetes"]);

    let sarah = pedigree.find_by_name("Sarah").unwrap();
    assert_eq!(sarah.sex, Sex::Female);
    assert_eq!(sarah.age, Some(42));
    assert_eq!(sarah.status, Status::Carrier);

    let emily = pedigree.find_by_name("Emily").unwrap();
    assert_eq!(emily.status, Status::Affected);
    assert_eq!(emily.generation, Some(1));

    let mark = pedigree.find_by_name("Mark").unwrap();
    assert_eq!(mark.sex, Sex::Male);
    assert_eq!(mark.status, Status::Unknown);

    assert_eq!(pedigree.edges.len(), 2);
    assert!(pedigree.edges.iter().all(|e| e.parents.len() == 2));
}

#[test]
fn children_list_without_a_dash_links_every_child() {
    let pedigree = Engine::new()
        .parse_pedigree(CHILDREN_WITHOUT_DASH, None)
        .unwrap();
    let reference = Engine::new().parse_pedigree(NUCLEAR_COMPACT, None).unwrap();
    assert_eq!(pedigree, reference);

    assert_eq!(pedigree.partnerships.len(), 1);
    assert!(pedigree.partnerships[0].same_pair("david", "emma"));
    assert_eq!(pedigree.edges.len(), 3);
    assert_eq!(row_names(&pedigree, 1), ["Noah", "Ava", "Liam"]);
}

#[test]
fn remarried_person_sits_between_both_partners() {
    let pedigree = Engine::new().parse_pedigree(REMARRIAGE, None).unwrap();
    assert_eq!(pedigree.partnerships.len(), 2);
    assert_eq!(row_names(&pedigree, 0), ["Ann", "Tom", "Beth"]);

    let kim = pedigree.edge_for_child("kim").unwrap();
    assert_eq!(kim.parents, ["tom", "beth"]);
    let p = kim.partnership.unwrap();
    assert!(pedigree.partnerships[p].same_pair("tom", "beth"));
    assert_eq!(pedigree.generation_of("kim"), Some(1));
}

#[test]
fn spouses_from_different_families_end_up_adjacent() {
    let pedigree = Engine::new().parse_pedigree(CROSS_FAMILY, None).unwrap();
    assert_eq!(pedigree.len(), 9);
    assert_eq!(row_names(&pedigree, 0), ["Al", "Bea", "Ed", "Flo"]);
    assert_eq!(row_names(&pedigree, 1), ["Cy", "Di", "Gus", "Hal"]);
    assert_eq!(row_names(&pedigree, 2), ["Ike"]);
    assert_eq!(pedigree.edge_for_child("ike").unwrap().parents, ["di", "gus"]);
}

#[test]
fn unrecognized_sentences_become_unresolved_spans() {
    let parsed = parse(MIXED_WITH_NOISE).unwrap();
    assert_eq!(parsed.unresolved.len(), 1);
    let span = &parsed.unresolved[0];
    assert_eq!(span.text, "The family lives near the coast");
    assert_eq!(&MIXED_WITH_NOISE[span.start..span.end], span.text);

    let pedigree = build(&parsed).unwrap();
    let walter = pedigree.find_by_name("Walter").unwrap();
    assert!(walter.deceased);
    assert_eq!(walter.status, Status::Affected);
    assert_eq!(pedigree.find_by_name("Victor").unwrap().generation, Some(1));
    assert_eq!(pedigree.find_by_name("Chloe").unwrap().generation, Some(2));
}

#[test]
fn every_fixture_satisfies_the_generation_invariant() {
    for text in [
        NUCLEAR_COMPACT,
        THREE_GENERATIONS,
        NARRATIVE,
        MIXED_WITH_NOISE,
        REMARRIAGE,
        CROSS_FAMILY,
        CHILDREN_WITHOUT_DASH,
    ] {
        let pedigree = Engine::new().parse_pedigree(text, None).unwrap();
        assert!(pedigree.verify().is_empty(), "{text}");
        for edge in &pedigree.edges {
            let child = pedigree.generation_of(&edge.child).unwrap();
            let min_parent = edge
                .parents
                .iter()
                .map(|p| pedigree.generation_of(p).unwrap())
                .min()
                .unwrap();
            assert_eq!(child, min_parent + 1);
        }
    }
}

#[test]
fn parse_result_serializes_to_the_interchange_schema() {
    let parsed = parse(NUCLEAR_COMPACT).unwrap();
    let value = serde_json::to_value(&parsed).unwrap();
    assert_eq!(value["source"], "text");
    assert_eq!(value["individuals"][0]["sex"], "male");
    assert_eq!(value["relationships"][0]["type"], "partnership");
    assert_eq!(value["relationships"][1]["type"], "parent-child");
    assert_eq!(value["relationships"][1]["parents"][1], "emma");

    let back: ParseResult = serde_json::from_value(value).unwrap();
    assert_eq!(back, parsed);
}
