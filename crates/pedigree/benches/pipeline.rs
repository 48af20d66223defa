use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use pedigree::Engine;
use pedigree::render::{LayoutOptions, PedigreeGenerator};

fn fixtures() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "nuclear",
            "David (40 M, carrier) and Emma (38 F, carrier) have three children — Noah (15 M, affected), Ava (12 F, carrier), and Liam (9 M, unaffected).",
        ),
        (
            "three_generations",
            "Robert (65 M, affected) and Mary (62 F, carrier) have two sons — John (40 M, carrier) and David (38 M, unaffected). John married Sarah (37 F, affected) and they have children — Mike (15 M, affected), Lisa (13 F, carrier), and Tom (11 M, unaffected).",
        ),
        (
            "narrative",
            "John is a 45-year-old male with diabetes. He is married to Sarah, a 42-year-old female who is a carrier. They have two children: Emily, a 15-year-old female with diabetes, and Mark, a 12-year-old male.",
        ),
    ]
}

fn bench_parse_only(c: &mut Criterion) {
    let engine = Engine::new();

    let mut group = c.benchmark_group("parse_only");
    for (name, input) in fixtures() {
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = engine.parse(input).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_build_only(c: &mut Criterion) {
    let engine = Engine::new();

    let mut group = c.benchmark_group("build_only");
    for (name, input) in fixtures() {
        let parsed = engine.parse(input).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = pedigree::build(&parsed).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_layout_only(c: &mut Criterion) {
    let engine = Engine::new();
    let options = LayoutOptions::default();

    let mut group = c.benchmark_group("layout_only");
    for (name, input) in fixtures() {
        let pedigree = engine.parse_pedigree(input, None).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = pedigree::render::layout_with_options(&pedigree, 800.0, 600.0, &options)
                    .unwrap();
            });
        });
    }
    group.finish();
}

fn bench_render_svg(c: &mut Criterion) {
    let generator = PedigreeGenerator::new();

    let mut group = c.benchmark_group("render_svg");
    for (name, input) in fixtures() {
        group.bench_function(name, |b| {
            b.iter_batched(
                || input,
                |text| {
                    let pedigree = generator.parse_family_description(text, false).unwrap();
                    let _svg = generator.generate_svg(&pedigree).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_only,
    bench_build_only,
    bench_layout_only,
    bench_render_svg
);
criterion_main!(benches);
