//! Generation-row layout.
//!
//! Rows are laid out top to bottom. Each row is cut into blocks (a sibling group together with
//! the spouses married into it, or a run of partners in the founder row); a block is centered
//! under its parents and then swept left to right so that blocks never overlap. The finished
//! drawing is scaled down uniformly when it does not fit the requested canvas.

use crate::model::{
    Bounds, DescentLayout, LayoutLabel, LayoutPoint, LayoutResult, LayoutSymbol, MarriageLayout,
};
use crate::text::TextStyle;
use crate::{Error, LayoutOptions, Result};
use indexmap::IndexMap;
use pedigree_core::{Individual, Pedigree};
use rustc_hash::FxHashMap;

/// Lays out `pedigree` on a `canvas_width` x `canvas_height` canvas with default options.
pub fn layout(pedigree: &Pedigree, canvas_width: f64, canvas_height: f64) -> Result<LayoutResult> {
    layout_with_options(
        pedigree,
        canvas_width,
        canvas_height,
        &LayoutOptions::default(),
    )
}

pub fn layout_with_options(
    pedigree: &Pedigree,
    canvas_width: f64,
    canvas_height: f64,
    options: &LayoutOptions,
) -> Result<LayoutResult> {
    if pedigree.is_empty() || pedigree.generations.is_empty() {
        return Err(Error::EmptyPedigree);
    }
    if !(canvas_width.is_finite()
        && canvas_height.is_finite()
        && canvas_width > 0.0
        && canvas_height > 0.0)
    {
        return Err(Error::InvalidCanvas {
            width: canvas_width,
            height: canvas_height,
        });
    }

    let footprints = measure_footprints(pedigree, options);
    let natural_x = place_rows(pedigree, &footprints, options);

    let s = options.symbol_size;
    let top = options.top_margin.max(s / 2.0);
    let row_y = |g: u32| top + f64::from(g) * options.generation_spacing;

    let mut min_left = f64::INFINITY;
    let mut max_right = f64::NEG_INFINITY;
    for (id, x) in &natural_x {
        let half = footprints.get(id.as_str()).copied().unwrap_or(s) / 2.0;
        min_left = min_left.min(x - half);
        max_right = max_right.max(x + half);
    }
    let last_row = pedigree.generations.len().saturating_sub(1) as u32;
    let natural_w = (max_right - min_left) + 2.0 * options.side_margin;
    let natural_h = row_y(last_row) + s / 2.0 + label_depth(options) + options.bottom_margin;

    let scale = if natural_w > canvas_width || natural_h > canvas_height {
        (canvas_width / natural_w).min(canvas_height / natural_h)
    } else {
        1.0
    };
    let offset_x = (canvas_width - natural_w * scale) / 2.0;
    let tx = |x: f64| offset_x + (x - min_left + options.side_margin) * scale;
    tracing::debug!(
        natural_w,
        natural_h,
        scale,
        "pedigree layout extents"
    );

    let mut symbols = Vec::with_capacity(pedigree.len());
    for generation in &pedigree.generations {
        for id in &generation.members {
            let (Some(individual), Some(&x)) = (pedigree.get(id), natural_x.get(id)) else {
                continue;
            };
            let footprint = footprints.get(id.as_str()).copied().unwrap_or(s);
            symbols.push(place_symbol(
                individual,
                generation.index,
                tx(x),
                row_y(generation.index) * scale,
                footprint,
                scale,
                options,
            ));
        }
    }

    let index: FxHashMap<&str, usize> = symbols
        .iter()
        .enumerate()
        .map(|(i, sym)| (sym.id.as_str(), i))
        .collect();
    let marriages = route_marriages(pedigree, &symbols, &index);
    let descents = route_descents(
        pedigree,
        &symbols,
        &index,
        &marriages,
        options.generation_spacing * scale,
    );

    let bounds = Bounds::from_points(symbols.iter().flat_map(|sym| {
        [(sym.left(), sym.top()), (sym.right(), sym.bottom())]
    }));

    Ok(LayoutResult {
        width: canvas_width,
        height: canvas_height,
        scale,
        symbols,
        marriages,
        descents,
        bounds,
    })
}

/// Vertical room below a symbol for the name and age lines.
fn label_depth(options: &LayoutOptions) -> f64 {
    options.label_gap + options.label_font_size + options.age_font_size * 1.5
}

fn age_text(individual: &Individual) -> Option<String> {
    individual.age.map(|age| format!("{age}y"))
}

fn measure_footprints<'a>(
    pedigree: &'a Pedigree,
    options: &LayoutOptions,
) -> FxHashMap<&'a str, f64> {
    let name_style = TextStyle {
        font_family: Some(options.font_family.clone()),
        font_size: options.label_font_size,
    };
    let age_style = TextStyle {
        font_family: Some(options.font_family.clone()),
        font_size: options.age_font_size,
    };

    pedigree
        .individuals
        .values()
        .map(|individual| {
            let name_w = options
                .text_measurer
                .measure(&individual.name, &name_style)
                .width;
            let age_w = age_text(individual)
                .map(|age| options.text_measurer.measure(&age, &age_style).width)
                .unwrap_or(0.0);
            (
                individual.id.as_str(),
                options.symbol_size.max(name_w).max(age_w),
            )
        })
        .collect()
}

fn sorted_parents(pedigree: &Pedigree, id: &str) -> Option<Vec<String>> {
    let edge = pedigree.edge_for_child(id)?;
    let mut parents = edge.parents.clone();
    parents.sort_unstable();
    Some(parents)
}

fn are_partners(pedigree: &Pedigree, a: &str, b: &str) -> bool {
    pedigree.partnerships.iter().any(|p| p.same_pair(a, b))
}

struct Block<'a> {
    members: Vec<&'a str>,
    /// Center of each member relative to the block's left edge.
    offsets: Vec<f64>,
    width: f64,
    /// Parents' center in already placed rows.
    anchor: Option<f64>,
    /// Center of the sibling run relative to the block's left edge.
    sibling_center: f64,
}

/// Natural (unscaled, unshifted) x centers for every individual in a generation row.
fn place_rows(
    pedigree: &Pedigree,
    footprints: &FxHashMap<&str, f64>,
    options: &LayoutOptions,
) -> IndexMap<String, f64> {
    let mut xs: IndexMap<String, f64> = IndexMap::new();
    let footprint = |id: &str| footprints.get(id).copied().unwrap_or(options.symbol_size);

    for generation in &pedigree.generations {
        let row: Vec<&str> = generation.members.iter().map(String::as_str).collect();
        let keys: Vec<Option<Vec<String>>> =
            row.iter().map(|id| sorted_parents(pedigree, id)).collect();

        // A member without parents belongs to the family of an adjacent partner.
        let families: Vec<Option<&Vec<String>>> = (0..row.len())
            .map(|i| {
                keys[i].as_ref().or_else(|| {
                    let left = i.checked_sub(1);
                    let right = (i + 1 < row.len()).then_some(i + 1);
                    [left, right].into_iter().flatten().find_map(|j| {
                        if are_partners(pedigree, row[i], row[j]) {
                            keys[j].as_ref()
                        } else {
                            None
                        }
                    })
                })
            })
            .collect();

        let mut blocks: Vec<Block<'_>> = Vec::new();
        for (i, &id) in row.iter().enumerate() {
            let joins_previous = i > 0 && {
                let same_family = families[i].is_some() && families[i] == families[i - 1];
                let partner_link = are_partners(pedigree, row[i - 1], id)
                    && (families[i].is_none() || families[i - 1].is_none());
                same_family || partner_link
            };
            let fp = footprint(id);
            match blocks.last_mut() {
                Some(block) if joins_previous => {
                    let prev = block.members[block.members.len() - 1];
                    let gap = if are_partners(pedigree, prev, id) {
                        options.spouse_gap
                    } else {
                        options.sibling_gap
                    };
                    let center = block.width + gap + fp / 2.0;
                    block.members.push(id);
                    block.offsets.push(center);
                    block.width = center + fp / 2.0;
                }
                _ => blocks.push(Block {
                    members: vec![id],
                    offsets: vec![fp / 2.0],
                    width: fp,
                    anchor: None,
                    sibling_center: fp / 2.0,
                }),
            }
        }

        for block in &mut blocks {
            let Some(first) = block.members.first() else {
                continue;
            };
            let Some(i) = row.iter().position(|id| id == first) else {
                continue;
            };
            let Some(family) = families[i] else {
                continue;
            };
            let parent_xs: Vec<f64> = family.iter().filter_map(|p| xs.get(p).copied()).collect();
            if parent_xs.is_empty() {
                continue;
            }
            block.anchor = Some(parent_xs.iter().sum::<f64>() / parent_xs.len() as f64);

            let sibling_offsets: Vec<f64> = block
                .members
                .iter()
                .zip(&block.offsets)
                .filter(|(id, _)| sorted_parents(pedigree, id).as_ref() == Some(family))
                .map(|(_, off)| *off)
                .collect();
            if let (Some(lo), Some(hi)) = (sibling_offsets.first(), sibling_offsets.last()) {
                block.sibling_center = (lo + hi) / 2.0;
            }
        }

        // Sweep: centered where possible, pushed right on overlap.
        let mut lefts: Vec<f64> = Vec::with_capacity(blocks.len());
        let mut displacement = Vec::new();
        let mut cursor: Option<f64> = None;
        for block in &blocks {
            let desired = match (block.anchor, cursor) {
                (Some(anchor), _) => anchor - block.sibling_center,
                (None, Some(right)) => right + options.sibling_gap,
                (None, None) => 0.0,
            };
            let left = match cursor {
                Some(right) => desired.max(right + options.sibling_gap),
                None => desired,
            };
            if block.anchor.is_some() {
                displacement.push(left - desired);
            }
            lefts.push(left);
            cursor = Some(left + block.width);
        }

        // Split the push between the blocks so the row stays centered under its parents.
        let shift = if displacement.is_empty() {
            0.0
        } else {
            displacement.iter().sum::<f64>() / displacement.len() as f64
        };
        for (block, left) in blocks.iter().zip(&lefts) {
            for (id, off) in block.members.iter().zip(&block.offsets) {
                xs.insert((*id).to_string(), left - shift + off);
            }
        }
    }

    xs
}

fn place_symbol(
    individual: &Individual,
    generation: u32,
    x: f64,
    y: f64,
    footprint: f64,
    scale: f64,
    options: &LayoutOptions,
) -> LayoutSymbol {
    let size = options.symbol_size * scale;
    let name_y = y + size / 2.0 + (options.label_gap + options.label_font_size) * scale;
    let age_label = age_text(individual).map(|text| LayoutLabel {
        x,
        y: name_y + options.age_font_size * 1.2 * scale,
        text,
        font_size: options.age_font_size * scale,
    });

    LayoutSymbol {
        id: individual.id.clone(),
        generation,
        x,
        y,
        size,
        footprint: footprint * scale,
        name_label: LayoutLabel {
            x,
            y: name_y,
            text: individual.name.clone(),
            font_size: options.label_font_size * scale,
        },
        age_label,
    }
}

fn route_marriages(
    pedigree: &Pedigree,
    symbols: &[LayoutSymbol],
    index: &FxHashMap<&str, usize>,
) -> Vec<MarriageLayout> {
    let mut out = Vec::with_capacity(pedigree.partnerships.len());
    for (i, partnership) in pedigree.partnerships.iter().enumerate() {
        let [a, b] = &partnership.members;
        let (Some(&ia), Some(&ib)) = (index.get(a.as_str()), index.get(b.as_str())) else {
            continue;
        };
        let (left, right) = if symbols[ia].x <= symbols[ib].x {
            (&symbols[ia], &symbols[ib])
        } else {
            (&symbols[ib], &symbols[ia])
        };
        out.push(MarriageLayout {
            partnership: i,
            members: partnership.members.clone(),
            from: LayoutPoint::new(left.right(), left.y),
            to: LayoutPoint::new(right.left(), right.y),
        });
    }
    out
}

fn route_descents(
    pedigree: &Pedigree,
    symbols: &[LayoutSymbol],
    index: &FxHashMap<&str, usize>,
    marriages: &[MarriageLayout],
    generation_spacing: f64,
) -> Vec<DescentLayout> {
    // Sibling groups keyed by parent set, in edge order.
    let mut groups: IndexMap<Vec<String>, (Vec<String>, Option<usize>, Vec<String>)> =
        IndexMap::new();
    for edge in &pedigree.edges {
        let mut key = edge.parents.clone();
        key.sort_unstable();
        let entry = groups
            .entry(key)
            .or_insert_with(|| (edge.parents.clone(), edge.partnership, Vec::new()));
        entry.2.push(edge.child.clone());
    }

    let mut out = Vec::with_capacity(groups.len());
    for (_, (parents, partnership, children)) in groups {
        let child_syms: Vec<&LayoutSymbol> = children
            .iter()
            .filter_map(|c| index.get(c.as_str()).map(|&i| &symbols[i]))
            .collect();
        let Some(first_child) = child_syms.first() else {
            continue;
        };

        let marriage = partnership.and_then(|p| marriages.iter().find(|m| m.partnership == p));
        let origin = match (marriage, parents.as_slice()) {
            (Some(m), _) => m.midpoint(),
            (None, [only]) => match index.get(only.as_str()) {
                Some(&i) => LayoutPoint::new(symbols[i].x, symbols[i].bottom()),
                None => continue,
            },
            (None, _) => {
                let ps: Vec<&LayoutSymbol> = parents
                    .iter()
                    .filter_map(|p| index.get(p.as_str()).map(|&i| &symbols[i]))
                    .collect();
                if ps.is_empty() {
                    continue;
                }
                let n = ps.len() as f64;
                LayoutPoint::new(
                    ps.iter().map(|s| s.x).sum::<f64>() / n,
                    ps.iter().map(|s| s.y).sum::<f64>() / n,
                )
            }
        };

        let bus_y = first_child.y - generation_spacing / 2.0;
        let min_x = child_syms
            .iter()
            .map(|s| s.x)
            .fold(origin.x, f64::min);
        let max_x = child_syms
            .iter()
            .map(|s| s.x)
            .fold(origin.x, f64::max);

        out.push(DescentLayout {
            parents,
            partnership,
            children,
            origin,
            bus_y,
            stem: vec![origin, LayoutPoint::new(origin.x, bus_y)],
            bus: vec![LayoutPoint::new(min_x, bus_y), LayoutPoint::new(max_x, bus_y)],
            drops: child_syms
                .iter()
                .map(|s| vec![LayoutPoint::new(s.x, bus_y), LayoutPoint::new(s.x, s.top())])
                .collect(),
        });
    }
    out
}
