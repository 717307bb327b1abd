// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_element` layout, transforms, and hit testing.
//!
//! The tree is a vertical stack of horizontal rows, each row holding fixed
//! size cells.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::rc::Rc;
use std::vec::Vec;

use kurbo::{Insets, Point, Size};
use understory_element::{CoreProperties, ElementId, ElementTree, Orientation, StackPanel};
use understory_property::PropertyRegistry;

struct Grid {
    tree: ElementTree,
    core: CoreProperties,
    root: ElementId,
    cells: Vec<ElementId>,
}

fn grid(rows: usize, cols: usize) -> Grid {
    let mut registry = PropertyRegistry::new();
    let core = CoreProperties::register(&mut registry).unwrap();
    let mut tree = ElementTree::new(registry, core.clone());
    let root = tree.create(core.stack_panel).unwrap();
    let mut cells = Vec::with_capacity(rows * cols);
    for _ in 0..rows {
        let row = tree
            .create_with_policy(
                core.stack_panel,
                Rc::new(StackPanel::new(Orientation::Horizontal)),
            )
            .unwrap();
        tree.append_child(root, row).unwrap();
        for _ in 0..cols {
            let cell = tree.create(core.element).unwrap();
            tree.set_local(cell, core.width, Some(20.0)).unwrap();
            tree.set_local(cell, core.height, Some(10.0)).unwrap();
            tree.set_local(cell, core.margin, Insets::uniform(1.0)).unwrap();
            tree.append_child(row, cell).unwrap();
            cells.push(cell);
        }
    }
    Grid {
        tree,
        core,
        root,
        cells,
    }
}

const VIEWPORT: Size = Size::new(4096.0, 4096.0);

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    for (rows, cols) in [(10_usize, 10_usize), (50, 40)] {
        let label = format!("{rows}x{cols}");

        group.bench_function(BenchmarkId::new("build_and_layout", &label), |b| {
            b.iter(|| {
                let Grid { mut tree, root, .. } = grid(rows, cols);
                tree.update_layout(root, VIEWPORT).unwrap();
                black_box(tree.desired_size(root))
            });
        });

        let Grid {
            mut tree,
            core,
            root,
            cells,
        } = grid(rows, cols);
        tree.update_layout(root, VIEWPORT).unwrap();

        group.bench_function(BenchmarkId::new("relayout_clean", &label), |b| {
            b.iter(|| black_box(tree.update_layout(root, VIEWPORT)));
        });

        // One cell grows: its row and the root re-measure, the rest is cached.
        let target = cells[cells.len() / 2];
        let mut width = 20.0;
        group.bench_function(BenchmarkId::new("relayout_one_cell", &label), |b| {
            b.iter(|| {
                width = if width == 20.0 { 24.0 } else { 20.0 };
                tree.set_local(target, core.width, Some(width)).unwrap();
                black_box(tree.update_layout(root, VIEWPORT))
            });
        });

        let last = *cells.last().unwrap();
        group.bench_function(BenchmarkId::new("world_transform_invalidated", &label), |b| {
            b.iter(|| {
                tree.invalidate_transform(root);
                black_box(tree.world_transform(last))
            });
        });

        let point = tree.point_to_screen(last, Point::new(5.0, 5.0)).unwrap();
        group.bench_function(BenchmarkId::new("hit_test_last", &label), |b| {
            b.iter(|| black_box(tree.hit_test(root, black_box(point))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
