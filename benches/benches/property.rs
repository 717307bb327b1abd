// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_property` + `understory_style` value resolution,
//! and for property reads and writes on an `understory_element` tree.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Once;
use std::vec::Vec;

use understory_element::{CoreProperties, ElementId, ElementTree, StyleBuilder, ThemeBuilder};
use understory_property::{
    BindingSource, ErasedValue, Invalidation, Property, PropertyId, PropertyMetadataBuilder,
    PropertyRegistry, PropertyStore,
};
use understory_style::{ResolveCx, Style, ValueTiers};

/// A parent chain `0 <- 1 <- ... <- N-1` with one local store and an
/// optional style per node.
struct Chain {
    stores: Vec<PropertyStore>,
    styles: Vec<Option<Style<()>>>,
}

impl Chain {
    fn new(len: usize) -> Self {
        Self {
            stores: (0..len).map(|_| PropertyStore::new()).collect(),
            styles: (0..len).map(|_| None).collect(),
        }
    }
}

impl ValueTiers<usize> for Chain {
    fn binding_value(&self, _: usize, _: PropertyId) -> Option<&ErasedValue> {
        None
    }

    fn local_value(&self, key: usize, id: PropertyId) -> Option<&ErasedValue> {
        self.stores[key].get(id)
    }

    fn style_value(&self, key: usize, id: PropertyId) -> Option<&ErasedValue> {
        self.styles[key].as_ref()?.get_erased(id)
    }

    fn parent(&self, key: usize) -> Option<usize> {
        key.checked_sub(1)
    }
}

fn bench_resolve(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: PropertyStore={} ErasedValue={} Style<()>={}",
            core::mem::size_of::<PropertyStore>(),
            core::mem::size_of::<ErasedValue>(),
            core::mem::size_of::<Style<()>>(),
        );
    });

    let mut registry = PropertyRegistry::new();
    let element = registry.register_kind("Element", None).unwrap();
    let width: Property<f64> = registry
        .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
        .unwrap();
    let font_size: Property<f64> = registry
        .register(
            "FontSize",
            element,
            PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
        )
        .unwrap();

    let chain_len = 16;
    let leaf = chain_len - 1;
    let mut chain = Chain::new(chain_len);
    chain.stores[leaf].set_local(width, 100.0);
    chain.stores[0].set_local(font_size, 16.0);
    let base = understory_style::StyleBuilder::new().set(width, 50.0).build();
    chain.styles[1] = Some(understory_style::StyleBuilder::new().based_on(base).build());

    let mut group = c.benchmark_group("property/resolve");
    let cx = ResolveCx::new(&registry, &chain);

    group.bench_function("local", |b| {
        b.iter(|| black_box(cx.get_value(black_box(leaf), width)));
    });

    group.bench_function("style_based_on", |b| {
        b.iter(|| black_box(cx.get_value(black_box(1), width)));
    });

    group.bench_function("default", |b| {
        b.iter(|| black_box(cx.get_value(black_box(2), width)));
    });

    group.bench_function(BenchmarkId::new("inherited", chain_len), |b| {
        b.iter(|| black_box(cx.get_value(black_box(leaf), font_size)));
    });

    group.bench_function("value_source", |b| {
        b.iter(|| black_box(cx.value_source(black_box(leaf), font_size.id())));
    });

    group.finish();
}

struct Tree {
    tree: ElementTree,
    core: CoreProperties,
    font_size: Property<f64>,
    root: ElementId,
    leaf: ElementId,
}

fn chain_tree(depth: usize) -> Tree {
    let mut registry = PropertyRegistry::new();
    let core = CoreProperties::register(&mut registry).unwrap();
    let font_size = registry
        .register(
            "FontSize",
            core.element,
            PropertyMetadataBuilder::new(12.0_f64)
                .inherits(true)
                .affects(Invalidation::MEASURE)
                .build(),
        )
        .unwrap();
    let mut tree = ElementTree::new(registry, core.clone());
    tree.set_theme(
        ThemeBuilder::new()
            .style(core.element, StyleBuilder::new().set(core.rotation, 0.0).build())
            .build(),
    );
    let root = tree.create(core.element).unwrap();
    let mut leaf = root;
    for _ in 1..depth {
        let child = tree.create(core.element).unwrap();
        tree.append_child(leaf, child).unwrap();
        leaf = child;
    }
    Tree {
        tree,
        core,
        font_size,
        root,
        leaf,
    }
}

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("property/tree");

    for depth in [4_usize, 32] {
        let Tree {
            tree,
            font_size,
            root: _,
            leaf,
            ..
        } = chain_tree(depth);
        group.bench_function(BenchmarkId::new("get_default", depth), |b| {
            b.iter(|| black_box(tree.get(black_box(leaf), font_size)));
        });

        let Tree {
            mut tree,
            font_size,
            root,
            leaf,
            ..
        } = chain_tree(depth);
        tree.set_local(root, font_size, 16.0).unwrap();
        group.bench_function(BenchmarkId::new("get_inherited", depth), |b| {
            b.iter(|| black_box(tree.get(black_box(leaf), font_size)));
        });

        // Every write changes the effective value and propagates to the
        // whole chain.
        let Tree {
            mut tree,
            font_size,
            root,
            ..
        } = chain_tree(depth);
        let mut size = 12.0;
        group.bench_function(BenchmarkId::new("set_local_propagating", depth), |b| {
            b.iter(|| {
                size += 1.0;
                black_box(tree.set_local(root, font_size, size))
            });
        });
    }

    let Tree {
        mut tree,
        core,
        leaf,
        ..
    } = chain_tree(1);
    group.bench_function("set_local_unchanged", |b| {
        tree.set_local(leaf, core.rotation, 1.0).unwrap();
        b.iter(|| black_box(tree.set_local(leaf, core.rotation, 1.0)));
    });

    let Tree {
        mut tree,
        font_size,
        leaf,
        ..
    } = chain_tree(8);
    let source = BindingSource::new(12.0);
    tree.attach_binding(leaf, font_size, source.one_way()).unwrap();
    let mut value = 12.0;
    group.bench_function("binding_update", |b| {
        b.iter(|| {
            value += 1.0;
            source.set(value);
            black_box(tree.process_binding_changes())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_tree);
criterion_main!(benches);
