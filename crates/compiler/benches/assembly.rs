//! Performance benchmarks for the imgproxy stack compiler
//!
//! Copyright 2025 imgproxy stack contributors
//! Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
//! See the LICENSE file in the project root for details.
//!
//! These benchmarks measure assembly and rendering time as the subnet count
//! grows, for both launch types and both output formats.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imgproxy_stack_compiler::config::{ClusterMode, NetworkMode};
use imgproxy_stack_compiler::{assemble, render, DeploymentConfig, Encoders, InstanceCatalog, LaunchType, OutputFormat};

const SUBNET_COUNTS: [u32; 4] = [1, 3, 8, 16];

fn config(launch_type: LaunchType, subnets: u32) -> DeploymentConfig {
    DeploymentConfig::new(NetworkMode::Embedded, ClusterMode::Managed, launch_type, subnets)
        .expect("Benchmark configurations should be valid")
}

/// Benchmark template assembly for different subnet counts
fn benchmark_assembly(c: &mut Criterion) {
    let catalog = InstanceCatalog::embedded().expect("Embedded catalog should load in benchmarks");

    let mut group = c.benchmark_group("assembly");
    group.sample_size(20);

    for launch_type in [LaunchType::Fargate, LaunchType::Ec2] {
        for subnets in SUBNET_COUNTS {
            let config = config(launch_type, subnets);
            group.bench_with_input(
                BenchmarkId::new(launch_type.as_str(), subnets),
                &config,
                |b, config| {
                    b.iter(|| {
                        let template = assemble(black_box(config), black_box(&catalog))
                            .expect("Assembly should succeed in benchmarks");
                        black_box(template)
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark the full pipeline (assemble + integrity check + render)
fn benchmark_full_pipeline(c: &mut Criterion) {
    let catalog = InstanceCatalog::embedded().expect("Embedded catalog should load in benchmarks");
    let encoders = Encoders::standard();

    let mut group = c.benchmark_group("full_pipeline");
    group.sample_size(20);

    for format in [OutputFormat::Yaml, OutputFormat::Json] {
        for subnets in SUBNET_COUNTS {
            let config = config(LaunchType::Ec2, subnets);
            group.bench_with_input(BenchmarkId::new(format.as_str(), subnets), &config, |b, config| {
                b.iter(|| {
                    let template = assemble(black_box(config), black_box(&catalog))
                        .expect("Assembly should succeed in benchmarks");
                    let out = render(black_box(&template), format, &encoders)
                        .expect("Rendering should succeed in benchmarks");
                    black_box(out.len())
                });
            });
        }
    }

    group.finish();
}

/// Benchmark catalog loading (YAML parse + schema validation + consistency checks)
fn benchmark_catalog(c: &mut Criterion) {
    c.bench_function("catalog_embedded", |b| {
        b.iter(|| {
            let catalog = InstanceCatalog::embedded().expect("Embedded catalog should load in benchmarks");
            black_box(catalog)
        });
    });
}

criterion_group!(benches, benchmark_assembly, benchmark_full_pipeline, benchmark_catalog);
criterion_main!(benches);
