use cablemap::render::{
    HeadlessRenderer, LayoutOptions, SvgRenderOptions, layout_and_shape, render_svg_fragment,
    sanitize_svg_id,
};
use cablemap::{TopologyInput, plan_topology};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

fn fixtures() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "switchless_2node",
            r#"{ "nodeCount": 2, "portsPerNode": 4, "storageMode": "switchless" }"#,
        ),
        (
            "switchless_4node_dual",
            r#"{ "nodeCount": 4, "portsPerNode": 8, "storageMode": "switchless" }"#,
        ),
        (
            "switched_16node_dual_tor",
            r#"{ "nodeCount": 16, "portsPerNode": 12, "torSwitchCount": 2 }"#,
        ),
        (
            "rack_aware_a_8node",
            r#"{ "nodeCount": 8, "portsPerNode": 6, "architectureOption": "A" }"#,
        ),
        (
            "rack_aware_d_4node",
            r#"{ "nodeCount": 4, "portsPerNode": 4, "architectureOption": "D" }"#,
        ),
    ]
}

fn inputs() -> Vec<(&'static str, TopologyInput)> {
    fixtures()
        .into_iter()
        .map(|(name, text)| (name, TopologyInput::from_json_str(text).unwrap()))
        .collect()
}

fn bench_render_svg(c: &mut Criterion) {
    let layout = LayoutOptions::default();

    let mut group = c.benchmark_group("render_svg");
    for (name, input) in inputs() {
        let diagram_id = sanitize_svg_id(name);
        group.bench_function(name, |b| {
            b.iter_batched(
                || input.clone(),
                |input| {
                    let topology = plan_topology(&input).unwrap();
                    let (_, shapes) = layout_and_shape(&topology, &layout);
                    let svg_opts = SvgRenderOptions {
                        diagram_id: Some(diagram_id.clone()),
                        ..SvgRenderOptions::default()
                    };
                    let _svg = render_svg_fragment(&shapes, &svg_opts);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_plan_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_only");
    for (name, input) in inputs() {
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = plan_topology(&input).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_headless_json(c: &mut Criterion) {
    let renderer = HeadlessRenderer::new();

    let mut group = c.benchmark_group("headless_json");
    for (name, text) in fixtures() {
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = renderer.render_svg_json(text).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render_svg, bench_plan_only, bench_headless_json);
criterion_main!(benches);
