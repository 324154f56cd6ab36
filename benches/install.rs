use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use statfan::collector::ScalarCollector;
use statfan::{
    connect, Aggregator, CollectorKind, CollectorRegistry, IdentifierLevel, InstallContext,
    OutputType, SimEntity, StaticCatalog, StatsFamily, StatsHelper,
};

struct ThroughputStats;

impl StatsFamily for ThroughputStats {
    fn build(&mut self, ctx: &mut InstallContext<'_>) {
        let mut collectors = CollectorRegistry::new();
        ctx.create_collectors(CollectorKind::Scalar, &mut collectors);
        connect(
            &collectors,
            "total",
            ctx.aggregator_node(),
            Aggregator::write_value,
        );
        for terminal in ctx.catalog().terminals() {
            let identifier = ctx.identifier_of_terminal(terminal.as_ref());
            ctx.install_probe(
                terminal.as_ref(),
                "bytes_sent",
                &format!("bytes-{}", terminal.id()),
                "value_forward",
                "output",
                identifier,
                &collectors,
                ScalarCollector::record,
            );
        }
        ctx.keep_registry("throughput", collectors);
    }
}

fn build_catalog(terminals: u32) -> Rc<StaticCatalog> {
    let mut catalog = StaticCatalog::new();
    catalog.add_gateway(Rc::new(SimEntity::new(1)));
    let beams = terminals.div_ceil(8).max(1);
    for beam in 1..=beams {
        catalog.add_beam(beam, 1);
    }
    for terminal in 0..terminals {
        catalog.add_terminal(
            Rc::new(SimEntity::new(1000 + terminal).with_value_point("bytes_sent")),
            terminal % beams + 1,
        );
    }
    Rc::new(catalog)
}

fn bench_install(c: &mut Criterion) {
    let mut group = c.benchmark_group("install");
    for terminals in [16u32, 128, 1024] {
        group.bench_with_input(
            BenchmarkId::new("terminal_level", terminals),
            &terminals,
            |b, &terminals| {
                let catalog = build_catalog(terminals);
                b.iter(|| {
                    let mut helper = StatsHelper::new(Rc::clone(&catalog) as _);
                    helper.set_name("fwd_throughput");
                    helper.set_identifier_level(IdentifierLevel::Terminal);
                    helper.set_output_type(OutputType::ScalarFile);
                    helper.install(&mut ThroughputStats);
                    helper.probe_count()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_install);
criterion_main!(benches);
