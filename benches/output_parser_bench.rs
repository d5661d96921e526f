// Benchmark for output handling
// Measures line assembly, classification and filtering of script output

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use script_runner::services::output::{
    LineAssembler, OutputFilter, OutputParser, RunLog, Stream,
};

/// Typical script output: progress, chatter, a warning and a traceback
fn sample_output(lines: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..lines {
        match i % 20 {
            0 => out.push_str(&format!("PROGRESS {}\n", (i * 100 / lines.max(1)).min(100))),
            7 => out.push_str("WARNING: disk almost full\n"),
            13 => out.push_str("Traceback (most recent call last):\n"),
            14 => out.push_str("  File \"job.py\", line 3, in <module>\n"),
            15 => out.push_str("ValueError: bad input\n"),
            _ => out.push_str(&format!("processed record {} of {}\r\n", i, lines)),
        }
    }
    out.into_bytes()
}

fn bench_line_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_assembly");

    for size in [100, 1_000, 10_000].iter() {
        let bytes = sample_output(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| {
                let mut assembler = LineAssembler::new();
                let mut count = 0;
                for chunk in bytes.chunks(4096) {
                    count += assembler.push(black_box(chunk)).len();
                }
                count + usize::from(assembler.finish().is_some())
            });
        });
    }

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let bytes = sample_output(1_000);
    let lines = LineAssembler::new().push(&bytes);

    c.bench_function("classify_1000_lines", |b| {
        b.iter(|| {
            let mut parser = OutputParser::new();
            lines
                .iter()
                .filter(|line| parser.classify(black_box(line)).is_error())
                .count()
        });
    });
}

fn bench_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_filter");

    let mut log = RunLog::with_capacity(10_000);
    for line in LineAssembler::new().push(&sample_output(10_000)) {
        log.push(Stream::Stdout, line);
    }

    let filters = [
        ("none", OutputFilter::default()),
        (
            "query",
            OutputFilter {
                query: "record 9".to_string(),
                ..OutputFilter::default()
            },
        ),
        (
            "errors_only",
            OutputFilter {
                errors_only: true,
                ..OutputFilter::default()
            },
        ),
    ];

    for (name, filter) in filters.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), filter, |b, filter| {
            b.iter(|| log.filtered(black_box(filter)).count());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_line_assembly,
    bench_classification,
    bench_filtering
);
criterion_main!(benches);
