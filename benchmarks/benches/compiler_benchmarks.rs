use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ddp_lang::codegen::pipeline::run_front_end;
use ddp_lang::lexer::{scan_source, Mode};
use ddp_lang::parser;

const PROGRAM: &str = "\
Die Zahlen Liste werte ist eine Liste, die aus 3, 1, 4, 1, 5, 9, 2 und 6 besteht.
Die Zahl summe ist 0.
Für jede Zahl wert in werte, mache:
    Speichere summe plus wert in summe.
Die Funktion quadriere mit dem Parameter z vom Typ Zahl, gibt eine Zahl zurück, macht:
    Gib z mal z zurück.
Und kann so benutzt werden:
    \"quadriere <z>\".
Schreibe quadriere summe.
Der Text gruß ist \"Hallo\" verkettet mit \", Welt!\".
Schreibe (gruß von 1 bis 5).
";

fn bench_scanner(c: &mut Criterion) {
    c.bench_function("scan_program", |b| {
        b.iter(|| scan_source("bench.ddp", black_box(PROGRAM), Mode::default()))
    });
}

fn bench_parser(c: &mut Criterion) {
    let (tokens, _) = scan_source("bench.ddp", PROGRAM, Mode::default());
    c.bench_function("parse_program", |b| {
        b.iter(|| parser::parse(black_box(tokens.clone()), "bench.ddp"))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    c.bench_function("front_end_to_ir", |b| {
        b.iter(|| run_front_end("bench.ddp", black_box(PROGRAM), false))
    });
}

criterion_group!(benches, bench_scanner, bench_parser, bench_full_pipeline);
criterion_main!(benches);
