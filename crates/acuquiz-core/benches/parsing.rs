use criterion::{black_box, criterion_group, criterion_main, Criterion};

use acuquiz_core::parser::{clean_html, parse_bank};
use acuquiz_core::traits::extract_json_object;

fn bench_parse_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_bank");

    let small = generate_bank(10);
    let medium = generate_bank(100);
    let large = generate_bank(500);

    group.bench_function("10_entries", |b| {
        b.iter(|| parse_bank(black_box(&small), black_box("bench.txt")))
    });

    group.bench_function("100_entries", |b| {
        b.iter(|| parse_bank(black_box(&medium), black_box("bench.txt")))
    });

    group.bench_function("500_entries", |b| {
        b.iter(|| parse_bank(black_box(&large), black_box("bench.txt")))
    });

    group.finish();
}

fn bench_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("helpers");

    let html = "主治：咳嗽<br>气喘<br />咽喉肿痛<b>胸痛</b>".repeat(20);
    let reply = "好的：\n```json\n{\"question\":\"太渊的主治？\",\"canonical_answer\":\"咳嗽\"}\n```";

    group.bench_function("clean_html", |b| b.iter(|| clean_html(black_box(&html))));

    group.bench_function("extract_json_object", |b| {
        b.iter(|| extract_json_object(black_box(reply)))
    });

    group.finish();
}

fn generate_bank(n: usize) -> String {
    let mut s = String::new();
    for i in 0..n {
        if i % 10 == 0 {
            s.push_str(&format!("# 第{}经：\n\n", i / 10));
        }
        s.push_str(&format!(
            "穴位{i}\n定位：在前臂第{i}处<br>桡侧\n主治：咳嗽，气喘\n特定穴：络穴\n取穴：伸臂取之\n\n"
        ));
    }
    s
}

criterion_group!(benches, bench_parse_bank, bench_helpers);
criterion_main!(benches);
