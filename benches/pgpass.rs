//! Pgpass Resolution Benchmarks
//!
//! Measures linear-scan credential resolution over realistic file sizes.
//! Typical pgpass files are tens of lines; the large case guards against
//! accidental quadratic behavior in field splitting.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pgprobe::pgpass::{resolve_from_contents, LookupKey};

fn pgpass_contents(entries: usize) -> String {
    let mut contents = String::from("# generated benchmark credentials\n");
    for i in 0..entries {
        contents.push_str(&format!("host{i}:5432:db{i}:user{i}:password{i}\n"));
    }
    contents.push_str("*:*:*:*:fallbackpw\n");
    contents
}

fn bench_resolve_first_entry(c: &mut Criterion) {
    let contents = pgpass_contents(100);
    let key = LookupKey::new("host0", 5432, "db0", "user0");

    c.bench_function("pgpass_resolve_first_entry", |b| {
        b.iter(|| resolve_from_contents(black_box(&contents), black_box(&key)));
    });
}

fn bench_resolve_wildcard_fallback(c: &mut Criterion) {
    let contents = pgpass_contents(100);
    let key = LookupKey::new("unlisted", 5432, "mydb", "nobody");

    c.bench_function("pgpass_resolve_wildcard_fallback", |b| {
        b.iter(|| resolve_from_contents(black_box(&contents), black_box(&key)));
    });
}

fn bench_resolve_escaped_fields(c: &mut Criterion) {
    let contents = "db\\:host:5432:my\\\\db:alice:sec\\:ret\n".repeat(100);
    let key = LookupKey::new("db:host", 5432, "my\\db", "alice");

    c.bench_function("pgpass_resolve_escaped_fields", |b| {
        b.iter(|| resolve_from_contents(black_box(&contents), black_box(&key)));
    });
}

criterion_group!(
    benches,
    bench_resolve_first_entry,
    bench_resolve_wildcard_fallback,
    bench_resolve_escaped_fields
);
criterion_main!(benches);
