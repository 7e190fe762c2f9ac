use criterion::{Criterion, criterion_group, criterion_main};
use nom_build::Logger;
use nom_build::files::{Walk, walk_tree};
use nom_build::freshness::parse_dependency_record;
use std::fs;
use std::hint::black_box;

const MOCK_RECORD: &str = "obj/net/http.o: src/net/http.c src/net/http.h \\\n \
 /usr/include/stdio.h /usr/include/stdlib.h /usr/include/string.h \\\n \
 src/common/with\\ space.h src/common/arena.h src/common/log.h \\\n \
 src/common/strings.h src/common/vec.h\n";

fn bench_parse_dependency_record(c: &mut Criterion) {
    c.bench_function("parse_dependency_record", |b| {
        b.iter(|| parse_dependency_record(black_box(MOCK_RECORD)))
    });
}

fn bench_walk_tree(c: &mut Criterion) {
    // Setup a temp tree for walking
    let temp_dir = std::env::temp_dir().join("nom_bench_walk");
    if !temp_dir.exists() {
        for d in 0..8 {
            let sub = temp_dir.join(format!("mod{}", d)).join("inner");
            fs::create_dir_all(&sub).unwrap();
            for f in 0..16 {
                fs::write(sub.join(format!("unit{}.c", f)), "").unwrap();
            }
        }
    }

    let log = Logger::silent();
    c.bench_function("walk_tree", |b| {
        b.iter(|| {
            let mut count = 0usize;
            walk_tree(&log, black_box(&temp_dir), |_| {
                count += 1;
                Walk::Continue
            })
            .unwrap();
            count
        })
    });
}

criterion_group!(benches, bench_parse_dependency_record, bench_walk_tree);
criterion_main!(benches);
