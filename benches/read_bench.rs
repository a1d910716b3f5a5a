use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use s_gzip::{GzipReader, GzipWriter};
use std::io::Read;
use tempfile::NamedTempFile;

fn generate_compressible_data(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        data.extend_from_slice(pattern);
    }
    data.truncate(size);
    data
}

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = 0x12345678u32;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

fn create_test_gz(data: &[u8], level: u32, members: usize) -> NamedTempFile {
    let temp = NamedTempFile::new().unwrap();
    let part = data.len().div_ceil(members.max(1)).max(1);
    let mut file = temp.reopen().unwrap();
    for chunk in data.chunks(part) {
        let mut writer = GzipWriter::with_level(&mut file, level).unwrap();
        writer.write_data(chunk).unwrap();
        writer.close().unwrap();
    }
    temp
}

fn bench_read_compressible_data(c: &mut Criterion) {
    let sizes = vec![
        100 * 1024,       // 100KB
        1024 * 1024,      // 1MB
        10 * 1024 * 1024, // 10MB
    ];

    for size in sizes {
        let mut group = c.benchmark_group(format!("read_compressible_{}", format_size(size)));
        group.throughput(Throughput::Bytes(size as u64));

        let data = generate_compressible_data(size);
        let gz = create_test_gz(&data, 6, 1);
        group.bench_function(BenchmarkId::new("level_6", size), |b| {
            b.iter(|| {
                let mut reader = GzipReader::open(gz.path()).unwrap();
                let mut buf = Vec::new();
                reader.read_to_end(black_box(&mut buf)).unwrap();
            });
        });

        group.finish();
    }
}

fn bench_read_random_data(c: &mut Criterion) {
    let sizes = vec![100 * 1024, 1024 * 1024]; // 100KB, 1MB

    for size in sizes {
        let mut group = c.benchmark_group(format!("read_random_{}", format_size(size)));
        group.throughput(Throughput::Bytes(size as u64));

        let data = generate_random_data(size);
        let gz = create_test_gz(&data, 6, 1);
        group.bench_function(BenchmarkId::new("level_6", size), |b| {
            b.iter(|| {
                let mut reader = GzipReader::open(gz.path()).unwrap();
                let mut buf = Vec::new();
                reader.read_to_end(black_box(&mut buf)).unwrap();
            });
        });

        group.finish();
    }
}

fn bench_read_multiple_members(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_multiple_members");

    let member_count = 100;
    let member_size = 10 * 1024; // 10KB per member
    group.throughput(Throughput::Bytes((member_count * member_size) as u64));

    let data = generate_compressible_data(member_count * member_size);
    let gz = create_test_gz(&data, 6, member_count);

    group.bench_function("100_members", |b| {
        b.iter(|| {
            let mut reader = GzipReader::open(gz.path()).unwrap();
            let mut buf = Vec::new();
            reader.read_to_end(black_box(&mut buf)).unwrap();
        });
    });

    group.finish();
}

fn bench_read_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_chunk_size");

    let size = 1024 * 1024; // 1MB
    let data = generate_compressible_data(size);
    group.throughput(Throughput::Bytes(size as u64));
    let gz = create_test_gz(&data, 6, 1);

    for chunk in [512usize, 8 * 1024, 64 * 1024] {
        group.bench_function(BenchmarkId::new("read_chunk", chunk), |b| {
            b.iter(|| {
                let mut reader = GzipReader::open(gz.path()).unwrap();
                while !black_box(reader.read_chunk(chunk).unwrap()).is_empty() {}
            });
        });
    }

    group.bench_function("read_all", |b| {
        b.iter(|| {
            let mut reader = GzipReader::open(gz.path()).unwrap();
            let _ = black_box(reader.read_all().unwrap());
        });
    });

    group.finish();
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{}MB", bytes / (1024 * 1024))
    }
}

criterion_group!(
    benches,
    bench_read_compressible_data,
    bench_read_random_data,
    bench_read_multiple_members,
    bench_read_chunk_sizes
);
criterion_main!(benches);
