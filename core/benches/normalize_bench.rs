use criterion::{criterion_group, criterion_main, Criterion};
use facsearch_core::{EnglishNormalizer, Normalizer, TfidfVectorizer};

const ABOUT: &str = "Dr. Rivera joined the International Business and Marketing department in 2012. \
Her research focuses on cross-border supply chains, consumer behavior in emerging markets, \
and the marketing strategies of small and medium-sized enterprises. She teaches courses in \
global marketing, export management, and international trade finance.";

fn bench_normalize(c: &mut Criterion) {
    let normalizer = EnglishNormalizer::default();
    c.bench_function("normalize_about", |b| b.iter(|| normalizer.normalize(ABOUT)));
}

fn bench_fit(c: &mut Criterion) {
    let normalizer = EnglishNormalizer::default();
    let texts: Vec<String> = (0..50).map(|i| normalizer.normalize(&format!("{ABOUT} cohort {i}"))).collect();
    c.bench_function("fit_50_profiles", |b| b.iter(|| TfidfVectorizer::default().fit(&texts)));
}

criterion_group!(benches, bench_normalize, bench_fit);
criterion_main!(benches);
