use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hocrspell::hocr::UNCHECKED_WORDS_QUERY;
use hocrspell::{DeletionIndex, DeletionTable, Document, SpellChecker};

fn generate_words(count: usize) -> Vec<String> {
    let letters: Vec<char> = "etaoinshrdlucmfw".chars().collect();
    (0..count)
        .map(|i| {
            let len = 4 + i % 6;
            (0..len)
                .map(|j| letters[(i * 7 + j * 13 + i / (j + 1)) % letters.len()])
                .collect()
        })
        .collect()
}

fn generate_page(words: &[String]) -> String {
    let mut page = String::from("<html><body><p class=\"ocr_par\">");
    for (i, word) in words.iter().enumerate() {
        // drop one character so most words have candidates
        let typo: String = word.chars().skip(1).collect();
        page.push_str(&format!(
            "<span class=\"ocrx_word\" title=\"bbox {} 0 {} 10\">{}</span>",
            i * 10,
            i * 10 + 9,
            typo
        ));
    }
    page.push_str("</p></body></html>");
    page
}

fn bench_index(c: &mut Criterion) {
    let dictionary = generate_words(5_000);

    let mut group = c.benchmark_group("index");
    for distance in [1, 2] {
        let table = DeletionTable::generate(&dictionary, distance);
        group.bench_function(format!("build_d{}", distance), |b| {
            b.iter(|| DeletionIndex::build(black_box(&dictionary), black_box(&table)))
        });

        let index = DeletionIndex::build(&dictionary, &table);
        let queries = generate_words(200);
        group.bench_function(format!("lookup_d{}", distance), |b| {
            b.iter(|| {
                for query in &queries {
                    black_box(index.lookup(black_box(query), distance));
                }
            })
        });
    }
    group.finish();
}

fn bench_document(c: &mut Criterion) {
    let dictionary = generate_words(5_000);
    let checker = SpellChecker::from_index(DeletionIndex::from_words(&dictionary, 1), 1);
    let page = generate_page(&dictionary[..500]);

    c.bench_function("check_document_500_words", |b| {
        b.iter(|| {
            let mut doc = Document::parse(&page).unwrap();
            black_box(checker.check_document(&mut doc, UNCHECKED_WORDS_QUERY).unwrap())
        })
    });
}

criterion_group!(benches, bench_index, bench_document);
criterion_main!(benches);
