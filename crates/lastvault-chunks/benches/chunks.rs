use lastvault_chunks::{encode_account, extract_chunks, VaultBlob};
use lastvault_core::Account;
use lastvault_crypto::VaultKey;

fn bench_key() -> VaultKey {
    VaultKey::from_bytes([0x5Au8; 32])
}

/// A blob of `records` ACCT chunks with realistic field sizes.
fn make_blob(records: usize) -> Vec<u8> {
    let key = bench_key();
    let mut blob = Vec::new();
    for i in 0..records {
        let account = Account {
            id: i.to_string(),
            name: format!("site-{i}"),
            username: format!("user{i}@example.com"),
            password: "correct horse battery staple".into(),
            url: format!("https://site-{i}.example.com/login"),
            group: "Work".into(),
            notes: "recovery codes: 1234 5678 9012".into(),
        };
        let payload = encode_account(&account, &key).unwrap();
        blob.extend_from_slice(b"ACCT");
        blob.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        blob.extend_from_slice(&payload);
    }
    blob
}

#[divan::bench(args = [10, 100, 1000])]
fn chunk_extract(bencher: divan::Bencher, records: usize) {
    let blob = make_blob(records);
    bencher
        .counter(divan::counter::BytesCount::new(blob.len()))
        .bench(|| extract_chunks(divan::black_box(&blob), None).unwrap());
}

#[divan::bench(args = [10, 100, 1000])]
fn decode_accounts(bencher: divan::Bencher, records: usize) {
    let key = bench_key();
    let blob = VaultBlob::new(make_blob(records), 1);
    bencher
        .counter(divan::counter::ItemsCount::new(records))
        .bench(|| blob.accounts(divan::black_box(&key)).unwrap());
}

fn main() {
    divan::main();
}
