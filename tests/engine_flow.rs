use proptest::prelude::*;
use std::thread;
use typeahead_core::{
    AutocompleteEngine, AutocompleteError, EngineConfig, EngineCredentials, IndexBackend, KeyPair, Opener,
    SharedEngine,
};

fn engine_for(keys: &KeyPair, backend: IndexBackend) -> AutocompleteEngine {
    let config = EngineConfig { backend, ..EngineConfig::default() };
    AutocompleteEngine::new(config, EngineCredentials::Split(keys.public())).unwrap()
}

fn opened(engine: &AutocompleteEngine, opener: &Opener, prefix: &str, k: usize) -> Vec<(String, u64)> {
    engine
        .suggest(prefix, k)
        .unwrap()
        .into_iter()
        .map(|s| (opener.unwrap(&s.payload).unwrap(), s.frequency))
        .collect()
}

#[test]
fn typing_and_confirming_changes_ranking_on_every_backend() {
    for backend in IndexBackend::ALL {
        let keys = KeyPair::generate();
        let opener = Opener::new(keys.private().clone());
        let mut engine = engine_for(&keys, backend);
        for word in ["car", "carbon", "cart", "cat"] {
            engine.add_word(word, &keys.public()).unwrap();
        }

        assert_eq!(
            opened(&engine, &opener, "car", 3),
            vec![("car".to_string(), 0), ("carbon".to_string(), 0), ("cart".to_string(), 0)],
            "{backend}"
        );

        engine.confirm_from("car", "cart").unwrap();
        engine.confirm_from("car", "cart").unwrap();
        engine.confirm("carbon").unwrap();
        assert_eq!(
            opened(&engine, &opener, "car", 2),
            vec![("cart".to_string(), 2), ("carbon".to_string(), 1)],
            "{backend}"
        );
        assert!(opened(&engine, &opener, "dog", 5).is_empty());
        assert_eq!(engine.history().count(), 3);
    }
}

#[test]
fn snapshot_file_survives_a_restart() {
    let keys = KeyPair::generate();
    let opener = Opener::new(keys.private().clone());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typeahead.snapshot");

    let mut engine =
        AutocompleteEngine::from_file_or_new(&path, EngineConfig::default(), EngineCredentials::Split(keys.public()))
            .unwrap();
    assert!(engine.is_empty());
    for word in ["dog", "door"] {
        engine.add_word(word, &keys.public()).unwrap();
    }
    for _ in 0..3 {
        engine.confirm("dog").unwrap();
    }
    engine.confirm("door").unwrap();
    engine.save_snapshot().unwrap();
    drop(engine);

    let config = EngineConfig { backend: IndexBackend::Ternary, ..EngineConfig::default() };
    let restarted = AutocompleteEngine::from_file_or_new(&path, config, EngineCredentials::Split(keys.public())).unwrap();
    assert_eq!(restarted.backend(), IndexBackend::Ternary);
    assert_eq!(
        opened(&restarted, &opener, "do", 10),
        vec![("dog".to_string(), 3), ("door".to_string(), 1)]
    );
}

#[test]
fn corrupt_snapshot_file_starts_empty() {
    let keys = KeyPair::generate();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typeahead.snapshot");
    std::fs::write(&path, b"\x00\x01 not a snapshot").unwrap();

    let engine =
        AutocompleteEngine::from_file_or_new(&path, EngineConfig::default(), EngineCredentials::Split(keys.public()))
            .unwrap();
    assert!(engine.is_empty());
}

#[test]
fn payloads_sealed_for_one_key_do_not_open_with_another() {
    let keys = KeyPair::generate();
    let stranger = Opener::new(KeyPair::generate().private().clone());
    let mut engine = engine_for(&keys, IndexBackend::Trie);
    engine.add_word("secret", &keys.public()).unwrap();

    let payload = engine.suggest("sec", 1).unwrap().remove(0).payload;
    assert!(matches!(stranger.unwrap(&payload), Err(AutocompleteError::Decryption(_))));
}

#[test]
fn shared_engine_serves_readers_while_confirming() {
    let keys = KeyPair::generate();
    let mut engine = engine_for(&keys, IndexBackend::Trie);
    let words: Vec<String> = (0..100).map(|i| format!("word{i:02}")).collect();
    for word in &words {
        engine.add_word(word, &keys.public()).unwrap();
    }
    let shared = SharedEngine::new(engine);

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    shared.confirm("word07").unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let suggestions = shared.suggest("word0", 5).unwrap();
                    assert_eq!(suggestions.len(), 5);
                }
            })
        })
        .collect();
    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert_eq!(shared.frequency("word07"), 200);
    let top = shared.suggest("word", 1).unwrap().remove(0);
    assert_eq!(top.frequency, 200);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn backends_agree_on_ranked_suggestions(
        words in prop::collection::btree_set("[a-d]{1,6}", 1..40),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..30),
        prefix in "[a-d]{1,3}",
    ) {
        let keys = KeyPair::generate();
        let opener = Opener::new(keys.private().clone());
        let words: Vec<String> = words.into_iter().collect();

        let mut results = Vec::new();
        for backend in IndexBackend::ALL {
            let mut engine = engine_for(&keys, backend);
            for word in &words {
                engine.add_word(word, &keys.public()).unwrap();
            }
            for pick in &picks {
                engine.confirm(pick.get::<String>(&words)).unwrap();
            }
            results.push(opened(&engine, &opener, &prefix, 5));
        }

        prop_assert_eq!(&results[0], &results[1]);
        prop_assert_eq!(&results[0], &results[2]);
        for pair in results[0].windows(2) {
            prop_assert!(pair[0].1 > pair[1].1 || (pair[0].1 == pair[1].1 && pair[0].0 < pair[1].0));
        }
    }
}
