use super::*;

#[test]
fn splits_sentences_on_terminators_and_trims_whitespace() {
    let sentences = split_sentences("Hello world.   Goodbye world!  What now?");
    assert_eq!(sentences, vec!["Hello world.", "Goodbye world!", "What now?"]);
}

#[test]
fn residual_text_without_terminator_forms_a_final_sentence() {
    let sentences = split_sentences("Hello world. trailing thought");
    assert_eq!(sentences, vec!["Hello world.", "trailing thought"]);
}

#[test]
fn residual_whitespace_only_tail_is_dropped() {
    let sentences = split_sentences("Hello world.   ");
    assert_eq!(sentences, vec!["Hello world."]);
}

#[test]
fn splits_words_on_whitespace_runs() {
    assert_eq!(split_words("Hello   world."), vec!["Hello", "world."]);
}

#[test]
fn parses_an_edit_script() {
    let script = parse_edit_script("0|1|cruel|").unwrap();
    assert_eq!(script.sentence_index, 0);
    assert_eq!(script.pairs, vec![EditPair { word_index: 1, word: "cruel".to_owned() }]);
}

#[test]
fn parses_an_empty_edit_script() {
    let script = parse_edit_script("3").unwrap();
    assert_eq!(script.sentence_index, 3);
    assert!(script.pairs.is_empty());
}

#[test]
fn edit_script_round_trips() {
    let script = EditScript {
        sentence_index: 2,
        pairs: vec![
            EditPair { word_index: 0, word: "a".into() },
            EditPair { word_index: 3, word: "b".into() },
        ],
    };
    let encoded = encode_edit_script(&script);
    assert_eq!(parse_edit_script(&encoded).unwrap(), script);
}

#[test]
fn malformed_edit_script_is_rejected() {
    assert_eq!(parse_edit_script("not-a-number").unwrap_err(), Error::InvalidParameters);
    assert_eq!(parse_edit_script("0|1").unwrap_err(), Error::InvalidParameters);
}

// S2 from §8: "Hello world. Goodbye world." + insert "cruel" at (0, 1).
#[test]
fn s2_lock_scoped_edit_inserts_a_word_inside_a_sentence() {
    let body = "Hello world. Goodbye world.";
    let script = parse_edit_script("0|1|cruel|").unwrap();
    let updated = apply_edit(body, &script).unwrap();
    assert_eq!(updated, "Hello cruel world. Goodbye world.");
}

#[test]
fn word_index_at_m_appends_to_the_sentence() {
    // "world." already ends on a terminator, so appending "there" after it
    // necessarily starts a fresh (untermined) sentence once re-tokenised.
    let body = "Hello world.";
    let script = parse_edit_script("0|2|there|").unwrap();
    let updated = apply_edit(body, &script).unwrap();
    assert_eq!(updated, "Hello world. there");
}

#[test]
fn word_index_at_m_appends_within_the_sentence_when_no_terminator_precedes_it() {
    let body = "Hello world";
    let script = parse_edit_script("0|2|there|").unwrap();
    let updated = apply_edit(body, &script).unwrap();
    assert_eq!(updated, "Hello world there");
}

#[test]
fn word_index_past_m_fails_and_leaves_body_untouched() {
    let body = "Hello world.";
    let script = parse_edit_script("0|3|there|").unwrap();
    assert_eq!(apply_edit(body, &script).unwrap_err(), Error::InvalidIndex);
}

#[test]
fn sentence_index_at_n_appends_a_new_sentence() {
    let body = "Hello world.";
    let script = parse_edit_script("1|0|Hi|").unwrap();
    let updated = apply_edit(body, &script).unwrap();
    assert_eq!(updated, "Hello world. Hi");
}

#[test]
fn sentence_index_past_n_fails() {
    let body = "Hello world.";
    let script = parse_edit_script("2|0|Hi|").unwrap();
    assert_eq!(apply_edit(body, &script).unwrap_err(), Error::InvalidIndex);
}

#[test]
fn second_pair_out_of_range_aborts_the_whole_commit() {
    let body = "Hello world.";
    // First pair is valid, second is out of range; the body must stay untouched.
    let script = parse_edit_script("0|0|Hey|5|oops|").unwrap();
    assert_eq!(apply_edit(body, &script).unwrap_err(), Error::InvalidIndex);
}

#[test]
fn an_inserted_terminator_splits_the_sentence_in_place() {
    // Inserting "Stop." mid-sentence should split into two sentences.
    let body = "Hello world.";
    let script = parse_edit_script("0|1|Stop.|").unwrap();
    let updated = apply_edit(body, &script).unwrap();
    assert_eq!(updated, "Hello Stop. world.");
    let sentences = split_sentences(&updated);
    assert_eq!(sentences, vec!["Hello Stop.", "world."]);
}

#[test]
fn empty_edit_pair_list_is_a_no_op_on_the_body() {
    let body = "Hello world. Goodbye world.";
    let script = parse_edit_script("0").unwrap();
    let updated = apply_edit(body, &script).unwrap();
    assert_eq!(updated, body);
}

#[test]
fn stats_are_recomputed_from_the_rebuilt_body() {
    let stats = compute_stats("Hello cruel world. Goodbye world.");
    assert_eq!(stats.word_count, 5);
    assert_eq!(stats.char_count, "Hello cruel world. Goodbye world.".chars().count() as u64);
}

#[test]
fn over_long_sentence_is_chopped_at_the_boundary() {
    let long = "a".repeat(MAX_SENTENCE_LEN + 10);
    let sentences = split_sentences(&long);
    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0].len(), MAX_SENTENCE_LEN);
}
