// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Hangul composition of decoded jamo sequences

use kordoc_ocr_node::vision::ocr::hangul::{
    compose, compose_syllable, decompose_syllable, is_hangul_syllable, HangulComposer,
};

#[test]
fn test_compose_simple_syllables() {
    assert_eq!(compose("ㄱㅏㅁ"), "감");
    assert_eq!(compose("ㅅㅏㅇㅎㅗ"), "상호");
    assert_eq!(compose("ㄷㅐㅍㅛㅈㅏ"), "대표자");
}

#[test]
fn test_final_moves_to_next_syllable() {
    // ㄴ is taken by the following vowel
    assert_eq!(compose("ㄱㅏㄴㅏ"), "가나");
    assert_eq!(compose("ㅂㅓㄴㅎㅗ"), "번호");
}

#[test]
fn test_business_registration_words() {
    assert_eq!(compose("ㅅㅏㅇㅓㅂㅈㅏㄷㅡㅇㄹㅗㄱㅈㅡㅇ"), "사업자등록증");
    assert_eq!(compose("ㅂㅓㅂㅇㅣㄴ"), "법인");
}

#[test]
fn test_mixed_text_passes_through() {
    assert_eq!(compose("ㅅㅏㅇㅎㅗ: ABC 123"), "상호: ABC 123");
    assert_eq!(compose("123-45-67890"), "123-45-67890");
    assert_eq!(compose("이미 완성된 글자"), "이미 완성된 글자");
}

#[test]
fn test_dangling_jamo_are_kept() {
    assert_eq!(compose("ㄱ"), "ㄱ");
    assert_eq!(compose("ㅏ"), "ㅏ");
    assert_eq!(compose("ㄱㄴ"), "ㄱㄴ");
}

#[test]
fn test_composer_incremental() {
    let mut composer = HangulComposer::new();
    for c in "ㅎㅏㄴㄱㅡㄹ".chars() {
        composer.push(c);
    }
    assert_eq!(composer.finish(), "한글");
}

#[test]
fn test_compose_decompose_round_trip() {
    for cho in 0..19u8 {
        for jung in 0..21u8 {
            for jong in [0u8, 1, 4, 8, 16, 27] {
                let syllable = compose_syllable(cho, jung, jong).unwrap();
                assert!(is_hangul_syllable(syllable));
                assert_eq!(decompose_syllable(syllable), Some((cho, jung, jong)));
            }
        }
    }
}

#[test]
fn test_out_of_range_indices() {
    assert!(compose_syllable(19, 0, 0).is_none());
    assert!(compose_syllable(0, 21, 0).is_none());
    assert!(compose_syllable(0, 0, 28).is_none());
    assert!(decompose_syllable('A').is_none());
}
