// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Korean jamo composition
//!
//! Recognition vocabularies for Korean sometimes emit decomposed jamo
//! (conjoining U+1100 block or compatibility U+3130 block) instead of
//! precomposed syllables. `compose` folds such streams back into display
//! syllables using `0xAC00 + (cho * 21 + jung) * 28 + jong`.

const HANGUL_BASE: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;
const CHOSEONG_COUNT: u32 = 19;
const JUNGSEONG_COUNT: u32 = 21;
const JONGSEONG_COUNT: u32 = 28;

/// Compatibility consonants U+3131..=U+314E as (initial index, final index)
const COMPAT_CONSONANTS: [(Option<u8>, Option<u8>); 30] = [
    (Some(0), Some(1)),   // ㄱ
    (Some(1), Some(2)),   // ㄲ
    (None, Some(3)),      // ㄳ
    (Some(2), Some(4)),   // ㄴ
    (None, Some(5)),      // ㄵ
    (None, Some(6)),      // ㄶ
    (Some(3), Some(7)),   // ㄷ
    (Some(4), None),      // ㄸ
    (Some(5), Some(8)),   // ㄹ
    (None, Some(9)),      // ㄺ
    (None, Some(10)),     // ㄻ
    (None, Some(11)),     // ㄼ
    (None, Some(12)),     // ㄽ
    (None, Some(13)),     // ㄾ
    (None, Some(14)),     // ㄿ
    (None, Some(15)),     // ㅀ
    (Some(6), Some(16)),  // ㅁ
    (Some(7), Some(17)),  // ㅂ
    (Some(8), None),      // ㅃ
    (None, Some(18)),     // ㅄ
    (Some(9), Some(19)),  // ㅅ
    (Some(10), Some(20)), // ㅆ
    (Some(11), Some(21)), // ㅇ
    (Some(12), Some(22)), // ㅈ
    (Some(13), None),     // ㅉ
    (Some(14), Some(23)), // ㅊ
    (Some(15), Some(24)), // ㅋ
    (Some(16), Some(25)), // ㅌ
    (Some(17), Some(26)), // ㅍ
    (Some(18), Some(27)), // ㅎ
];

/// Compatibility characters for each initial index
const COMPAT_CHOSEONG: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ',
    'ㅌ', 'ㅍ', 'ㅎ',
];

/// Compound finals as (compound, first, second)
const COMPOUND_FINALS: [(u8, u8, u8); 11] = [
    (3, 1, 19),   // ㄳ = ㄱ + ㅅ
    (5, 4, 22),   // ㄵ = ㄴ + ㅈ
    (6, 4, 27),   // ㄶ = ㄴ + ㅎ
    (9, 8, 1),    // ㄺ = ㄹ + ㄱ
    (10, 8, 16),  // ㄻ = ㄹ + ㅁ
    (11, 8, 17),  // ㄼ = ㄹ + ㅂ
    (12, 8, 19),  // ㄽ = ㄹ + ㅅ
    (13, 8, 25),  // ㄾ = ㄹ + ㅌ
    (14, 8, 26),  // ㄿ = ㄹ + ㅍ
    (15, 8, 27),  // ㅀ = ㄹ + ㅎ
    (18, 17, 19), // ㅄ = ㅂ + ㅅ
];

/// Compound vowels as (first, second, compound)
const COMPOUND_VOWELS: [(u8, u8, u8); 7] = [
    (8, 0, 9),    // ㅘ
    (8, 1, 10),   // ㅙ
    (8, 20, 11),  // ㅚ
    (13, 4, 14),  // ㅝ
    (13, 5, 15),  // ㅞ
    (13, 20, 16), // ㅟ
    (18, 20, 19), // ㅢ
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Jamo {
    Consonant {
        initial: Option<u8>,
        final_index: Option<u8>,
    },
    Vowel(u8),
}

fn classify(c: char) -> Option<Jamo> {
    let code = c as u32;
    match code {
        0x1100..=0x1112 => Some(Jamo::Consonant {
            initial: Some((code - 0x1100) as u8),
            final_index: None,
        }),
        0x1161..=0x1175 => Some(Jamo::Vowel((code - 0x1161) as u8)),
        0x11A8..=0x11C2 => Some(Jamo::Consonant {
            initial: None,
            final_index: Some((code - 0x11A8 + 1) as u8),
        }),
        0x3131..=0x314E => {
            let (initial, final_index) = COMPAT_CONSONANTS[(code - 0x3131) as usize];
            Some(Jamo::Consonant {
                initial,
                final_index,
            })
        }
        0x314F..=0x3163 => Some(Jamo::Vowel((code - 0x314F) as u8)),
        _ => None,
    }
}

/// Initial consonant equivalent of a simple final
fn final_to_initial(final_index: u8) -> Option<u8> {
    match final_index {
        1 => Some(0),
        2 => Some(1),
        4 => Some(2),
        7 => Some(3),
        8 => Some(5),
        16 => Some(6),
        17 => Some(7),
        19 => Some(9),
        20 => Some(10),
        21 => Some(11),
        22 => Some(12),
        23 => Some(14),
        24 => Some(15),
        25 => Some(16),
        26 => Some(17),
        27 => Some(18),
        _ => None,
    }
}

fn merge_finals(current: u8, next: u8) -> Option<u8> {
    COMPOUND_FINALS
        .iter()
        .find(|&&(_, first, second)| first == current && second == next)
        .map(|&(compound, _, _)| compound)
}

fn merge_vowels(current: u8, next: u8) -> Option<u8> {
    COMPOUND_VOWELS
        .iter()
        .find(|&&(first, second, _)| first == current && second == next)
        .map(|&(_, _, compound)| compound)
}

/// Split a final before a vowel: (final kept on this syllable, next initial)
fn release_final(final_index: u8) -> Option<(u8, u8)> {
    if let Some(initial) = final_to_initial(final_index) {
        return Some((0, initial));
    }
    COMPOUND_FINALS
        .iter()
        .find(|&&(compound, _, _)| compound == final_index)
        .and_then(|&(_, first, second)| final_to_initial(second).map(|initial| (first, initial)))
}

/// Compose a syllable from (cho, jung, jong) indices
pub fn compose_syllable(cho: u8, jung: u8, jong: u8) -> Option<char> {
    let (cho, jung, jong) = (cho as u32, jung as u32, jong as u32);
    if cho >= CHOSEONG_COUNT || jung >= JUNGSEONG_COUNT || jong >= JONGSEONG_COUNT {
        return None;
    }
    char::from_u32(HANGUL_BASE + (cho * JUNGSEONG_COUNT + jung) * JONGSEONG_COUNT + jong)
}

/// Split a precomposed syllable into (cho, jung, jong) indices
pub fn decompose_syllable(c: char) -> Option<(u8, u8, u8)> {
    let code = c as u32;
    if !(HANGUL_BASE..=HANGUL_LAST).contains(&code) {
        return None;
    }
    let offset = code - HANGUL_BASE;
    let cho = offset / (JUNGSEONG_COUNT * JONGSEONG_COUNT);
    let jung = (offset % (JUNGSEONG_COUNT * JONGSEONG_COUNT)) / JONGSEONG_COUNT;
    let jong = offset % JONGSEONG_COUNT;
    Some((cho as u8, jung as u8, jong as u8))
}

/// Whether `c` is a precomposed Hangul syllable (U+AC00..=U+D7A3)
pub fn is_hangul_syllable(c: char) -> bool {
    (HANGUL_BASE..=HANGUL_LAST).contains(&(c as u32))
}

/// Streaming jamo composer
///
/// Feed characters with [`push`](Self::push) and collect the output with
/// [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct HangulComposer {
    output: String,
    /// Pending initial consonant with the character that introduced it
    cho: Option<(u8, char)>,
    jung: Option<u8>,
    jong: Option<u8>,
}

impl HangulComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: char) {
        match classify(c) {
            Some(Jamo::Vowel(vowel)) => self.push_vowel(vowel, c),
            Some(Jamo::Consonant {
                initial,
                final_index,
            }) => self.push_consonant(initial, final_index, c),
            None => {
                self.flush();
                self.output.push(c);
            }
        }
    }

    pub fn finish(mut self) -> String {
        self.flush();
        self.output
    }

    fn push_consonant(&mut self, initial: Option<u8>, final_index: Option<u8>, c: char) {
        match (self.cho, self.jung, self.jong) {
            (Some(_), Some(_), None) if final_index.is_some() => {
                self.jong = final_index;
            }
            (Some(_), Some(_), Some(current)) => {
                match final_index.and_then(|next| merge_finals(current, next)) {
                    Some(compound) => self.jong = Some(compound),
                    None => {
                        self.flush();
                        self.start(initial, c);
                    }
                }
            }
            _ => {
                self.flush();
                self.start(initial, c);
            }
        }
    }

    fn push_vowel(&mut self, vowel: u8, c: char) {
        match (self.cho, self.jung, self.jong) {
            (Some(_), None, _) => self.jung = Some(vowel),
            (Some(_), Some(current), None) => match merge_vowels(current, vowel) {
                Some(compound) => self.jung = Some(compound),
                None => {
                    self.flush();
                    self.output.push(c);
                }
            },
            (Some((cho, _)), Some(jung), Some(jong)) => match release_final(jong) {
                Some((kept, next_initial)) => {
                    self.emit(cho, jung, kept);
                    self.cho = Some((next_initial, COMPAT_CHOSEONG[next_initial as usize]));
                    self.jung = Some(vowel);
                    self.jong = None;
                }
                None => {
                    self.flush();
                    self.output.push(c);
                }
            },
            (None, _, _) => self.output.push(c),
        }
    }

    fn start(&mut self, initial: Option<u8>, c: char) {
        match initial {
            Some(index) => self.cho = Some((index, c)),
            None => self.output.push(c),
        }
    }

    fn emit(&mut self, cho: u8, jung: u8, jong: u8) {
        if let Some(syllable) = compose_syllable(cho, jung, jong) {
            self.output.push(syllable);
        }
    }

    fn flush(&mut self) {
        match (self.cho.take(), self.jung.take(), self.jong.take()) {
            (Some((cho, _)), Some(jung), jong) => self.emit(cho, jung, jong.unwrap_or(0)),
            (Some((_, original)), None, _) => self.output.push(original),
            _ => {}
        }
    }
}

/// Compose every jamo run in `text`, passing other characters through
pub fn compose(text: &str) -> String {
    let mut composer = HangulComposer::new();
    for c in text.chars() {
        composer.push(c);
    }
    composer.finish()
}
