//! Нормализация сценария и разбиение на абзацы для синтеза речи.
//!
//! Сценарий от языковой модели часто содержит таймкоды, пометки в скобках и
//! остатки латиницы. Всё это вырезается, затем текст делится на предложения,
//! а предложения группируются по `SENTENCES_PER_PARAGRAPH` в абзацы.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::constants::{PARAGRAPH_TERMINATOR, SENTENCES_PER_PARAGRAPH, SENTENCE_TERMINATORS};

lazy_static! {
    // (..1..), "#1 - 2", hh:mm:ss, mm:ss, "#1 00:12"
    static ref TIMESTAMP_RE: Regex = Regex::new(
        r"\(.*?\d+.*?\)|#+.*?\d+.*?-.*?\d+|\d+[:.]\d+[:.]\d+|\d+[:.]\d+|#+.*?\d+[:.]\d+"
    )
    .unwrap();
    static ref RESIDUE_RE: Regex = Regex::new(r"[a-zA-Z()\[\].\-!#]").unwrap();
}

/// Удаляет из сценария таймкоды, латиницу и разметку
pub fn normalize_script(raw: &str) -> String {
    let without_timestamps = TIMESTAMP_RE.replace_all(raw, "");
    RESIDUE_RE.replace_all(&without_timestamps, "").into_owned()
}

/// Разбивает нормализованный текст на непустые предложения
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Разбивает сценарий на абзацы для синтеза речи.
///
/// Каждый абзац состоит максимум из `SENTENCES_PER_PARAGRAPH` предложений,
/// соединённых пробелом, и заканчивается ровно одним `PARAGRAPH_TERMINATOR`.
/// Порядок предложений сохраняется. Пустой результат означает, что озвучивать
/// нечего.
pub fn chunk_script(raw: &str) -> Vec<String> {
    let sentences = split_sentences(&normalize_script(raw));

    let paragraphs: Vec<String> = sentences
        .chunks(SENTENCES_PER_PARAGRAPH)
        .map(|group| {
            let mut paragraph = group.join(" ");
            paragraph.push(PARAGRAPH_TERMINATOR);
            paragraph
        })
        .collect();

    debug!(
        "Chunked script into {} sentences / {} paragraphs",
        sentences.len(),
        paragraphs.len()
    );

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminator_count(s: &str) -> usize {
        s.chars().filter(|c| SENTENCE_TERMINATORS.contains(c)).count()
    }

    #[test]
    fn test_empty_and_stripped_input() {
        assert!(chunk_script("").is_empty());
        assert!(chunk_script("   \n\t ").is_empty());
        assert!(chunk_script("Hello world! (00:12) [intro] ...").is_empty());
    }

    #[test]
    fn test_timestamp_in_parentheses_removed() {
        let paragraphs = chunk_script("အကြောင်း(10:20)တစ်ခု။ နောက်တစ်ခု။");
        assert_eq!(paragraphs, vec!["အကြောင်းတစ်ခု နောက်တစ်ခု။".to_string()]);
        assert!(!paragraphs[0].contains("10"));
    }

    #[test]
    fn test_bare_timestamps_and_latin_removed() {
        let paragraphs = chunk_script("01:23:45 ဇာတ်လမ်း Scene one စတယ်။ 12:30 သူထွက်သွားတယ်။");
        assert_eq!(paragraphs.len(), 1);
        for p in &paragraphs {
            assert!(!p.contains("01:23:45"));
            assert!(!p.contains("12:30"));
            assert!(!p.chars().any(|c| c.is_ascii_alphabetic()));
        }
    }

    #[test]
    fn test_hash_ranges_removed() {
        let paragraphs = chunk_script("#1 - 3 ပထမ။ #2 00:15 ဒုတိယ။");
        assert_eq!(paragraphs, vec!["ပထမ ဒုတိယ။".to_string()]);
    }

    #[test]
    fn test_grouping_into_threes() {
        let script = "က။ ခ။ ဂ။ ဃ။ င။ စ။ ဆ။";
        let paragraphs = chunk_script(script);

        // 7 sentences -> ceil(7 / 3) paragraphs
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0], "က ခ ဂ။");
        assert_eq!(paragraphs[1], "ဃ င စ။");
        assert_eq!(paragraphs[2], "ဆ။");

        for p in &paragraphs {
            assert_eq!(terminator_count(p), 1);
            assert!(p.ends_with(PARAGRAPH_TERMINATOR));
        }
    }

    #[test]
    fn test_sentence_order_preserved() {
        let sentences = ["တစ်", "နှစ်", "သုံး", "လေး", "ငါး"];
        let script = sentences
            .iter()
            .map(|s| format!("{}။", s))
            .collect::<Vec<_>>()
            .join(" ");

        let rebuilt: Vec<String> = chunk_script(&script)
            .iter()
            .flat_map(|p| split_sentences(p))
            .flat_map(|s| s.split(' ').map(str::to_string).collect::<Vec<_>>())
            .collect();

        assert_eq!(rebuilt, sentences);
    }

    #[test]
    fn test_devanagari_danda_splits_sentences() {
        let paragraphs = chunk_script("က। ခ");
        assert_eq!(paragraphs, vec!["က ခ။".to_string()]);
    }

    #[test]
    fn test_punctuation_stripped() {
        assert_eq!(normalize_script("ကောင်း!!! [ရယ်] ဟုတ်...#"), "ကောင်း ရယ် ဟုတ်");
    }
}
