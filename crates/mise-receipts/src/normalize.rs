use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds an ingredient or receipt line name into the key used for matching.
///
/// Lowercases, rewrites "ç" and "ão", strips accents and every character
/// that is not a letter or digit, then collapses spellings that sound
/// alike ("lh", "zz", doubled letters, silent "h"). "Queijo Muçarela" and
/// "QUEIJO MUSSARELA" fold to the same key whether the accents arrive
/// precomposed or as combining marks.
pub fn normalize_name(name: &str) -> String {
    // composed form, so "c" + U+0327 is seen as "ç"
    let lowered = name.nfkc().collect::<String>().to_lowercase();
    let lowered = lowered.replace('ç', "ss").replace("ão", "o");

    let plain: String = lowered
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .filter(char::is_ascii_alphanumeric)
        .collect();

    let plain = plain.replace("lh", "l").replace("zz", "s");

    let mut key = String::with_capacity(plain.len());
    let mut previous = None;
    for ch in plain.chars() {
        if ch == 'h' {
            continue;
        }
        if ch.is_ascii_alphabetic() && previous == Some(ch) {
            continue;
        }
        key.push(ch);
        previous = Some(ch);
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_accents_and_punctuation() {
        assert_eq!(normalize_name("  Açúcar Refinado 1kg! "), "asucarrefinado1kg");
        assert_eq!(normalize_name("FEIJÃO-PRETO"), "feijopreto");
        assert_eq!(normalize_name("Café"), "cafe");
    }

    #[test]
    fn collapses_sound_alike_spellings() {
        assert_eq!(normalize_name("Queijo Mussarela"), normalize_name("Queijo Muçarela"));
        assert_eq!(normalize_name("Mozzarella"), "mosarela");
        assert_eq!(normalize_name("Filhote"), "filote");
        assert_eq!(normalize_name("Repolho"), "repolo");
    }

    #[test]
    fn decomposed_accents_fold_like_precomposed_ones() {
        assert_eq!(
            normalize_name("Queijo Muc\u{0327}arela"),
            normalize_name("Queijo Mussarela")
        );
        assert_eq!(normalize_name("FEIJA\u{0303}O"), "feijo");
        assert_eq!(normalize_name("Cafe\u{0301}"), normalize_name("Café"));
        assert_eq!(normalize_name("Pi\u{00f1}a"), normalize_name("Pin\u{0303}a"));
    }

    #[test]
    fn compatibility_forms_fold_to_ascii() {
        assert_eq!(normalize_name("ＡＲＲＯＺ ５kg"), "aroz5kg");
        assert_eq!(normalize_name("ﬁlé"), "file");
    }

    #[test]
    fn keeps_repeated_digits() {
        assert_eq!(normalize_name("Farinha 1000g"), "farina1000g");
    }

    #[test]
    fn blank_names_fold_to_empty() {
        assert_eq!(normalize_name(" -- "), "");
    }
}
