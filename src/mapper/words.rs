//! Word-stem condensation for generated identifiers.

/// Maximum significant words taken from a name.
const MAX_WORDS: usize = 2;
/// Maximum letters kept per word.
const WORD_LEN: usize = 4;

/// Condense a descriptive name into a CamelCase stem.
///
/// Each of the first two alphanumeric words contributes its leading letter
/// (upper-cased) followed by up to three more consonants, so
/// "Escherichia coli" becomes "EschCl" and "hypothetical protein" becomes
/// "HyptPrtn". Purely numeric words are skipped. The result may be empty for
/// names with no letters.
pub fn condense(name: &str) -> String {
    let mut stem = String::new();
    let mut taken = 0;

    for word in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        if taken >= MAX_WORDS {
            break;
        }
        if !word.chars().any(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        let mut chars = word.chars().filter(char::is_ascii_alphabetic);
        let Some(first) = chars.next() else {
            continue;
        };
        stem.push(first.to_ascii_uppercase());
        let mut kept = 1;
        for c in chars {
            if kept >= WORD_LEN {
                break;
            }
            if !matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u') {
                stem.push(c.to_ascii_lowercase());
                kept += 1;
            }
        }
        taken += 1;
    }
    stem
}

/// Capitalize a feature type for embedding in a word identifier.
pub fn capitalize(ftype: &str) -> String {
    let mut chars = ftype.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condense_two_words() {
        assert_eq!(condense("Escherichia coli"), "EschCl");
        assert_eq!(condense("hypothetical protein"), "HyptPrtn");
    }

    #[test]
    fn test_condense_skips_numeric_words() {
        // Purely numeric words contribute nothing to the stem.
        assert_eq!(condense("Anthrobacter 12345"), "Anth");
    }

    #[test]
    fn test_condense_deterministic() {
        assert_eq!(condense("Curli production protein"), condense("Curli production protein"));
    }

    #[test]
    fn test_condense_empty() {
        assert_eq!(condense("12.34"), "");
        assert_eq!(condense(""), "");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("peg"), "Peg");
        assert_eq!(capitalize("rna"), "Rna");
    }
}
