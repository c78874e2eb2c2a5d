//! Static word lists that keep the heuristics from flagging real products.

/// Legitimate words whose letter patterns resemble OCR misreads.
/// Matching tokens are never flagged by the cluster, noise or vowel checks.
const LEGITIMATE_WORDS: &[&str] = &[
    "borscht",
    "bratwurst",
    "brontosaurus",
    "chrysanthemum",
    "frankfurter",
    "gewurztraminer",
    "gorgonzola",
    "knackwurst",
    "kirschwasser",
    "mozzarella",
    "pepperoncini",
    "pfeffernusse",
    "prosciutto",
    "pumpernickel",
    "sauerkraut",
    "schnitzel",
    "schnapps",
    "schweppes",
    "strengths",
    "stracciatella",
    "tzatziki",
    "worcestershire",
];

/// Units of measure and packaging words.
const UNIT_WORDS: &[&str] = &[
    "bag", "bags", "bottle", "bottles", "box", "boxes", "btl", "bunch", "can", "cans", "carton",
    "case", "cases", "ctn", "doz", "dozen", "each", "gal", "gallon", "gallons", "gram", "grams",
    "jar", "kilo", "kilos", "liter", "liters", "litre", "litres", "lbs", "pack", "packs", "pail",
    "pkg", "pkt", "pound", "pounds", "roll", "rolls", "sack", "tray", "tub", "unit", "units",
];

/// Abbreviations common on distributor invoices.
const ABBREVIATIONS: &[&str] = &[
    "assrt", "asst", "blk", "bnls", "brst", "chkn", "choc", "crm", "frz", "frzn", "grnd", "hvy",
    "lrg", "mdm", "mixd", "org", "pcs", "qty", "shrd", "skls", "sknls", "slcd", "sml", "whl",
    "whp", "wht", "xlg",
];

/// Culinary terms that general-purpose dictionaries tend to miss.
const CULINARY_TERMS: &[&str] = &[
    "aioli", "arugula", "bechamel", "bresaola", "brioche", "burrata", "ciabatta", "chorizo",
    "edamame", "focaccia", "gnocchi", "gochujang", "guanciale", "harissa", "jalapeno",
    "jalapenos", "kimchi", "mascarpone", "mirin", "miso", "nduja", "pancetta", "panko",
    "parmigiano", "pecorino", "radicchio", "ricotta", "sriracha", "tahini", "tempeh", "tofu",
    "wasabi", "yuzu",
];

/// True for words the quality heuristics must never flag.
pub fn is_legitimate_word(lowercase: &str) -> bool {
    LEGITIMATE_WORDS.contains(&lowercase) || CULINARY_TERMS.contains(&lowercase)
}

/// True for domain vocabulary the typo check skips.
pub fn is_domain_term(lowercase: &str) -> bool {
    UNIT_WORDS.contains(&lowercase)
        || ABBREVIATIONS.contains(&lowercase)
        || CULINARY_TERMS.contains(&lowercase)
        || LEGITIMATE_WORDS.contains(&lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_are_lowercase() {
        for list in [LEGITIMATE_WORDS, UNIT_WORDS, ABBREVIATIONS, CULINARY_TERMS] {
            for word in list {
                assert_eq!(*word, word.to_lowercase());
            }
        }
    }

    #[test]
    fn test_lookups() {
        assert!(is_legitimate_word("prosciutto"));
        assert!(is_domain_term("frzn"));
        assert!(is_domain_term("dozen"));
        assert!(!is_domain_term("prontosaurvi"));
    }
}
