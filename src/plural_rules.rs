//! CLDR plural categories per language, used to label indexed plural forms.
//!
//! gettext stores plural translations as `msgstr[0]`, `msgstr[1]`, …; the
//! meaning of each index depends on the language. This table gives the
//! category order for common languages so indexed forms can be mapped onto
//! [`PluralCategory`] and the `other` form can be picked out.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;

use crate::types::{PluralCategory, parse_language_identifier};

lazy_static! {
    /// Static mapping from base language subtag → plural categories (CLDR-style, cardinals).
    static ref CATEGORY_TABLE: BTreeMap<&'static str, BTreeSet<PluralCategory>> = {
        use PluralCategory::*;
        let mut m: BTreeMap<&'static str, BTreeSet<PluralCategory>> = BTreeMap::new();

        fn s(items: &[PluralCategory]) -> BTreeSet<PluralCategory> {
            items.iter().copied().collect()
        }

        // One/Other
        for code in [
            "en","de","nl","sv","da","nb","nn","no","is","fi","et","fa","hi","bn","gu",
            "ta","te","kn","ml","mr","it","es","pt","mk","el","eu","gl","af","sw","ur",
            "fil","tl","tr","id","ms","fr","hy","kab","ca","bg","hu","ka","kk","az"
        ] {
            m.insert(code, s(&[One, Other]));
        }

        // Only Other
        for code in ["ja","zh","ko","th","vi","km","lo","my","yue"] {
            m.insert(code, s(&[Other]));
        }

        for code in ["ru","uk","be","sr","hr","bs","sh","pl"] {
            m.insert(code, s(&[One, Few, Many, Other]));
        }

        for code in ["cs","sk","lt","ro"] {
            m.insert(code, s(&[One, Few, Other]));
        }

        m.insert("sl", s(&[One, Two, Few, Other]));
        m.insert("ga", s(&[One, Two, Few, Many, Other]));
        m.insert("ar", s(&[Zero, One, Two, Few, Many, Other]));

        for code in ["he","iw"] {
            m.insert(code, s(&[One, Two, Many, Other]));
        }

        m
    };

    /// Languages whose gettext `Plural-Forms` number the forms differently
    /// from the CLDR category order.
    static ref GETTEXT_INDEX_ORDER: BTreeMap<&'static str, Vec<PluralCategory>> = {
        use PluralCategory::*;
        let mut m = BTreeMap::new();
        // plural=(n%10==1 && n%100!=11 ? 0 : n != 0 ? 1 : 2)
        m.insert("lv", vec![One, Other, Zero]);
        m
    };
}

/// Returns the plural categories of `locale` in gettext index order.
///
/// Unknown locales get `[one, other]`, the most common gettext layout.
pub fn categories_for(locale: &str) -> Vec<PluralCategory> {
    let language = parse_language_identifier(locale)
        .map(|id| id.language.as_str().to_string())
        .unwrap_or_default();
    if let Some(order) = GETTEXT_INDEX_ORDER.get(language.as_str()) {
        return order.clone();
    }
    CATEGORY_TABLE
        .get(language.as_str())
        .map(|set| set.iter().copied().collect())
        .unwrap_or_else(|| vec![PluralCategory::One, PluralCategory::Other])
}

/// Maps gettext plural index `index` onto a category for `locale`.
///
/// `nplurals` is the count declared by the file's `Plural-Forms` header, if
/// any. The last index always maps to `other` when the language has fewer
/// indices than categories.
pub fn category_for_index(locale: &str, index: usize, nplurals: Option<usize>) -> PluralCategory {
    let categories = categories_for(locale);
    let count = nplurals.unwrap_or(categories.len());
    if count > 0 && index + 1 == count && count < categories.len() {
        return PluralCategory::Other;
    }
    categories
        .get(index)
        .copied()
        .unwrap_or(PluralCategory::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use PluralCategory::*;

    #[test]
    fn test_categories_for_known_languages() {
        assert_eq!(categories_for("en"), vec![One, Other]);
        assert_eq!(categories_for("en-US"), vec![One, Other]);
        assert_eq!(categories_for("ja"), vec![Other]);
        assert_eq!(categories_for("ru_RU"), vec![One, Few, Many, Other]);
        assert_eq!(categories_for("ar"), vec![Zero, One, Two, Few, Many, Other]);
    }

    #[test]
    fn test_categories_for_unknown_language() {
        assert_eq!(categories_for("xx"), vec![One, Other]);
        assert_eq!(categories_for("???"), vec![One, Other]);
    }

    #[test]
    fn test_category_for_index() {
        assert_eq!(category_for_index("en", 0, Some(2)), One);
        assert_eq!(category_for_index("en", 1, Some(2)), Other);
        assert_eq!(category_for_index("ja", 0, Some(1)), Other);
        // gettext Russian has three forms; the last one carries `other`.
        assert_eq!(category_for_index("ru", 0, Some(3)), One);
        assert_eq!(category_for_index("ru", 1, Some(3)), Few);
        assert_eq!(category_for_index("ru", 2, Some(3)), Other);
        // Indices past the table fall back to `other`.
        assert_eq!(category_for_index("en", 5, None), Other);
    }

    #[test]
    fn test_latvian_uses_gettext_index_order() {
        assert_eq!(categories_for("lv"), vec![One, Other, Zero]);
        assert_eq!(category_for_index("lv", 0, Some(3)), One);
        assert_eq!(category_for_index("lv", 1, Some(3)), Other);
        assert_eq!(category_for_index("lv_LV", 2, Some(3)), Zero);
        assert_eq!(category_for_index("lv", 1, Some(2)), Other);
    }
}
