//! Route naming: model name -> lowercase singular route segment and its English plural.
//! e.g. "User" -> "user" / "users", "Category" -> "category" / "categories"

/// Irregular singular -> plural pairs.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("ox", "oxen"),
];

/// Words whose plural is the same as the singular.
const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "news",
    "data",
    "media",
];

/// Route segment for a model name: lowercase, as given.
pub fn route_name(model: &str) -> String {
    model.to_lowercase()
}

/// English plural of a lowercase word.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == word) {
        return plural.to_string();
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == word) {
        return word.to_string();
    }

    let ends_with_consonant_y = word.ends_with('y')
        && word
            .chars()
            .rev()
            .nth(1)
            .map(|c| !"aeiou".contains(c))
            .unwrap_or(false);
    if ends_with_consonant_y {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    if word.ends_with("fe") {
        return format!("{}ves", &word[..word.len() - 2]);
    }
    if word.ends_with("lf") || word.ends_with("af") || word.ends_with("rf") {
        return format!("{}ves", &word[..word.len() - 1]);
    }
    if word.ends_with("sis") {
        return format!("{}ses", &word[..word.len() - 3]);
    }
    if word.ends_with("ss")
        || word.ends_with("us")
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    format!("{}s", word)
}
