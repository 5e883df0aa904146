/// Textual `${var}`-token replacement against an ordered substitution list.
///
/// Declaration order is preserved (rather than collecting into a `HashMap`)
/// because the source iterates its replacement dict in insertion order and a
/// rule author may rely on earlier substitutions affecting later ones when
/// variable names overlap as substrings.
pub fn substitute(input: &str, replacements: &[(String, String)]) -> String {
    let mut output = input.to_owned();
    for (name, value) in replacements {
        output = output.replace(name.as_str(), value.as_str());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_single_token() {
        let subs = vec![("${load}".to_owned(), "42".to_owned())];
        assert_eq!(substitute("value is ${load}", &subs), "value is 42");
    }

    #[test]
    fn unchanged_when_no_match() {
        let subs = vec![("${load}".to_owned(), "42".to_owned())];
        assert_eq!(substitute("/m/v", &subs), "/m/v");
    }

    #[test]
    fn applies_in_declaration_order() {
        let subs = vec![
            ("${a}".to_owned(), "${b}".to_owned()),
            ("${b}".to_owned(), "final".to_owned()),
        ];
        assert_eq!(substitute("${a}", &subs), "final");
    }
}
