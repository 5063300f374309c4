use serde_json::Value;
use url::Url;

/// Sets each key to the stringified value on the URL's query. Repeated merges
/// with the same key overwrite the previous value instead of appending a
/// duplicate pair; insertion order of new keys is preserved.
pub fn set_params<I, K, V>(url: &mut Url, params: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (key, value) in params {
        let key = key.as_ref();
        let value = value.as_ref();
        match pairs.iter_mut().find(|(existing, _)| existing == key) {
            Some(pair) => pair.1 = value.to_string(),
            None => pairs.push((key.to_string(), value.to_string())),
        }
    }

    if pairs.is_empty() {
        url.set_query(None);
        return;
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
}

/// JSON values render the way the originating API expects them back: strings
/// bare, everything else via its JSON form.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_and_form_encodes_values() {
        let mut url = Url::parse("https://api.example.org/execute/buy/v2").unwrap();
        set_params(
            &mut url,
            [("taker", "0xabc"), ("tokens[0]", "0xcol:5")],
        );
        assert_eq!(
            url.query(),
            Some("taker=0xabc&tokens%5B0%5D=0xcol%3A5")
        );
    }

    #[test]
    fn repeated_merge_overwrites_instead_of_appending() {
        let mut url = Url::parse("https://api.example.org/x?taker=0xabc").unwrap();
        set_params(&mut url, [("taker", "0xdef"), ("r", "0x01")]);
        assert_eq!(url.query(), Some("taker=0xdef&r=0x01"));

        set_params(&mut url, [("r", "0x02")]);
        assert_eq!(url.query(), Some("taker=0xdef&r=0x02"));
    }

    #[test]
    fn stringify_matches_javascript_to_string() {
        assert_eq!(stringify(&json!("0xabc")), "0xabc");
        assert_eq!(stringify(&json!(27)), "27");
        assert_eq!(stringify(&json!(true)), "true");
    }

    #[test]
    fn empty_merge_preserves_existing_query() {
        let mut url = Url::parse("https://api.example.org/x?a=1").unwrap();
        set_params(&mut url, std::iter::empty::<(&str, &str)>());
        assert_eq!(url.query(), Some("a=1"));
    }
}
